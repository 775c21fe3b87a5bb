//! Secret management commands.

use connkeep_core::secret::{StageOutcome, build_target};
use connkeep_core::{ConnectionId, SecretError, SecretKind, WindowHandle};
use secrecy::ExposeSecret;

use crate::error::CliError;
use crate::prompt::TerminalPrompter;
use crate::util::{SessionOptions, open_session, profile_for};

/// Parameters for the set command
pub struct SetParams<'a> {
    pub connection: &'a str,
    pub kind: SecretKind,
    pub user: Option<&'a str>,
    pub name: Option<&'a str>,
    pub stdin: bool,
}

fn check_connection(connection: &str) -> Result<ConnectionId, CliError> {
    let id = ConnectionId::from(connection);
    if id.is_empty() {
        return Err(SecretError::InvalidArgument("connection id is empty".to_string()).into());
    }
    Ok(id)
}

/// Prints the store key for a connection's secret
pub fn cmd_target(connection: &str, kind: SecretKind) -> Result<(), CliError> {
    let id = check_connection(connection)?;
    let target = build_target(&id, kind)
        .ok_or_else(|| SecretError::InvalidArgument("connection id is empty".to_string()))?;
    println!("{target}");
    Ok(())
}

/// Reads a secret and commits it like an edited profile
pub fn cmd_set(options: &SessionOptions, params: SetParams<'_>) -> Result<(), CliError> {
    let id = check_connection(params.connection)?;
    let kind = params.kind;
    let profile = profile_for(params.connection, kind, params.name, params.user);
    let mut context = open_session(
        options,
        profile.clone(),
        TerminalPrompter::new(params.stdin),
    )?;
    let dispatcher = context.dispatcher();

    let secret = dispatcher.prompt_for_secret(&profile.name, kind, WindowHandle::NONE)?;
    let edit_id = id.clone();
    let outcome = dispatcher.call(move |service| {
        service.begin_edit(&edit_id)?;
        let staging = service.staging_mut();
        staging.on_field_changed(&edit_id);
        Ok(staging.stage(&edit_id, kind, secret.expose_secret()))
    })?;
    if outcome != StageOutcome::Staged(kind) {
        tracing::warn!(?outcome, "Secret was not staged");
    }

    let report = dispatcher.commit_edits(vec![profile.clone()], vec![profile])?;
    context.shutdown();

    if report.written.contains(&(id.clone(), kind)) {
        println!("Saved {} for {id}", kind.label());
    } else {
        println!("Nothing to save for {id}");
    }
    Ok(())
}

/// Reports whether a secret is saved, printing it with `--reveal`
pub fn cmd_get(
    options: &SessionOptions,
    connection: &str,
    kind: SecretKind,
    reveal: bool,
    prompt: bool,
    stdin: bool,
) -> Result<(), CliError> {
    let id = check_connection(connection)?;
    let profile = profile_for(connection, kind, None, None);
    let mut context = open_session(options, profile, TerminalPrompter::new(stdin))?;
    let dispatcher = context.dispatcher();

    let secret = if prompt {
        dispatcher.resolve_secret(&id, kind, WindowHandle::NONE)?
    } else {
        dispatcher.get_secret(&id, kind, WindowHandle::NONE)?
    };
    context.shutdown();

    if reveal {
        println!("{}", secret.expose_secret());
    } else {
        println!("A {} is saved for {id}", kind.label());
    }
    Ok(())
}

/// Deletes both secret kinds of a connection
pub fn cmd_delete(options: &SessionOptions, connection: &str) -> Result<(), CliError> {
    let id = check_connection(connection)?;
    let saved = profile_for(connection, SecretKind::Password, None, None);
    let unsaved = saved.clone().with_save_password(false);
    let mut context = open_session(options, saved.clone(), TerminalPrompter::default())?;
    let dispatcher = context.dispatcher();

    let edit_id = id.clone();
    let stored = dispatcher.call(move |service| service.begin_edit(&edit_id))?;
    if stored.is_empty() {
        context.shutdown();
        return Err(SecretError::NotFound(format!("no secret saved for {id}")).into());
    }

    dispatcher.commit_edits(vec![unsaved], vec![saved])?;
    context.shutdown();
    println!("Deleted {} saved secret(s) for {id}", stored.len());
    Ok(())
}

/// Drops a cached secret
pub fn cmd_clear(options: &SessionOptions, connection: &str, kind: SecretKind) -> Result<(), CliError> {
    let id = check_connection(connection)?;
    let profile = profile_for(connection, kind, None, None);
    let mut context = open_session(options, profile, TerminalPrompter::default())?;
    context.dispatcher().clear_cached_secret(&id, kind)?;
    context.shutdown();
    println!("Cleared cached {} for {id}", kind.label());
    Ok(())
}
