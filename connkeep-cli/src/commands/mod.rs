//! Command handler modules for the CLI.

mod secret;

use crate::cli::Commands;
use crate::error::CliError;
use crate::util::SessionOptions;

/// Dispatch a CLI command to the appropriate handler.
pub fn dispatch(options: &SessionOptions, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Target { connection, kind } => secret::cmd_target(&connection, kind.into()),
        Commands::Set {
            connection,
            kind,
            user,
            name,
            stdin,
        } => secret::cmd_set(
            options,
            secret::SetParams {
                connection: &connection,
                kind: kind.into(),
                user: user.as_deref(),
                name: name.as_deref(),
                stdin,
            },
        ),
        Commands::Get {
            connection,
            kind,
            reveal,
            prompt,
            stdin,
        } => secret::cmd_get(options, &connection, kind.into(), reveal, prompt, stdin),
        Commands::Delete { connection } => secret::cmd_delete(options, &connection),
        Commands::Clear { connection, kind } => secret::cmd_clear(options, &connection, kind.into()),
    }
}
