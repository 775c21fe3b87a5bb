//! Terminal secret entry

use std::io::BufRead;

use connkeep_core::secret::{PromptRequest, SecretPrompter};
use connkeep_core::{SecretError, SecretResult};
use secrecy::SecretString;

/// Reads secrets from the terminal without echo, or from standard input
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter {
    from_stdin: bool,
}

impl TerminalPrompter {
    /// Creates a prompter; `from_stdin` reads one line from standard input
    #[must_use]
    pub const fn new(from_stdin: bool) -> Self {
        Self { from_stdin }
    }

    fn read_line(&self, request: &PromptRequest) -> std::io::Result<String> {
        if self.from_stdin {
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        } else {
            rpassword::prompt_password(format!("{}: ", request.message()))
        }
    }
}

impl SecretPrompter for TerminalPrompter {
    fn prompt(&self, request: &PromptRequest) -> SecretResult<Option<SecretString>> {
        let mut line = self
            .read_line(request)
            .map_err(|e| SecretError::Unexpected(format!("failed to read secret: {e}")))?;
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        if line.is_empty() {
            return Ok(None);
        }
        Ok(Some(SecretString::from(line)))
    }
}
