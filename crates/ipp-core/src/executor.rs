use crate::command::{IPTABLES, IptablesCommand};
use crate::error::RunCommandError;
use tracing::{debug, error};

/// Decoded result of one control-utility invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs control-utility commands against the host.
///
/// Implementors only provide [`CommandExecutor::execute`]; logging and the
/// opt-in error policy live in the provided methods.
pub trait CommandExecutor {
    /// Run the command and report how it exited
    fn execute(&self, command: &IptablesCommand) -> std::io::Result<CommandOutput>;

    /// Command line used in log output
    fn command_line(&self, command: &IptablesCommand) -> String {
        command.command_line(IPTABLES)
    }

    /// Run a command, logging any failure.
    ///
    /// A non-zero exit is returned as `Ok` unless `raise_on_failure` is set.
    /// Spawn failures are always returned as errors.
    fn run_command(
        &self,
        command: &IptablesCommand,
        raise_on_failure: bool,
    ) -> Result<CommandOutput, RunCommandError> {
        let line = self.command_line(command);
        debug!("Running command: {}", line);

        let output = self.execute(command).map_err(|source| {
            error!("\"{}\" could not be spawned: {}", line, source);
            RunCommandError::Spawn {
                command: line.clone(),
                source,
            }
        })?;

        if output.success() {
            return Ok(output);
        }

        let err = RunCommandError::Failed {
            command: line,
            code: output.code,
            stderr: output.stderr.trim_end().to_string(),
        };
        error!("{}", err);

        if raise_on_failure {
            return Err(err);
        }
        Ok(output)
    }

    /// Exit code only, for existence checks. Spawn failures map to -1.
    fn run_command_return_rc(&self, command: &IptablesCommand) -> i32 {
        match self.execute(command) {
            Ok(output) => output.code,
            Err(e) => {
                debug!("\"{}\" could not be spawned: {}", self.command_line(command), e);
                -1
            }
        }
    }
}
