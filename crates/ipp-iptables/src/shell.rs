use ipp_core::{CommandExecutor, CommandOutput, IPTABLES, IptablesCommand};
use std::process::{Command, Stdio};
use tracing::info;

/// Runs iptables through `sh -c`, the rule token being word-split by the shell
pub struct ShellExecutor {
    binary: String,
    dry_run: bool,
}

impl ShellExecutor {
    pub fn new(dry_run: bool) -> Self {
        Self {
            binary: IPTABLES.to_string(),
            dry_run,
        }
    }

    /// Use another iptables-compatible binary, e.g. `ip6tables` or `iptables-legacy`
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl CommandExecutor for ShellExecutor {
    fn execute(&self, command: &IptablesCommand) -> std::io::Result<CommandOutput> {
        let line = self.command_line(command);

        // Queries still hit the live tables so a dry run reports real drift
        if self.dry_run && !command.is_query() {
            info!("[DRY RUN] Would execute: {}", line);
            return Ok(CommandOutput::default());
        }

        let output = Command::new("sh")
            .arg("-c")
            .arg(&line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code().unwrap_or(-1),
        })
    }

    fn command_line(&self, command: &IptablesCommand) -> String {
        command.command_line(&self.binary)
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipp_core::{Policy, RuleSpec, TableName};

    fn append() -> IptablesCommand {
        IptablesCommand::Append {
            table: TableName::Filter,
            chain: "INPUT".into(),
            rule: RuleSpec::new("-p", Some("tcp --dport 22 -j ACCEPT".into())),
        }
    }

    #[test]
    fn command_line_uses_configured_binary() {
        let exec = ShellExecutor::default().with_binary("ip6tables");
        assert_eq!(
            exec.command_line(&append()),
            "ip6tables -t filter -A INPUT -p:tcp --dport 22 -j ACCEPT"
        );
    }

    #[test]
    fn dry_run_skips_mutations() {
        let exec = ShellExecutor::new(true).with_binary("false");
        let out = exec.execute(&append()).unwrap();
        assert!(out.success());

        let policy = IptablesCommand::SetPolicy {
            table: TableName::Filter,
            chain: "INPUT".into(),
            policy: Policy::Drop,
        };
        assert!(exec.run_command(&policy, true).is_ok());
    }

    #[test]
    fn dry_run_still_runs_queries() {
        let exec = ShellExecutor::new(true).with_binary("false");
        let check = IptablesCommand::Check {
            table: TableName::Filter,
            chain: "INPUT".into(),
            rule: RuleSpec::new("-j ACCEPT", None),
        };
        assert_ne!(exec.run_command_return_rc(&check), 0);
    }

    #[test]
    fn exit_status_and_output_are_captured() {
        let exec = ShellExecutor::default().with_binary("echo");
        let list = IptablesCommand::ListChain {
            table: TableName::Filter,
            chain: "CUSTOM1".into(),
        };
        let out = exec.run_command(&list, true).unwrap();
        assert_eq!(out.stdout, "-t filter -L CUSTOM1\n");

        let failing = ShellExecutor::default().with_binary("false");
        assert_eq!(failing.run_command_return_rc(&list), 1);
        assert!(failing.run_command(&list, true).is_err());
        assert_eq!(failing.run_command(&list, false).unwrap().code, 1);
    }
}
