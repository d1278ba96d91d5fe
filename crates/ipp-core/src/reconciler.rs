use crate::command::{CHAIN_LOOKUP_TABLE, IptablesCommand};
use crate::executor::CommandExecutor;
use crate::model::{Chain, Policy, RuleSpec, Ruleset, TableName};
use crate::report::{Outcome, ReconcileReport, Step};
use tracing::info;

/// Converges live iptables state to a loaded [`Ruleset`].
///
/// Every mutation except policy assignment is guarded by an existence check,
/// so `start` and `stop` can be repeated freely. Failures are recorded per
/// step and never stop the walk.
pub struct Reconciler<E> {
    ruleset: Ruleset,
    executor: E,
}

impl<E: CommandExecutor> Reconciler<E> {
    pub fn new(ruleset: Ruleset, executor: E) -> Self {
        Self { ruleset, executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Apply the ruleset.
    ///
    /// User-defined chains are created and filled before any built-in chain
    /// is touched, so jump rules always find their target.
    pub fn start(&self) -> ReconcileReport {
        let mut report = ReconcileReport::new();

        for table in self.ruleset.tables() {
            for chain in table.user_chains() {
                self.create_chain(table.name(), chain.name(), &mut report);
                for rule in chain.rules() {
                    self.append_rule(chain, rule, &mut report);
                }
            }
        }

        for table in self.ruleset.tables() {
            for chain in table.builtin_chains() {
                for rule in chain.rules() {
                    self.append_rule(chain, rule, &mut report);
                }
                if let Some(policy) = chain.policy() {
                    self.set_policy(chain, policy, &mut report);
                }
            }
        }

        info!("start finished: {}", report);
        report
    }

    /// Reset policies to ACCEPT and remove every managed rule.
    ///
    /// User-defined chains are left in place, empty.
    pub fn stop(&self) -> ReconcileReport {
        let mut report = ReconcileReport::new();

        for chain in self.ruleset.chains() {
            if chain.policy().is_some() {
                self.set_policy(chain, Policy::Accept, &mut report);
            }
            for rule in chain.rules() {
                self.delete_rule(chain, rule, &mut report);
            }
        }

        info!("stop finished: {}", report);
        report
    }

    pub fn chain_exists(&self, chain: &str) -> bool {
        let cmd = IptablesCommand::ListChain {
            table: CHAIN_LOOKUP_TABLE,
            chain: chain.to_string(),
        };
        self.executor.run_command_return_rc(&cmd) == 0
    }

    pub fn check_rule(&self, chain: &Chain, rule: &RuleSpec) -> bool {
        let cmd = IptablesCommand::Check {
            table: chain.table(),
            chain: chain.name().to_string(),
            rule: rule.clone(),
        };
        self.executor.run_command_return_rc(&cmd) == 0
    }

    fn create_chain(&self, table: TableName, name: &str, report: &mut ReconcileReport) {
        let step = Step::CreateChain {
            table,
            chain: name.to_string(),
        };
        if self.chain_exists(name) {
            report.record(step, Outcome::AlreadyPresent);
            return;
        }

        let cmd = IptablesCommand::NewChain {
            table,
            chain: name.to_string(),
        };
        report.record(step, self.run(&cmd));
    }

    fn append_rule(&self, chain: &Chain, rule: &RuleSpec, report: &mut ReconcileReport) {
        let step = Step::AppendRule {
            table: chain.table(),
            chain: chain.name().to_string(),
            rule: rule.token(),
        };
        if self.check_rule(chain, rule) {
            report.record(step, Outcome::AlreadyPresent);
            return;
        }

        let cmd = IptablesCommand::Append {
            table: chain.table(),
            chain: chain.name().to_string(),
            rule: rule.clone(),
        };
        report.record(step, self.run(&cmd));
    }

    fn delete_rule(&self, chain: &Chain, rule: &RuleSpec, report: &mut ReconcileReport) {
        let step = Step::DeleteRule {
            table: chain.table(),
            chain: chain.name().to_string(),
            rule: rule.token(),
        };
        if !self.check_rule(chain, rule) {
            report.record(step, Outcome::Absent);
            return;
        }

        let cmd = IptablesCommand::Delete {
            table: chain.table(),
            chain: chain.name().to_string(),
            rule: rule.clone(),
        };
        report.record(step, self.run(&cmd));
    }

    fn set_policy(&self, chain: &Chain, policy: Policy, report: &mut ReconcileReport) {
        let cmd = IptablesCommand::SetPolicy {
            table: chain.table(),
            chain: chain.name().to_string(),
            policy,
        };
        let step = Step::SetPolicy {
            table: chain.table(),
            chain: chain.name().to_string(),
            policy,
        };
        report.record(step, self.run(&cmd));
    }

    fn run(&self, cmd: &IptablesCommand) -> Outcome {
        match self.executor.run_command(cmd, false) {
            Ok(output) if output.success() => Outcome::Applied,
            Ok(output) => Outcome::Failed(format!(
                "exit code {}: {}",
                output.code,
                output.stderr.trim_end()
            )),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }
}
