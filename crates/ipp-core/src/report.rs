use crate::model::{Policy, TableName};
use std::fmt;

/// A single mutation the reconciler considered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    CreateChain {
        table: TableName,
        chain: String,
    },
    AppendRule {
        table: TableName,
        chain: String,
        rule: String,
    },
    DeleteRule {
        table: TableName,
        chain: String,
        rule: String,
    },
    SetPolicy {
        table: TableName,
        chain: String,
        policy: Policy,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::CreateChain { table, chain } => write!(f, "Create chain {}:{}", table, chain),
            Step::AppendRule { table, chain, rule } => {
                write!(f, "Append rule to {}:{}: {}", table, chain, rule)
            }
            Step::DeleteRule { table, chain, rule } => {
                write!(f, "Delete rule from {}:{}: {}", table, chain, rule)
            }
            Step::SetPolicy {
                table,
                chain,
                policy,
            } => write!(f, "Set policy {} on {}:{}", policy, table, chain),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The command ran and succeeded
    Applied,
    /// Existence check found the target already in place
    AlreadyPresent,
    /// Existence check found nothing to remove
    Absent,
    /// The command ran and failed; the walk carried on
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: Outcome,
}

/// Per-step outcomes of one `start` or `stop` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub steps: Vec<StepRecord>,
}

impl ReconcileReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: Step, outcome: Outcome) {
        self.steps.push(StepRecord { step, outcome });
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::AlreadyPresent | Outcome::Absent))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.steps.iter().filter(|r| pred(&r.outcome)).count()
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} applied, {} unchanged, {} failed",
            self.applied(),
            self.skipped(),
            self.failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_outcomes() {
        let mut report = ReconcileReport::new();
        let step = Step::CreateChain {
            table: TableName::Filter,
            chain: "CUSTOM1".into(),
        };
        report.record(step.clone(), Outcome::Applied);
        report.record(step.clone(), Outcome::AlreadyPresent);
        report.record(step.clone(), Outcome::Absent);
        report.record(step, Outcome::Failed("boom".into()));

        assert_eq!(report.to_string(), "1 applied, 2 unchanged, 1 failed");
        assert!(report.has_failures());
        assert_eq!(report.failures().count(), 1);
    }
}
