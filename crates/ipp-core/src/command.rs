use crate::model::{Policy, RuleSpec, TableName};
use std::fmt;

pub const IPTABLES: &str = "iptables";

/// Table queried when checking whether a chain exists.
///
/// Known limitation: the lookup always targets `filter`, while the chain is
/// created in its own table. A user chain in `nat` that is missing from
/// `filter` is therefore reported absent on every pass.
pub const CHAIN_LOOKUP_TABLE: TableName = TableName::Filter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IptablesCommand {
    NewChain {
        table: TableName,
        chain: String,
    },
    ListChain {
        table: TableName,
        chain: String,
    },
    Append {
        table: TableName,
        chain: String,
        rule: RuleSpec,
    },
    Delete {
        table: TableName,
        chain: String,
        rule: RuleSpec,
    },
    Check {
        table: TableName,
        chain: String,
        rule: RuleSpec,
    },
    SetPolicy {
        table: TableName,
        chain: String,
        policy: Policy,
    },
}

impl IptablesCommand {
    pub fn table(&self) -> TableName {
        match self {
            IptablesCommand::NewChain { table, .. }
            | IptablesCommand::ListChain { table, .. }
            | IptablesCommand::Append { table, .. }
            | IptablesCommand::Delete { table, .. }
            | IptablesCommand::Check { table, .. }
            | IptablesCommand::SetPolicy { table, .. } => *table,
        }
    }

    pub fn chain(&self) -> &str {
        match self {
            IptablesCommand::NewChain { chain, .. }
            | IptablesCommand::ListChain { chain, .. }
            | IptablesCommand::Append { chain, .. }
            | IptablesCommand::Delete { chain, .. }
            | IptablesCommand::Check { chain, .. }
            | IptablesCommand::SetPolicy { chain, .. } => chain,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            IptablesCommand::NewChain { .. } => "-N",
            IptablesCommand::ListChain { .. } => "-L",
            IptablesCommand::Append { .. } => "-A",
            IptablesCommand::Delete { .. } => "-D",
            IptablesCommand::Check { .. } => "-C",
            IptablesCommand::SetPolicy { .. } => "-P",
        }
    }

    /// Queries leave kernel state untouched
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            IptablesCommand::ListChain { .. } | IptablesCommand::Check { .. }
        )
    }

    /// Arguments following the binary name
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-t".to_string(),
            self.table().to_string(),
            self.operation().to_string(),
            self.chain().to_string(),
        ];

        match self {
            IptablesCommand::Append { rule, .. }
            | IptablesCommand::Delete { rule, .. }
            | IptablesCommand::Check { rule, .. } => args.push(rule.token()),
            IptablesCommand::SetPolicy { policy, .. } => args.push(policy.to_string()),
            IptablesCommand::NewChain { .. } | IptablesCommand::ListChain { .. } => {}
        }

        args
    }

    /// Space-joined command line for the given binary, as handed to the shell
    pub fn command_line(&self, binary: &str) -> String {
        let mut parts = vec![binary.to_string()];
        parts.extend(self.args());
        parts.join(" ")
    }
}

impl fmt::Display for IptablesCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line(IPTABLES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_renders_table_chain_and_token() {
        let cmd = IptablesCommand::Append {
            table: TableName::Filter,
            chain: "INPUT".into(),
            rule: RuleSpec::new("-p", Some("tcp --dport 22 -j ACCEPT".into())),
        };
        assert_eq!(
            cmd.args(),
            vec!["-t", "filter", "-A", "INPUT", "-p:tcp --dport 22 -j ACCEPT"]
        );
        assert_eq!(
            cmd.to_string(),
            "iptables -t filter -A INPUT -p:tcp --dport 22 -j ACCEPT"
        );
        assert!(!cmd.is_query());
    }

    #[test]
    fn chain_commands_carry_no_trailing_argument() {
        let list = IptablesCommand::ListChain {
            table: CHAIN_LOOKUP_TABLE,
            chain: "CUSTOM1".into(),
        };
        assert_eq!(list.command_line("ip6tables"), "ip6tables -t filter -L CUSTOM1");
        assert!(list.is_query());

        let new = IptablesCommand::NewChain {
            table: TableName::Nat,
            chain: "CUSTOM1".into(),
        };
        assert_eq!(new.to_string(), "iptables -t nat -N CUSTOM1");
    }

    #[test]
    fn set_policy_renders_verdict() {
        let cmd = IptablesCommand::SetPolicy {
            table: TableName::Mangle,
            chain: "FORWARD".into(),
            policy: Policy::Accept,
        };
        assert_eq!(cmd.to_string(), "iptables -t mangle -P FORWARD ACCEPT");
    }
}
