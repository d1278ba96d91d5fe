use crate::error::ModelError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TableName {
    Filter,
    Nat,
    Mangle,
    Raw,
}

impl TableName {
    pub const ALL: [TableName; 4] = [
        TableName::Filter,
        TableName::Nat,
        TableName::Mangle,
        TableName::Raw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Filter => "filter",
            TableName::Nat => "nat",
            TableName::Mangle => "mangle",
            TableName::Raw => "raw",
        }
    }

    /// Hook chains the kernel provides for this table
    pub fn builtin_chains(&self) -> &'static [&'static str] {
        match self {
            TableName::Filter => &["INPUT", "OUTPUT", "FORWARD"],
            TableName::Nat => &["PREROUTING", "POSTROUTING", "OUTPUT"],
            TableName::Mangle => &["PREROUTING", "OUTPUT", "FORWARD", "INPUT", "POSTROUTING"],
            TableName::Raw => &["PREROUTING", "OUTPUT"],
        }
    }

    pub fn is_builtin(&self, chain: &str) -> bool {
        self.builtin_chains().contains(&chain)
    }
}

impl FromStr for TableName {
    type Err = ModelError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .into_iter()
            .find(|table| table.as_str() == name)
            .ok_or_else(|| ModelError::InvalidTable(name.to_string()))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default verdict of a built-in chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Accept,
    Drop,
    Queue,
    Return,
}

impl Policy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Accept => "ACCEPT",
            Policy::Drop => "DROP",
            Policy::Queue => "QUEUE",
            Policy::Return => "RETURN",
        }
    }
}

impl FromStr for Policy {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ACCEPT" => Ok(Policy::Accept),
            "DROP" => Ok(Policy::Drop),
            "QUEUE" => Ok(Policy::Queue),
            "RETURN" => Ok(Policy::Return),
            other => Err(ModelError::InvalidPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule as written in the configuration: an iptables flag and its optional value.
///
/// The pair is kept structured and only joined into a token when a command is
/// built. The token is handed to the control utility verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    flag: String,
    value: Option<String>,
}

impl RuleSpec {
    /// Join character between flag and value in the rendered token.
    ///
    /// iptables separates a flag from its argument with whitespace, so a
    /// token such as `-p:tcp` is passed through as-is and the utility decides
    /// what it means.
    pub const DELIMITER: char = ':';

    pub fn new(flag: impl Into<String>, value: Option<String>) -> Self {
        Self {
            flag: flag.into(),
            value: value.filter(|v| !v.is_empty()),
        }
    }

    pub fn token(&self) -> String {
        match &self.value {
            Some(value) => format!("{}{}{}", self.flag, Self::DELIMITER, value),
            None => self.flag.clone(),
        }
    }
}

impl fmt::Display for RuleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    name: String,
    table: TableName,
    rules: Vec<RuleSpec>,
    policy: Option<Policy>,
}

impl Chain {
    pub fn new(name: impl Into<String>, table: TableName) -> Self {
        Self {
            name: name.into(),
            table,
            rules: vec![],
            policy: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> TableName {
        self.table
    }

    pub fn rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    pub fn policy(&self) -> Option<Policy> {
        self.policy
    }

    pub fn is_builtin(&self) -> bool {
        self.table.is_builtin(&self.name)
    }

    pub fn push_rule(&mut self, rule: RuleSpec) {
        self.rules.push(rule);
    }

    /// Set the default policy; refused for user-defined chains
    pub fn set_policy(&mut self, policy: Policy) -> Result<(), ModelError> {
        if !self.is_builtin() {
            return Err(ModelError::PolicyOnUserChain {
                table: self.table.to_string(),
                chain: self.name.clone(),
            });
        }
        self.policy = Some(policy);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: TableName,
    chains: Vec<Chain>,
}

impl Table {
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            chains: vec![],
        }
    }

    /// Build a table from its textual name, rejecting anything outside the known set
    pub fn from_name(name: &str) -> Result<Self, ModelError> {
        Ok(Self::new(name.parse()?))
    }

    pub fn name(&self) -> TableName {
        self.name
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// Look a chain up by name, creating an empty one on first reference
    pub fn get_chain(&mut self, name: &str) -> &mut Chain {
        let index = match self.chains.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.chains.push(Chain::new(name, self.name));
                self.chains.len() - 1
            }
        };
        &mut self.chains[index]
    }

    pub fn user_chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter().filter(|c| !c.is_builtin())
    }

    pub fn builtin_chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter().filter(|c| c.is_builtin())
    }
}

/// Every table referenced by a configuration, in first-reference order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ruleset {
    tables: Vec<Table>,
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: TableName) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn get_table(&mut self, name: TableName) -> &mut Table {
        let index = match self.tables.iter().position(|t| t.name == name) {
            Some(index) => index,
            None => {
                self.tables.push(Table::new(name));
                self.tables.len() - 1
            }
        };
        &mut self.tables[index]
    }

    pub fn chains(&self) -> impl Iterator<Item = &Chain> {
        self.tables.iter().flat_map(|t| t.chains.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_parse_and_reject_unknown() {
        assert_eq!("nat".parse::<TableName>().unwrap(), TableName::Nat);
        assert_eq!(
            "security".parse::<TableName>(),
            Err(ModelError::InvalidTable("security".into()))
        );
        assert!(Table::from_name("Filter").is_err());
    }

    #[test]
    fn builtin_sets_are_per_table() {
        assert!(TableName::Filter.is_builtin("FORWARD"));
        assert!(!TableName::Nat.is_builtin("FORWARD"));
        assert!(TableName::Mangle.is_builtin("POSTROUTING"));
        assert!(!TableName::Raw.is_builtin("INPUT"));
    }

    #[test]
    fn policy_values_are_case_sensitive() {
        assert_eq!("DROP".parse::<Policy>().unwrap(), Policy::Drop);
        assert!(matches!(
            "drop".parse::<Policy>(),
            Err(ModelError::InvalidPolicy(v)) if v == "drop"
        ));
        assert!("REJECT".parse::<Policy>().is_err());
    }

    #[test]
    fn policy_refused_on_user_chain() {
        let mut chain = Chain::new("CUSTOM1", TableName::Filter);
        assert!(chain.set_policy(Policy::Drop).is_err());
        assert_eq!(chain.policy(), None);

        let mut input = Chain::new("INPUT", TableName::Filter);
        input.set_policy(Policy::Drop).unwrap();
        assert_eq!(input.policy(), Some(Policy::Drop));
    }

    // Current behaviour: flag and value are joined with ':' rather than the
    // whitespace iptables expects between a flag and its argument.
    #[test]
    fn rule_token_joins_flag_and_value_with_colon() {
        let rule = RuleSpec::new("-p", Some("tcp --dport 22 -j ACCEPT".into()));
        assert_eq!(rule.token(), "-p:tcp --dport 22 -j ACCEPT");
    }

    #[test]
    fn rule_token_without_value_is_flag_alone() {
        assert_eq!(RuleSpec::new("-j ACCEPT", None).token(), "-j ACCEPT");
        assert_eq!(RuleSpec::new("-j ACCEPT", Some(String::new())).token(), "-j ACCEPT");
    }

    #[test]
    fn get_chain_reuses_existing_entry() {
        let mut table = Table::new(TableName::Filter);
        table.get_chain("INPUT").push_rule(RuleSpec::new("-a", None));
        table.get_chain("CUSTOM1");
        table.get_chain("INPUT").push_rule(RuleSpec::new("-b", None));

        assert_eq!(table.chains().len(), 2);
        assert_eq!(table.chain("INPUT").unwrap().rules().len(), 2);
        assert_eq!(
            table.user_chains().map(Chain::name).collect::<Vec<_>>(),
            vec!["CUSTOM1"]
        );
        assert_eq!(
            table.builtin_chains().map(Chain::name).collect::<Vec<_>>(),
            vec!["INPUT"]
        );
    }
}
