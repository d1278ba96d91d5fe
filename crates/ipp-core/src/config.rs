use crate::error::ConfigError;
use crate::model::{Policy, RuleSpec, Ruleset, TableName};
use std::path::PathBuf;
use tracing::{debug, error};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/edge/iptables-persistent/iptables.ini";

/// Reserved key that sets a built-in chain's default policy
pub const POLICY_KEY: &str = "policy";

const DEFAULT_SECTION: &str = "DEFAULT";

/// One `[name]` block with its entries in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    pub name: String,
    pub entries: Vec<(String, Option<String>)>,
}

impl IniSection {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: vec![],
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }
}

/// Parse section-based configuration text.
///
/// Keys and values split on the first `=` or `:`; a line without either is a
/// key with no value. `#` and `;` start full-line comments. A line indented
/// deeper than its key line continues that key's value, across blank lines.
/// Entries of a `[DEFAULT]` section are inherited by every other section.
pub fn parse_ini(content: &str) -> Result<Vec<IniSection>, ConfigError> {
    let mut defaults: Option<IniSection> = None;
    let mut sections: Vec<IniSection> = vec![];
    let mut in_default = false;
    // Indent of the key line whose value may still be continued
    let mut key_indent: Option<usize> = None;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let indent = raw.len() - raw.trim_start().len();
        let current = if in_default {
            defaults.as_mut()
        } else {
            sections.last_mut()
        };

        if key_indent.is_some_and(|level| indent > level) {
            if let Some((key, value)) = current.and_then(|s| s.entries.last_mut()) {
                match value {
                    Some(v) if !v.is_empty() => {
                        v.push(' ');
                        v.push_str(line);
                    }
                    Some(v) => v.push_str(line),
                    None => {
                        return Err(ConfigError::Parse {
                            line: line_no,
                            message: format!("key {:?} has no value to continue", key),
                        });
                    }
                }
            }
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            key_indent = None;

            if name == DEFAULT_SECTION {
                if defaults.is_some() {
                    return Err(ConfigError::DuplicateSection(name.to_string()));
                }
                defaults = Some(IniSection::new(name));
                in_default = true;
            } else {
                if sections.iter().any(|s| s.name == name) {
                    return Err(ConfigError::DuplicateSection(name.to_string()));
                }
                sections.push(IniSection::new(name));
                in_default = false;
            }
            continue;
        }

        let Some(section) = current else {
            return Err(ConfigError::Parse {
                line: line_no,
                message: format!("entry {:?} appears before any section header", line),
            });
        };

        let (key, value) = match line.find(['=', ':']) {
            Some(pos) => (line[..pos].trim(), Some(line[pos + 1..].trim().to_string())),
            None => (line, None),
        };

        if key.is_empty() {
            return Err(ConfigError::Parse {
                line: line_no,
                message: format!("entry {:?} has an empty key", line),
            });
        }
        if section.position(key).is_some() {
            return Err(ConfigError::DuplicateOption {
                section: section.name.clone(),
                key: key.to_string(),
            });
        }

        section.entries.push((key.to_string(), value));
        key_indent = Some(indent);
    }

    if let Some(defaults) = defaults {
        for section in &mut sections {
            let mut merged = defaults.entries.clone();
            for (key, value) in section.entries.drain(..) {
                match merged.iter_mut().find(|(k, _)| *k == key) {
                    Some(slot) => slot.1 = value,
                    None => merged.push((key, value)),
                }
            }
            section.entries = merged;
        }
    }

    Ok(sections)
}

/// Builds the rule model from a `table:chain` sectioned configuration file
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn load(&self) -> Result<Ruleset, ConfigError> {
        let content =
            std::fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Io {
                path: self.config_path.clone(),
                source,
            })?;
        load_str(&content)
    }
}

/// Build the rule model from configuration text.
///
/// Malformed section names and unknown tables are logged and skipped. A
/// policy under a user-defined chain is logged and dropped. An invalid
/// policy value under a built-in chain aborts the load.
pub fn load_str(content: &str) -> Result<Ruleset, ConfigError> {
    let mut ruleset = Ruleset::new();

    for section in parse_ini(content)? {
        debug!("Loading {}.", section.name);

        let (table_name, chain_name) = match split_section(&section.name) {
            Ok(parts) => parts,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };

        let table_name: TableName = match table_name.parse() {
            Ok(name) => name,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };

        let chain = ruleset.get_table(table_name).get_chain(chain_name);

        for (key, value) in section.entries {
            if key == POLICY_KEY {
                if chain.is_builtin() {
                    let policy: Policy = value.as_deref().unwrap_or_default().parse()?;
                    chain.set_policy(policy)?;
                } else {
                    error!("Bad built-in chain name: {}", chain.name());
                }
                continue;
            }
            chain.push_rule(RuleSpec::new(key, value));
        }
    }

    Ok(ruleset)
}

fn split_section(name: &str) -> Result<(&str, &str), ConfigError> {
    if name.matches(':').count() != 1 {
        return Err(ConfigError::InvalidSection(name.to_string()));
    }
    match name.split_once(':') {
        Some((table, chain)) if !table.is_empty() && !chain.is_empty() => Ok((table, chain)),
        _ => Err(ConfigError::InvalidSection(name.to_string())),
    }
}
