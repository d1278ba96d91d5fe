use std::path::PathBuf;

/// Errors raised while constructing tables, chains and policies
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid table: {0}")]
    InvalidTable(String),

    #[error("invalid policy: {0}, choice from: ACCEPT, DROP, QUEUE, RETURN")]
    InvalidPolicy(String),

    /// Policies only exist for the hook chains a table ships with
    #[error("chain {chain} in table {table} is not a built-in chain and cannot carry a policy")]
    PolicyOnUserChain { table: String, chain: String },
}

/// Errors raised while reading the ruleset configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid section: {0}")]
    InvalidSection(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("section {0:?} already exists")]
    DuplicateSection(String),

    #[error("option {key:?} in section {section:?} already exists")]
    DuplicateOption { section: String, key: String },
}

/// A control-utility invocation that did not complete successfully
#[derive(Debug, thiserror::Error)]
pub enum RunCommandError {
    #[error("\"{command}\" failed with err: {stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("\"{command}\" could not be spawned: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
