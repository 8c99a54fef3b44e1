//! Rule set and test selection

use std::path::Path;

use ember_evm::ChainConfig;

use crate::error::{TestError, TestResult};

/// Forks accepted by name, with the key fixtures file their per-fork
/// results under
pub const SUPPORTED_FORKS: &[(&str, &str)] = &[
    ("frontier", "Frontier"),
    ("homestead", "Homestead"),
    ("gas_reprice", "EIP150"),
    ("diehard", "EIP158"),
    ("atlantis", "Byzantium"),
];

/// Fixture key for a fork name, accepting the same aliases as
/// [`ChainConfig::from_fork_name`]
pub fn fixture_fork_key(name: &str) -> Option<&'static str> {
    let name = match name.to_ascii_lowercase().as_str() {
        "gasreprice" | "eip150" => "gas_reprice".to_string(),
        other => other.to_string(),
    };
    SUPPORTED_FORKS
        .iter()
        .find(|(fork, _)| *fork == name)
        .map(|(_, key)| *key)
}

/// What to run and under which rules
#[derive(Clone, Debug)]
pub struct FixtureConfig {
    /// Rule set every fixture runs under
    pub rules: ChainConfig,
    /// Per-fork results to check in state tests
    pub fork: Option<String>,
    /// Only run tests whose name contains this
    pub filter: Option<String>,
}

impl FixtureConfig {
    /// Preset rules of fork `name`
    pub fn for_fork(name: &str) -> TestResult<Self> {
        let rules = ChainConfig::from_fork_name(name)
            .ok_or_else(|| TestError::Unsupported(format!("unknown fork {}", name)))?;
        Ok(Self {
            rules,
            fork: fixture_fork_key(name).map(str::to_string),
            filter: None,
        })
    }

    /// Replace the preset rules, keeping the fork's fixture key
    pub fn with_rules(mut self, rules: ChainConfig) -> Self {
        self.rules = rules;
        self
    }

    /// Restrict to test names containing `filter`
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Whether test `name` is selected
    pub fn matches(&self, name: &str) -> bool {
        match &self.filter {
            Some(filter) => name.contains(filter.as_str()),
            None => true,
        }
    }
}

/// Read a [`ChainConfig`] from a JSON file such as
/// `{"homesteadBlock": 1150000, "gasRepriceBlock": 2500000}`
pub fn load_rules(path: &Path) -> TestResult<ChainConfig> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
