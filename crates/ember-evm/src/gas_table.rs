//! Fork-dependent gas costs and the rule sets that select them

use serde::{Deserialize, Serialize};

/// Costs that changed between hard forks. Everything else is a fixed
/// protocol constant in [`crate::gas::cost`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasTable {
    /// EXTCODESIZE
    pub ext_codesize: u64,
    /// EXTCODECOPY base cost
    pub ext_codecopy: u64,
    /// BALANCE
    pub balance: u64,
    /// SLOAD
    pub sload: u64,
    /// CALL, CALLCODE and DELEGATECALL base cost
    pub calls: u64,
    /// SUICIDE
    pub suicide: u64,
    /// EXP cost per byte of exponent
    pub exp_byte: u64,
    /// Surcharge when SUICIDE sends funds to a new account. Its presence
    /// also switches CALL and CREATE to forwarding all but one 64th of
    /// the available gas.
    pub create_by_suicide: Option<u64>,
}

impl GasTable {
    /// Frontier and Homestead costs
    pub const HOMESTEAD: GasTable = GasTable {
        ext_codesize: 20,
        ext_codecopy: 20,
        balance: 20,
        sload: 50,
        calls: 40,
        suicide: 0,
        exp_byte: 10,
        create_by_suicide: None,
    };

    /// Costs after the IO-heavy operation repricing
    pub const GAS_REPRICE: GasTable = GasTable {
        ext_codesize: 700,
        ext_codecopy: 700,
        balance: 400,
        sload: 200,
        calls: 700,
        suicide: 5000,
        exp_byte: 10,
        create_by_suicide: Some(25000),
    };

    /// Repriced costs with the raised EXP byte cost
    pub const DIEHARD: GasTable = GasTable {
        exp_byte: 50,
        ..GasTable::GAS_REPRICE
    };
}

/// Block-number gated protocol rules consumed by the interpreter and
/// the orchestrator.
pub trait RuleSet {
    /// Whether Homestead rules apply at `block`
    fn is_homestead(&self, block: u64) -> bool;

    /// Whether Atlantis rules apply at `block`
    fn is_atlantis(&self, block: u64) -> bool;

    /// Gas table active at `block`
    fn gas_table(&self, block: u64) -> GasTable;
}

/// Fork activation blocks. A missing block means the fork never activates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChainConfig {
    /// Homestead activation block
    pub homestead_block: Option<u64>,
    /// Gas reprice activation block
    pub gas_reprice_block: Option<u64>,
    /// Diehard activation block
    pub diehard_block: Option<u64>,
    /// Atlantis activation block
    pub atlantis_block: Option<u64>,
}

fn is_active(fork: Option<u64>, block: u64) -> bool {
    fork.is_some_and(|at| block >= at)
}

impl ChainConfig {
    /// Frontier rules forever
    pub fn frontier() -> Self {
        Self::default()
    }

    /// Homestead from genesis
    pub fn homestead() -> Self {
        Self {
            homestead_block: Some(0),
            ..Self::default()
        }
    }

    /// Homestead and the gas reprice from genesis
    pub fn gas_reprice() -> Self {
        Self {
            gas_reprice_block: Some(0),
            ..Self::homestead()
        }
    }

    /// Everything up to Diehard from genesis
    pub fn diehard() -> Self {
        Self {
            diehard_block: Some(0),
            ..Self::gas_reprice()
        }
    }

    /// Everything up to Atlantis from genesis
    pub fn atlantis() -> Self {
        Self {
            atlantis_block: Some(0),
            ..Self::diehard()
        }
    }

    /// Ethereum Classic mainnet schedule
    pub fn classic_mainnet() -> Self {
        Self {
            homestead_block: Some(1_150_000),
            gas_reprice_block: Some(2_500_000),
            diehard_block: Some(3_000_000),
            atlantis_block: Some(8_772_000),
        }
    }

    /// Look up a preset by fork name (case-insensitive)
    pub fn from_fork_name(name: &str) -> Option<Self> {
        let config = match name.to_ascii_lowercase().as_str() {
            "frontier" => Self::frontier(),
            "homestead" => Self::homestead(),
            "gasreprice" | "gas_reprice" | "eip150" => Self::gas_reprice(),
            "diehard" => Self::diehard(),
            "atlantis" => Self::atlantis(),
            "classic" | "mainnet" => Self::classic_mainnet(),
            _ => return None,
        };
        Some(config)
    }
}

impl RuleSet for ChainConfig {
    fn is_homestead(&self, block: u64) -> bool {
        is_active(self.homestead_block, block)
    }

    fn is_atlantis(&self, block: u64) -> bool {
        is_active(self.atlantis_block, block)
    }

    fn gas_table(&self, block: u64) -> GasTable {
        if is_active(self.diehard_block, block) {
            GasTable::DIEHARD
        } else if is_active(self.gas_reprice_block, block) {
            GasTable::GAS_REPRICE
        } else {
            GasTable::HOMESTEAD
        }
    }
}
