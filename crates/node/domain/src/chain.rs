//! Chain-wide parameters.

/// Default EVM chain id.
pub const DEFAULT_CHAIN_ID: u64 = 1337;

/// Default base denomination.
pub const DEFAULT_BASE_DENOM: &str = "agate";

/// Default base fee per gas, in base denom.
pub const DEFAULT_BASE_FEE: u64 = 1_000_000_000;

/// Immutable chain parameters.
///
/// Built once at startup and shared by reference with every component that
/// formats amounts, wraps EVM transactions, or checks replay protection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    /// EVM chain id (EIP-155).
    pub chain_id: u64,
    /// Denomination fees and balances are expressed in.
    pub base_denom: String,
    /// Base fee per gas applied to every block.
    pub base_fee: u64,
}

impl ChainConfig {
    /// Create a chain configuration with the default denom and base fee.
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id, ..Self::default() }
    }

    /// Set the base denomination.
    #[must_use]
    pub fn with_base_denom(mut self, denom: impl Into<String>) -> Self {
        self.base_denom = denom.into();
        self
    }

    /// Set the base fee per gas.
    #[must_use]
    pub const fn with_base_fee(mut self, base_fee: u64) -> Self {
        self.base_fee = base_fee;
        self
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            base_denom: DEFAULT_BASE_DENOM.to_string(),
            base_fee: DEFAULT_BASE_FEE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_config_builders() {
        let chain = ChainConfig::new(9000).with_base_denom("uatom").with_base_fee(7);
        assert_eq!(chain.chain_id, 9000);
        assert_eq!(chain.base_denom, "uatom");
        assert_eq!(chain.base_fee, 7);
    }

    #[test]
    fn chain_config_default() {
        let chain = ChainConfig::default();
        assert_eq!(chain.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(chain.base_denom, DEFAULT_BASE_DENOM);
    }
}
