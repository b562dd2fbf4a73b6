//! Ecosystem constants for the leverage strategy pallets.
//!
//! This module centralizes the system-level constants shared between the
//! strategy pallet, its collaborator implementations and the runtime: the
//! fixed-point scales for proportional math and USD valuation, and the pallet
//! id the strategy account is derived from.
//!
//! These constants are the single source of truth and are re-used across all
//! runtime configurations via the primitives crate.

/// Balance type alias for consistency across the ecosystem
pub type Balance = u128;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// These IDs are used by Polkadot SDK's `PalletId::into_account_truncating()`
/// to deterministically generate accounts for pallet-specific operations.
pub mod pallet_ids {
  /// Leverage strategy pallet ID (strategy sovereign account)
  pub const LEVERAGE_STRATEGY_PALLET_ID: &[u8; 8] = b"lvgstrat";
}

/// Parameters defining the fixed-point scales and shared thresholds.
pub mod params {
  use super::Balance;

  /// One whole unit of an asset in raw balance parts (10^12).
  ///
  /// Oracle prices are quoted per `UNIT`, so raw balances and USD values
  /// convert without per-asset decimals bookkeeping.
  pub const UNIT: Balance = 1_000_000_000_000;

  /// Fixed-point denominator for withdrawal percentages (10^18 = 100%).
  ///
  /// All proportional math in the withdrawal guard uses this scale; the
  /// debt-repayment rounding buffer is one part of it.
  pub const PERCENTAGE_DENOMINATOR: Balance = 1_000_000_000_000_000_000;

  /// Basis point denominator (10_000 = 100%) for slippage tolerances.
  pub const BPS_DENOMINATOR: u32 = 10_000;

  /// Decimals of the USD fixed-point values returned by the price oracle.
  pub const USD_DECIMALS: u32 = 8;

  /// Maximum acceptable age of an oracle quote in seconds (24h).
  ///
  /// Enforced by the oracle implementation, not by the strategy pallet;
  /// quotes older than this must be rejected at the source.
  pub const ORACLE_MAX_AGE_SECS: u64 = 86_400;
}
