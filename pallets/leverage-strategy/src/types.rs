use codec::{Decode, DecodeWithMemTracking, Encode};
use polkadot_sdk::frame_support::pallet_prelude::*;
use scale_info::prelude::vec::Vec;

// Re-export AssetKind from primitives as the single source of truth
pub use primitives::AssetKind;
pub use primitives::Balance;

/// Identifier of a configured external swap router
pub type RouterId = u32;

/// Identifier of a price feed served by the oracle collaborator
pub type FeedId = u32;

/// Parameters of a single oracle-validated token exchange.
///
/// `router_payload` is an opaque blob assembled off-chain by the keeper and
/// forwarded verbatim to the router; the strategy never interprets it. The
/// two floors (`min_amount_out` from the keeper, the oracle-derived USD floor
/// from `max_oracle_slippage_bps`) are enforced independently of whatever the
/// router reports.
#[derive(Clone, Encode, Decode, DecodeWithMemTracking, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub struct SwapParams {
  /// Configured router to route the exchange through
  pub router: RouterId,
  /// Token sold
  pub token_in: AssetKind,
  /// Maximum amount of `token_in` the router may consume
  pub amount_in: Balance,
  /// Token bought
  pub token_out: AssetKind,
  /// Keeper's execution-quality floor on the observed output
  pub min_amount_out: Balance,
  /// Oracle floor: output USD value may lag input USD value by at most this
  /// many basis points
  pub max_oracle_slippage_bps: u32,
  /// Opaque routing instructions forwarded to the router
  pub router_payload: Vec<u8>,
}

/// One step of a keeper-supplied execution plan.
///
/// Codec indices are the wire tags of the command encoding; a tag outside
/// 0..=4 fails to decode. There is deliberately no command that transfers
/// funds to an arbitrary account — value leaves the strategy only through the
/// parent's own `collect`.
#[derive(Clone, Encode, Decode, DecodeWithMemTracking, Eq, PartialEq, RuntimeDebug, TypeInfo)]
pub enum StrategyCommand {
  /// Supply collateral to the lending venue
  #[codec(index = 0)]
  Supply { asset: AssetKind, amount: Balance },
  /// Withdraw collateral from the lending venue
  #[codec(index = 1)]
  Withdraw { asset: AssetKind, amount: Balance },
  /// Borrow against the supplied collateral
  #[codec(index = 2)]
  Borrow { asset: AssetKind, amount: Balance },
  /// Repay outstanding debt
  #[codec(index = 3)]
  Repay { asset: AssetKind, amount: Balance },
  /// Exchange one token for another through a configured router
  #[codec(index = 4)]
  Swap(SwapParams),
}

/// Capability interface of the external lending venue.
///
/// One implementation per venue; the strategy depends only on these hooks and
/// never on a concrete venue. All amounts are raw balances, `who` is the
/// strategy's sovereign account.
pub trait LendingAdapter<AccountId> {
  /// Move `amount` of `asset` from the strategy's idle balance into the
  /// venue as collateral
  fn supply(who: &AccountId, asset: AssetKind, amount: Balance) -> DispatchResult;

  /// Pull `amount` of collateral out of the venue into the idle balance
  fn withdraw(who: &AccountId, asset: AssetKind, amount: Balance) -> DispatchResult;

  /// Draw `amount` of `asset` as debt against the position
  fn borrow(who: &AccountId, asset: AssetKind, amount: Balance) -> DispatchResult;

  /// Repay `amount` of outstanding debt from the idle balance
  fn repay(who: &AccountId, asset: AssetKind, amount: Balance) -> DispatchResult;

  /// The venue's collateral token
  fn collateral_asset() -> AssetKind;

  /// The venue's debt token
  fn debt_asset() -> AssetKind;

  /// Live (collateral, debt) amounts as reported by the venue
  fn position_amounts() -> Result<(Balance, Balance), DispatchError>;

  /// Additional tokens the venue wants protected by the proportionality
  /// guard (reward tokens and the like)
  fn reward_assets() -> Vec<AssetKind> {
    Vec::new()
  }

  /// Debt fraction to repay when unwinding `fraction` of the position.
  ///
  /// The default over-repays by one part of the percentage denominator so a
  /// partial exit leaves the health factor strictly on the safe side. Venues
  /// with their own health-factor math should override this.
  fn repay_fraction(fraction: Balance) -> Balance {
    fraction
      .saturating_add(1)
      .min(primitives::params::PERCENTAGE_DENOMINATOR)
  }
}

/// Price oracle interface.
///
/// Values are USD fixed-point with `primitives::params::USD_DECIMALS`
/// decimals, quoted per `primitives::params::UNIT` of the asset. The
/// implementation must reject stale (older than `ORACLE_MAX_AGE_SECS`) or
/// non-positive quotes; the strategy treats any `Err` as fatal for the call.
pub trait PriceOracle {
  /// USD value of `amount` of `asset` according to feed `feed`
  fn value_of(feed: FeedId, asset: AssetKind, amount: Balance) -> Result<Balance, DispatchError>;
}

/// External swap router registry and dispatcher.
///
/// `execute` hands control to arbitrary external code. The router may consume
/// at most `amount_in` of `token_in` from `who` — the swap executor verifies
/// this from balance deltas and rejects overdrawing routers, so a grant never
/// outlives the call.
pub trait SwapRouter<AccountId> {
  /// Whether `router` is a configured routing target
  fn is_registered(router: RouterId) -> bool;

  /// Execute the exchange; output is measured by the caller, not trusted
  /// from the router
  fn execute(
    router: RouterId,
    who: &AccountId,
    token_in: AssetKind,
    amount_in: Balance,
    token_out: AssetKind,
    payload: &[u8],
  ) -> DispatchResult;
}
