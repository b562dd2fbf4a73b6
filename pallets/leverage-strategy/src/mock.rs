extern crate alloc;

use crate as pallet_leverage_strategy;
use crate::types::{AssetKind, FeedId, LendingAdapter, PriceOracle, RouterId, SwapRouter};
use polkadot_sdk::frame_support::traits::fungibles::Mutate;
use polkadot_sdk::frame_support::traits::tokens::{Fortitude, Precision, Preservation};
use polkadot_sdk::frame_support::{
  PalletId, construct_runtime, derive_impl, ord_parameter_types, parameter_types,
  traits::{ConstU32, ConstU128, Currency},
};
use polkadot_sdk::frame_system;
use polkadot_sdk::sp_runtime::{
  BuildStorage, DispatchError, DispatchResult,
  testing::H256,
  traits::{BlakeTwo256, IdentityLookup},
};
use primitives::AssetInspector;
use primitives::params::UNIT;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Parent principal driving the strategy
pub const PARENT: u64 = 7;
/// Any other signer; must be locked out of every mutating entry point
pub const OUTSIDER: u64 = 8;

pub const BASE_ASSET: AssetKind = AssetKind::Local(1);
pub const COLLATERAL_ASSET: AssetKind = AssetKind::Local(2);
pub const DEBT_ASSET: AssetKind = AssetKind::Local(3);
pub const REWARD_ASSET: AssetKind = AssetKind::Local(4);
pub const UNTRACKED_ASSET: AssetKind = AssetKind::Local(9);

thread_local! {
    /// (collateral, debt) held at the mock venue
    pub static POSITION: RefCell<(u128, u128)> = const { RefCell::new((0, 0)) };
    pub static ORACLE_PRICES: RefCell<BTreeMap<(FeedId, AssetKind), u128>> = const { RefCell::new(BTreeMap::new()) };
    pub static ROUTERS: RefCell<BTreeMap<RouterId, RouterBehavior>> = const { RefCell::new(BTreeMap::new()) };
    /// Reward tokens the mock venue reports for proportionality tracking
    pub static REWARD_ASSETS: RefCell<alloc::vec::Vec<AssetKind>> = const { RefCell::new(alloc::vec::Vec::new()) };
    /// Outcome of the re-entrant router's attempt, for later inspection
    pub static REENTRANCY_RESULT: RefCell<Option<DispatchResult>> = const { RefCell::new(None) };
}

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Balances: polkadot_sdk::pallet_balances,
    Assets: polkadot_sdk::pallet_assets,
    LeverageStrategy: pallet_leverage_strategy,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = u64;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = H256;
  type Hashing = BlakeTwo256;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<u128>;
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ();
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = u128;
  type DustRemoval = ();
  type RuntimeEvent = RuntimeEvent;
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = ();
  type RuntimeFreezeReason = ();
  type DoneSlashHandler = ();
}

impl polkadot_sdk::pallet_assets::Config for Test {
  type RuntimeEvent = RuntimeEvent;
  type Balance = u128;
  type AssetId = u32;
  type AssetIdParameter = u32;
  type Currency = Balances;
  type CreateOrigin = polkadot_sdk::frame_support::traits::AsEnsureOriginWithArg<
    frame_system::EnsureSigned<Self::AccountId>,
  >;
  type ForceOrigin = frame_system::EnsureRoot<Self::AccountId>;
  type AssetDeposit = ConstU128<1>;
  type AssetAccountDeposit = ConstU128<1>;
  type MetadataDepositBase = ConstU128<1>;
  type MetadataDepositPerByte = ConstU128<1>;
  type ApprovalDeposit = ConstU128<1>;
  type StringLimit = ConstU32<50>;
  type Freezer = ();
  type Extra = ();
  type CallbackHandle = ();
  type WeightInfo = ();
  type RemoveItemsLimit = ConstU32<5>;
  type Holder = ();
  type ReserveData = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = ();
}

/// Aave-like single-position venue backed by thread-local state.
///
/// Supplying burns collateral tokens from the strategy account, withdrawing
/// mints them back; borrow/repay do the inverse on the debt token.
pub struct MockVenue;

impl MockVenue {
  pub fn set_position(collateral: u128, debt: u128) {
    POSITION.with(|p| *p.borrow_mut() = (collateral, debt));
  }

  pub fn set_reward_assets(assets: alloc::vec::Vec<AssetKind>) {
    REWARD_ASSETS.with(|r| *r.borrow_mut() = assets);
  }

  pub fn position() -> (u128, u128) {
    POSITION.with(|p| *p.borrow())
  }
}

impl LendingAdapter<u64> for MockVenue {
  fn supply(who: &u64, asset: AssetKind, amount: u128) -> DispatchResult {
    if asset != COLLATERAL_ASSET {
      return Err(DispatchError::Other("venue: unsupported collateral"));
    }
    burn(asset, who, amount)?;
    POSITION.with(|p| p.borrow_mut().0 += amount);
    Ok(())
  }

  fn withdraw(who: &u64, asset: AssetKind, amount: u128) -> DispatchResult {
    if asset != COLLATERAL_ASSET {
      return Err(DispatchError::Other("venue: unsupported collateral"));
    }
    POSITION.with(|p| {
      let mut position = p.borrow_mut();
      if position.0 < amount {
        return Err(DispatchError::Other("venue: insufficient collateral"));
      }
      position.0 -= amount;
      Ok(())
    })?;
    mint(asset, who, amount);
    Ok(())
  }

  fn borrow(who: &u64, asset: AssetKind, amount: u128) -> DispatchResult {
    if asset != DEBT_ASSET {
      return Err(DispatchError::Other("venue: unsupported debt asset"));
    }
    POSITION.with(|p| p.borrow_mut().1 += amount);
    mint(asset, who, amount);
    Ok(())
  }

  fn repay(who: &u64, asset: AssetKind, amount: u128) -> DispatchResult {
    if asset != DEBT_ASSET {
      return Err(DispatchError::Other("venue: unsupported debt asset"));
    }
    POSITION.with(|p| {
      let mut position = p.borrow_mut();
      if position.1 < amount {
        return Err(DispatchError::Other("venue: repay exceeds debt"));
      }
      position.1 -= amount;
      Ok(())
    })?;
    burn(asset, who, amount)?;
    Ok(())
  }

  fn collateral_asset() -> AssetKind {
    COLLATERAL_ASSET
  }

  fn debt_asset() -> AssetKind {
    DEBT_ASSET
  }

  fn position_amounts() -> Result<(u128, u128), DispatchError> {
    Ok(MockVenue::position())
  }

  fn reward_assets() -> alloc::vec::Vec<AssetKind> {
    REWARD_ASSETS.with(|r| r.borrow().clone())
  }
}

/// Per-feed prices in 8-decimal USD per UNIT of the asset
pub struct MockOracle;

pub fn set_price(feed: FeedId, asset: AssetKind, price: u128) {
  ORACLE_PRICES.with(|p| p.borrow_mut().insert((feed, asset), price));
}

impl PriceOracle for MockOracle {
  fn value_of(feed: FeedId, asset: AssetKind, amount: u128) -> Result<u128, DispatchError> {
    let price = ORACLE_PRICES
      .with(|p| p.borrow().get(&(feed, asset)).cloned())
      .ok_or(DispatchError::Other("oracle: missing price"))?;
    amount
      .checked_mul(price)
      .map(|value| value / UNIT)
      .ok_or(DispatchError::Other("oracle: value overflow"))
  }
}

/// Scriptable router behaviors covering honest, sloppy and hostile venues
#[derive(Clone)]
pub enum RouterBehavior {
  /// Consume the full grant, pay out `amount_in * num / den`
  Rate { num: u128, den: u128 },
  /// Consume the full grant, pay out a fixed amount
  FixedOut(u128),
  /// Fail outright
  Revert,
  /// Consume twice the granted input
  Overdraw,
  /// Attempt to re-enter the strategy before trading 1:1
  Reentrant,
}

pub struct MockRouter;

pub fn register_router(router: RouterId, behavior: RouterBehavior) {
  ROUTERS.with(|r| r.borrow_mut().insert(router, behavior));
}

pub fn reentrancy_result() -> Option<DispatchResult> {
  REENTRANCY_RESULT.with(|r| r.borrow().clone())
}

impl SwapRouter<u64> for MockRouter {
  fn is_registered(router: RouterId) -> bool {
    ROUTERS.with(|r| r.borrow().contains_key(&router))
  }

  fn execute(
    router: RouterId,
    who: &u64,
    token_in: AssetKind,
    amount_in: u128,
    token_out: AssetKind,
    _payload: &[u8],
  ) -> DispatchResult {
    let behavior = ROUTERS
      .with(|r| r.borrow().get(&router).cloned())
      .ok_or(DispatchError::Other("router: not registered"))?;

    match behavior {
      RouterBehavior::Rate { num, den } => {
        burn(token_in, who, amount_in)?;
        mint(token_out, who, amount_in * num / den);
        Ok(())
      }
      RouterBehavior::FixedOut(amount_out) => {
        burn(token_in, who, amount_in)?;
        mint(token_out, who, amount_out);
        Ok(())
      }
      RouterBehavior::Revert => Err(DispatchError::Other("router: execution failed")),
      RouterBehavior::Overdraw => {
        burn(token_in, who, amount_in * 2)?;
        mint(token_out, who, amount_in);
        Ok(())
      }
      RouterBehavior::Reentrant => {
        let attempt = LeverageStrategy::rebalance(
          RuntimeOrigin::signed(OUTSIDER),
          None,
          0,
          0,
          alloc::vec::Vec::new(),
        );
        REENTRANCY_RESULT.with(|r| *r.borrow_mut() = Some(attempt));
        burn(token_in, who, amount_in)?;
        mint(token_out, who, amount_in);
        Ok(())
      }
    }
  }
}

pub fn mint(asset: AssetKind, who: &u64, amount: u128) {
  if amount == 0 {
    return;
  }
  match asset.local_id() {
    None => {
      let _ = Balances::deposit_creating(who, amount);
    }
    Some(id) => {
      let _ = <Assets as Mutate<u64>>::mint_into(id, who, amount);
    }
  }
}

pub fn burn(asset: AssetKind, who: &u64, amount: u128) -> DispatchResult {
  if amount == 0 {
    return Ok(());
  }
  match asset.local_id() {
    None => {
      let _ = <Balances as Currency<u64>>::withdraw(
        who,
        amount,
        polkadot_sdk::frame_support::traits::WithdrawReasons::TRANSFER,
        polkadot_sdk::frame_support::traits::ExistenceRequirement::AllowDeath,
      )?;
    }
    Some(id) => {
      <Assets as Mutate<u64>>::burn_from(
        id,
        who,
        amount,
        Preservation::Expendable,
        Precision::Exact,
        Fortitude::Polite,
      )?;
    }
  }
  Ok(())
}

pub fn balance(asset: AssetKind, who: &u64) -> u128 {
  LeverageStrategy::balance_of(asset, who)
}

parameter_types! {
  pub const StrategyPalletId: PalletId =
    PalletId(*primitives::pallet_ids::LEVERAGE_STRATEGY_PALLET_ID);
  pub const BaseAsset: AssetKind = BASE_ASSET;
}

ord_parameter_types! {
  pub const ParentAccount: u64 = PARENT;
}

impl pallet_leverage_strategy::Config for Test {
  type Assets = Assets;
  type Currency = Balances;
  type Venue = MockVenue;
  type Oracle = MockOracle;
  type Router = MockRouter;
  type ParentOrigin = frame_system::EnsureSignedBy<ParentAccount, u64>;
  type BaseAsset = BaseAsset;
  type PalletId = StrategyPalletId;
  type MaxCommands = ConstU32<8>;
  type WeightInfo = ();
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  polkadot_sdk::pallet_assets::GenesisConfig::<Test> {
    assets: alloc::vec![
      (1, 999, true, 1),
      (2, 999, true, 1),
      (3, 999, true, 1),
      (4, 999, true, 1),
      (9, 999, true, 1),
    ],
    metadata: alloc::vec![],
    accounts: alloc::vec![],
    reserves: alloc::vec![],
    next_asset_id: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  // Strategy genesis: sovereign account gets a provider ref (ED-free)
  pallet_leverage_strategy::GenesisConfig::<Test>::default()
    .assimilate_storage(&mut t)
    .unwrap();

  POSITION.with(|p| *p.borrow_mut() = (0, 0));
  ORACLE_PRICES.with(|p| p.borrow_mut().clear());
  ROUTERS.with(|r| r.borrow_mut().clear());
  REWARD_ASSETS.with(|r| r.borrow_mut().clear());
  REENTRANCY_RESULT.with(|r| *r.borrow_mut() = None);

  t.into()
}
