//! Leverage Strategy Pallet
//!
//! Execution engine for a single leveraged yield position held at one external
//! lending venue, driven by a semi-trusted keeper but owned by exactly one
//! parent origin.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod types;
pub use types::{
  AssetKind, Balance, FeedId, LendingAdapter, PriceOracle, RouterId, StrategyCommand, SwapParams,
  SwapRouter,
};

#[cfg(test)]
pub mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;
pub use weights::WeightInfo;

#[frame::pallet]
pub mod pallet {
  use super::WeightInfo;
  use crate::types::{
    AssetKind, Balance, FeedId, LendingAdapter, PriceOracle, RouterId, StrategyCommand,
    SwapParams, SwapRouter,
  };
  use alloc::vec::Vec;
  use frame::deps::{
    frame_support::traits::{
      Currency, EnsureOrigin,
      fungible::{Inspect as NativeInspect, Mutate as NativeMutate},
      fungibles::{Inspect as FungiblesInspect, Mutate as FungiblesMutate},
      tokens::Preservation,
    },
    sp_runtime::{DispatchError, traits::AccountIdConversion},
  };
  use frame::prelude::*;
  use primitives::AssetInspector;
  use primitives::params::{BPS_DENOMINATOR, PERCENTAGE_DENOMINATOR, UNIT};

  pub const LOG_TARGET: &str = "leverage-strategy";

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Asset management interface for fungible tokens
    type Assets: FungiblesInspect<Self::AccountId, AssetId = u32, Balance = u128>
      + FungiblesMutate<Self::AccountId, AssetId = u32, Balance = u128>;
    /// Native currency interface
    type Currency: Currency<Self::AccountId>
      + NativeInspect<Self::AccountId, Balance = u128>
      + NativeMutate<Self::AccountId, Balance = u128>;
    /// Lending venue the position lives at
    type Venue: LendingAdapter<Self::AccountId>;
    /// Price oracle used for swap floors and valuation
    type Oracle: PriceOracle;
    /// Registry and dispatcher of external swap routers
    type Router: SwapRouter<Self::AccountId>;
    /// The sole principal allowed to drive the strategy.
    ///
    /// Fixed at runtime construction; every mutating entry point checks it.
    /// The resolved account is also the destination of `collect`.
    type ParentOrigin: EnsureOrigin<Self::RuntimeOrigin, Success = Self::AccountId>;
    /// Unit of account the strategy is valued in
    #[pallet::constant]
    type BaseAsset: Get<AssetKind>;
    /// Pallet ID for deriving the strategy's sovereign account
    #[pallet::constant]
    type PalletId: Get<PalletId>;
    /// Upper bound on keeper plan length
    #[pallet::constant]
    type MaxCommands: Get<u32>;
    /// Weight information for extrinsics
    type WeightInfo: WeightInfo;
  }

  /// The pallet is one strategy instance: the pallet-derived account holds the
  /// idle balances and the venue adapter tracks one (collateral, debt)
  /// position for it.
  ///
  /// ## Keeper plans
  /// The parent relays keeper-built command sequences into `deposit`,
  /// `withdraw` and `rebalance`. Commands dispatch to the venue hooks or to
  /// the oracle-validated swap executor; a failing command voids the whole
  /// call (transactional dispatch).
  ///
  /// ## Withdrawal guard
  /// `withdraw` sizes the venue unwind on-chain from the live position, then
  /// restricts the keeper to swap-only clean-up commands and verifies that no
  /// tracked balance fell by more than its proportional share. The keeper
  /// chooses *how* tokens are converted, never *how much* leaves.
  ///
  /// ## Parent principal
  /// The parent is the runtime-configured [`Config::ParentOrigin`] and has no
  /// storage mirror or getter; the resolved account (also the destination of
  /// `collect`) is discoverable through the runtime's metadata.
  ///
  /// ## Reentrancy precondition
  /// The pallet carries no reentrancy guard of its own. Calls MUST be made
  /// from within a single-entry, non-reentrant parent context; external code
  /// reached mid-call (routers, venue hooks) cannot re-enter because it does
  /// not hold the parent origin.
  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Feed the price oracle is queried with; replaceable only by the parent
  #[pallet::storage]
  #[pallet::getter(fn price_feed)]
  pub type PriceFeed<T: Config> = StorageValue<_, FeedId, ValueQuery>;

  /// Amounts approved for the parent to pull out via `collect`
  #[pallet::storage]
  #[pallet::getter(fn collection_allowance)]
  pub type CollectionAllowances<T: Config> =
    StorageMap<_, Blake2_128Concat, AssetKind, Balance, ValueQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// Position opened or increased
    Deposited {
      parent: T::AccountId,
      deposit_token: AssetKind,
      deposit_amount: Balance,
      provided_amount: Balance,
      expected_amount: Balance,
      commands: u32,
    },
    /// Position partially or fully unwound
    Withdrawn {
      percentage: Balance,
      output_token: AssetKind,
      actual_withdrawn: Balance,
      repaid: Balance,
      deleveraged: Balance,
    },
    /// Position restructured without a net size change
    Rebalanced {
      provided_amount: Balance,
      expected_amount: Balance,
      commands: u32,
    },
    /// Oracle-validated swap executed
    SwapExecuted {
      router: RouterId,
      token_in: AssetKind,
      amount_in: Balance,
      token_out: AssetKind,
      amount_out: Balance,
      usd_value_in: Balance,
      usd_value_out: Balance,
    },
    /// Price feed reference replaced
    OracleUpdated { feed: FeedId },
    /// Parent pulled an approved amount out of the strategy
    Collected {
      parent: T::AccountId,
      asset: AssetKind,
      amount: Balance,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Token is not tracked, not usable here, or a swap pairs a token with
    /// itself
    InvalidToken,
    /// Zero or out-of-bound amount; also the proportionality bound violation
    InvalidAmount,
    /// Router is not configured
    InvalidRouter,
    /// Withdrawal percentage outside (0, 100%]
    InvalidPercentage,
    /// Non-swap command in a withdrawal clean-up plan
    InvalidKeeperCommand,
    /// Observed swap output below the keeper's floor
    SlippageTooHigh,
    /// Observed swap output below the oracle-derived USD floor
    OracleSlippageCheckFailed,
    /// Router consumed more input than it was granted
    RouterAllowanceExceeded,
    /// Keeper plan exceeds `MaxCommands`
    TooManyCommands,
    /// No collection allowance outstanding for the asset
    NothingToCollect,
    /// Oracle returned a zero price for the base asset
    InvalidOraclePrice,
    /// Arithmetic overflow in proportional or valuation math
    ArithmeticOverflow,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Open or increase the position by executing a keeper plan.
    ///
    /// The full command set is permitted: the keeper is constructing a fresh
    /// position and the parent-origin check is the only protection needed.
    /// If `expected_amount` is nonzero the parent is granted a collection
    /// allowance of that much `flash_loan_token` so it can recover the funds
    /// it advanced.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::deposit())]
    pub fn deposit(
      origin: OriginFor<T>,
      deposit_token: AssetKind,
      deposit_amount: Balance,
      flash_loan_token: Option<AssetKind>,
      provided_amount: Balance,
      expected_amount: Balance,
      commands: Vec<StrategyCommand>,
    ) -> DispatchResult {
      let parent = T::ParentOrigin::ensure_origin(origin)?;

      ensure!(deposit_amount > 0, Error::<T>::InvalidAmount);
      ensure!(
        commands.len() as u32 <= T::MaxCommands::get(),
        Error::<T>::TooManyCommands
      );

      Self::execute_commands(&commands)?;
      Self::settle_flash_loan(flash_loan_token, expected_amount)?;

      Self::deposit_event(Event::Deposited {
        parent,
        deposit_token,
        deposit_amount,
        provided_amount,
        expected_amount,
        commands: commands.len() as u32,
      });

      Ok(())
    }

    /// Unwind `percentage` of the position into `output_token`.
    ///
    /// The venue unwind is sized on-chain from the live position; the keeper
    /// plan may only contain swaps over tracked tokens, and afterwards every
    /// tracked balance except the output token must retain at least its
    /// proportional share (adjusted for the flash-loan advance).
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::withdraw())]
    pub fn withdraw(
      origin: OriginFor<T>,
      percentage: Balance,
      output_token: AssetKind,
      flash_loan_token: Option<AssetKind>,
      provided_amount: Balance,
      expected_amount: Balance,
      commands: Vec<StrategyCommand>,
    ) -> DispatchResult {
      T::ParentOrigin::ensure_origin(origin)?;

      ensure!(
        percentage > 0 && percentage <= PERCENTAGE_DENOMINATOR,
        Error::<T>::InvalidPercentage
      );
      ensure!(
        commands.len() as u32 <= T::MaxCommands::get(),
        Error::<T>::TooManyCommands
      );

      let strategy = Self::account_id();
      let tracked = Self::tracked_tokens();
      ensure!(tracked.contains(&output_token), Error::<T>::InvalidToken);
      if let Some(flash) = flash_loan_token {
        ensure!(tracked.contains(&flash), Error::<T>::InvalidToken);
      }

      // Idle balances before the unwind; the flash-loan advance is not idle
      let mut snapshot = Vec::with_capacity(tracked.len());
      for token in tracked.iter() {
        let mut balance = Self::balance_of(*token, &strategy);
        if Some(*token) == flash_loan_token {
          balance = balance
            .checked_sub(provided_amount)
            .ok_or(Error::<T>::InvalidAmount)?;
        }
        snapshot.push((*token, balance));
      }

      // Venue unwind sized from live state: the keeper cannot influence how
      // much collateral/debt moves, only how the proceeds get converted
      let (collateral, debt) = T::Venue::position_amounts()?;
      let repay_fraction = T::Venue::repay_fraction(percentage).min(PERCENTAGE_DENOMINATOR);
      let repay_amount = Self::mul_div(debt, repay_fraction, PERCENTAGE_DENOMINATOR)?;
      let withdraw_amount = Self::mul_div(collateral, percentage, PERCENTAGE_DENOMINATOR)?;

      if repay_amount > 0 {
        T::Venue::repay(&strategy, T::Venue::debt_asset(), repay_amount)?;
      }
      if withdraw_amount > 0 {
        T::Venue::withdraw(&strategy, T::Venue::collateral_asset(), withdraw_amount)?;
      }

      // Clean-up plan: swap-only, over known tokens
      for command in commands.iter() {
        let swap = match command {
          StrategyCommand::Swap(params) => params,
          _ => return Err(Error::<T>::InvalidKeeperCommand.into()),
        };
        for token in [swap.token_in, swap.token_out] {
          let known = tracked.contains(&token)
            || Some(token) == flash_loan_token
            || token == output_token;
          ensure!(known, Error::<T>::InvalidToken);
        }
      }
      Self::execute_commands(&commands)?;

      // Proportionality bound: whatever routing the keeper chose, no tracked
      // balance may have lost more than its share
      let remaining = PERCENTAGE_DENOMINATOR - percentage;
      for (token, before) in snapshot.iter() {
        if *token == output_token {
          continue;
        }
        let mut floor = Self::mul_div(*before, remaining, PERCENTAGE_DENOMINATOR)?;
        if Some(*token) == flash_loan_token {
          floor = floor
            .checked_add(expected_amount)
            .ok_or(Error::<T>::ArithmeticOverflow)?;
        }
        let current = Self::balance_of(*token, &strategy);
        log::debug!(
          target: LOG_TARGET,
          "proportionality: token {:?} before {} floor {} current {}",
          token, before, floor, current,
        );
        ensure!(current >= floor, Error::<T>::InvalidAmount);
      }

      let before_output = snapshot
        .iter()
        .find(|(token, _)| *token == output_token)
        .map(|(_, balance)| *balance)
        .unwrap_or_default();
      let expected_adjustment = if Some(output_token) == flash_loan_token {
        expected_amount
      } else {
        0
      };
      let actual_withdrawn = Self::balance_of(output_token, &strategy)
        .saturating_sub(before_output)
        .saturating_sub(expected_adjustment);

      Self::record_allowance(output_token, actual_withdrawn)?;
      if let Some(flash) = flash_loan_token {
        if expected_amount > 0 {
          Self::record_allowance(flash, expected_amount)?;
        }
      }

      Self::deposit_event(Event::Withdrawn {
        percentage,
        output_token,
        actual_withdrawn,
        repaid: repay_amount,
        deleveraged: withdraw_amount,
      });

      Ok(())
    }

    /// Restructure the position without a net size change.
    ///
    /// Deposit semantics minus the deposit fields: full command set, then
    /// flash-loan allowance bookkeeping.
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::rebalance())]
    pub fn rebalance(
      origin: OriginFor<T>,
      flash_loan_token: Option<AssetKind>,
      provided_amount: Balance,
      expected_amount: Balance,
      commands: Vec<StrategyCommand>,
    ) -> DispatchResult {
      T::ParentOrigin::ensure_origin(origin)?;

      ensure!(
        commands.len() as u32 <= T::MaxCommands::get(),
        Error::<T>::TooManyCommands
      );

      Self::execute_commands(&commands)?;
      Self::settle_flash_loan(flash_loan_token, expected_amount)?;

      Self::deposit_event(Event::Rebalanced {
        provided_amount,
        expected_amount,
        commands: commands.len() as u32,
      });

      Ok(())
    }

    /// Replace the price feed reference
    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::set_oracle())]
    pub fn set_oracle(origin: OriginFor<T>, feed: FeedId) -> DispatchResult {
      T::ParentOrigin::ensure_origin(origin)?;

      PriceFeed::<T>::put(feed);

      Self::deposit_event(Event::OracleUpdated { feed });

      Ok(())
    }

    /// Pull an approved amount out of the strategy.
    ///
    /// The only path by which value leaves: no command can push funds
    /// anywhere, the parent redeems its allowance itself.
    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::collect())]
    pub fn collect(origin: OriginFor<T>, asset: AssetKind) -> DispatchResult {
      let parent = T::ParentOrigin::ensure_origin(origin)?;

      let allowance = CollectionAllowances::<T>::take(asset);
      ensure!(allowance > 0, Error::<T>::NothingToCollect);

      let strategy = Self::account_id();
      let amount = allowance.min(Self::balance_of(asset, &strategy));
      match asset.local_id() {
        None => {
          <T::Currency as NativeMutate<T::AccountId>>::transfer(
            &strategy,
            &parent,
            amount,
            Preservation::Expendable,
          )?;
        }
        Some(id) => {
          T::Assets::transfer(id, &strategy, &parent, amount, Preservation::Expendable)?;
        }
      }

      Self::deposit_event(Event::Collected {
        parent,
        asset,
        amount,
      });

      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Get the strategy's sovereign account (derived from PalletId)
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    /// The deduplicated token universe protected by the proportionality
    /// guard: base, collateral, debt, plus venue extensions
    pub fn tracked_tokens() -> Vec<AssetKind> {
      let mut tokens = Vec::with_capacity(4);
      for candidate in [
        T::BaseAsset::get(),
        T::Venue::collateral_asset(),
        T::Venue::debt_asset(),
      ] {
        if !tokens.contains(&candidate) {
          tokens.push(candidate);
        }
      }
      for extra in T::Venue::reward_assets() {
        if !tokens.contains(&extra) {
          tokens.push(extra);
        }
      }
      tokens
    }

    /// Idle balance of `asset` held directly by `who`
    pub fn balance_of(asset: AssetKind, who: &T::AccountId) -> Balance {
      match asset.local_id() {
        None => <T::Currency as NativeInspect<T::AccountId>>::balance(who),
        Some(id) => T::Assets::balance(id, who),
      }
    }

    /// Net position value in base-asset units.
    ///
    /// Oracle-valued idle balances plus collateral minus debt, saturating at
    /// zero when the position is underwater. Pure read, callable by anyone.
    pub fn total_assets() -> Result<Balance, DispatchError> {
      let strategy = Self::account_id();
      let feed = PriceFeed::<T>::get();

      let mut usd_total: Balance = 0;
      for token in Self::tracked_tokens() {
        let balance = Self::balance_of(token, &strategy);
        if balance > 0 {
          let value = T::Oracle::value_of(feed, token, balance)?;
          usd_total = usd_total
            .checked_add(value)
            .ok_or(Error::<T>::ArithmeticOverflow)?;
        }
      }

      let (collateral, debt) = T::Venue::position_amounts()?;
      if collateral > 0 {
        let value = T::Oracle::value_of(feed, T::Venue::collateral_asset(), collateral)?;
        usd_total = usd_total
          .checked_add(value)
          .ok_or(Error::<T>::ArithmeticOverflow)?;
      }
      let usd_debt = if debt > 0 {
        T::Oracle::value_of(feed, T::Venue::debt_asset(), debt)?
      } else {
        0
      };

      // An unhealthy position reads as zero rather than underflowing
      let usd_net = usd_total.saturating_sub(usd_debt);

      let base_price = T::Oracle::value_of(feed, T::BaseAsset::get(), UNIT)?;
      ensure!(base_price > 0, Error::<T>::InvalidOraclePrice);

      Self::mul_div(usd_net, UNIT, base_price)
    }

    /// Dispatch a keeper plan in order; the first failing command aborts the
    /// whole call
    fn execute_commands(commands: &[StrategyCommand]) -> DispatchResult {
      let strategy = Self::account_id();
      for command in commands {
        match command {
          StrategyCommand::Supply { asset, amount } => {
            T::Venue::supply(&strategy, *asset, *amount)?
          }
          StrategyCommand::Withdraw { asset, amount } => {
            T::Venue::withdraw(&strategy, *asset, *amount)?
          }
          StrategyCommand::Borrow { asset, amount } => {
            T::Venue::borrow(&strategy, *asset, *amount)?
          }
          StrategyCommand::Repay { asset, amount } => {
            T::Venue::repay(&strategy, *asset, *amount)?
          }
          StrategyCommand::Swap(params) => {
            Self::execute_swap(params)?;
          }
        }
      }
      Ok(())
    }

    /// Execute one oracle-validated exchange and return the observed output.
    ///
    /// Two independent floors: the keeper's `min_amount_out` and the oracle
    /// USD floor, which no router can spoof. The router gets at most
    /// `amount_in`; consuming more voids the call, so no grant survives the
    /// swap.
    fn execute_swap(params: &SwapParams) -> Result<Balance, DispatchError> {
      ensure!(params.amount_in > 0, Error::<T>::InvalidAmount);
      ensure!(params.token_in != params.token_out, Error::<T>::InvalidToken);
      ensure!(
        params.max_oracle_slippage_bps <= BPS_DENOMINATOR,
        Error::<T>::InvalidAmount
      );
      ensure!(
        T::Router::is_registered(params.router),
        Error::<T>::InvalidRouter
      );

      let strategy = Self::account_id();
      let feed = PriceFeed::<T>::get();
      let usd_value_in = T::Oracle::value_of(feed, params.token_in, params.amount_in)?;

      let before_in = Self::balance_of(params.token_in, &strategy);
      let before_out = Self::balance_of(params.token_out, &strategy);

      // Control passes to external code; its error propagates verbatim
      T::Router::execute(
        params.router,
        &strategy,
        params.token_in,
        params.amount_in,
        params.token_out,
        &params.router_payload,
      )?;

      let spent = before_in.saturating_sub(Self::balance_of(params.token_in, &strategy));
      ensure!(
        spent <= params.amount_in,
        Error::<T>::RouterAllowanceExceeded
      );

      // Output is the observed delta, never the router's own report
      let amount_out =
        Self::balance_of(params.token_out, &strategy).saturating_sub(before_out);
      ensure!(
        amount_out >= params.min_amount_out,
        Error::<T>::SlippageTooHigh
      );

      let usd_value_out = T::Oracle::value_of(feed, params.token_out, amount_out)?;
      let usd_floor = Self::mul_div(
        usd_value_in,
        (BPS_DENOMINATOR - params.max_oracle_slippage_bps) as Balance,
        BPS_DENOMINATOR as Balance,
      )?;
      ensure!(
        usd_value_out >= usd_floor,
        Error::<T>::OracleSlippageCheckFailed
      );

      Self::deposit_event(Event::SwapExecuted {
        router: params.router,
        token_in: params.token_in,
        amount_in: params.amount_in,
        token_out: params.token_out,
        amount_out,
        usd_value_in,
        usd_value_out,
      });

      Ok(amount_out)
    }

    /// Grant the parent an allowance to recover the flash-loan funds it
    /// advanced for this call
    fn settle_flash_loan(
      flash_loan_token: Option<AssetKind>,
      expected_amount: Balance,
    ) -> DispatchResult {
      if expected_amount == 0 {
        return Ok(());
      }
      let token = flash_loan_token.ok_or(Error::<T>::InvalidToken)?;
      Self::record_allowance(token, expected_amount)
    }

    /// Additive allowance bookkeeping: same-token grants accumulate into one
    /// figure instead of overwriting each other
    fn record_allowance(asset: AssetKind, amount: Balance) -> DispatchResult {
      if amount == 0 {
        return Ok(());
      }
      CollectionAllowances::<T>::try_mutate(asset, |allowance| -> DispatchResult {
        *allowance = allowance
          .checked_add(amount)
          .ok_or(Error::<T>::ArithmeticOverflow)?;
        Ok(())
      })
    }

    /// value * numerator / denominator without intermediate overflow
    fn mul_div(
      value: Balance,
      numerator: Balance,
      denominator: Balance,
    ) -> Result<Balance, DispatchError> {
      use polkadot_sdk::sp_core::U256;

      let result = U256::from(value)
        .checked_mul(U256::from(numerator))
        .ok_or(Error::<T>::ArithmeticOverflow)?
        .checked_div(U256::from(denominator))
        .ok_or(Error::<T>::ArithmeticOverflow)?;

      if result > U256::from(u128::MAX) {
        return Err(Error::<T>::ArithmeticOverflow.into());
      }

      Ok(result.as_u128())
    }
  }

  /// Genesis configuration — ensures the strategy account is ED-free
  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      // Strategy account survives zero native balance via provider reference
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
    }
  }
}
