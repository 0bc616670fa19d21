//! Rebalancing Pallet
//!
//! Escrowed redemption ledger and swap validation for a custodial multi-asset fund.
//!
//! A rebalance is a two-step protocol. `redeem` moves a held position from the fund vault
//! into a per-fund escrow and records it as the fund's single pending redemption. The asset
//! manager then commits it with `meta_aggregator_swap`, which unwraps the escrowed position,
//! validates the off-chain computed route against it, executes every leg and deposits the
//! proceeds into the target portfolio position. Until committed, the redemption can be
//! reverted: immediately by the asset manager, or by anyone once the cooldown has elapsed.
//!
//! The escrow holds the position token itself, so a revert returns exactly what was taken.
//! Every output of a route is measured as a balance delta, never taken from the executor's
//! report, and any failing leg aborts the whole call.
//!
//! `direct_swap` and `swap_primary_token` convert between positions sharing an underlying
//! without external routes. Leg execution and the asset helpers are public so the off-chain
//! settlement pallet runs its routes through the same code.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod types;
pub use types::*;


#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;
pub use weights::WeightInfo;

use frame::prelude::*;
use pallet_price_oracle::PriceProvider;

pub(crate) const LOG_TARGET: &str = "runtime::rebalancing";

#[frame::pallet]
pub mod pallet {
  use super::*;
  use alloc::{vec, vec::Vec};
  use frame::deps::{
    frame_support::{
      storage::with_storage_layer,
      traits::{
        UnixTime,
        fungible::{Inspect as NativeInspect, Mutate as NativeMutate},
        fungibles::{Inspect as FungiblesInspect, Mutate as FungiblesMutate},
        tokens::Preservation,
      },
    },
    sp_runtime::{DispatchError, PerThing, Permill, traits::AccountIdConversion},
  };

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Pallet ID for escrow account derivation
    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Asset management interface for fungible tokens
    type Assets: FungiblesInspect<Self::AccountId, AssetId = u32, Balance = Balance>
      + FungiblesMutate<Self::AccountId, AssetId = u32, Balance = Balance>;

    /// Native currency interface
    type NativeCurrency: NativeInspect<Self::AccountId, Balance = Balance>
      + NativeMutate<Self::AccountId, Balance = Balance>;

    /// Fund shares, custody and held-token bookkeeping
    type Ledger: FundLedger<Self::AccountId>;

    /// Position adapters
    type Adapters: PositionAdapter<Self::AccountId>;

    /// Pause switch, adapter and route provider registrations
    type Registry: ProtocolRegistry;

    /// Executor for off-chain computed route legs
    type Router: RouteProvider<Self::AccountId>;

    /// Default on-chain swap venue
    type Venue: OnChainVenue<Self::AccountId>;

    /// Staleness-gated valuations
    type Prices: PriceProvider;

    /// Wall clock for the revert cooldown
    type TimeProvider: UnixTime;

    /// Seconds after escrow before anyone may revert a pending redemption
    #[pallet::constant]
    type RedeemCooldown: Get<Moment>;

    /// Weight information
    type WeightInfo: WeightInfo;

    /// Helper for benchmarking
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::types::BenchmarkHelper<Self::AccountId>;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Pending redemption slot per fund
  #[pallet::storage]
  pub type RedemptionState<T: Config> =
    StorageMap<_, Blake2_128Concat, FundId, RedemptionStatus, ValueQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// Position moved from the vault into escrow
    Redeemed {
      fund: FundId,
      token: AssetKind,
      amount: Balance,
      slippage: Permill,
    },
    /// Escrowed position returned to the vault
    RedemptionReverted {
      fund: FundId,
      token: AssetKind,
      amount: Balance,
      by: T::AccountId,
    },
    /// Pending redemption committed into a portfolio position
    SwapCommitted {
      fund: FundId,
      sell_token: AssetKind,
      sell_amount: Balance,
      portfolio_token: AssetKind,
      received: Balance,
    },
    /// Position converted into another position with the same underlying
    DirectSwapExecuted {
      fund: FundId,
      sell_token: AssetKind,
      buy_token: AssetKind,
      sell_amount: Balance,
      received: Balance,
    },
    /// Plain asset wrapped into a position
    PrimaryTokenSwapped {
      fund: FundId,
      sell_token: AssetKind,
      buy_token: AssetKind,
      amount: Balance,
      received: Balance,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Fund already has a pending redemption
    AlreadyRedeeming,
    /// Fund has no pending redemption
    NotRedeemed,
    /// Caller is not the fund's asset manager
    CallerNotAssetManager,
    /// Route provider or target adapter is disabled
    SwapHandlerNotEnabled,
    /// Target token has no registered adapter
    BuyTokenAddressNotValid,
    /// A leg or the final deposit produced nothing
    SwapFailed,
    /// Token does not match what the operation requires
    InvalidToken,
    /// Sell amounts do not add up to the redeemed amount
    InvalidSellAmount,
    /// Route arrays are empty or differ in length
    InvalidTokenLength,
    /// Revert cooldown has not elapsed
    FifteenMinutesNotExcedeed,
    /// Protocol is paused
    ProtocolIsPaused,
    /// Fund is paused
    FundIsPaused,
    /// Amount is zero
    ZeroAmount,
    /// Fund has no custody account
    UnknownFund,
    /// Arithmetic overflow
    ArithmeticOverflow,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Move `amount` of a held `token` into escrow as the fund's pending redemption
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::redeem())]
    pub fn redeem(
      origin: OriginFor<T>,
      fund: FundId,
      amount: Balance,
      slippage: Permill,
      token: AssetKind,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::ensure_manager_of_active_fund(fund, &who)?;
      ensure!(
        RedemptionState::<T>::get(fund).pending().is_none(),
        Error::<T>::AlreadyRedeeming
      );
      ensure!(amount > 0, Error::<T>::ZeroAmount);
      ensure!(
        T::Ledger::held_tokens(fund).contains(&token),
        Error::<T>::InvalidToken
      );

      let vault = Self::vault_of(fund)?;
      Self::transfer_asset(token, &vault, &Self::escrow_account(fund), amount)?;
      RedemptionState::<T>::insert(
        fund,
        RedemptionStatus::Redeemed(PendingRedemption {
          sell_token: token,
          amount,
          slippage,
          escrowed_at: T::TimeProvider::now().as_secs(),
        }),
      );

      log::debug!(target: LOG_TARGET, "fund {} escrowed {} of {:?}", fund, amount, token);
      Self::deposit_event(Event::Redeemed {
        fund,
        token,
        amount,
        slippage,
      });
      Ok(())
    }

    /// Return the escrowed position to the vault (asset manager, no cooldown)
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::revert_redeem())]
    pub fn revert_redeem(origin: OriginFor<T>, fund: FundId) -> DispatchResult {
      let who = ensure_signed(origin)?;
      ensure!(
        T::Ledger::is_asset_manager(fund, &who),
        Error::<T>::CallerNotAssetManager
      );
      Self::restore_escrow(fund, who)
    }

    /// Return the escrowed position to the vault once the cooldown has elapsed (anyone)
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::revert_sell_by_user())]
    pub fn revert_sell_by_user(origin: OriginFor<T>, fund: FundId) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let pending = RedemptionState::<T>::get(fund)
        .pending()
        .ok_or(Error::<T>::NotRedeemed)?;
      let now = T::TimeProvider::now().as_secs();
      ensure!(
        now >= pending.escrowed_at.saturating_add(T::RedeemCooldown::get()),
        Error::<T>::FifteenMinutesNotExcedeed
      );
      Self::restore_escrow(fund, who)
    }

    /// Commit the pending redemption into `route.portfolio_token` through an off-chain route
    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::meta_aggregator_swap(route.sell_tokens.len() as u32))]
    pub fn meta_aggregator_swap(
      origin: OriginFor<T>,
      fund: FundId,
      route: MetaSwapRoute,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let pending = RedemptionState::<T>::get(fund)
        .pending()
        .ok_or(Error::<T>::NotRedeemed)?;
      ensure!(
        T::Ledger::is_asset_manager(fund, &who),
        Error::<T>::CallerNotAssetManager
      );
      ensure!(
        T::Registry::is_route_provider_enabled(route.route_provider),
        Error::<T>::SwapHandlerNotEnabled
      );
      let portfolio_adapter = Self::enabled_adapter(route.portfolio_token)?;

      let legs = route.legs().ok_or(Error::<T>::InvalidTokenLength)?;
      let sell_underlying = Self::underlying_of(pending.sell_token)?;
      let buy_underlying = T::Adapters::underlying(portfolio_adapter, route.portfolio_token)?;
      if distinct_in_order(&route.sell_tokens) != sell_underlying
        || distinct_in_order(&route.buy_tokens) != buy_underlying
      {
        log::warn!(
          target: LOG_TARGET,
          "fund {}: route tokens do not match {:?} -> {:?}",
          fund,
          pending.sell_token,
          route.portfolio_token
        );
        return Err(Error::<T>::InvalidToken.into());
      }

      let vault = Self::vault_of(fund)?;
      let escrow = Self::escrow_account(fund);
      let realized = Self::unwrap_position(
        pending.sell_token,
        pending.amount,
        pending.slippage,
        &escrow,
        &escrow,
      )?;
      for (token, amount) in sell_underlying.iter().zip(&realized) {
        let routed = sum_where(legs.iter().map(|leg| (leg.sell_token, leg.sell_amount)), *token)
          .ok_or(Error::<T>::ArithmeticOverflow)?;
        if routed != *amount {
          log::warn!(
            target: LOG_TARGET,
            "fund {}: route sells {} of {:?}, escrow realized {}",
            fund,
            routed,
            token,
            amount
          );
          return Err(Error::<T>::InvalidSellAmount.into());
        }
      }

      let outputs = Self::execute_legs(&escrow, route.route_provider, &legs, &[])?;
      let amounts = buy_underlying
        .iter()
        .map(|token| {
          sum_where(
            legs.iter().zip(&outputs).map(|(leg, out)| (leg.buy_token, *out)),
            *token,
          )
        })
        .collect::<Option<Vec<_>>>()
        .ok_or(Error::<T>::ArithmeticOverflow)?;

      let before = Self::position_balance(route.portfolio_token, &vault);
      Self::wrap_position(
        route.portfolio_token,
        &amounts,
        route.lp_slippage,
        &escrow,
        &vault,
      )?;
      let mut leftovers: Vec<(AssetKind, Balance)> = vec![(pending.sell_token, 0)];
      leftovers.extend(sell_underlying.iter().chain(buy_underlying.iter()).map(|t| (*t, 0)));
      Self::sweep(fund, &escrow, &vault, &leftovers)?;
      let received = Self::position_balance(route.portfolio_token, &vault).saturating_sub(before);
      ensure!(received > 0, Error::<T>::SwapFailed);

      Self::settle_held(fund, &vault, pending.sell_token, route.portfolio_token)?;
      RedemptionState::<T>::remove(fund);

      log::debug!(
        target: LOG_TARGET,
        "fund {} committed {} of {:?} into {} of {:?}",
        fund,
        pending.amount,
        pending.sell_token,
        received,
        route.portfolio_token
      );
      Self::deposit_event(Event::SwapCommitted {
        fund,
        sell_token: pending.sell_token,
        sell_amount: pending.amount,
        portfolio_token: route.portfolio_token,
        received,
      });
      Ok(())
    }

    /// Convert held positions into positions with an identical underlying decomposition
    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::direct_swap(sell_tokens.len() as u32))]
    pub fn direct_swap(
      origin: OriginFor<T>,
      fund: FundId,
      sell_tokens: Vec<AssetKind>,
      buy_tokens: Vec<AssetKind>,
      sell_amounts: Vec<Balance>,
      slippage: Vec<Permill>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::ensure_manager_of_active_fund(fund, &who)?;
      let n = sell_tokens.len();
      ensure!(
        n > 0 && buy_tokens.len() == n && sell_amounts.len() == n && slippage.len() == n,
        Error::<T>::InvalidTokenLength
      );

      let held = T::Ledger::held_tokens(fund);
      let mut pairs = Vec::with_capacity(n);
      for i in 0..n {
        let (sell, buy) = (sell_tokens[i], buy_tokens[i]);
        ensure!(sell_amounts[i] > 0, Error::<T>::ZeroAmount);
        ensure!(held.contains(&sell) && sell != buy, Error::<T>::InvalidToken);
        let buy_adapter = Self::enabled_adapter(buy)?;
        let underlying = Self::underlying_of(sell)?;
        ensure!(
          T::Adapters::underlying(buy_adapter, buy)? == underlying,
          Error::<T>::InvalidToken
        );
        pairs.push(underlying);
      }

      let vault = Self::vault_of(fund)?;
      let escrow = Self::escrow_account(fund);
      for (i, underlying) in pairs.into_iter().enumerate() {
        let (sell, buy, amount) = (sell_tokens[i], buy_tokens[i], sell_amounts[i]);
        // Escrow may hold a pending redemption; only what this swap adds is swept
        let mut tracked = vec![sell];
        tracked.extend(underlying);
        let baseline = Self::snapshot(&escrow, &tracked);
        Self::transfer_asset(sell, &vault, &escrow, amount)?;
        let amounts = Self::unwrap_position(sell, amount, slippage[i], &escrow, &escrow)?;

        let before = Self::position_balance(buy, &vault);
        Self::wrap_position(buy, &amounts, slippage[i], &escrow, &vault)?;
        Self::sweep(fund, &escrow, &vault, &baseline)?;
        let received = Self::position_balance(buy, &vault).saturating_sub(before);
        ensure!(received > 0, Error::<T>::SwapFailed);

        Self::settle_held(fund, &vault, sell, buy)?;
        Self::deposit_event(Event::DirectSwapExecuted {
          fund,
          sell_token: sell,
          buy_token: buy,
          sell_amount: amount,
          received,
        });
      }
      Ok(())
    }

    /// Wrap a held plain asset into a position containing it
    #[pallet::call_index(5)]
    #[pallet::weight(T::WeightInfo::swap_primary_token())]
    pub fn swap_primary_token(
      origin: OriginFor<T>,
      fund: FundId,
      sell_token: AssetKind,
      buy_token: AssetKind,
      amount: Balance,
      slippage: Permill,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::ensure_manager_of_active_fund(fund, &who)?;
      ensure!(amount > 0, Error::<T>::ZeroAmount);
      ensure!(
        sell_token != buy_token && T::Ledger::held_tokens(fund).contains(&sell_token),
        Error::<T>::InvalidToken
      );
      ensure!(
        Self::underlying_of(sell_token)? == vec![sell_token],
        Error::<T>::InvalidToken
      );
      let buy_adapter = Self::enabled_adapter(buy_token)?;
      let buy_underlying = T::Adapters::underlying(buy_adapter, buy_token)?;
      ensure!(
        buy_underlying.contains(&sell_token)
          && buy_underlying.len() as u32 <= primitives::ecosystem::params::MAX_UNDERLYING,
        Error::<T>::InvalidToken
      );

      let vault = Self::vault_of(fund)?;
      let escrow = Self::escrow_account(fund);
      let baseline = Self::snapshot(&escrow, &buy_underlying);
      Self::transfer_asset(sell_token, &vault, &escrow, amount)?;

      let amounts = match buy_underlying.iter().find(|token| **token != sell_token) {
        None => vec![amount],
        Some(&other) => {
          let half = amount / 2;
          let quote = T::Prices::convert(sell_token, other, half)?;
          let min_out = slippage.left_from_one().mul_floor(quote);
          let before = Self::balance_of(other, &escrow);
          T::Venue::swap_exact_in(&escrow, sell_token, other, half, min_out)?;
          let bought = Self::balance_of(other, &escrow).saturating_sub(before);
          ensure!(bought > 0 && bought >= min_out, Error::<T>::SwapFailed);
          buy_underlying
            .iter()
            .map(|token| if *token == sell_token { amount - half } else { bought })
            .collect()
        }
      };

      let before = Self::position_balance(buy_token, &vault);
      Self::wrap_position(buy_token, &amounts, slippage, &escrow, &vault)?;
      Self::sweep(fund, &escrow, &vault, &baseline)?;
      let received = Self::position_balance(buy_token, &vault).saturating_sub(before);
      ensure!(received > 0, Error::<T>::SwapFailed);

      Self::settle_held(fund, &vault, sell_token, buy_token)?;
      Self::deposit_event(Event::PrimaryTokenSwapped {
        fund,
        sell_token,
        buy_token,
        amount,
        received,
      });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Escrow account holding a fund's pending redemption
    pub fn escrow_account(fund: FundId) -> T::AccountId {
      T::PalletId::get().into_sub_account_truncating(fund)
    }

    pub fn vault_of(fund: FundId) -> Result<T::AccountId, DispatchError> {
      T::Ledger::vault_account(fund).ok_or_else(|| Error::<T>::UnknownFund.into())
    }

    pub fn balance_of(asset: AssetKind, who: &T::AccountId) -> Balance {
      match asset {
        AssetKind::Native => T::NativeCurrency::balance(who),
        AssetKind::Local(id) | AssetKind::Foreign(id) => T::Assets::balance(id, who),
      }
    }

    pub fn transfer_asset(
      asset: AssetKind,
      from: &T::AccountId,
      to: &T::AccountId,
      amount: Balance,
    ) -> DispatchResult {
      if amount == 0 || from == to {
        return Ok(());
      }
      match asset {
        AssetKind::Native => {
          T::NativeCurrency::transfer(from, to, amount, Preservation::Expendable)?;
        }
        AssetKind::Local(id) | AssetKind::Foreign(id) => {
          T::Assets::transfer(id, from, to, amount, Preservation::Expendable)?;
        }
      }
      Ok(())
    }

    /// Balance of a position, read through its adapter when one is registered
    pub fn position_balance(token: AssetKind, who: &T::AccountId) -> Balance {
      match T::Registry::adapter_of(token) {
        Some(adapter) => T::Adapters::token_balance(adapter, token, who),
        None => Self::balance_of(token, who),
      }
    }

    /// Decomposition of `token`. Tokens without an adapter are their own decomposition.
    pub fn underlying_of(token: AssetKind) -> Result<Vec<AssetKind>, DispatchError> {
      match T::Registry::adapter_of(token) {
        Some(adapter) => T::Adapters::underlying(adapter, token),
        None => Ok(vec![token]),
      }
    }

    /// Unwrap `amount` of `token` held by `owner` into `to`.
    ///
    /// Returns the underlying amounts actually received by `to`, aligned with
    /// `underlying_of(token)`.
    pub fn unwrap_position(
      token: AssetKind,
      amount: Balance,
      slippage: Permill,
      owner: &T::AccountId,
      to: &T::AccountId,
    ) -> Result<Vec<Balance>, DispatchError> {
      let underlying = Self::underlying_of(token)?;
      if underlying == [token] {
        Self::transfer_asset(token, owner, to, amount)?;
        return Ok(vec![amount]);
      }
      let adapter = T::Registry::adapter_of(token).ok_or(Error::<T>::InvalidToken)?;
      let before = Self::snapshot(to, &underlying);
      T::Adapters::redeem(
        adapter,
        RedeemParams {
          token,
          amount,
          slippage,
          owner: owner.clone(),
          to: to.clone(),
          payout_in_native: false,
        },
      )?;
      Ok(
        before
          .into_iter()
          .map(|(token, prior)| Self::balance_of(token, to).saturating_sub(prior))
          .collect(),
      )
    }

    /// Wrap `amounts` (aligned with `underlying_of(token)`) from `payer` into `token` for
    /// `recipient`. Returns the position amount credited.
    pub fn wrap_position(
      token: AssetKind,
      amounts: &[Balance],
      slippage: Permill,
      payer: &T::AccountId,
      recipient: &T::AccountId,
    ) -> Result<Balance, DispatchError> {
      let underlying = Self::underlying_of(token)?;
      ensure!(amounts.len() == underlying.len(), Error::<T>::InvalidTokenLength);
      let before = Self::position_balance(token, recipient);
      if underlying == [token] {
        Self::transfer_asset(token, payer, recipient, amounts[0])?;
      } else {
        let adapter = T::Registry::adapter_of(token).ok_or(Error::<T>::InvalidToken)?;
        T::Adapters::deposit(adapter, token, amounts, slippage, payer, recipient)?;
      }
      Ok(Self::position_balance(token, recipient).saturating_sub(before))
    }

    /// Execute route legs for `who` inside one storage layer.
    ///
    /// Returns the realized output of each leg measured on `who`'s buy-token balance. Any
    /// failing leg discards the effects of every leg. After every leg `who` must still hold
    /// at least the `reserved` floor of each listed token.
    pub fn execute_legs(
      who: &T::AccountId,
      provider: RouteProviderId,
      legs: &[RouteLeg],
      reserved: &[(AssetKind, Balance)],
    ) -> Result<Vec<Balance>, DispatchError> {
      with_storage_layer(|| {
        let mut outputs = Vec::with_capacity(legs.len());
        for (index, leg) in legs.iter().enumerate() {
          if leg.is_passthrough() {
            outputs.push(leg.sell_amount);
            continue;
          }
          if leg.call_data.is_empty() {
            log::warn!(target: LOG_TARGET, "leg {} has no call data", index);
            return Err(Error::<T>::InvalidToken.into());
          }
          let sell_before = Self::balance_of(leg.sell_token, who);
          let before = Self::balance_of(leg.buy_token, who);
          T::Router::execute(provider, who, leg)?;
          let spent = sell_before.saturating_sub(Self::balance_of(leg.sell_token, who));
          let received = Self::balance_of(leg.buy_token, who).saturating_sub(before);
          if spent > leg.sell_amount {
            log::warn!(
              target: LOG_TARGET,
              "leg {} spent {} of {:?}, allowed {}",
              index,
              spent,
              leg.sell_token,
              leg.sell_amount
            );
            return Err(Error::<T>::SwapFailed.into());
          }
          if let Some((token, floor)) = reserved
            .iter()
            .find(|(token, floor)| Self::balance_of(*token, who) < *floor)
          {
            log::warn!(
              target: LOG_TARGET,
              "leg {} pulled reserved {:?} below {}",
              index,
              token,
              floor
            );
            return Err(Error::<T>::SwapFailed.into());
          }
          if received == 0 {
            log::warn!(
              target: LOG_TARGET,
              "leg {} ({:?} -> {:?}) produced nothing",
              index,
              leg.sell_token,
              leg.buy_token
            );
            return Err(Error::<T>::SwapFailed.into());
          }
          outputs.push(received);
        }
        Ok(outputs)
      })
    }

    /// Move everything `from` holds above `baseline` into the vault and record it as held
    pub fn sweep(
      fund: FundId,
      from: &T::AccountId,
      vault: &T::AccountId,
      baseline: &[(AssetKind, Balance)],
    ) -> DispatchResult {
      let mut seen: Vec<AssetKind> = Vec::with_capacity(baseline.len());
      for (token, keep) in baseline {
        if seen.contains(token) {
          continue;
        }
        seen.push(*token);
        let dust = Self::balance_of(*token, from).saturating_sub(*keep);
        if dust > 0 {
          Self::transfer_asset(*token, from, vault, dust)?;
          Self::ensure_held(fund, *token)?;
          log::debug!(target: LOG_TARGET, "fund {} swept {} of {:?}", fund, dust, token);
        }
      }
      Ok(())
    }

    /// Current balances of `tokens` held by `who`
    pub fn snapshot(who: &T::AccountId, tokens: &[AssetKind]) -> Vec<(AssetKind, Balance)> {
      tokens
        .iter()
        .map(|token| (*token, Self::balance_of(*token, who)))
        .collect()
    }

    pub fn ensure_held(fund: FundId, token: AssetKind) -> DispatchResult {
      if !T::Ledger::held_tokens(fund).contains(&token) {
        T::Ledger::add_held_token(fund, token)?;
      }
      Ok(())
    }

    /// Drop `token` from the held list once the vault no longer holds any of it
    pub fn drop_if_drained(fund: FundId, vault: &T::AccountId, token: AssetKind) -> DispatchResult {
      if Self::position_balance(token, vault) == 0 && T::Ledger::held_tokens(fund).contains(&token) {
        T::Ledger::remove_held_token(fund, token)?;
      }
      Ok(())
    }

    /// Registered and enabled adapter for a target position
    pub fn enabled_adapter(token: AssetKind) -> Result<AdapterId, DispatchError> {
      let adapter = T::Registry::adapter_of(token).ok_or(Error::<T>::BuyTokenAddressNotValid)?;
      ensure!(
        T::Registry::is_adapter_enabled(adapter),
        Error::<T>::SwapHandlerNotEnabled
      );
      Ok(adapter)
    }

    fn settle_held(
      fund: FundId,
      vault: &T::AccountId,
      sold: AssetKind,
      bought: AssetKind,
    ) -> DispatchResult {
      Self::drop_if_drained(fund, vault, sold)?;
      Self::ensure_held(fund, bought)
    }

    fn ensure_manager_of_active_fund(fund: FundId, who: &T::AccountId) -> DispatchResult {
      ensure!(
        T::Ledger::is_asset_manager(fund, who),
        Error::<T>::CallerNotAssetManager
      );
      ensure!(!T::Registry::is_paused(), Error::<T>::ProtocolIsPaused);
      ensure!(!T::Ledger::is_fund_paused(fund), Error::<T>::FundIsPaused);
      Ok(())
    }

    fn restore_escrow(fund: FundId, by: T::AccountId) -> DispatchResult {
      let pending = RedemptionState::<T>::get(fund)
        .pending()
        .ok_or(Error::<T>::NotRedeemed)?;
      let vault = Self::vault_of(fund)?;
      Self::transfer_asset(
        pending.sell_token,
        &Self::escrow_account(fund),
        &vault,
        pending.amount,
      )?;
      RedemptionState::<T>::remove(fund);

      log::debug!(target: LOG_TARGET, "fund {} redemption reverted", fund);
      Self::deposit_event(Event::RedemptionReverted {
        fund,
        token: pending.sell_token,
        amount: pending.amount,
        by,
      });
      Ok(())
    }
  }
}

/// Distinct tokens in order of first appearance
pub fn distinct_in_order(tokens: &[AssetKind]) -> alloc::vec::Vec<AssetKind> {
  let mut distinct = alloc::vec::Vec::with_capacity(tokens.len());
  for token in tokens {
    if !distinct.contains(token) {
      distinct.push(*token);
    }
  }
  distinct
}

/// Checked sum of the amounts paired with `token`
pub fn sum_where(
  entries: impl Iterator<Item = (AssetKind, Balance)>,
  token: AssetKind,
) -> Option<Balance> {
  entries
    .filter(|(t, _)| *t == token)
    .try_fold(0 as Balance, |acc, (_, amount)| acc.checked_add(amount))
}
