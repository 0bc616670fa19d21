//! Off-Chain Settlement Pallet
//!
//! Investor-side flows of a custodial fund whose swaps are routed off-chain.
//!
//! - `invest_in_fund_off_chain` takes one sell token from an investor, routes it into the
//!   fund's current composition and mints shares for the value actually added. The proposed
//!   per-token amounts must agree with the on-chain reference split within a tolerance.
//! - `redeem_tokens` burns shares and moves the investor's pro-rata slice of every held
//!   position into the settlement account as a per-user withdrawal record.
//!   Neither runs while a rebalancing redemption is pending in escrow.
//! - `withdraw_off_chain` converts exactly the recorded entries into the payout token through
//!   an off-chain route. `trigger_multiple_token_withdrawal` does the same through the
//!   default on-chain venue with oracle-derived minimum outputs.
//!
//! Leg execution, position wrapping and asset movement are shared with the rebalancing
//! pallet, so routed outputs are always measured as balance deltas.
//!
//! Every investor's unsettled tokens share one settlement account per fund. `OwedTotals`
//! tracks what the account owes, and no route or payout may leave it holding less than what
//! other investors are owed.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod types;
pub use types::*;

#[cfg(test)]
pub mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;
pub use weights::WeightInfo;

use frame::prelude::*;
use pallet_price_oracle::PriceProvider;
use pallet_rebalancing::{FundLedger, OnChainVenue, PositionAdapter, ProtocolRegistry, RouteLeg};
use primitives::AssetInspector;

pub(crate) const LOG_TARGET: &str = "runtime::offchain-settlement";

type Rebalancing<T> = pallet_rebalancing::Pallet<T>;

#[frame::pallet]
pub mod pallet {
  use super::*;
  use alloc::vec::Vec;
  use frame::deps::{
    frame_support::traits::UnixTime,
    sp_runtime::{DispatchError, PerThing, Permill, traits::AccountIdConversion},
  };

  #[pallet::config]
  pub trait Config: frame_system::Config + pallet_rebalancing::Config {
    /// Pallet ID for settlement account derivation
    #[pallet::constant]
    type SettlementPalletId: Get<PalletId>;

    /// Allowed deviation of a proposed buy amount from the reference split
    #[pallet::constant]
    type BuyValueTolerance: Get<Permill>;

    /// Slippage applied to oracle quotes for venue withdrawals
    #[pallet::constant]
    type DefaultVenueSlippage: Get<Permill>;

    /// Maximum distinct tokens in one withdrawal record
    #[pallet::constant]
    type MaxWithdrawalTokens: Get<u32>;

    /// Weight information
    type WeightInfo: WeightInfo;

    /// Helper for benchmarking
    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::types::BenchmarkHelper;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Tokens owed to an investor after redeeming shares
  #[pallet::storage]
  pub type WithdrawalRecords<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    FundId,
    Blake2_128Concat,
    T::AccountId,
    UserWithdrawalRecord<T::MaxWithdrawalTokens>,
    OptionQuery,
  >;

  /// Sum of every outstanding withdrawal entry per token, owed out of the settlement account
  #[pallet::storage]
  pub type OwedTotals<T: Config> =
    StorageDoubleMap<_, Blake2_128Concat, FundId, Blake2_128Concat, AssetKind, Balance, ValueQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// Sell token routed into the fund and shares minted
    Invested {
      fund: FundId,
      who: T::AccountId,
      sell_token: AssetKind,
      amount: Balance,
      value_usd: Balance,
      shares: Balance,
    },
    /// Shares burnt and their underlying tokens recorded for withdrawal
    TokensRedeemed {
      fund: FundId,
      who: T::AccountId,
      shares: Balance,
      payout_token: AssetKind,
    },
    /// Withdrawal record settled in the payout token
    Withdrawn {
      fund: FundId,
      who: T::AccountId,
      payout_token: AssetKind,
      amount: Balance,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Proposed amounts do not add up or stray from the reference split
    InvalidBuyValues,
    /// Route provider is disabled
    OffHandlerNotEnabled,
    /// Remaining share balance would fall below the fund's minimum
    BalanceCantBeBelowVelvetMinInvestAmount,
    /// Token is not permitted or does not match what the operation requires
    InvalidToken,
    /// Arrays are empty or differ in length
    InvalidLength,
    /// Sell amount differs from the recorded entry
    InvalidSellAmount,
    /// Protocol is paused
    ProtocolIsPaused,
    /// Fund is paused
    FundIsPaused,
    /// Fund has a pending redemption in escrow
    RedemptionPending,
    /// Caller has no withdrawal record for the fund
    TokensNotRedeemed,
    /// Amount is zero
    ZeroAmount,
    /// Caller holds fewer shares than requested
    InsufficientShares,
    /// Fund holds nothing of value
    EmptyFund,
    /// A route or swap produced less than required
    SwapFailed,
    /// Withdrawal record holds too many tokens
    TooManyWithdrawalTokens,
    /// Arithmetic overflow
    ArithmeticOverflow,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Route `total_sell_amount` of `sell_token` into the fund's positions and mint shares.
    ///
    /// `buy_amounts[i]` of the sell token is routed into `buy_tokens[i]` with `call_data[i]`.
    /// `slippage` has one entry per position of the reference split.
    #[pallet::call_index(0)]
    #[pallet::weight(<T as Config>::WeightInfo::invest_in_fund_off_chain(buy_tokens.len() as u32))]
    pub fn invest_in_fund_off_chain(
      origin: OriginFor<T>,
      fund: FundId,
      sell_token: AssetKind,
      buy_tokens: Vec<AssetKind>,
      buy_amounts: Vec<Balance>,
      call_data: Vec<Vec<u8>>,
      route_provider: RouteProviderId,
      total_sell_amount: Balance,
      slippage: Vec<Permill>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::ensure_active(fund)?;
      ensure!(
        T::Registry::is_route_provider_enabled(route_provider),
        Error::<T>::OffHandlerNotEnabled
      );
      ensure!(
        T::Registry::is_token_permitted(sell_token),
        Error::<T>::InvalidToken
      );
      ensure!(total_sell_amount > 0, Error::<T>::ZeroAmount);
      let n = buy_tokens.len();
      ensure!(
        n > 0 && buy_amounts.len() == n && call_data.len() == n,
        Error::<T>::InvalidLength
      );

      let splits = Self::reference_split(fund, total_sell_amount)?;
      ensure!(slippage.len() == splits.len(), Error::<T>::InvalidLength);
      let reference: Vec<(AssetKind, Balance)> =
        splits.iter().flat_map(|split| split.parts.iter().copied()).collect();
      ensure!(
        reference.iter().map(|(token, _)| *token).eq(buy_tokens.iter().copied()),
        Error::<T>::InvalidToken
      );
      let proposed = buy_amounts
        .iter()
        .try_fold(0 as Balance, |acc, amount| acc.checked_add(*amount))
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      ensure!(proposed == total_sell_amount, Error::<T>::InvalidBuyValues);
      let tolerance = T::BuyValueTolerance::get();
      for ((_, expected), amount) in reference.iter().zip(&buy_amounts) {
        if amount.abs_diff(*expected) > tolerance.mul_floor(*expected) {
          log::warn!(
            target: LOG_TARGET,
            "fund {}: proposed {} against reference {}",
            fund,
            amount,
            expected
          );
          return Err(Error::<T>::InvalidBuyValues.into());
        }
      }

      let vault = Rebalancing::<T>::vault_of(fund)?;
      let account = Self::settlement_account(fund);
      let value_before = Self::fund_value_usd(fund, &vault)?;

      let mut touched = alloc::vec![sell_token];
      touched.extend(buy_tokens.iter().copied());
      let baseline = Rebalancing::<T>::snapshot(&account, &touched);
      Rebalancing::<T>::transfer_asset(sell_token, &who, &account, total_sell_amount)?;

      let legs: Vec<RouteLeg> = (0..n)
        .map(|i| RouteLeg {
          sell_token,
          buy_token: buy_tokens[i],
          sell_amount: buy_amounts[i],
          call_data: call_data[i].clone(),
        })
        .collect();
      let reserved = Self::reserved(fund, None);
      let outputs = Rebalancing::<T>::execute_legs(&account, route_provider, &legs, &reserved)?;

      let mut offset = 0;
      for (split, slippage) in splits.iter().zip(&slippage) {
        let end = offset + split.parts.len();
        Rebalancing::<T>::wrap_position(
          split.position,
          &outputs[offset..end],
          *slippage,
          &account,
          &vault,
        )?;
        offset = end;
      }
      Self::refund_residue(&account, &who, &baseline)?;
      Self::ensure_covered(&account, &reserved)?;

      let value_after = Self::fund_value_usd(fund, &vault)?;
      let value_usd = value_after.saturating_sub(value_before);
      ensure!(value_usd > 0, Error::<T>::SwapFailed);
      let supply = T::Ledger::total_shares(fund);
      let shares = if supply == 0 {
        value_usd
      } else {
        mul_div(supply, value_usd, value_before).ok_or(Error::<T>::ArithmeticOverflow)?
      };
      ensure!(shares > 0, Error::<T>::ZeroAmount);
      T::Ledger::mint_shares(fund, &who, shares)?;

      log::debug!(
        target: LOG_TARGET,
        "fund {}: {} of {:?} added {} USD, minted {} shares",
        fund,
        total_sell_amount,
        sell_token,
        value_usd,
        shares
      );
      Self::deposit_event(Event::Invested {
        fund,
        who,
        sell_token,
        amount: total_sell_amount,
        value_usd,
        shares,
      });
      Ok(())
    }

    /// Burn `shares` and record the caller's pro-rata slice of every held position.
    ///
    /// `slippage` has one entry per held token, in held order.
    #[pallet::call_index(1)]
    #[pallet::weight(<T as Config>::WeightInfo::redeem_tokens(slippage.len() as u32))]
    pub fn redeem_tokens(
      origin: OriginFor<T>,
      fund: FundId,
      shares: Balance,
      slippage: Vec<Permill>,
      payout_token: AssetKind,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::ensure_active(fund)?;
      ensure!(
        T::Registry::is_token_permitted(payout_token) && !payout_token.is_native(),
        Error::<T>::InvalidToken
      );
      ensure!(shares > 0, Error::<T>::ZeroAmount);
      let balance = T::Ledger::share_balance(fund, &who);
      ensure!(balance >= shares, Error::<T>::InsufficientShares);
      let remaining = balance - shares;
      ensure!(
        remaining == 0 || remaining >= T::Ledger::min_investment_amount(fund),
        Error::<T>::BalanceCantBeBelowVelvetMinInvestAmount
      );
      let held = T::Ledger::held_tokens(fund);
      ensure!(slippage.len() == held.len(), Error::<T>::InvalidLength);

      let vault = Rebalancing::<T>::vault_of(fund)?;
      let account = Self::settlement_account(fund);
      let supply = T::Ledger::total_shares(fund);
      let mut record = WithdrawalRecords::<T>::get(fund, &who).unwrap_or_else(|| {
        UserWithdrawalRecord {
          payout_token,
          owed: Default::default(),
          recorded_at: 0,
        }
      });
      record.payout_token = payout_token;
      record.recorded_at = T::TimeProvider::now().as_secs();

      for (token, slippage) in held.iter().zip(&slippage) {
        let position = Rebalancing::<T>::position_balance(*token, &vault);
        let amount = mul_div(position, shares, supply).ok_or(Error::<T>::ArithmeticOverflow)?;
        if amount == 0 {
          continue;
        }
        let underlying = Rebalancing::<T>::underlying_of(*token)?;
        let realized =
          Rebalancing::<T>::unwrap_position(*token, amount, *slippage, &vault, &account)?;
        for (underlying, amount) in underlying.into_iter().zip(realized) {
          if amount > 0 {
            ensure!(
              record.credit(underlying, amount),
              Error::<T>::TooManyWithdrawalTokens
            );
            OwedTotals::<T>::mutate(fund, underlying, |total| {
              *total = total.saturating_add(amount)
            });
          }
        }
        Rebalancing::<T>::drop_if_drained(fund, &vault, *token)?;
      }
      T::Ledger::burn_shares(fund, &who, shares)?;
      WithdrawalRecords::<T>::insert(fund, &who, record);

      log::debug!(target: LOG_TARGET, "fund {}: {} shares redeemed", fund, shares);
      Self::deposit_event(Event::TokensRedeemed {
        fund,
        who,
        shares,
        payout_token,
      });
      Ok(())
    }

    /// Convert every outstanding entry of the caller's record into the payout token through
    /// an off-chain route and pay it out.
    ///
    /// The arrays must list the outstanding entries exactly, in record order.
    #[pallet::call_index(2)]
    #[pallet::weight(<T as Config>::WeightInfo::withdraw_off_chain(sell_tokens.len() as u32))]
    pub fn withdraw_off_chain(
      origin: OriginFor<T>,
      fund: FundId,
      sell_tokens: Vec<AssetKind>,
      sell_amounts: Vec<Balance>,
      call_data: Vec<Vec<u8>>,
      route_provider: RouteProviderId,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      ensure!(!T::Registry::is_paused(), Error::<T>::ProtocolIsPaused);
      let record = WithdrawalRecords::<T>::get(fund, &who).ok_or(Error::<T>::TokensNotRedeemed)?;
      ensure!(
        T::Registry::is_route_provider_enabled(route_provider),
        Error::<T>::OffHandlerNotEnabled
      );
      let outstanding = record.outstanding();
      let n = sell_tokens.len();
      ensure!(
        n == outstanding.len() && sell_amounts.len() == n && call_data.len() == n,
        Error::<T>::InvalidLength
      );
      for (i, (token, amount)) in outstanding.iter().enumerate() {
        ensure!(sell_tokens[i] == *token, Error::<T>::InvalidToken);
        ensure!(sell_amounts[i] == *amount, Error::<T>::InvalidSellAmount);
      }

      let account = Self::settlement_account(fund);
      let legs: Vec<RouteLeg> = outstanding
        .iter()
        .zip(call_data)
        .map(|((token, amount), call_data)| RouteLeg {
          sell_token: *token,
          buy_token: record.payout_token,
          sell_amount: *amount,
          call_data,
        })
        .collect();
      let reserved = Self::reserved(fund, Some(&record));
      let outputs = Rebalancing::<T>::execute_legs(&account, route_provider, &legs, &reserved)?;
      let amount = outputs
        .iter()
        .try_fold(0 as Balance, |acc, out| acc.checked_add(*out))
        .ok_or(Error::<T>::ArithmeticOverflow)?;

      Self::pay_out(fund, who, &record, amount)
    }

    /// Convert every outstanding entry of the caller's record through the default on-chain
    /// venue and pay it out.
    #[pallet::call_index(3)]
    #[pallet::weight(
      <T as Config>::WeightInfo::trigger_multiple_token_withdrawal(T::MaxWithdrawalTokens::get())
    )]
    pub fn trigger_multiple_token_withdrawal(origin: OriginFor<T>, fund: FundId) -> DispatchResult {
      let who = ensure_signed(origin)?;
      ensure!(!T::Registry::is_paused(), Error::<T>::ProtocolIsPaused);
      let record = WithdrawalRecords::<T>::get(fund, &who).ok_or(Error::<T>::TokensNotRedeemed)?;

      let account = Self::settlement_account(fund);
      let payout = record.payout_token;
      let slippage = T::DefaultVenueSlippage::get();
      let mut amount: Balance = 0;
      for (token, owed) in record.outstanding() {
        let received = if token == payout {
          owed
        } else {
          let min_out = slippage
            .left_from_one()
            .mul_floor(T::Prices::convert(token, payout, owed)?);
          let before = Rebalancing::<T>::balance_of(payout, &account);
          T::Venue::swap_exact_in(&account, token, payout, owed, min_out)?;
          let received = Rebalancing::<T>::balance_of(payout, &account).saturating_sub(before);
          ensure!(received > 0 && received >= min_out, Error::<T>::SwapFailed);
          received
        };
        amount = amount
          .checked_add(received)
          .ok_or(Error::<T>::ArithmeticOverflow)?;
      }

      Self::pay_out(fund, who, &record, amount)
    }
  }

  impl<T: Config> Pallet<T> {
    /// Account holding every investor's unsettled withdrawal tokens for a fund
    pub fn settlement_account(fund: FundId) -> T::AccountId {
      T::SettlementPalletId::get().into_sub_account_truncating(fund)
    }

    pub fn withdrawal_record(
      fund: FundId,
      who: &T::AccountId,
    ) -> Option<UserWithdrawalRecord<T::MaxWithdrawalTokens>> {
      WithdrawalRecords::<T>::get(fund, who)
    }

    /// Reference split of `total_amount` of a sell token across the underlying tokens of the
    /// fund's held positions, flattened in held order.
    pub fn calculate_swap_amounts_off_chain(
      fund: FundId,
      total_amount: Balance,
    ) -> Result<Vec<(AssetKind, Balance)>, DispatchError> {
      Ok(
        Self::reference_split(fund, total_amount)?
          .into_iter()
          .flat_map(|split| split.parts)
          .collect(),
      )
    }

    /// Split `total_amount` across held positions by USD weight, then equally across each
    /// position's underlying tokens. Positions without value are skipped and the rounding
    /// remainder goes to the last entry.
    pub fn reference_split(
      fund: FundId,
      total_amount: Balance,
    ) -> Result<Vec<PositionSplit>, DispatchError> {
      let vault = Rebalancing::<T>::vault_of(fund)?;
      let mut weighted = Vec::new();
      let mut total_usd: Balance = 0;
      for token in T::Ledger::held_tokens(fund) {
        let value = Self::position_value_usd(token, &vault)?;
        if value == 0 {
          continue;
        }
        total_usd = total_usd
          .checked_add(value)
          .ok_or(Error::<T>::ArithmeticOverflow)?;
        weighted.push((token, value));
      }
      ensure!(total_usd > 0, Error::<T>::EmptyFund);

      let mut splits = Vec::with_capacity(weighted.len());
      let mut assigned: Balance = 0;
      for (position, value) in weighted {
        let share = mul_div(total_amount, value, total_usd).ok_or(Error::<T>::ArithmeticOverflow)?;
        let underlying = Rebalancing::<T>::underlying_of(position)?;
        let part = share / underlying.len().max(1) as Balance;
        assigned = assigned.saturating_add(part.saturating_mul(underlying.len() as Balance));
        splits.push(PositionSplit {
          position,
          parts: underlying.into_iter().map(|token| (token, part)).collect(),
        });
      }
      if let Some(last) = splits.last_mut().and_then(|split| split.parts.last_mut()) {
        last.1 = last.1.saturating_add(total_amount.saturating_sub(assigned));
      }
      Ok(splits)
    }

    /// USD value (18 decimals) of everything the fund holds
    pub fn fund_value_usd(fund: FundId, vault: &T::AccountId) -> Result<Balance, DispatchError> {
      T::Ledger::held_tokens(fund)
        .into_iter()
        .try_fold(0 as Balance, |acc, token| {
          acc
            .checked_add(Self::position_value_usd(token, vault)?)
            .ok_or_else(|| Error::<T>::ArithmeticOverflow.into())
        })
    }

    fn position_value_usd(token: AssetKind, who: &T::AccountId) -> Result<Balance, DispatchError> {
      match T::Registry::adapter_of(token) {
        Some(adapter) => T::Adapters::token_balance_usd(adapter, token, who),
        None => T::Prices::token_to_usd(token, Rebalancing::<T>::balance_of(token, who)),
      }
    }

    /// Shares can only be priced while the whole fund sits in its vault
    fn ensure_active(fund: FundId) -> DispatchResult {
      ensure!(!T::Registry::is_paused(), Error::<T>::ProtocolIsPaused);
      ensure!(!T::Ledger::is_fund_paused(fund), Error::<T>::FundIsPaused);
      ensure!(
        pallet_rebalancing::RedemptionState::<T>::get(fund).pending().is_none(),
        Error::<T>::RedemptionPending
      );
      Ok(())
    }

    /// Settlement balances owed to investors other than the owner of `settling`
    fn reserved(
      fund: FundId,
      settling: Option<&UserWithdrawalRecord<T::MaxWithdrawalTokens>>,
    ) -> Vec<(AssetKind, Balance)> {
      OwedTotals::<T>::iter_prefix(fund)
        .map(|(token, total)| {
          let own = settling
            .and_then(|record| record.owed.iter().find(|(owed, _)| *owed == token))
            .map_or(0, |(_, amount)| *amount);
          (token, total.saturating_sub(own))
        })
        .collect()
    }

    fn ensure_covered(account: &T::AccountId, reserved: &[(AssetKind, Balance)]) -> DispatchResult {
      for (token, floor) in reserved {
        let balance = Rebalancing::<T>::balance_of(*token, account);
        if balance < *floor {
          log::warn!(
            target: LOG_TARGET,
            "settlement holds {} of {:?}, owes {}",
            balance,
            token,
            floor
          );
          return Err(Error::<T>::SwapFailed.into());
        }
      }
      Ok(())
    }

    /// Return to `who` whatever the settlement account holds above `baseline`
    fn refund_residue(
      account: &T::AccountId,
      who: &T::AccountId,
      baseline: &[(AssetKind, Balance)],
    ) -> DispatchResult {
      let mut seen: Vec<AssetKind> = Vec::with_capacity(baseline.len());
      for (token, keep) in baseline {
        if seen.contains(token) {
          continue;
        }
        seen.push(*token);
        let residue = Rebalancing::<T>::balance_of(*token, account).saturating_sub(*keep);
        Rebalancing::<T>::transfer_asset(*token, account, who, residue)?;
      }
      Ok(())
    }

    fn pay_out(
      fund: FundId,
      who: T::AccountId,
      record: &UserWithdrawalRecord<T::MaxWithdrawalTokens>,
      amount: Balance,
    ) -> DispatchResult {
      ensure!(amount > 0, Error::<T>::SwapFailed);
      let payout_token = record.payout_token;
      let account = Self::settlement_account(fund);
      let reserved = Self::reserved(fund, Some(record));
      Rebalancing::<T>::transfer_asset(payout_token, &account, &who, amount)?;
      Self::ensure_covered(&account, &reserved)?;
      for (token, owed) in record.outstanding() {
        OwedTotals::<T>::mutate_exists(fund, token, |total| {
          *total = total.map(|t| t.saturating_sub(owed)).filter(|t| *t > 0)
        });
      }
      WithdrawalRecords::<T>::remove(fund, &who);

      log::debug!(
        target: LOG_TARGET,
        "fund {}: paid out {} of {:?}",
        fund,
        amount,
        payout_token
      );
      Self::deposit_event(Event::Withdrawn {
        fund,
        who,
        payout_token,
        amount,
      });
      Ok(())
    }
  }
}

/// `a * b / c` rounded down, `None` on a zero divisor or a result wider than `u128`
pub fn mul_div(a: Balance, b: Balance, c: Balance) -> Option<Balance> {
  if c == 0 {
    return None;
  }
  let result = polkadot_sdk::sp_core::U256::from(a)
    .checked_mul(polkadot_sdk::sp_core::U256::from(b))?
    / polkadot_sdk::sp_core::U256::from(c);
  (result <= polkadot_sdk::sp_core::U256::from(u128::MAX)).then(|| result.as_u128())
}
