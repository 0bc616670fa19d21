//! Price Oracle Pallet
//!
//! Staleness-gated price reads over upstream aggregator feeds.
//!
//! Every read goes through the same gate: the sequencer (on L2 deployments) must be up and
//! past its grace period, the feed must exist and report a positive answer, and the answer
//! must be younger than the expiration threshold. Nothing is cached between calls; a gated
//! failure is surfaced to the caller, never replaced by an older value.
//!
//! Derived queries scale through token decimals and divide once at the end, so every result
//! rounds toward zero. LP tokens are valued with the fair-reserve formula
//! `2 * sqrt(value_a * value_b) * amount / supply`, which a single-block reserve skew cannot
//! inflate.

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
use polkadot_sdk::sp_core::U256;
use primitives::ecosystem::params::USD_DECIMALS;

pub(crate) const LOG_TARGET: &str = "runtime::price-oracle";

#[frame::pallet]
pub mod pallet {
  use super::*;
  use alloc::vec::Vec;
  use frame::deps::frame_support::traits::{EnsureOrigin, UnixTime};

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Origin allowed to register feeds and tune thresholds
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Wall clock used for staleness checks
    type TimeProvider: UnixTime;

    /// Upstream aggregators
    type Aggregators: AggregatorSource;

    /// Sequencer uptime feed, `()` when the chain has none
    type SequencerFeed: SequencerStatusProvider;

    /// Token decimals
    type Decimals: TokenDecimals;

    /// Pool inspection for LP valuation
    type Pools: LiquidityPoolInspect;

    /// Denomination asset that USD feeds are quoted in
    #[pallet::constant]
    type UsdAsset: Get<AssetKind>;

    /// Maximum answer age in seconds until governance overrides it
    #[pallet::constant]
    type DefaultExpirationThreshold: Get<Moment>;

    /// Seconds the sequencer must be back up before prices are trusted
    #[pallet::constant]
    type DefaultSequencerGracePeriod: Get<Moment>;

    /// Weight information
    type WeightInfo: WeightInfo;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Registered aggregator per (base, quote) pair
  #[pallet::storage]
  pub type Feeds<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    AssetKind,
    Blake2_128Concat,
    AssetKind,
    FeedSourceId,
    OptionQuery,
  >;

  /// Maximum age (seconds) of an aggregator answer
  #[pallet::storage]
  pub type ExpirationThreshold<T: Config> =
    StorageValue<_, Moment, ValueQuery, T::DefaultExpirationThreshold>;

  /// Grace period (seconds) after the sequencer comes back up
  #[pallet::storage]
  pub type SequencerGracePeriod<T: Config> =
    StorageValue<_, Moment, ValueQuery, T::DefaultSequencerGracePeriod>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// Aggregator registered for a pair
    FeedAdded {
      base: AssetKind,
      quote: AssetKind,
      source: FeedSourceId,
    },
    /// Staleness threshold changed
    ExpirationThresholdUpdated { old: Moment, new: Moment },
    /// Sequencer grace period changed
    SequencerThresholdUpdated { old: Moment, new: Moment },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Sequencer reports downtime
    SequencerDown,
    /// Sequencer is up but the grace period has not elapsed
    SequencerThresholdNotCrossed,
    /// Latest answer is older than the expiration threshold
    PriceExpired,
    /// Feed registration arrays differ in length or are empty
    IncorrectArrayLength,
    /// Pair already has an aggregator
    AggregatorAlreadyExists,
    /// No aggregator, or no answer, for the pair
    FeedNotFound,
    /// Aggregator answer is not positive
    InvalidPrice,
    /// Decimals of a token are unknown
    UnknownDecimals,
    /// Scaled value does not fit the balance type
    ArithmeticOverflow,
    /// Asset is not backed by a liquidity pool
    NotLpToken,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Register aggregators for `(bases[i], quotes[i])` pairs. Registration is append-only.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::add_feed(bases.len() as u32))]
    pub fn add_feed(
      origin: OriginFor<T>,
      bases: Vec<AssetKind>,
      quotes: Vec<AssetKind>,
      sources: Vec<FeedSourceId>,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        !bases.is_empty() && bases.len() == quotes.len() && bases.len() == sources.len(),
        Error::<T>::IncorrectArrayLength
      );
      for ((base, quote), source) in bases.into_iter().zip(quotes).zip(sources) {
        // Earlier pairs of the same call are already inserted, so in-call duplicates fail here
        ensure!(
          !Feeds::<T>::contains_key(base, quote),
          Error::<T>::AggregatorAlreadyExists
        );
        Feeds::<T>::insert(base, quote, source);
        Self::deposit_event(Event::FeedAdded {
          base,
          quote,
          source,
        });
      }
      Ok(())
    }

    /// Set the maximum answer age in seconds
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::update_expiration_threshold())]
    pub fn update_expiration_threshold(origin: OriginFor<T>, new: Moment) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      let old = ExpirationThreshold::<T>::get();
      ExpirationThreshold::<T>::put(new);
      Self::deposit_event(Event::ExpirationThresholdUpdated { old, new });
      Ok(())
    }

    /// Set the sequencer grace period in seconds
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::update_sequencer_threshold())]
    pub fn update_sequencer_threshold(origin: OriginFor<T>, new: Moment) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      let old = SequencerGracePeriod::<T>::get();
      SequencerGracePeriod::<T>::put(new);
      Self::deposit_event(Event::SequencerThresholdUpdated { old, new });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Gated latest price of `base` in `quote`
    pub fn get_price(base: AssetKind, quote: AssetKind) -> Result<Price, DispatchError> {
      let now = T::TimeProvider::now().as_secs();
      Self::ensure_sequencer_live(now)?;

      let source = Feeds::<T>::get(base, quote).ok_or(Error::<T>::FeedNotFound)?;
      let round = T::Aggregators::latest_round(source).ok_or(Error::<T>::FeedNotFound)?;
      ensure!(round.answer > 0, Error::<T>::InvalidPrice);
      let answer = u128::try_from(round.answer).map_err(|_| Error::<T>::InvalidPrice)?;

      let age = now.saturating_sub(round.updated_at);
      let threshold = ExpirationThreshold::<T>::get();
      if age > threshold {
        log::warn!(
          target: LOG_TARGET,
          "stale answer for {:?}/{:?}: age {}s exceeds {}s",
          base,
          quote,
          age,
          threshold
        );
        return Err(Error::<T>::PriceExpired.into());
      }

      Ok(Price {
        answer,
        decimals: round.decimals,
      })
    }

    /// Value of `amount` of `base` in `quote` units through the direct feed
    pub fn get_price_for_amount(
      base: AssetKind,
      quote: AssetKind,
      amount: Balance,
    ) -> Result<Balance, DispatchError> {
      let price = Self::get_price(base, quote)?;
      let base_decimals = Self::decimals_of(base)?;
      let quote_decimals = Self::decimals_of(quote)?;
      let numerator = U256::from(amount)
        .checked_mul(U256::from(price.answer))
        .and_then(|n| n.checked_mul(Self::pow10(quote_decimals as u32).ok()?))
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      let denominator = Self::pow10(base_decimals as u32 + price.decimals as u32)?;
      Self::narrow(numerator / denominator)
    }

    /// USD value of `amount` of `token` with 18 decimals
    pub fn get_price_token_usd_18(
      token: AssetKind,
      amount: Balance,
    ) -> Result<Balance, DispatchError> {
      Self::get_price_for_amount(token, T::UsdAsset::get(), amount)
    }

    /// Amount of `token` worth `usd_amount` (18 decimals)
    pub fn get_price_usd_token(
      token: AssetKind,
      usd_amount: Balance,
    ) -> Result<Balance, DispatchError> {
      let usd = T::UsdAsset::get();
      let price = Self::get_price(token, usd)?;
      let token_decimals = Self::decimals_of(token)?;
      let numerator = U256::from(usd_amount)
        .checked_mul(Self::pow10(token_decimals as u32 + price.decimals as u32)?)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      let denominator = U256::from(price.answer)
        .checked_mul(Self::pow10(USD_DECIMALS as u32)?)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      Self::narrow(numerator / denominator)
    }

    /// Amount of `token_out` worth `amount` of `token_in`, crossed through both USD feeds
    pub fn get_price_for_token_amount(
      token_in: AssetKind,
      token_out: AssetKind,
      amount: Balance,
    ) -> Result<Balance, DispatchError> {
      if token_in == token_out {
        return Ok(amount);
      }
      let usd = T::UsdAsset::get();
      let price_in = Self::get_price(token_in, usd)?;
      let price_out = Self::get_price(token_out, usd)?;
      let decimals_in = Self::decimals_of(token_in)? as u32;
      let decimals_out = Self::decimals_of(token_out)? as u32;

      let numerator = U256::from(amount)
        .checked_mul(U256::from(price_in.answer))
        .and_then(|n| n.checked_mul(Self::pow10(decimals_out + price_out.decimals as u32).ok()?))
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      let denominator = Self::pow10(decimals_in + price_in.decimals as u32)?
        .checked_mul(U256::from(price_out.answer))
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      Self::narrow(numerator / denominator)
    }

    /// Fair USD value (18 decimals) of `amount` LP tokens
    pub fn get_lp_price_usd_18(lp_token: AssetKind, amount: Balance) -> Result<Balance, DispatchError> {
      let pool = T::Pools::composition(lp_token).ok_or(Error::<T>::NotLpToken)?;
      ensure!(pool.total_supply > 0, Error::<T>::InvalidPrice);

      let value_a = Self::get_price_token_usd_18(pool.token_a, pool.reserve_a)?;
      let value_b = Self::get_price_token_usd_18(pool.token_b, pool.reserve_b)?;
      // u128 * u128 always fits in U256
      let fair_reserves = (U256::from(value_a) * U256::from(value_b)).integer_sqrt() * U256::from(2);
      let value = fair_reserves
        .checked_mul(U256::from(amount))
        .ok_or(Error::<T>::ArithmeticOverflow)?
        / U256::from(pool.total_supply);
      Self::narrow(value)
    }

    /// Sequencer gate. Chains without a sequencer feed always pass.
    fn ensure_sequencer_live(now: Moment) -> DispatchResult {
      let Some(status) = T::SequencerFeed::status() else {
        return Ok(());
      };
      if !status.is_up {
        log::warn!(target: LOG_TARGET, "sequencer down since {}", status.started_at);
        return Err(Error::<T>::SequencerDown.into());
      }
      ensure!(
        now.saturating_sub(status.started_at) >= SequencerGracePeriod::<T>::get(),
        Error::<T>::SequencerThresholdNotCrossed
      );
      Ok(())
    }

    fn decimals_of(asset: AssetKind) -> Result<u8, DispatchError> {
      if asset == T::UsdAsset::get() {
        return Ok(USD_DECIMALS);
      }
      T::Decimals::decimals(asset).ok_or_else(|| Error::<T>::UnknownDecimals.into())
    }

    fn pow10(exp: u32) -> Result<U256, DispatchError> {
      U256::from(10u8)
        .checked_pow(U256::from(exp))
        .ok_or_else(|| Error::<T>::ArithmeticOverflow.into())
    }

    fn narrow(value: U256) -> Result<Balance, DispatchError> {
      if value > U256::from(u128::MAX) {
        return Err(Error::<T>::ArithmeticOverflow.into());
      }
      Ok(value.as_u128())
    }
  }

  impl<T: Config> PriceProvider for Pallet<T> {
    fn token_to_usd(token: AssetKind, amount: Balance) -> Result<Balance, DispatchError> {
      if T::Pools::composition(token).is_some() {
        return Self::get_lp_price_usd_18(token, amount);
      }
      Self::get_price_token_usd_18(token, amount)
    }

    fn usd_to_token(token: AssetKind, usd_amount: Balance) -> Result<Balance, DispatchError> {
      Self::get_price_usd_token(token, usd_amount)
    }

    fn convert(
      token_in: AssetKind,
      token_out: AssetKind,
      amount: Balance,
    ) -> Result<Balance, DispatchError> {
      if T::Pools::composition(token_in).is_some() {
        let usd = Self::get_lp_price_usd_18(token_in, amount)?;
        return Self::get_price_usd_token(token_out, usd);
      }
      Self::get_price_for_token_amount(token_in, token_out, amount)
    }
  }

  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    /// Initial `(base, quote, source)` registrations
    pub feeds: Vec<(AssetKind, AssetKind, FeedSourceId)>,
    pub expiration_threshold: Option<Moment>,
    pub sequencer_grace_period: Option<Moment>,
    #[serde(skip)]
    pub _marker: PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      for (base, quote, source) in &self.feeds {
        assert!(
          !Feeds::<T>::contains_key(base, quote),
          "Duplicate feed in genesis"
        );
        Feeds::<T>::insert(base, quote, source);
      }
      if let Some(threshold) = self.expiration_threshold {
        ExpirationThreshold::<T>::put(threshold);
      }
      if let Some(grace) = self.sequencer_grace_period {
        SequencerGracePeriod::<T>::put(grace);
      }
    }
  }
}
