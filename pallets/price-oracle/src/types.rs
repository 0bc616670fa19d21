use polkadot_sdk::frame_support::pallet_prelude::*;

pub use primitives::{AssetKind, Balance, FeedSourceId, Moment};

/// Latest answer published by an upstream aggregator.
///
/// `answer` is signed because upstream aggregators may report non-positive values on
/// malfunction; the oracle rejects those instead of clamping them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, MaxEncodedLen)]
pub struct RoundData {
  pub answer: i128,
  pub decimals: u8,
  pub updated_at: Moment,
}

/// Liveness report of an L2 sequencer uptime feed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Encode, Decode, TypeInfo, MaxEncodedLen)]
pub struct SequencerStatus {
  pub is_up: bool,
  /// Timestamp of the last status flip
  pub started_at: Moment,
}

/// A gated price: `answer / 10^decimals` units of quote per unit of base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Price {
  pub answer: u128,
  pub decimals: u8,
}

/// Reserve composition of a two-asset liquidity pool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolComposition {
  pub token_a: AssetKind,
  pub reserve_a: Balance,
  pub token_b: AssetKind,
  pub reserve_b: Balance,
  pub total_supply: Balance,
}

/// Upstream aggregator access keyed by feed source
pub trait AggregatorSource {
  fn latest_round(source: FeedSourceId) -> Option<RoundData>;
}

/// Sequencer uptime feed. `None` means the deployment has no sequencer to gate on.
pub trait SequencerStatusProvider {
  fn status() -> Option<SequencerStatus>;
}

impl SequencerStatusProvider for () {
  fn status() -> Option<SequencerStatus> {
    None
  }
}

/// Token decimals used to scale raw amounts
pub trait TokenDecimals {
  fn decimals(asset: AssetKind) -> Option<u8>;
}

/// Decimals resolved from the well-known asset table
pub struct WellKnownDecimals;
impl TokenDecimals for WellKnownDecimals {
  fn decimals(asset: AssetKind) -> Option<u8> {
    primitives::get_well_known_metadata(asset).map(|meta| meta.decimals)
  }
}

/// Pool inspection for LP token valuation
pub trait LiquidityPoolInspect {
  /// Composition of the pool backing `lp_token`, `None` when it is not an LP token
  fn composition(lp_token: AssetKind) -> Option<PoolComposition>;
}

impl LiquidityPoolInspect for () {
  fn composition(_lp_token: AssetKind) -> Option<PoolComposition> {
    None
  }
}

/// Valuation interface consumed by the rebalancing and settlement pallets.
///
/// Every call re-reads the feeds through the staleness gate; implementations must not cache.
pub trait PriceProvider {
  /// USD value (18 decimals) of `amount` of `token`. LP tokens are valued from their pool.
  fn token_to_usd(token: AssetKind, amount: Balance) -> Result<Balance, DispatchError>;

  /// Amount of `token` worth `usd_amount` (18 decimals)
  fn usd_to_token(token: AssetKind, usd_amount: Balance) -> Result<Balance, DispatchError>;

  /// Amount of `token_out` worth `amount` of `token_in`
  fn convert(
    token_in: AssetKind,
    token_out: AssetKind,
    amount: Balance,
  ) -> Result<Balance, DispatchError>;
}
