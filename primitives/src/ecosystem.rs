//! Ecosystem Constants for the custodial fund pallets
//!
//! Centralizes identifier aliases, pallet IDs and the fundamental parameters shared by the
//! price oracle, rebalancing and off-chain settlement pallets.

/// Balance type alias for consistency across ecosystem
pub type Balance = u128;

/// Identifier of a fund managed by the external fund ledger
pub type FundId = u32;

/// Identifier of a position adapter registered in the protocol registry
pub type AdapterId = u32;

/// Identifier of a route provider (off-chain aggregator handler) in the protocol registry
pub type RouteProviderId = u32;

/// Identifier of an upstream price aggregator
pub type FeedSourceId = u32;

/// Unix timestamp in seconds
pub type Moment = u64;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// The first four bytes are distinct per pallet so accounts stay distinct even when the
/// runtime truncates derived accounts to short account ids.
pub mod pallet_ids {
  /// Rebalancing pallet ID (escrow for pending redemptions)
  pub const REBALANCING_PALLET_ID: &[u8; 8] = b"rebalanc";

  /// Off-chain settlement pallet ID (investment and withdrawal escrow)
  pub const OFFCHAIN_SETTLEMENT_PALLET_ID: &[u8; 8] = b"offsettl";
}

/// Ecosystem parameters defining thresholds and tolerances.
pub mod params {
  use super::Moment;
  use sp_arithmetic::Permill;

  /// Decimals of USD-normalized values returned by the oracle.
  pub const USD_DECIMALS: u8 = 18;

  /// Time after escrow before anyone may revert a pending redemption (15 minutes).
  pub const REDEEM_COOLDOWN_SECS: Moment = 15 * 60;

  /// Default maximum age of an aggregator answer (25 hours).
  ///
  /// Heartbeats of slow feeds are 24 hours; one extra hour absorbs publication lag.
  pub const DEFAULT_EXPIRATION_THRESHOLD_SECS: Moment = 25 * 60 * 60;

  /// Default grace period after the sequencer comes back up (1 hour).
  pub const DEFAULT_SEQUENCER_GRACE_PERIOD_SECS: Moment = 60 * 60;

  /// Maximum deviation of an off-chain proposed buy allocation from the on-chain reference
  /// split (1%).
  pub const BUY_VALUE_TOLERANCE: Permill = Permill::from_percent(1);

  /// Slippage accepted by the default on-chain venue against the oracle quote (3%).
  pub const DEFAULT_VENUE_SLIPPAGE: Permill = Permill::from_percent(3);

  /// Maximum number of underlying tokens a position decomposes into.
  pub const MAX_UNDERLYING: u32 = 2;
}
