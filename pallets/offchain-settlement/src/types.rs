use polkadot_sdk::frame_support::{
  BoundedVec, CloneNoBound, EqNoBound, PartialEqNoBound, RuntimeDebugNoBound, pallet_prelude::*,
};

pub use primitives::{AssetKind, Balance, FundId, Moment, RouteProviderId};

/// Underlying tokens a redeeming investor is owed, held in the settlement account until
/// they are converted into `payout_token` and paid out.
#[derive(
  CloneNoBound,
  PartialEqNoBound,
  EqNoBound,
  RuntimeDebugNoBound,
  Encode,
  Decode,
  TypeInfo,
  MaxEncodedLen,
)]
#[scale_info(skip_type_params(S))]
#[codec(mel_bound(S: Get<u32>))]
pub struct UserWithdrawalRecord<S: Get<u32> + 'static> {
  pub payout_token: AssetKind,
  /// Owed amounts per underlying token, in order of first redemption
  pub owed: BoundedVec<(AssetKind, Balance), S>,
  pub recorded_at: Moment,
}

impl<S: Get<u32> + 'static> UserWithdrawalRecord<S> {
  /// Entries that still carry a balance
  pub fn outstanding(&self) -> alloc::vec::Vec<(AssetKind, Balance)> {
    self
      .owed
      .iter()
      .filter(|(_, amount)| *amount > 0)
      .copied()
      .collect()
  }

  /// Add `amount` of `token` to the matching entry, appending a new entry when absent.
  /// Returns `false` when a new entry does not fit.
  pub fn credit(&mut self, token: AssetKind, amount: Balance) -> bool {
    if let Some(entry) = self.owed.iter_mut().find(|(t, _)| *t == token) {
      entry.1 = entry.1.saturating_add(amount);
      return true;
    }
    self.owed.try_push((token, amount)).is_ok()
  }
}

/// Reference split of an investment for one held position
#[derive(Clone, PartialEq, Eq, RuntimeDebug)]
pub struct PositionSplit {
  pub position: AssetKind,
  /// Sell-token amount routed to each underlying token of the position
  pub parts: alloc::vec::Vec<(AssetKind, Balance)>,
}

/// Benchmark setup for routed withdrawals
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper {
  /// Permitted, non-native payout token
  fn payout_token() -> AssetKind;
  /// Enabled route provider and call data making a leg produce `amount_out`
  fn route(amount_out: Balance) -> (RouteProviderId, alloc::vec::Vec<u8>);
}
