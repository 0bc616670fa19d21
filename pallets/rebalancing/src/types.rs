use alloc::vec::Vec;
use polkadot_sdk::frame_support::pallet_prelude::*;
use polkadot_sdk::sp_runtime::Permill;

pub use primitives::{AdapterId, AssetKind, Balance, FundId, Moment, RouteProviderId};

/// One conversion step of a route.
///
/// A leg whose sell and buy token are the same asset is a passthrough; a leg between
/// different assets must carry call data for the route provider.
#[derive(Clone, PartialEq, Eq, RuntimeDebug, Encode, Decode, DecodeWithMemTracking, TypeInfo)]
pub struct RouteLeg {
  pub sell_token: AssetKind,
  pub buy_token: AssetKind,
  pub sell_amount: Balance,
  /// Opaque payload produced by the off-chain routing service
  pub call_data: Vec<u8>,
}

impl RouteLeg {
  pub fn is_passthrough(&self) -> bool {
    self.sell_token == self.buy_token
  }
}

/// Off-chain computed route committing a pending redemption into `portfolio_token`.
///
/// Arrays are parallel: leg `i` sells `sell_amounts[i]` of `sell_tokens[i]` for
/// `buy_tokens[i]` using `call_data[i]`.
#[derive(Clone, PartialEq, Eq, RuntimeDebug, Encode, Decode, DecodeWithMemTracking, TypeInfo)]
pub struct MetaSwapRoute {
  pub sell_tokens: Vec<AssetKind>,
  pub buy_tokens: Vec<AssetKind>,
  pub sell_amounts: Vec<Balance>,
  /// Slippage accepted when depositing the bought tokens into the portfolio position
  pub lp_slippage: Permill,
  pub call_data: Vec<Vec<u8>>,
  pub portfolio_token: AssetKind,
  pub route_provider: RouteProviderId,
}

impl MetaSwapRoute {
  /// Legs in route order, `None` when the parallel arrays disagree in length or are empty
  pub fn legs(&self) -> Option<Vec<RouteLeg>> {
    let n = self.sell_tokens.len();
    if n == 0
      || self.buy_tokens.len() != n
      || self.sell_amounts.len() != n
      || self.call_data.len() != n
    {
      return None;
    }
    Some(
      (0..n)
        .map(|i| RouteLeg {
          sell_token: self.sell_tokens[i],
          buy_token: self.buy_tokens[i],
          sell_amount: self.sell_amounts[i],
          call_data: self.call_data[i].clone(),
        })
        .collect(),
    )
  }
}

/// Funds moved from the vault into escrow, waiting for a swap or a revert
#[derive(
  Clone, Copy, PartialEq, Eq, RuntimeDebug, Encode, Decode, DecodeWithMemTracking, TypeInfo, MaxEncodedLen,
)]
pub struct PendingRedemption {
  pub sell_token: AssetKind,
  pub amount: Balance,
  pub slippage: Permill,
  pub escrowed_at: Moment,
}

/// Per-fund redemption slot. At most one redemption is live at a time.
#[derive(
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  RuntimeDebug,
  Encode,
  Decode,
  DecodeWithMemTracking,
  TypeInfo,
  MaxEncodedLen,
)]
pub enum RedemptionStatus {
  #[default]
  Idle,
  Redeemed(PendingRedemption),
}

impl RedemptionStatus {
  pub fn pending(&self) -> Option<PendingRedemption> {
    match self {
      RedemptionStatus::Idle => None,
      RedemptionStatus::Redeemed(pending) => Some(*pending),
    }
  }
}

/// Arguments of a position redemption through its adapter
#[derive(Clone, PartialEq, Eq, RuntimeDebug)]
pub struct RedeemParams<AccountId> {
  pub token: AssetKind,
  pub amount: Balance,
  pub slippage: Permill,
  /// Account holding the position tokens
  pub owner: AccountId,
  /// Account receiving the underlying tokens
  pub to: AccountId,
  pub payout_in_native: bool,
}

/// Fund-share ledger and custody bookkeeping
pub trait FundLedger<AccountId> {
  /// Custody account of the fund, `None` for unknown funds
  fn vault_account(fund: FundId) -> Option<AccountId>;
  fn is_asset_manager(fund: FundId, who: &AccountId) -> bool;
  fn is_fund_paused(fund: FundId) -> bool;
  /// Tokens the fund currently holds, in insertion order
  fn held_tokens(fund: FundId) -> Vec<AssetKind>;
  fn add_held_token(fund: FundId, token: AssetKind) -> DispatchResult;
  fn remove_held_token(fund: FundId, token: AssetKind) -> DispatchResult;
  fn mint_shares(fund: FundId, who: &AccountId, amount: Balance) -> DispatchResult;
  fn burn_shares(fund: FundId, who: &AccountId, amount: Balance) -> DispatchResult;
  fn share_balance(fund: FundId, who: &AccountId) -> Balance;
  fn total_shares(fund: FundId) -> Balance;
  /// Smallest non-zero share balance an investor may keep
  fn min_investment_amount(fund: FundId) -> Balance;
}

/// Protocol-specific position handling, dispatched by adapter id
pub trait PositionAdapter<AccountId> {
  /// Decomposition of `token` into the tokens it redeems into
  fn underlying(adapter: AdapterId, token: AssetKind) -> Result<Vec<AssetKind>, DispatchError>;

  /// Wrap `amounts` (aligned with `underlying`) taken from `payer` into `token` credited to
  /// `recipient`. Returns the position amount minted.
  fn deposit(
    adapter: AdapterId,
    token: AssetKind,
    amounts: &[Balance],
    slippage: Permill,
    payer: &AccountId,
    recipient: &AccountId,
  ) -> Result<Balance, DispatchError>;

  /// Unwrap a position. Returns the amounts paid out, aligned with `underlying`.
  fn redeem(adapter: AdapterId, params: RedeemParams<AccountId>) -> Result<Vec<Balance>, DispatchError>;

  fn token_balance(adapter: AdapterId, token: AssetKind, who: &AccountId) -> Balance;

  /// USD value (18 decimals) of `who`'s position
  fn token_balance_usd(
    adapter: AdapterId,
    token: AssetKind,
    who: &AccountId,
  ) -> Result<Balance, DispatchError>;
}

/// Protocol-wide switches and registrations
pub trait ProtocolRegistry {
  fn is_paused() -> bool;
  fn adapter_of(token: AssetKind) -> Option<AdapterId>;
  fn is_adapter_enabled(adapter: AdapterId) -> bool;
  fn is_route_provider_enabled(provider: RouteProviderId) -> bool;
  fn is_token_permitted(token: AssetKind) -> bool;
}

/// Executor for opaque off-chain routes
pub trait RouteProvider<AccountId> {
  /// Execute one leg for `who`, spending its sell tokens and crediting buy tokens back to it.
  /// The reported outcome is not trusted; callers measure balances.
  fn execute(provider: RouteProviderId, who: &AccountId, leg: &RouteLeg) -> DispatchResult;
}

/// Default on-chain swap venue
pub trait OnChainVenue<AccountId> {
  fn swap_exact_in(
    who: &AccountId,
    asset_in: AssetKind,
    asset_out: AssetKind,
    amount_in: Balance,
    min_amount_out: Balance,
  ) -> Result<Balance, DispatchError>;
}

/// Benchmark setup for a runtime's fund ledger and assets
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId> {
  /// An existing, unpaused fund and its asset manager
  fn fund() -> (FundId, AccountId);
  /// Create `asset` if it does not exist and credit `amount` of it to `who`
  fn fund_account(who: &AccountId, asset: AssetKind, amount: Balance) -> DispatchResult;
}
