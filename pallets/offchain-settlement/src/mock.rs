extern crate alloc;

use crate as pallet_offchain_settlement;
use crate::types::*;
use codec::{Decode, Encode};
use pallet_price_oracle::{
  AggregatorSource, LiquidityPoolInspect, PoolComposition, PriceProvider, RoundData,
  TokenDecimals, WellKnownDecimals,
};
use pallet_rebalancing::{
  FundLedger, OnChainVenue, PositionAdapter, ProtocolRegistry, RedeemParams, RouteLeg,
  RouteProvider,
};
use polkadot_sdk::frame_support::traits::fungibles::{Inspect, Mutate};
use polkadot_sdk::frame_support::traits::tokens::{Fortitude, Precision, Preservation};
use polkadot_sdk::frame_support::{
  PalletId, construct_runtime, derive_impl, parameter_types,
  storage::unhashed,
  traits::{ConstU32, ConstU64, ConstU128, UnixTime},
};
use polkadot_sdk::frame_system;
use polkadot_sdk::sp_core::U256;
use polkadot_sdk::sp_runtime::{
  BuildStorage, DispatchError, DispatchResult, Permill,
  testing::H256,
  traits::{BlakeTwo256, IdentityLookup},
};
use primitives::{AdapterId, TYPE_LP, TYPE_VTOKEN, ecosystem::params, pallet_ids, well_known};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// One whole token with 18 decimals
pub const E: u128 = 1_000_000_000_000_000_000;
/// One whole USDC (6 decimals)
pub const U: u128 = 1_000_000;

pub const DAI: AssetKind = AssetKind::Local(well_known::DAI);
pub const ETH: AssetKind = AssetKind::Local(well_known::ETH);
pub const USDC: AssetKind = AssetKind::Local(well_known::USDC);
/// Token no adapter is registered for
pub const USDT: AssetKind = AssetKind::Local(well_known::USDT);
pub const USD: AssetKind = AssetKind::Local(well_known::USD);
/// DAI/ETH liquidity pool share
pub const LP: AssetKind = AssetKind::Local(TYPE_LP | 1);
/// 1:1 yield-bearing DAI wrapper
pub const WDAI: AssetKind = AssetKind::Local(TYPE_VTOKEN | 7);
pub const SHARES_ID: u32 = 1_000;

pub const PLAIN_ADAPTER: AdapterId = 1;
pub const LP_ADAPTER: AdapterId = 2;
pub const WRAP_ADAPTER: AdapterId = 3;
pub const PROVIDER: RouteProviderId = 1;

pub const FUND: FundId = 0;
pub const MANAGER: u64 = 10;
pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;
pub const VAULT: u64 = 500;
pub const POOL: u64 = 600;
pub const WRAP_RESERVE: u64 = 700;

pub const GENESIS_TIME: Moment = 1_700_000_000;

thread_local! {
    pub static NOW: RefCell<Moment> = const { RefCell::new(GENESIS_TIME) };
    pub static ROUNDS: RefCell<BTreeMap<u32, RoundData>> = const { RefCell::new(BTreeMap::new()) };
    pub static PAUSED: RefCell<bool> = const { RefCell::new(false) };
    pub static FUND_PAUSED: RefCell<bool> = const { RefCell::new(false) };
    pub static DISABLED_ADAPTERS: RefCell<BTreeSet<AdapterId>> = const { RefCell::new(BTreeSet::new()) };
    pub static DISABLED_PROVIDERS: RefCell<BTreeSet<RouteProviderId>> = const { RefCell::new(BTreeSet::new()) };
    pub static VENUE_HAIRCUT: RefCell<Permill> = const { RefCell::new(Permill::zero()) };
    pub static MIN_INVESTMENT: RefCell<u128> = const { RefCell::new(0) };
    pub static ROUTER_SKIM: RefCell<Option<(AssetKind, u128)>> = const { RefCell::new(None) };
}

pub fn set_now(now: Moment) {
  NOW.with(|n| *n.borrow_mut() = now);
}

pub fn now() -> Moment {
  NOW.with(|n| *n.borrow())
}

pub fn set_paused(paused: bool) {
  PAUSED.with(|p| *p.borrow_mut() = paused);
}

pub fn set_fund_paused(paused: bool) {
  FUND_PAUSED.with(|p| *p.borrow_mut() = paused);
}

pub fn disable_adapter(adapter: AdapterId) {
  DISABLED_ADAPTERS.with(|d| d.borrow_mut().insert(adapter));
}

pub fn disable_provider(provider: RouteProviderId) {
  DISABLED_PROVIDERS.with(|d| d.borrow_mut().insert(provider));
}

pub fn set_venue_haircut(haircut: Permill) {
  VENUE_HAIRCUT.with(|h| *h.borrow_mut() = haircut);
}

/// Makes every routed leg also take `amount` of `token` from the executing account
pub fn set_router_skim(skim: Option<(AssetKind, u128)>) {
  ROUTER_SKIM.with(|s| *s.borrow_mut() = skim);
}

pub fn set_min_investment(amount: u128) {
  MIN_INVESTMENT.with(|m| *m.borrow_mut() = amount);
}

/// Publish USD prices (8 decimals) for every priced asset at the current time
pub fn publish_prices() {
  let updated_at = now();
  ROUNDS.with(|r| {
    let mut rounds = r.borrow_mut();
    for (source, answer) in [(1, 100_000_000), (2, 2_000 * 100_000_000), (3, 100_000_000)] {
      rounds.insert(
        source,
        RoundData {
          answer,
          decimals: 8,
          updated_at,
        },
      );
    }
  });
}

/// Call data understood by the mock router: the exact amount to pay out
pub fn route(amount_out: u128) -> Vec<u8> {
  amount_out.encode()
}

pub fn asset_id(asset: AssetKind) -> u32 {
  match asset {
    AssetKind::Local(id) | AssetKind::Foreign(id) => id,
    AssetKind::Native => panic!("native asset has no id"),
  }
}

pub fn balance(asset: AssetKind, who: u64) -> u128 {
  Assets::balance(asset_id(asset), who)
}

pub fn mint(asset: AssetKind, who: u64, amount: u128) {
  <Assets as Mutate<u64>>::mint_into(asset_id(asset), &who, amount).unwrap();
}

pub fn burn(asset: AssetKind, who: &u64, amount: u128) -> DispatchResult {
  <Assets as Mutate<u64>>::burn_from(
    asset_id(asset),
    who,
    amount,
    Preservation::Expendable,
    Precision::Exact,
    Fortitude::Polite,
  )?;
  Ok(())
}

pub fn mul_div(a: u128, b: u128, c: u128) -> u128 {
  (U256::from(a) * U256::from(b) / U256::from(c)).as_u128()
}

/// Mark `token` as held by the fund
pub fn hold(token: AssetKind) {
  MockFund::add_held_token(FUND, token).unwrap();
}

pub fn held() -> Vec<AssetKind> {
  MockFund::held_tokens(FUND)
}

pub fn shares(who: u64) -> u128 {
  Assets::balance(SHARES_ID, who)
}

/// Vault holding 2000 DAI and 1 ETH ($4000 at the published prices)
pub fn seed_fund() {
  mint(DAI, VAULT, 2_000 * E);
  mint(ETH, VAULT, E);
  hold(DAI);
  hold(ETH);
}

/// DAI/ETH pool priced at 2000 DAI per ETH: 6000 DAI + 3 ETH backing 1000 LP, of which the
/// vault owns 100 ($1200).
pub fn seed_lp_pool() {
  mint(DAI, POOL, 6_000 * E);
  mint(ETH, POOL, 3 * E);
  mint(LP, BOB, 900 * E);
  mint(LP, VAULT, 100 * E);
}

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Balances: polkadot_sdk::pallet_balances,
    Assets: polkadot_sdk::pallet_assets,
    PriceOracle: pallet_price_oracle,
    Rebalancing: pallet_rebalancing,
    OffchainSettlement: pallet_offchain_settlement,
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

pub struct MockTime;
impl UnixTime for MockTime {
  fn now() -> core::time::Duration {
    core::time::Duration::from_secs(now())
  }
}

pub struct MockAggregators;
impl AggregatorSource for MockAggregators {
  fn latest_round(source: u32) -> Option<RoundData> {
    ROUNDS.with(|r| r.borrow().get(&source).copied())
  }
}

pub struct MockDecimals;
impl TokenDecimals for MockDecimals {
  fn decimals(asset: AssetKind) -> Option<u8> {
    if asset == LP || asset == WDAI {
      return Some(18);
    }
    WellKnownDecimals::decimals(asset)
  }
}

pub struct MockPools;
impl LiquidityPoolInspect for MockPools {
  fn composition(lp_token: AssetKind) -> Option<PoolComposition> {
    (lp_token == LP).then(|| PoolComposition {
      token_a: DAI,
      reserve_a: balance(DAI, POOL),
      token_b: ETH,
      reserve_b: balance(ETH, POOL),
      total_supply: Assets::total_issuance(asset_id(LP)),
    })
  }
}

parameter_types! {
  pub const UsdAsset: AssetKind = USD;
  pub const RebalancingPalletId: PalletId = PalletId(*pallet_ids::REBALANCING_PALLET_ID);
  pub const SettlementPalletId: PalletId = PalletId(*pallet_ids::OFFCHAIN_SETTLEMENT_PALLET_ID);
  pub const BuyValueTolerance: Permill = params::BUY_VALUE_TOLERANCE;
  pub const DefaultVenueSlippage: Permill = params::DEFAULT_VENUE_SLIPPAGE;
}

impl pallet_price_oracle::Config for Test {
  type AdminOrigin = frame_system::EnsureRoot<u64>;
  type TimeProvider = MockTime;
  type Aggregators = MockAggregators;
  type SequencerFeed = ();
  type Decimals = MockDecimals;
  type Pools = MockPools;
  type UsdAsset = UsdAsset;
  type DefaultExpirationThreshold = ConstU64<{ params::DEFAULT_EXPIRATION_THRESHOLD_SECS }>;
  type DefaultSequencerGracePeriod = ConstU64<{ params::DEFAULT_SEQUENCER_GRACE_PERIOD_SECS }>;
  type WeightInfo = ();
}

fn held_key(fund: FundId) -> Vec<u8> {
  (b"mock:held", fund).encode()
}

/// Single fund (id 0) whose held-token list lives in storage so it rolls back with the call
pub struct MockFund;
impl FundLedger<u64> for MockFund {
  fn vault_account(fund: FundId) -> Option<u64> {
    (fund == FUND).then_some(VAULT)
  }

  fn is_asset_manager(fund: FundId, who: &u64) -> bool {
    fund == FUND && *who == MANAGER
  }

  fn is_fund_paused(_fund: FundId) -> bool {
    FUND_PAUSED.with(|p| *p.borrow())
  }

  fn held_tokens(fund: FundId) -> Vec<AssetKind> {
    unhashed::get_or_default(&held_key(fund))
  }

  fn add_held_token(fund: FundId, token: AssetKind) -> DispatchResult {
    let mut tokens = Self::held_tokens(fund);
    if !tokens.contains(&token) {
      tokens.push(token);
      unhashed::put(&held_key(fund), &tokens);
    }
    Ok(())
  }

  fn remove_held_token(fund: FundId, token: AssetKind) -> DispatchResult {
    let mut tokens = Self::held_tokens(fund);
    tokens.retain(|t| *t != token);
    unhashed::put(&held_key(fund), &tokens);
    Ok(())
  }

  fn mint_shares(_fund: FundId, who: &u64, amount: u128) -> DispatchResult {
    <Assets as Mutate<u64>>::mint_into(SHARES_ID, who, amount)?;
    Ok(())
  }

  fn burn_shares(_fund: FundId, who: &u64, amount: u128) -> DispatchResult {
    <Assets as Mutate<u64>>::burn_from(
      SHARES_ID,
      who,
      amount,
      Preservation::Expendable,
      Precision::Exact,
      Fortitude::Polite,
    )?;
    Ok(())
  }

  fn share_balance(_fund: FundId, who: &u64) -> u128 {
    Assets::balance(SHARES_ID, who)
  }

  fn total_shares(_fund: FundId) -> u128 {
    Assets::total_issuance(SHARES_ID)
  }

  fn min_investment_amount(_fund: FundId) -> u128 {
    MIN_INVESTMENT.with(|m| *m.borrow())
  }
}

/// Plain tokens (transfer-through), the DAI/ETH pool, and the DAI wrapper
pub struct MockAdapters;
impl PositionAdapter<u64> for MockAdapters {
  fn underlying(adapter: AdapterId, token: AssetKind) -> Result<Vec<AssetKind>, DispatchError> {
    match adapter {
      PLAIN_ADAPTER => Ok(vec![token]),
      LP_ADAPTER => Ok(vec![DAI, ETH]),
      WRAP_ADAPTER => Ok(vec![DAI]),
      _ => Err(DispatchError::Other("Unknown adapter")),
    }
  }

  fn deposit(
    adapter: AdapterId,
    token: AssetKind,
    amounts: &[u128],
    _slippage: Permill,
    payer: &u64,
    recipient: &u64,
  ) -> Result<u128, DispatchError> {
    match adapter {
      PLAIN_ADAPTER => {
        Rebalancing::transfer_asset(token, payer, recipient, amounts[0])?;
        Ok(amounts[0])
      }
      WRAP_ADAPTER => {
        Rebalancing::transfer_asset(DAI, payer, &WRAP_RESERVE, amounts[0])?;
        mint(WDAI, *recipient, amounts[0]);
        Ok(amounts[0])
      }
      LP_ADAPTER => {
        let (dai, eth) = (amounts[0], amounts[1]);
        let reserve_dai = balance(DAI, POOL);
        let reserve_eth = balance(ETH, POOL);
        let supply = Assets::total_issuance(asset_id(LP));
        // Proportional join; the excess side stays with the payer
        let (take_dai, take_eth, minted) =
          if U256::from(dai) * U256::from(reserve_eth) <= U256::from(eth) * U256::from(reserve_dai) {
            (dai, mul_div(dai, reserve_eth, reserve_dai), mul_div(dai, supply, reserve_dai))
          } else {
            (mul_div(eth, reserve_dai, reserve_eth), eth, mul_div(eth, supply, reserve_eth))
          };
        if minted == 0 {
          return Err(DispatchError::Other("Deposit too small"));
        }
        Rebalancing::transfer_asset(DAI, payer, &POOL, take_dai)?;
        Rebalancing::transfer_asset(ETH, payer, &POOL, take_eth)?;
        mint(LP, *recipient, minted);
        Ok(minted)
      }
      _ => Err(DispatchError::Other("Unknown adapter")),
    }
  }

  fn redeem(adapter: AdapterId, params: RedeemParams<u64>) -> Result<Vec<u128>, DispatchError> {
    match adapter {
      PLAIN_ADAPTER => {
        Rebalancing::transfer_asset(params.token, &params.owner, &params.to, params.amount)?;
        Ok(vec![params.amount])
      }
      WRAP_ADAPTER => {
        burn(WDAI, &params.owner, params.amount)?;
        Rebalancing::transfer_asset(DAI, &WRAP_RESERVE, &params.to, params.amount)?;
        Ok(vec![params.amount])
      }
      LP_ADAPTER => {
        let supply = Assets::total_issuance(asset_id(LP));
        let out_dai = mul_div(balance(DAI, POOL), params.amount, supply);
        let out_eth = mul_div(balance(ETH, POOL), params.amount, supply);
        burn(LP, &params.owner, params.amount)?;
        Rebalancing::transfer_asset(DAI, &POOL, &params.to, out_dai)?;
        Rebalancing::transfer_asset(ETH, &POOL, &params.to, out_eth)?;
        Ok(vec![out_dai, out_eth])
      }
      _ => Err(DispatchError::Other("Unknown adapter")),
    }
  }

  fn token_balance(_adapter: AdapterId, token: AssetKind, who: &u64) -> u128 {
    balance(token, *who)
  }

  fn token_balance_usd(
    adapter: AdapterId,
    token: AssetKind,
    who: &u64,
  ) -> Result<u128, DispatchError> {
    let amount = balance(token, *who);
    match adapter {
      WRAP_ADAPTER => PriceOracle::token_to_usd(DAI, amount),
      _ => PriceOracle::token_to_usd(token, amount),
    }
  }
}

pub struct MockRegistry;
impl ProtocolRegistry for MockRegistry {
  fn is_paused() -> bool {
    PAUSED.with(|p| *p.borrow())
  }

  fn adapter_of(token: AssetKind) -> Option<AdapterId> {
    match token {
      DAI | ETH | USDC => Some(PLAIN_ADAPTER),
      LP => Some(LP_ADAPTER),
      WDAI => Some(WRAP_ADAPTER),
      _ => None,
    }
  }

  fn is_adapter_enabled(adapter: AdapterId) -> bool {
    !DISABLED_ADAPTERS.with(|d| d.borrow().contains(&adapter))
  }

  fn is_route_provider_enabled(provider: RouteProviderId) -> bool {
    provider == PROVIDER && !DISABLED_PROVIDERS.with(|d| d.borrow().contains(&provider))
  }

  fn is_token_permitted(token: AssetKind) -> bool {
    matches!(token, DAI | ETH | USDC | AssetKind::Native)
  }
}

/// Burns the sell amount and mints the amount encoded in the call data
pub struct MockRouter;
impl RouteProvider<u64> for MockRouter {
  fn execute(_provider: RouteProviderId, who: &u64, leg: &RouteLeg) -> DispatchResult {
    let amount_out = u128::decode(&mut &leg.call_data[..])
      .map_err(|_| DispatchError::Other("Malformed route"))?;
    burn(leg.sell_token, who, leg.sell_amount)?;
    if let Some((token, extra)) = ROUTER_SKIM.with(|s| *s.borrow()) {
      burn(token, who, extra)?;
    }
    if amount_out > 0 {
      mint(leg.buy_token, *who, amount_out);
    }
    Ok(())
  }
}

/// Fills at the oracle price minus the configured haircut
pub struct MockVenue;
impl OnChainVenue<u64> for MockVenue {
  fn swap_exact_in(
    who: &u64,
    asset_in: AssetKind,
    asset_out: AssetKind,
    amount_in: u128,
    min_amount_out: u128,
  ) -> Result<u128, DispatchError> {
    let quote = PriceOracle::convert(asset_in, asset_out, amount_in)?;
    let amount_out = quote - VENUE_HAIRCUT.with(|h| *h.borrow()).mul_floor(quote);
    if amount_out < min_amount_out {
      return Err(DispatchError::Other("Venue slippage"));
    }
    burn(asset_in, who, amount_in)?;
    mint(asset_out, *who, amount_out);
    Ok(amount_out)
  }
}

impl pallet_rebalancing::Config for Test {
  type PalletId = RebalancingPalletId;
  type Assets = Assets;
  type NativeCurrency = Balances;
  type Ledger = MockFund;
  type Adapters = MockAdapters;
  type Registry = MockRegistry;
  type Router = MockRouter;
  type Venue = MockVenue;
  type Prices = PriceOracle;
  type TimeProvider = MockTime;
  type RedeemCooldown = ConstU64<{ params::REDEEM_COOLDOWN_SECS }>;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = RebalancingBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct RebalancingBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl pallet_rebalancing::BenchmarkHelper<u64> for RebalancingBenchmarkHelper {
  fn fund() -> (FundId, u64) {
    (FUND, MANAGER)
  }

  fn fund_account(who: &u64, asset: AssetKind, amount: u128) -> DispatchResult {
    let id = asset_id(asset);
    if !<Assets as Inspect<u64>>::asset_exists(id) {
      Assets::force_create(RuntimeOrigin::root(), id, 1, true, 1)?;
    }
    <Assets as Mutate<u64>>::mint_into(id, who, amount)?;
    Ok(())
  }
}

impl pallet_offchain_settlement::Config for Test {
  type SettlementPalletId = SettlementPalletId;
  type BuyValueTolerance = BuyValueTolerance;
  type DefaultVenueSlippage = DefaultVenueSlippage;
  type MaxWithdrawalTokens = ConstU32<8>;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = SettlementBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct SettlementBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl crate::types::BenchmarkHelper for SettlementBenchmarkHelper {
  fn payout_token() -> AssetKind {
    USDC
  }

  fn route(amount_out: u128) -> (RouteProviderId, Vec<u8>) {
    (PROVIDER, route(amount_out))
  }
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  set_now(GENESIS_TIME);
  ROUNDS.with(|r| r.borrow_mut().clear());
  set_paused(false);
  set_fund_paused(false);
  DISABLED_ADAPTERS.with(|d| d.borrow_mut().clear());
  DISABLED_PROVIDERS.with(|d| d.borrow_mut().clear());
  set_venue_haircut(Permill::zero());
  set_router_skim(None);
  set_min_investment(0);

  let mut t = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  let assets = [DAI, ETH, USDC, USDT, LP, WDAI]
    .into_iter()
    .map(asset_id)
    .chain([SHARES_ID])
    .map(|id| (id, 1, true, 1))
    .collect();
  polkadot_sdk::pallet_assets::GenesisConfig::<Test> {
    assets,
    metadata: alloc::vec![],
    accounts: alloc::vec![],
    reserves: alloc::vec![],
    next_asset_id: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  pallet_price_oracle::GenesisConfig::<Test> {
    feeds: alloc::vec![(DAI, USD, 1), (ETH, USD, 2), (USDC, USD, 3)],
    ..Default::default()
  }
  .assimilate_storage(&mut t)
  .unwrap();

  let mut ext = polkadot_sdk::sp_io::TestExternalities::new(t);
  ext.execute_with(|| {
    System::set_block_number(1);
    publish_prices();
  });
  ext
}
