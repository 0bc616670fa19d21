extern crate alloc;

use crate::*;
use alloc::{vec, vec::Vec};
use frame::deps::frame_benchmarking::v2::*;
use frame::deps::frame_system::RawOrigin;
use frame::deps::sp_runtime::Permill;
use pallet_rebalancing::BenchmarkHelper as FundBenchmarkHelper;
use primitives::{AssetKind, TYPE_STD};

const UNIT: Balance = 1_000_000_000_000_000_000;

type FundHelper<T> = <T as pallet_rebalancing::Config>::BenchmarkHelper;
type RouteHelper<T> = <T as Config>::BenchmarkHelper;

/// Fund holding `n` plain positions with `caller` owning 1000 shares of it
fn invested_fund<T: Config>(caller: &T::AccountId, n: u32) -> FundId {
  let (fund, _) = FundHelper::<T>::fund();
  let vault = Rebalancing::<T>::vault_of(fund).expect("benchmark fund must have a vault");
  for i in 0..n {
    let token = AssetKind::Local(TYPE_STD | (3_000 + i));
    FundHelper::<T>::fund_account(&vault, token, 1_000 * UNIT).expect("Failed to fund vault");
    Rebalancing::<T>::ensure_held(fund, token).expect("Failed to hold position");
  }
  T::Ledger::mint_shares(fund, caller, 1_000 * UNIT).expect("Failed to issue shares");
  fund
}

fn slippage<T: Config>(fund: FundId) -> Vec<Permill> {
  vec![Permill::from_percent(1); T::Ledger::held_tokens(fund).len()]
}

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn redeem_tokens(n: Linear<1, 8>) {
    let caller: T::AccountId = whitelisted_caller();
    let fund = invested_fund::<T>(&caller, n);
    let slippage = slippage::<T>(fund);
    let payout = RouteHelper::<T>::payout_token();

    #[extrinsic_call]
    redeem_tokens(RawOrigin::Signed(caller.clone()), fund, 1_000 * UNIT, slippage, payout);

    assert!(WithdrawalRecords::<T>::contains_key(fund, &caller));
  }

  #[benchmark]
  fn withdraw_off_chain(n: Linear<1, 8>) {
    let caller: T::AccountId = whitelisted_caller();
    let fund = invested_fund::<T>(&caller, n);
    Pallet::<T>::redeem_tokens(
      RawOrigin::Signed(caller.clone()).into(),
      fund,
      1_000 * UNIT,
      slippage::<T>(fund),
      RouteHelper::<T>::payout_token(),
    )
    .expect("Failed to redeem shares");
    let outstanding = WithdrawalRecords::<T>::get(fund, &caller)
      .expect("redemption must leave a record")
      .outstanding();
    let (provider, route) = RouteHelper::<T>::route(UNIT);
    let sell_tokens: Vec<AssetKind> = outstanding.iter().map(|(token, _)| *token).collect();
    let sell_amounts: Vec<Balance> = outstanding.iter().map(|(_, amount)| *amount).collect();
    let call_data = vec![route; outstanding.len()];

    #[extrinsic_call]
    withdraw_off_chain(
      RawOrigin::Signed(caller.clone()),
      fund,
      sell_tokens,
      sell_amounts,
      call_data,
      provider,
    );

    assert!(!WithdrawalRecords::<T>::contains_key(fund, &caller));
  }

  impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
