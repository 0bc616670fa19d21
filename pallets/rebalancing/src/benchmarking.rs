use crate::{types::BenchmarkHelper, *};
use frame::deps::frame_benchmarking::v2::*;
use frame::deps::frame_system::RawOrigin;
use frame::deps::sp_runtime::Permill;
use primitives::{AssetKind, TYPE_STD};

const UNIT: Balance = 1_000_000_000_000_000_000;

/// Fund whose vault holds 1000 units of a plain position
fn held_position<T: Config>() -> (FundId, T::AccountId, AssetKind) {
  let (fund, manager) = T::BenchmarkHelper::fund();
  let token = AssetKind::Local(TYPE_STD | 2_000);
  let vault = Pallet::<T>::vault_of(fund).expect("benchmark fund must have a vault");
  T::BenchmarkHelper::fund_account(&vault, token, 1_000 * UNIT).expect("Failed to fund vault");
  Pallet::<T>::ensure_held(fund, token).expect("Failed to hold position");
  (fund, manager, token)
}

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn redeem() {
    let (fund, manager, token) = held_position::<T>();

    #[extrinsic_call]
    redeem(
      RawOrigin::Signed(manager),
      fund,
      400 * UNIT,
      Permill::from_percent(1),
      token,
    );

    assert!(RedemptionState::<T>::get(fund).pending().is_some());
  }

  #[benchmark]
  fn revert_redeem() {
    let (fund, manager, token) = held_position::<T>();
    Pallet::<T>::redeem(
      RawOrigin::Signed(manager.clone()).into(),
      fund,
      400 * UNIT,
      Permill::from_percent(1),
      token,
    )
    .expect("Failed to escrow position");

    #[extrinsic_call]
    revert_redeem(RawOrigin::Signed(manager), fund);

    assert!(RedemptionState::<T>::get(fund).pending().is_none());
    let vault = Pallet::<T>::vault_of(fund).expect("benchmark fund must have a vault");
    assert_eq!(Pallet::<T>::balance_of(token, &vault), 1_000 * UNIT);
  }

  impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
