extern crate alloc;

use crate::*;
use alloc::vec::Vec;
use frame::deps::frame_benchmarking::v2::*;
use frame::deps::frame_support::traits::EnsureOrigin;
use primitives::{AssetKind, TYPE_STD};

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn add_feed(n: Linear<1, 32>) {
    let bases: Vec<AssetKind> = (0..n).map(|i| AssetKind::Local(TYPE_STD | (1_000 + i))).collect();
    let quotes: Vec<AssetKind> = (0..n).map(|_| T::UsdAsset::get()).collect();
    let sources: Vec<FeedSourceId> = (0..n).collect();
    let origin =
      T::AdminOrigin::try_successful_origin().expect("AdminOrigin must have a successful origin");

    #[extrinsic_call]
    add_feed(origin as T::RuntimeOrigin, bases.clone(), quotes, sources);

    assert!(Feeds::<T>::contains_key(bases[0], T::UsdAsset::get()));
  }

  #[benchmark]
  fn update_expiration_threshold() {
    let origin =
      T::AdminOrigin::try_successful_origin().expect("AdminOrigin must have a successful origin");

    #[extrinsic_call]
    update_expiration_threshold(origin as T::RuntimeOrigin, 3_600);

    assert_eq!(ExpirationThreshold::<T>::get(), 3_600);
  }

  #[benchmark]
  fn update_sequencer_threshold() {
    let origin =
      T::AdminOrigin::try_successful_origin().expect("AdminOrigin must have a successful origin");

    #[extrinsic_call]
    update_sequencer_threshold(origin as T::RuntimeOrigin, 600);

    assert_eq!(SequencerGracePeriod::<T>::get(), 600);
  }

  impl_benchmark_test_suite!(Pallet, crate::mock::new_test_ext(), crate::mock::Test);
}
