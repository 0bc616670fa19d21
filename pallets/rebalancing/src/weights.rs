#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use polkadot_sdk::frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

pub trait WeightInfo {
	fn redeem() -> Weight;
	fn revert_redeem() -> Weight;
	fn revert_sell_by_user() -> Weight;
	fn meta_aggregator_swap(n: u32) -> Weight;
	fn direct_swap(n: u32) -> Weight;
	fn swap_primary_token() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn redeem() -> Weight {
		Weight::from_parts(45_000_000, 6196)
			.saturating_add(T::DbWeight::get().reads(5))
			.saturating_add(T::DbWeight::get().writes(3))
	}
	fn revert_redeem() -> Weight {
		Weight::from_parts(40_000_000, 6196)
			.saturating_add(T::DbWeight::get().reads(4))
			.saturating_add(T::DbWeight::get().writes(3))
	}
	fn revert_sell_by_user() -> Weight {
		Weight::from_parts(40_000_000, 6196)
			.saturating_add(T::DbWeight::get().reads(4))
			.saturating_add(T::DbWeight::get().writes(3))
	}
	fn meta_aggregator_swap(n: u32) -> Weight {
		Weight::from_parts(150_000_000, 12392)
			.saturating_add(Weight::from_parts(60_000_000, 6196).saturating_mul(n.into()))
			.saturating_add(T::DbWeight::get().reads(12))
			.saturating_add(T::DbWeight::get().reads((4_u64).saturating_mul(n.into())))
			.saturating_add(T::DbWeight::get().writes(10))
			.saturating_add(T::DbWeight::get().writes((4_u64).saturating_mul(n.into())))
	}
	fn direct_swap(n: u32) -> Weight {
		Weight::from_parts(30_000_000, 6196)
			.saturating_add(Weight::from_parts(110_000_000, 12392).saturating_mul(n.into()))
			.saturating_add(T::DbWeight::get().reads(4))
			.saturating_add(T::DbWeight::get().reads((10_u64).saturating_mul(n.into())))
			.saturating_add(T::DbWeight::get().writes((8_u64).saturating_mul(n.into())))
	}
	fn swap_primary_token() -> Weight {
		Weight::from_parts(160_000_000, 12392)
			.saturating_add(T::DbWeight::get().reads(14))
			.saturating_add(T::DbWeight::get().writes(10))
	}
}

impl WeightInfo for () {
	fn redeem() -> Weight {
		Weight::from_parts(45_000_000, 6196)
			.saturating_add(RocksDbWeight::get().reads(5))
			.saturating_add(RocksDbWeight::get().writes(3))
	}
	fn revert_redeem() -> Weight {
		Weight::from_parts(40_000_000, 6196)
	}
	fn revert_sell_by_user() -> Weight {
		Weight::from_parts(40_000_000, 6196)
	}
	fn meta_aggregator_swap(n: u32) -> Weight {
		Weight::from_parts(150_000_000, 12392)
			.saturating_add(Weight::from_parts(60_000_000, 6196).saturating_mul(n.into()))
	}
	fn direct_swap(n: u32) -> Weight {
		Weight::from_parts(30_000_000, 6196)
			.saturating_add(Weight::from_parts(110_000_000, 12392).saturating_mul(n.into()))
	}
	fn swap_primary_token() -> Weight {
		Weight::from_parts(160_000_000, 12392)
	}
}
