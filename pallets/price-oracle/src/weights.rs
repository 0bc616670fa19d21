#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use polkadot_sdk::frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

pub trait WeightInfo {
	fn add_feed(n: u32) -> Weight;
	fn update_expiration_threshold() -> Weight;
	fn update_sequencer_threshold() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn add_feed(n: u32) -> Weight {
		Weight::from_parts(12_000_000, 1500)
			.saturating_add(Weight::from_parts(8_000_000, 2600).saturating_mul(n.into()))
			.saturating_add(T::DbWeight::get().reads((n as u64).into()))
			.saturating_add(T::DbWeight::get().writes((n as u64).into()))
	}
	fn update_expiration_threshold() -> Weight {
		Weight::from_parts(9_000_000, 1500)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
	fn update_sequencer_threshold() -> Weight {
		Weight::from_parts(9_000_000, 1500)
			.saturating_add(T::DbWeight::get().reads(1))
			.saturating_add(T::DbWeight::get().writes(1))
	}
}

impl WeightInfo for () {
	fn add_feed(n: u32) -> Weight {
		Weight::from_parts(12_000_000, 1500)
			.saturating_add(Weight::from_parts(8_000_000, 2600).saturating_mul(n.into()))
			.saturating_add(RocksDbWeight::get().reads((n as u64).into()))
			.saturating_add(RocksDbWeight::get().writes((n as u64).into()))
	}
	fn update_expiration_threshold() -> Weight {
		Weight::from_parts(9_000_000, 1500)
	}
	fn update_sequencer_threshold() -> Weight {
		Weight::from_parts(9_000_000, 1500)
	}
}
