#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use polkadot_sdk::frame_support::{traits::Get, weights::{Weight, constants::RocksDbWeight}};
use core::marker::PhantomData;

pub trait WeightInfo {
	fn invest_in_fund_off_chain(n: u32) -> Weight;
	fn redeem_tokens(n: u32) -> Weight;
	fn withdraw_off_chain(n: u32) -> Weight;
	fn trigger_multiple_token_withdrawal(n: u32) -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config> WeightInfo for SubstrateWeight<T> {
	fn invest_in_fund_off_chain(n: u32) -> Weight {
		Weight::from_parts(120_000_000, 12392)
			.saturating_add(Weight::from_parts(75_000_000, 6196).saturating_mul(n.into()))
			.saturating_add(T::DbWeight::get().reads(10))
			.saturating_add(T::DbWeight::get().reads((6_u64).saturating_mul(n.into())))
			.saturating_add(T::DbWeight::get().writes(6))
			.saturating_add(T::DbWeight::get().writes((5_u64).saturating_mul(n.into())))
	}
	fn redeem_tokens(n: u32) -> Weight {
		Weight::from_parts(60_000_000, 6196)
			.saturating_add(Weight::from_parts(55_000_000, 6196).saturating_mul(n.into()))
			.saturating_add(T::DbWeight::get().reads(6))
			.saturating_add(T::DbWeight::get().reads((5_u64).saturating_mul(n.into())))
			.saturating_add(T::DbWeight::get().writes(3))
			.saturating_add(T::DbWeight::get().writes((4_u64).saturating_mul(n.into())))
	}
	fn withdraw_off_chain(n: u32) -> Weight {
		Weight::from_parts(50_000_000, 6196)
			.saturating_add(Weight::from_parts(60_000_000, 6196).saturating_mul(n.into()))
			.saturating_add(T::DbWeight::get().reads(4))
			.saturating_add(T::DbWeight::get().reads((4_u64).saturating_mul(n.into())))
			.saturating_add(T::DbWeight::get().writes(3))
			.saturating_add(T::DbWeight::get().writes((4_u64).saturating_mul(n.into())))
	}
	fn trigger_multiple_token_withdrawal(n: u32) -> Weight {
		Weight::from_parts(50_000_000, 6196)
			.saturating_add(Weight::from_parts(90_000_000, 12392).saturating_mul(n.into()))
			.saturating_add(T::DbWeight::get().reads(4))
			.saturating_add(T::DbWeight::get().reads((8_u64).saturating_mul(n.into())))
			.saturating_add(T::DbWeight::get().writes(3))
			.saturating_add(T::DbWeight::get().writes((6_u64).saturating_mul(n.into())))
	}
}

impl WeightInfo for () {
	fn invest_in_fund_off_chain(n: u32) -> Weight {
		Weight::from_parts(120_000_000, 12392)
			.saturating_add(Weight::from_parts(75_000_000, 6196).saturating_mul(n.into()))
	}
	fn redeem_tokens(n: u32) -> Weight {
		Weight::from_parts(60_000_000, 6196)
			.saturating_add(Weight::from_parts(55_000_000, 6196).saturating_mul(n.into()))
	}
	fn withdraw_off_chain(n: u32) -> Weight {
		Weight::from_parts(50_000_000, 6196)
			.saturating_add(Weight::from_parts(60_000_000, 6196).saturating_mul(n.into()))
	}
	fn trigger_multiple_token_withdrawal(n: u32) -> Weight {
		Weight::from_parts(50_000_000, 6196)
			.saturating_add(Weight::from_parts(90_000_000, 12392).saturating_mul(n.into()))
			.saturating_add(RocksDbWeight::get().reads(4))
	}
}
