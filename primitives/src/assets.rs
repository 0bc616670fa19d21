use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

/// Single source of truth for asset identity across the oracle, rebalancing and
/// settlement pallets.
///
/// - `Native`: The system's native token (managed by pallet-balances).
/// - `Local(u32)`: Local assets (managed by pallet-assets), classified by bitmask.
/// - `Foreign(u32)`: Assets bridged in from other consensus systems.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum AssetKind {
  /// Native token managed by pallet-balances
  #[default]
  Native,
  /// Local asset managed by pallet-assets
  Local(u32),
  /// Foreign asset managed by pallet-assets via XCM mapping (0xF... namespace)
  Foreign(u32),
}

impl From<u32> for AssetKind {
  fn from(asset_id: u32) -> Self {
    AssetKind::Local(asset_id)
  }
}

// Bitmask Architecture for Asset Classification
//
// 32-bit ID Structure:
// [ 4 bits: Type ] [ 28 bits: Index/ID ]
//
// Types:
// 0x1... -> Standard Tokens (DOT, ETH, etc.)
// 0x2... -> Stablecoins (USDT, USDC, etc.)
// 0x3... -> Yield-bearing wrappers (vDOT, aUSDC, etc.)
// 0x4... -> LP Tokens
// 0x5... -> Price denominations (USD). Never held, only quoted against.
// 0xF... -> Foreign/XCM Assets

pub const MASK_TYPE: u32 = 0xF000_0000;
pub const MASK_INDEX: u32 = 0x0FFF_FFFF;

pub const TYPE_STD: u32 = 0x1000_0000;
pub const TYPE_STABLE: u32 = 0x2000_0000;
pub const TYPE_VTOKEN: u32 = 0x3000_0000;
pub const TYPE_LP: u32 = 0x4000_0000;
pub const TYPE_DENOMINATION: u32 = 0x5000_0000;
pub const TYPE_FOREIGN: u32 = 0xF000_0000;

/// Helper trait to inspect AssetKind properties
pub trait AssetInspector {
  fn is_native(&self) -> bool;
}

impl AssetInspector for AssetKind {
  fn is_native(&self) -> bool {
    matches!(self, AssetKind::Native)
  }
}

/// Helper to construct compile-time IDs
const fn make_id(type_mask: u32, index: u32) -> u32 {
  type_mask | (index & MASK_INDEX)
}

/// Well-known asset constants serving as system defaults
pub mod well_known {
  use super::*;

  // Standard Tokens (0x1...)
  pub const ETH: u32 = make_id(TYPE_STD, 3);
  pub const BTC: u32 = make_id(TYPE_STD, 4);

  // Stablecoins (0x2...)
  pub const USDT: u32 = make_id(TYPE_STABLE, 1);
  pub const USDC: u32 = make_id(TYPE_STABLE, 2);
  pub const DAI: u32 = make_id(TYPE_STABLE, 3);

  // Denominations (0x5...). Index is the ISO 4217 numeric code.
  pub const USD: u32 = make_id(TYPE_DENOMINATION, 840);
}

/// Metadata container for currencies
#[derive(Encode, Decode, DecodeWithMemTracking, Eq, PartialEq, Clone, Debug, TypeInfo)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct CurrencyMetadata {
  pub name: Vec<u8>,
  pub symbol: Vec<u8>,
  pub decimals: u8,
}

/// Helper to resolve metadata for well-known assets (off-chain / view logic)
pub fn get_well_known_metadata(asset: AssetKind) -> Option<CurrencyMetadata> {
  let (name, symbol, decimals): (&[u8], &[u8], u8) = match asset {
    AssetKind::Native => (b"Native Token", b"NATIVE", 12),
    AssetKind::Local(id) => match id {
      well_known::ETH => (b"Ethereum", b"ETH", 18),
      well_known::BTC => (b"Bitcoin", b"BTC", 8),
      well_known::USDT => (b"Tether USD", b"USDT", 6),
      well_known::USDC => (b"USD Coin", b"USDC", 6),
      well_known::DAI => (b"Dai Stablecoin", b"DAI", 18),
      well_known::USD => (b"US Dollar", b"USD", 18),
      _ => return None,
    },
    AssetKind::Foreign(_) => return None,
  };
  Some(CurrencyMetadata {
    name: name.to_vec(),
    symbol: symbol.to_vec(),
    decimals,
  })
}
