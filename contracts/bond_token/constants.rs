pub const TOKEN_NAME: &str = "Bond";
pub const TOKEN_SYMBOL: &str = "BND";

pub const DECIMALS: u8 = 18;
/// One whole token in smallest units (10^DECIMALS).
pub const UNIT: u128 = 1_000_000_000_000_000_000;
pub const MAX_SUPPLY: u128 = 1_000_000 * UNIT;

// currency side (native chain balance)
pub const CURRENCY_UNIT: u128 = 1_000_000_000_000_000_000;
pub const SALE_PRICE: u128 = CURRENCY_UNIT;
pub const SALE_TOKENS: u128 = 100;

/// Buy-back pays per full lot only; remainders are paid nothing.
pub const BUYBACK_LOT_TOKENS: u128 = 1000;
pub const BUYBACK_LOT_PAYOUT: u128 = CURRENCY_UNIT / 2;
