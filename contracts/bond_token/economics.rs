use crate::constants::{BUYBACK_LOT_PAYOUT, BUYBACK_LOT_TOKENS, SALE_TOKENS, UNIT};

/// Whole tokens -> smallest units. `None` on overflow.
pub fn to_units(token_count: u128) -> Option<u128> {
    token_count.checked_mul(UNIT)
}

/// Tokens handed out per `buy()`, in smallest units.
pub const fn sale_amount() -> u128 {
    SALE_TOKENS * UNIT
}

/// Currency paid for selling `token_count` whole tokens back.
///
/// Floor-divides by the lot size, so anything under one lot pays zero.
pub fn buyback_payout(token_count: u128) -> Option<u128> {
    (token_count / BUYBACK_LOT_TOKENS).checked_mul(BUYBACK_LOT_PAYOUT)
}
