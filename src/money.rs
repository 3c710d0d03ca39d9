/// Coin amounts as fixed-point sats
use crate::error::{ShopError, ShopResult};

/// 1 coin = 100_000_000 sats
pub const SATS_PER_COIN: i64 = 100_000_000;

const FRACTION_DIGITS: usize = 8;

/// Parse a coin amount such as `"2.5"` into sats.
///
/// Digits past the eighth decimal place are truncated.
pub fn parse_coins(input: &str) -> ShopResult<i64> {
    let invalid = || ShopError::Validation(format!("Invalid coin amount: {}", input.trim()));

    let raw = input.trim();
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_sats = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<i64>()
            .ok()
            .and_then(|coins| coins.checked_mul(SATS_PER_COIN))
            .ok_or_else(invalid)?
    };

    let mut digits: String = fraction.chars().take(FRACTION_DIGITS).collect();
    while digits.len() < FRACTION_DIGITS {
        digits.push('0');
    }
    let fraction_sats: i64 = digits.parse().map_err(|_| invalid())?;

    whole_sats.checked_add(fraction_sats).ok_or_else(invalid)
}

/// Render sats with all eight decimals, e.g. `2.50000000`
pub fn format_sats(sats: i64) -> String {
    let sign = if sats < 0 { "-" } else { "" };
    let abs = sats.unsigned_abs();
    let per_coin = SATS_PER_COIN as u64;
    format!("{}{}.{:08}", sign, abs / per_coin, abs % per_coin)
}

/// Coin value sent to the ledger
pub fn sats_to_coins(sats: i64) -> f64 {
    sats as f64 / SATS_PER_COIN as f64
}
