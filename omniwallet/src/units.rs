//! Amount, quantity and network-id conversions.

use alloy::primitives::U256;
use alloy::primitives::utils::{Unit, parse_units};
use serde_json::Value;

use crate::error::{Result, WalletError};

/// Smallest-unit exponent of EVM native currencies.
pub const EVM_DECIMALS: u8 = 18;

/// Smallest-unit exponent of Bitcoin (satoshis).
pub const BTC_DECIMALS: u8 = 8;

/// Smallest-unit exponent of TRX (sun).
pub const TRX_DECIMALS: u8 = 6;

/// Decimals of a named unit (`wei`, `gwei`, `ether`, or a digit count).
///
/// # Errors
///
/// Returns [`WalletError::Units`] for an unknown unit name.
pub fn unit_decimals(unit: &str) -> Result<u8> {
    unit.parse::<Unit>()
        .map(Unit::get)
        .map_err(|e| WalletError::Units(format!("unknown unit '{unit}': {e}")))
}

/// Render an integer amount of smallest units as a decimal string with
/// trailing zeros removed (`10^16` at 18 decimals is `0.01`).
#[must_use]
pub fn format_trimmed(amount: U256, decimals: u8) -> String {
    let (int, frac) = split_decimal(amount, decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int
    } else {
        format!("{int}.{frac}")
    }
}

/// Render an integer amount of smallest units with exactly
/// `fraction_digits` digits after the point, rounding half up.
#[must_use]
pub fn format_fixed(amount: U256, decimals: u8, fraction_digits: u8) -> String {
    let amount = if fraction_digits < decimals {
        let step = U256::from(10u8).pow(U256::from(decimals - fraction_digits));
        let half = step / U256::from(2u8);
        (amount.saturating_add(half) / step) * step
    } else {
        amount
    };
    let (int, mut frac) = split_decimal(amount, decimals);
    frac.truncate(usize::from(fraction_digits));
    while frac.len() < usize::from(fraction_digits) {
        frac.push('0');
    }
    if frac.is_empty() {
        int
    } else {
        format!("{int}.{frac}")
    }
}

fn split_decimal(amount: U256, decimals: u8) -> (String, String) {
    let digits = amount.to_string();
    let decimals = usize::from(decimals);
    if decimals == 0 {
        return (digits, String::new());
    }
    if digits.len() > decimals {
        let (int, frac) = digits.split_at(digits.len() - decimals);
        (int.to_string(), frac.to_string())
    } else {
        ("0".to_string(), format!("{digits:0>decimals$}"))
    }
}

/// Convert a display amount in `unit` to smallest units.
///
/// # Errors
///
/// Returns [`WalletError::Units`] for an unknown unit, a malformed amount,
/// or more fraction digits than the unit has.
pub fn to_smallest_unit(amount: &str, unit: &str) -> Result<U256> {
    parse_units(amount, unit)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| WalletError::Units(format!("cannot parse '{amount}' as {unit}: {e}")))
}

/// Parse a JSON-RPC quantity: a `0x` hex string, a decimal string or a number.
///
/// # Errors
///
/// Returns [`WalletError::InvalidResponse`] for any other JSON type, bad
/// digits, or a negative or fractional number.
pub fn parse_quantity(value: &Value) -> Result<U256> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                if hex.is_empty() {
                    Ok(U256::ZERO)
                } else {
                    U256::from_str_radix(hex, 16)
                }
            } else {
                U256::from_str_radix(s, 10)
            };
            parsed.map_err(|e| WalletError::invalid_response(format!("bad quantity '{s}': {e}")))
        }
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| WalletError::invalid_response(format!("bad quantity {n}"))),
        other => Err(WalletError::invalid_response(format!(
            "expected quantity, got {other}"
        ))),
    }
}

/// Parse a quantity that must fit in a `u64`.
///
/// # Errors
///
/// Same as [`parse_quantity`], plus [`WalletError::InvalidResponse`] when the
/// value does not fit.
pub fn parse_u64_quantity(value: &Value) -> Result<u64> {
    let quantity = parse_quantity(value)?;
    u64::try_from(quantity)
        .map_err(|_| WalletError::invalid_response(format!("quantity {quantity} overflows u64")))
}

/// Canonical string form of a chain or network identifier.
///
/// Numbers become `0x`-prefixed lowercase hex; strings are kept as given.
#[must_use]
pub fn canonical_network(chain: &Value) -> Option<String> {
    match chain {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => n.as_u64().map(|id| format!("{id:#x}")),
        _ => None,
    }
}
