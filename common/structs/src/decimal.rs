use multiversx_sc::api::ManagedTypeApi;
use multiversx_sc::types::{BigUint, ManagedDecimal, NumDecimals};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecimalParseError {
    #[error("`{0}` is not an unsigned decimal number")]
    Malformed(String),
    #[error("`{text}` carries more than {decimals} fractional digits")]
    TooPrecise { text: String, decimals: NumDecimals },
}

/// Parses `"1000.5"` into raw units at `decimals`, without going through floats.
pub fn parse_decimal<M: ManagedTypeApi>(
    text: &str,
    decimals: NumDecimals,
) -> Result<ManagedDecimal<M, NumDecimals>, DecimalParseError> {
    let trimmed = text.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    let is_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
        return Err(DecimalParseError::Malformed(text.to_string()));
    }
    if fraction.len() > decimals {
        return Err(DecimalParseError::TooPrecise {
            text: text.to_string(),
            decimals,
        });
    }

    let ten = BigUint::<M>::from(10u64);
    let padding = core::iter::repeat(b'0').take(decimals - fraction.len());
    let mut raw = BigUint::<M>::zero();
    for digit in whole.bytes().chain(fraction.bytes()).chain(padding) {
        raw = &raw * &ten + BigUint::from(u64::from(digit - b'0'));
    }

    Ok(ManagedDecimal::from_raw_units(raw, decimals))
}

/// Base-10 digits of a raw integer.
pub fn raw_digits<M: ManagedTypeApi>(value: &BigUint<M>) -> String {
    let buffer = value.to_display();
    String::from_utf8_lossy(buffer.to_boxed_bytes().as_slice()).into_owned()
}

/// Human form of a decimal, keeping every fractional digit of its scale.
pub fn format_decimal<M: ManagedTypeApi>(value: &ManagedDecimal<M, NumDecimals>) -> String {
    let digits = raw_digits(value.into_raw_units());
    let scale = value.scale();
    if scale == 0 {
        return digits;
    }

    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - scale);
    format!("{whole}.{fraction}")
}
