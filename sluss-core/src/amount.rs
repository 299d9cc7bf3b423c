//! Token amounts.
//!
//! Scenario files write large amounts with `_` digit-group separators
//! (`1_000_000_000_000_000_000`). YAML 1.2 treats those as strings, so the
//! serde helpers here accept either a plain integer or an underscored
//! string and strip the separators.

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// Unsigned token amount. `u128` keeps 18-decimal token sums comfortably
/// in range.
pub type Amount = u128;

/// Parse an amount literal, stripping `_` digit-group separators.
pub fn parse_amount(value: &str) -> Result<Amount, String> {
    let cleaned: String = value.chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() || cleaned.len() != value.chars().filter(|c| c.is_ascii_digit()).count() {
        return Err(format!("invalid amount literal '{value}'"));
    }
    cleaned
        .parse::<Amount>()
        .map_err(|e| format!("invalid amount literal '{value}': {e}"))
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("an unsigned integer, optionally with '_' separators")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Amount, E> {
        Ok(Amount::from(value))
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> Result<Amount, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Amount, E> {
        Amount::try_from(value).map_err(|_| E::custom("amount cannot be negative"))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Amount, E> {
        parse_amount(value).map_err(E::custom)
    }
}

/// `#[serde(deserialize_with = "amount::deserialize")]`
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

/// `#[serde(deserialize_with = "amount::deserialize_opt")]`
pub fn deserialize_opt<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Amount>, D::Error> {
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize")] Amount);

    Option::<Wrapper>::deserialize(deserializer).map(|opt| opt.map(|w| w.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_digits() {
        assert_eq!(parse_amount("0"), Ok(0));
        assert_eq!(parse_amount("1000000000000000000"), Ok(10u128.pow(18)));
    }

    #[test]
    fn strips_digit_group_separators() {
        assert_eq!(parse_amount("1_000_000_000_000_000_000"), Ok(10u128.pow(18)));
        assert_eq!(parse_amount("5_00"), Ok(500));
    }

    #[test]
    fn rejects_non_numeric_literals() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("___").is_err());
        assert!(parse_amount("1_000x").is_err());
        assert!(parse_amount("-5").is_err());
    }

    #[test]
    fn deserializes_from_yaml_int_and_string() {
        #[derive(serde::Deserialize)]
        struct Doc {
            #[serde(deserialize_with = "deserialize")]
            amount: Amount,
        }

        let doc: Doc = serde_yaml::from_str("amount: 42").unwrap();
        assert_eq!(doc.amount, 42);
        let doc: Doc = serde_yaml::from_str("amount: 1_000_000").unwrap();
        assert_eq!(doc.amount, 1_000_000);
    }
}
