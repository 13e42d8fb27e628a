//! Money value objects: supported currencies and strictly positive amounts.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Exclusive upper bound for any stored amount (`NUMERIC(14, 2)`).
pub const MAX_CHARGE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// ISO-4217 currencies the platform accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    #[default]
    Usd,
    Ugx,
    Kes,
    Ngn,
    Zar,
    Ghs,
}

impl Currency {
    /// Every supported currency, in display order.
    pub const ALL: [Currency; 6] = [
        Currency::Usd,
        Currency::Ugx,
        Currency::Kes,
        Currency::Ngn,
        Currency::Zar,
        Currency::Ghs,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ugx => "UGX",
            Currency::Kes => "KES",
            Currency::Ngn => "NGN",
            Currency::Zar => "ZAR",
            Currency::Ghs => "GHS",
        }
    }

    /// Number of decimal places in the smallest unit providers charge in.
    ///
    /// UGX has no minor unit.
    pub fn minor_unit_exponent(&self) -> u32 {
        match self {
            Currency::Ugx => 0,
            _ => 2,
        }
    }

    /// Converts a decimal amount into provider minor units (cents for USD).
    ///
    /// Rounds half away from zero at the currency's precision.
    pub fn to_minor_units(&self, amount: Decimal) -> Option<i64> {
        let scale = Decimal::from(10_i64.pow(self.minor_unit_exponent()));
        let minor = amount
            .checked_mul(scale)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        i64::try_from(minor).ok()
    }

    /// Checks that `amount` is chargeable in this currency: no finer than
    /// the minor unit and below [`MAX_CHARGE`].
    pub fn check_charge(&self, field: &str, amount: Decimal) -> Result<(), ValidationError> {
        let exponent = self.minor_unit_exponent();
        if amount.normalize().scale() > exponent {
            return Err(ValidationError::invalid_format(
                field,
                format!(
                    "{} allows at most {} decimal places",
                    self.code(),
                    exponent
                ),
            ));
        }
        if amount >= MAX_CHARGE {
            return Err(ValidationError::invalid_format(
                field,
                format!("must be less than {}", MAX_CHARGE),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| {
                ValidationError::invalid_format(
                    "currency",
                    format!("unsupported currency '{}'", s),
                )
            })
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code().to_string()
    }
}

/// A strictly positive monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value <= Decimal::ZERO {
            return Err(ValidationError::not_positive("amount"));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Amount::new(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("ugx".parse::<Currency>().unwrap(), Currency::Ugx);
        assert_eq!(" Kes ".parse::<Currency>().unwrap(), Currency::Kes);
    }

    #[test]
    fn currency_outside_allow_list_is_rejected() {
        assert!("EUR".parse::<Currency>().is_err());
        assert!("".parse::<Currency>().is_err());
    }

    #[test]
    fn currency_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Currency::Ngn).unwrap(), "\"NGN\"");
        let c: Currency = serde_json::from_str("\"zar\"").unwrap();
        assert_eq!(c, Currency::Zar);
    }

    #[test]
    fn minor_units_respect_currency_precision() {
        assert_eq!(Currency::Usd.to_minor_units(dec!(9.99)), Some(999));
        assert_eq!(Currency::Usd.to_minor_units(dec!(0.005)), Some(1));
        assert_eq!(Currency::Ugx.to_minor_units(dec!(5000)), Some(5000));
    }

    #[test]
    fn minor_units_overflow_is_none_not_a_panic() {
        assert_eq!(Currency::Usd.to_minor_units(Decimal::MAX), None);
        assert_eq!(Currency::Usd.to_minor_units(dec!(100000000000000000)), None);
    }

    #[test]
    fn max_charge_is_twelve_integer_digits() {
        assert_eq!(MAX_CHARGE, dec!(1000000000000));
    }

    #[test]
    fn check_charge_rejects_sub_minor_precision() {
        assert!(Currency::Usd.check_charge("amount", dec!(10.50)).is_ok());
        assert!(Currency::Usd.check_charge("amount", dec!(10.500)).is_ok());
        assert_eq!(
            Currency::Usd
                .check_charge("amount", dec!(0.001))
                .unwrap_err()
                .field(),
            "amount"
        );
        assert!(Currency::Ugx.check_charge("amount", dec!(5000.5)).is_err());
    }

    #[test]
    fn check_charge_rejects_amounts_beyond_storage() {
        assert!(Currency::Usd.check_charge("amount", dec!(999999999999.99)).is_ok());
        assert!(Currency::Usd.check_charge("amount", dec!(1000000000000)).is_err());
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert_eq!(
            Amount::new(dec!(0)).unwrap_err(),
            ValidationError::not_positive("amount")
        );
        assert!(Amount::new(dec!(-5)).is_err());
    }

    #[test]
    fn amount_deserialization_validates() {
        let ok: Result<Amount, _> = serde_json::from_str("\"10.50\"");
        let bad: Result<Amount, _> = serde_json::from_str("\"-1\"");
        assert_eq!(ok.unwrap().value(), dec!(10.50));
        assert!(bad.is_err());
    }
}
