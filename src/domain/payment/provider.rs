//! Payment rails: who moves the money and by which instrument.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Party that settles a transaction.
///
/// `Manual` marks wallet-funded transactions, which never leave the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    Stripe,
    Flutterwave,
    Manual,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Flutterwave => "flutterwave",
            PaymentProvider::Manual => "manual",
        }
    }

    /// Returns true for providers reached over the network.
    pub fn is_external(&self) -> bool {
        !matches!(self, PaymentProvider::Manual)
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PaymentProvider::Stripe),
            "flutterwave" => Ok(PaymentProvider::Flutterwave),
            "manual" => Ok(PaymentProvider::Manual),
            other => Err(ValidationError::invalid_format(
                "payment_provider",
                format!("unknown provider '{}'", other),
            )),
        }
    }
}

/// Instrument the payer chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    MobileMoney,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Wallet => "wallet",
        }
    }

    /// Picks the method when the caller left it out.
    ///
    /// Without a provider the only possible rail is the wallet.
    pub fn resolve(requested: Option<PaymentMethod>, provider: Option<PaymentProvider>) -> Self {
        match (requested, provider) {
            (Some(method), _) => method,
            (None, None) => PaymentMethod::Wallet,
            (None, Some(_)) => PaymentMethod::Card,
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "mobile_money" => Ok(PaymentMethod::MobileMoney),
            "wallet" => Ok(PaymentMethod::Wallet),
            other => Err(ValidationError::invalid_format(
                "payment_method",
                format!("unknown payment method '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_roundtrips_through_str() {
        for p in [
            PaymentProvider::Stripe,
            PaymentProvider::Flutterwave,
            PaymentProvider::Manual,
        ] {
            assert_eq!(p.as_str().parse::<PaymentProvider>().unwrap(), p);
        }
        assert!("paypal".parse::<PaymentProvider>().is_err());
    }

    #[test]
    fn only_manual_is_internal() {
        assert!(PaymentProvider::Stripe.is_external());
        assert!(PaymentProvider::Flutterwave.is_external());
        assert!(!PaymentProvider::Manual.is_external());
    }

    #[test]
    fn method_defaults_to_wallet_without_provider() {
        assert_eq!(PaymentMethod::resolve(None, None), PaymentMethod::Wallet);
        assert_eq!(
            PaymentMethod::resolve(None, Some(PaymentProvider::Stripe)),
            PaymentMethod::Card
        );
        assert_eq!(
            PaymentMethod::resolve(Some(PaymentMethod::MobileMoney), None),
            PaymentMethod::MobileMoney
        );
    }

    #[test]
    fn method_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::MobileMoney).unwrap(),
            "\"mobile_money\""
        );
    }
}
