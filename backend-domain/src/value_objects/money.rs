// Money value object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Mmk,
    Thb,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Mmk => "MMK",
            Currency::Thb => "THB",
            Currency::Usd => "USD",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Mmk
    }
}

impl std::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MMK" => Ok(Currency::Mmk),
            "THB" => Ok(Currency::Thb),
            "USD" => Ok(Currency::Usd),
            other => Err(DomainError::Validation(format!(
                "unsupported currency '{}'",
                other
            ))),
        }
    }
}

/// Currency-tagged amount. COD and declared-value fields carry this instead of
/// bare numbers so amounts in different currencies never silently mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, DomainError> {
        if amount.is_sign_negative() {
            return Err(DomainError::Validation(format!(
                "amount must not be negative: {}",
                amount
            )));
        }
        Ok(Self { amount, currency })
    }

    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn try_add(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::Validation(format!(
                "currency mismatch: {} vs {}",
                self.currency.as_str(),
                other.currency.as_str()
            )));
        }
        Ok(Money {
            amount: self.amount + other.amount,
            currency: self.currency,
        })
    }

    pub fn try_sub(&self, other: &Money) -> Result<Money, DomainError> {
        if self.currency != other.currency {
            return Err(DomainError::Validation(format!(
                "currency mismatch: {} vs {}",
                self.currency.as_str(),
                other.currency.as_str()
            )));
        }
        Ok(Money {
            amount: self.amount - other.amount,
            currency: self.currency,
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency.as_str())
    }
}
