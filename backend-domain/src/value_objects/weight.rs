// Weight value object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Parcel weight in kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weight(Decimal);

impl Weight {
    pub const ZERO: Weight = Weight(Decimal::ZERO);

    pub fn from_kg(kg: Decimal) -> Result<Self, DomainError> {
        if kg.is_sign_negative() {
            return Err(DomainError::Validation(format!(
                "weight must not be negative: {} kg",
                kg
            )));
        }
        Ok(Self(kg))
    }

    pub fn kg(&self) -> Decimal {
        self.0
    }
}

impl std::ops::Add for Weight {
    type Output = Weight;

    fn add(self, rhs: Weight) -> Weight {
        Weight(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Weight {
    type Output = Weight;

    fn sub(self, rhs: Weight) -> Weight {
        // Totals never go below zero even if a stored item drifted.
        Weight((self.0 - rhs.0).max(Decimal::ZERO))
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} kg", self.0)
    }
}
