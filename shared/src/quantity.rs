use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unit of measure, identified by its code (e.g. `EA`, `KG`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uom(String);

impl Uom {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("UOM mismatch: expected {expected}, got {actual}")]
    UomMismatch { expected: Uom, actual: Uom },
}

/// A decimal amount in a unit of measure.
///
/// Arithmetic between quantities never converts implicitly: both operands must
/// carry the same [`Uom`], otherwise [`QuantityError::UomMismatch`] is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity {
    qty: BigDecimal,
    uom: Uom,
}

impl Quantity {
    pub fn of(qty: impl Into<BigDecimal>, uom: Uom) -> Self {
        Self { qty: qty.into(), uom }
    }

    pub fn zero(uom: Uom) -> Self {
        Self {
            qty: BigDecimal::zero(),
            uom,
        }
    }

    pub fn qty(&self) -> &BigDecimal {
        &self.qty
    }

    pub fn uom(&self) -> &Uom {
        &self.uom
    }

    pub fn into_parts(self) -> (BigDecimal, Uom) {
        (self.qty, self.uom)
    }

    pub fn is_zero(&self) -> bool {
        self.qty.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.qty > BigDecimal::zero()
    }

    pub fn add(&self, other: &Quantity) -> Result<Quantity, QuantityError> {
        self.check_same_uom(other)?;
        Ok(Self {
            qty: &self.qty + &other.qty,
            uom: self.uom.clone(),
        })
    }

    pub fn subtract(&self, other: &Quantity) -> Result<Quantity, QuantityError> {
        self.check_same_uom(other)?;
        Ok(Self {
            qty: &self.qty - &other.qty,
            uom: self.uom.clone(),
        })
    }

    pub fn min(&self, other: &Quantity) -> Result<Quantity, QuantityError> {
        self.check_same_uom(other)?;
        if other.qty < self.qty {
            Ok(other.clone())
        } else {
            Ok(self.clone())
        }
    }

    fn check_same_uom(&self, other: &Quantity) -> Result<(), QuantityError> {
        if self.uom != other.uom {
            return Err(QuantityError::UomMismatch {
                expected: self.uom.clone(),
                actual: other.uom.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.qty, self.uom)
    }
}
