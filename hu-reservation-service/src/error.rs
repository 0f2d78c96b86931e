use shared::{HuId, Quantity, QuantityError, Uom, UnknownStatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReservationError {
    #[error("invalid reservation request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Quantity(#[from] QuantityError),

    #[error("no UOM conversion from {from} to {to} for handling unit {hu_id}")]
    UomConversion { hu_id: HuId, from: Uom, to: Uom },

    #[error("reserved quantity for handling unit {vhu_id} must be positive, got {qty}")]
    NonPositiveQuantity { vhu_id: HuId, qty: Quantity },

    #[error("handling unit not found: {0}")]
    HuNotFound(HuId),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("corrupt record: {0}")]
    CorruptRecord(#[from] UnknownStatusCode),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("transaction error: {0}")]
    Transaction(String),
}

impl ReservationError {
    /// Failures caused by the request or by unfinished functionality, as opposed
    /// to infrastructure faults. These are reported back to the caller rather
    /// than retried.
    pub fn is_business_rule_violation(&self) -> bool {
        matches!(
            self,
            ReservationError::InvalidRequest(_)
                | ReservationError::Quantity(_)
                | ReservationError::UomConversion { .. }
                | ReservationError::NonPositiveQuantity { .. }
                | ReservationError::HuNotFound(_)
                | ReservationError::NotImplemented(_)
        )
    }
}

pub type Result<T, E = ReservationError> = std::result::Result<T, E>;
