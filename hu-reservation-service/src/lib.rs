//! Handling-unit reservations for sales order lines.
//!
//! [`service::HuReservationService`] splits dedicated CUs off candidate
//! handling units, flags them as reserved and stores one reservation line per
//! CU, all in one transaction. Storage and transactions are pluggable: see
//! [`postgres`] for the diesel-async backend and [`memory`] for the in-memory one.

pub mod config;
pub mod error;
pub mod handlers;
pub mod hu;
pub mod ledger;
pub mod logging;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod reservation;
pub mod schema;
pub mod service;
pub mod trx;

pub use error::{ReservationError, Result};
pub use reservation::{HuReservation, HuReservationRequest, ReservationLine};
pub use service::HuReservationService;
