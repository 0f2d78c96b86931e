mod ids;
mod quantity;
mod status;

pub use ids::{HuId, HuReservationId, OrderLineId, ProductId};
pub use quantity::{Quantity, QuantityError, Uom};
pub use status::{DocStatus, HuStatus, UnknownStatusCode};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub id: Uuid,
    pub correlation_id: Uuid,
    pub command_type: CommandType,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandType {
    ReserveHandlingUnits,
    DeleteHuReservation,
    QueryHuReservation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandReply {
    pub id: Uuid,
    pub command_id: Uuid,
    pub correlation_id: Uuid,
    pub status: CommandStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandStatus {
    Success,
    Failed,
}

/// Payload of [`CommandType::ReserveHandlingUnits`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuReservationData {
    pub sales_order_line_id: OrderLineId,
    pub hu_ids: Vec<HuId>,
    pub product_id: ProductId,
    pub qty_to_reserve: BigDecimal,
    pub uom: Uom,
}

/// Payload of [`CommandType::DeleteHuReservation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteHuReservationData {
    pub reservation_id: HuReservationId,
}

/// Payload of [`CommandType::QueryHuReservation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineData {
    pub sales_order_line_id: OrderLineId,
}

/// Reply body describing the reservation held for one order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuReservationSummary {
    pub sales_order_line_id: OrderLineId,
    pub lines: Vec<ReservedHuLine>,
    pub reserved_qty_sum: Option<Quantity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservedHuLine {
    pub vhu_id: HuId,
    pub qty_reserved: Quantity,
}

impl Command {
    pub fn new(correlation_id: Uuid, command_type: CommandType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            correlation_id,
            command_type,
            payload,
            idempotency_key: format!("{}_{}", correlation_id, Uuid::new_v4()),
            created_at: Utc::now(),
        }
    }
}

impl CommandReply {
    pub fn success(command_id: Uuid, correlation_id: Uuid, result: Option<serde_json::Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            command_id,
            correlation_id,
            status: CommandStatus::Success,
            result,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn failed(command_id: Uuid, correlation_id: Uuid, error: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            command_id,
            correlation_id,
            status: CommandStatus::Failed,
            result: None,
            error: Some(error),
            created_at: Utc::now(),
        }
    }
}
