use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use shared::{HuId, OrderLineId, Quantity, Uom};
use uuid::Uuid;

use crate::error::Result;
use crate::hu::HandlingUnit;
use crate::reservation::ReservationLine;

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = crate::schema::handling_units)]
pub struct HandlingUnitRecord {
    pub id: Uuid,
    pub parent_hu_id: Option<Uuid>,
    pub hu_status: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl HandlingUnitRecord {
    pub fn to_handling_unit(&self) -> Result<HandlingUnit> {
        Ok(HandlingUnit {
            id: HuId::from_uuid(self.id),
            parent_hu_id: self.parent_hu_id.map(HuId::from_uuid),
            status: self.hu_status.parse()?,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::handling_units)]
pub struct NewHandlingUnit {
    pub id: Uuid,
    pub parent_hu_id: Option<Uuid>,
    pub hu_status: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::hu_storage)]
pub struct HuStorageRecord {
    pub hu_id: Uuid,
    pub product_id: Uuid,
    pub qty: BigDecimal,
    pub uom: String,
}

impl HuStorageRecord {
    pub fn quantity(&self) -> Quantity {
        Quantity::of(self.qty.clone(), Uom::new(self.uom.clone()))
    }
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = crate::schema::hu_reservations)]
pub struct HuReservationRecord {
    pub id: Uuid,
    pub sales_order_line_id: Uuid,
    pub vhu_id: Uuid,
    pub qty_reserved: BigDecimal,
    pub uom: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl HuReservationRecord {
    pub fn to_line(&self) -> Result<ReservationLine> {
        ReservationLine::new(
            HuId::from_uuid(self.vhu_id),
            Quantity::of(self.qty_reserved.clone(), Uom::new(self.uom.clone())),
        )
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::hu_reservations)]
pub struct NewHuReservation {
    pub id: Uuid,
    pub sales_order_line_id: Uuid,
    pub vhu_id: Uuid,
    pub qty_reserved: BigDecimal,
    pub uom: String,
}

impl NewHuReservation {
    pub fn new(sales_order_line_id: OrderLineId, vhu_id: HuId, qty: &Quantity) -> Self {
        Self {
            id: Uuid::new_v4(),
            sales_order_line_id: sales_order_line_id.as_uuid(),
            vhu_id: vhu_id.as_uuid(),
            qty_reserved: qty.qty().clone(),
            uom: qty.uom().code().to_string(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::processed_commands)]
pub struct ProcessedCommand {
    pub idempotency_key: String,
    pub command_id: Uuid,
    pub result: Option<serde_json::Value>,
    pub processed_at: Option<DateTime<Utc>>,
}
