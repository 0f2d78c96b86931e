//! In-memory warehouse: handling units, their storage and reservation rows
//! behind one async mutex.
//!
//! A transaction holds the mutex for its whole lifetime and works on a staged
//! copy of the state. Commit swaps the copy in, rollback drops it, so
//! transactions are fully serialized and never partially visible.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use shared::{Command, CommandReply, HuId, HuReservationId, HuStatus, OrderLineId, ProductId, Quantity, Uom};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{ReservationError, Result};
use crate::hu::split::plan_split;
use crate::hu::{
    collect_sources, ensure_convertible, HandlingUnit, HuStatusMutator, HuStorage, HuTransformService,
    HusToNewCusRequest,
};
use crate::ledger::{processed_command, ProcessedCommandLedger};
use crate::models::ProcessedCommand;
use crate::repository::HuReservationStore;
use crate::reservation::{HuReservation, ReservationLine};
use crate::service::HuReservationService;
use crate::trx::TrxManager;

pub type InMemoryHuReservationService =
    HuReservationService<InMemoryWarehouse, InMemoryHuReservationRepository, InMemoryHandlingUnits>;

#[derive(Debug, Clone, PartialEq)]
pub struct ReservationRow {
    pub id: HuReservationId,
    pub sales_order_line_id: OrderLineId,
    pub vhu_id: HuId,
    pub qty_reserved: Quantity,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarehouseState {
    pub handling_units: HashMap<HuId, HandlingUnit>,
    pub storage: HashMap<(HuId, ProductId), Quantity>,
    pub reservations: Vec<ReservationRow>,
}

impl WarehouseState {
    pub fn hu(&self, hu_id: HuId) -> Option<&HandlingUnit> {
        self.handling_units.get(&hu_id)
    }

    pub fn stock(&self, hu_id: HuId, product_id: ProductId) -> Option<&Quantity> {
        self.storage.get(&(hu_id, product_id))
    }

    fn holds_anything(&self, hu_id: HuId) -> bool {
        self.storage.keys().any(|(id, _)| *id == hu_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryWarehouse {
    state: Arc<Mutex<WarehouseState>>,
}

pub struct InMemoryTrx {
    guard: OwnedMutexGuard<WarehouseState>,
    staged: WarehouseState,
}

impl InMemoryTrx {
    pub fn state(&self) -> &WarehouseState {
        &self.staged
    }
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Service wired to this warehouse for all of its collaborators.
    pub fn service(&self) -> InMemoryHuReservationService {
        HuReservationService::new(self.clone(), InMemoryHuReservationRepository, InMemoryHandlingUnits)
    }

    /// Adds an active HU holding `qty` of `product_id`.
    pub async fn add_hu(&self, parent_hu_id: Option<HuId>, product_id: ProductId, qty: Quantity) -> HuId {
        self.add_hu_with_status(parent_hu_id, product_id, qty, HuStatus::Active).await
    }

    pub async fn add_hu_with_status(
        &self,
        parent_hu_id: Option<HuId>,
        product_id: ProductId,
        qty: Quantity,
        status: HuStatus,
    ) -> HuId {
        let id = HuId::new();
        let mut state = self.state.lock().await;
        state.handling_units.insert(
            id,
            HandlingUnit {
                id,
                parent_hu_id,
                status,
                is_active: status.is_active_flag(),
            },
        );
        state.storage.insert((id, product_id), qty);
        id
    }

    pub async fn snapshot(&self) -> WarehouseState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl TrxManager for InMemoryWarehouse {
    type Trx = InMemoryTrx;

    async fn begin(&self) -> Result<InMemoryTrx> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(InMemoryTrx { guard, staged })
    }

    async fn commit(&self, trx: InMemoryTrx) -> Result<()> {
        let InMemoryTrx { mut guard, staged } = trx;
        *guard = staged;
        Ok(())
    }

    async fn rollback(&self, trx: InMemoryTrx) -> Result<()> {
        drop(trx);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryHuReservationRepository;

#[async_trait]
impl HuReservationStore<InMemoryTrx> for InMemoryHuReservationRepository {
    async fn get_by_sales_order_line_id(&self, trx: &mut InMemoryTrx, id: OrderLineId) -> Result<HuReservation> {
        let lines = trx
            .staged
            .reservations
            .iter()
            .filter(|row| row.is_active && row.sales_order_line_id == id)
            .map(|row| ReservationLine::new(row.vhu_id, row.qty_reserved.clone()))
            .collect::<Result<Vec<_>>>()?;

        HuReservation::from_lines(id, lines)
    }

    async fn save(&self, trx: &mut InMemoryTrx, reservation: &HuReservation) -> Result<()> {
        for (vhu_id, qty) in reservation.lines() {
            trx.staged.reservations.push(ReservationRow {
                id: HuReservationId::new(),
                sales_order_line_id: reservation.sales_order_line_id(),
                vhu_id,
                qty_reserved: qty.clone(),
                is_active: true,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryHandlingUnits;

#[async_trait]
impl HuTransformService<InMemoryTrx> for InMemoryHandlingUnits {
    async fn hus_to_new_cus(&self, trx: &mut InMemoryTrx, request: &HusToNewCusRequest) -> Result<Vec<HuId>> {
        let state = &mut trx.staged;
        let product_id = request.product_id;

        let sources = collect_sources(
            request,
            |hu_id| state.hu(hu_id),
            |hu_id| state.stock(hu_id, product_id),
        )?;
        let steps = plan_split(&sources, &request.qty_cu)?;

        let mut new_cus = Vec::with_capacity(steps.len());
        for step in steps {
            let new_cu = HuId::new();
            state.handling_units.insert(
                new_cu,
                HandlingUnit {
                    id: new_cu,
                    parent_hu_id: step.new_cu_parent(request.keep_new_cus_under_same_parent),
                    status: HuStatus::Active,
                    is_active: true,
                },
            );
            state.storage.insert((new_cu, product_id), step.qty.clone());

            if step.drains_source() {
                state.storage.remove(&(step.source_hu_id, product_id));
                if !state.holds_anything(step.source_hu_id) {
                    if let Some(source) = state.handling_units.get_mut(&step.source_hu_id) {
                        source.status = HuStatus::Destroyed;
                        source.is_active = false;
                    }
                }
            } else {
                state
                    .storage
                    .insert((step.source_hu_id, product_id), step.source_remaining.clone());
            }

            new_cus.push(new_cu);
        }

        Ok(new_cus)
    }
}

#[async_trait]
impl HuStorage<InMemoryTrx> for InMemoryHandlingUnits {
    async fn get_quantity(&self, trx: &mut InMemoryTrx, hu_id: HuId, product_id: ProductId, uom: &Uom) -> Result<Quantity> {
        let state = &trx.staged;
        if state.hu(hu_id).is_none() {
            return Err(ReservationError::HuNotFound(hu_id));
        }
        match state.stock(hu_id, product_id) {
            Some(qty) => {
                ensure_convertible(hu_id, qty, uom)?;
                Ok(qty.clone())
            }
            None => Ok(Quantity::zero(uom.clone())),
        }
    }
}

#[async_trait]
impl HuStatusMutator<InMemoryTrx> for InMemoryHandlingUnits {
    async fn set_hu_status(&self, trx: &mut InMemoryTrx, hu_id: HuId, status: HuStatus) -> Result<()> {
        let hu = trx
            .staged
            .handling_units
            .get_mut(&hu_id)
            .ok_or(ReservationError::HuNotFound(hu_id))?;
        hu.status = status;
        hu.is_active = status.is_active_flag();
        Ok(())
    }
}

/// Idempotency ledger kept in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProcessedCommands {
    entries: Arc<Mutex<HashMap<String, ProcessedCommand>>>,
}

impl InMemoryProcessedCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl ProcessedCommandLedger for InMemoryProcessedCommands {
    async fn check_idempotency(&self, idempotency_key: &str) -> anyhow::Result<Option<ProcessedCommand>> {
        Ok(self.entries.lock().await.get(idempotency_key).cloned())
    }

    async fn store_processed_command(&self, command: &Command, reply: &CommandReply) -> anyhow::Result<()> {
        let entry = processed_command(command, reply)?;
        self.entries.lock().await.insert(entry.idempotency_key.clone(), entry);
        Ok(())
    }
}
