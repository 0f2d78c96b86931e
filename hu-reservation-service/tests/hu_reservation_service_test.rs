//! Reservation service tests against the in-memory warehouse.
//!
//! Run with: `cargo test -p hu-reservation-service --test hu_reservation_service_test`

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use hu_reservation_service::hu::{HuStatusMutator, HuStorage, HuTransformService, HusToNewCusRequest};
use hu_reservation_service::logging;
use hu_reservation_service::memory::{
    InMemoryHandlingUnits, InMemoryHuReservationRepository, InMemoryTrx, InMemoryWarehouse,
};
use hu_reservation_service::repository::HuReservationStore;
use hu_reservation_service::{HuReservation, HuReservationRequest, HuReservationService, ReservationError, Result};
use shared::{DocStatus, HuId, HuReservationId, HuStatus, OrderLineId, ProductId, Quantity, Uom};

fn ea(qty: i32) -> Quantity {
    Quantity::of(qty, Uom::new("EA"))
}

fn request(order_line: OrderLineId, hu_ids: Vec<HuId>, product: ProductId, qty: Quantity) -> HuReservationRequest {
    HuReservationRequest {
        sales_order_line_id: order_line,
        hu_ids,
        product_id: product,
        qty_to_reserve: qty,
    }
}

/// Splits and stores like the in-memory backend but cannot flag HUs.
struct StatusUpdateFails;

#[async_trait]
impl HuTransformService<InMemoryTrx> for StatusUpdateFails {
    async fn hus_to_new_cus(&self, trx: &mut InMemoryTrx, request: &HusToNewCusRequest) -> Result<Vec<HuId>> {
        InMemoryHandlingUnits.hus_to_new_cus(trx, request).await
    }
}

#[async_trait]
impl HuStorage<InMemoryTrx> for StatusUpdateFails {
    async fn get_quantity(&self, trx: &mut InMemoryTrx, hu_id: HuId, product_id: ProductId, uom: &Uom) -> Result<Quantity> {
        InMemoryHandlingUnits.get_quantity(trx, hu_id, product_id, uom).await
    }
}

#[async_trait]
impl HuStatusMutator<InMemoryTrx> for StatusUpdateFails {
    async fn set_hu_status(&self, _trx: &mut InMemoryTrx, _hu_id: HuId, _status: HuStatus) -> Result<()> {
        Err(ReservationError::Transaction("status update rejected".to_string()))
    }
}

/// Reads like the in-memory repository but every save fails.
struct SaveFails;

#[async_trait]
impl HuReservationStore<InMemoryTrx> for SaveFails {
    async fn get_by_sales_order_line_id(&self, trx: &mut InMemoryTrx, id: OrderLineId) -> Result<HuReservation> {
        InMemoryHuReservationRepository.get_by_sales_order_line_id(trx, id).await
    }

    async fn save(&self, _trx: &mut InMemoryTrx, _reservation: &HuReservation) -> Result<()> {
        Err(ReservationError::Transaction("insert rejected".to_string()))
    }
}

#[tokio::test]
async fn reserves_requested_quantity_across_candidates() {
    logging::init_test();
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let tu = HuId::new();
    let u1 = warehouse.add_hu(Some(tu), product, ea(6)).await;
    let u2 = warehouse.add_hu(Some(tu), product, ea(8)).await;
    let order_line = OrderLineId::new();

    let reservation = warehouse
        .service()
        .make_reservation(request(order_line, vec![u1, u2], product, ea(10)))
        .await
        .unwrap();

    assert_eq!(reservation.sales_order_line_id(), order_line);
    assert_eq!(reservation.reserved_qty_sum(), Some(&ea(10)));
    let mut reserved: Vec<Quantity> = reservation.lines().map(|(_, qty)| qty.clone()).collect();
    reserved.sort_by(|a, b| a.qty().cmp(b.qty()));
    assert_eq!(reserved, vec![ea(4), ea(6)]);

    let state = warehouse.snapshot().await;
    for (vhu_id, qty) in reservation.lines() {
        let cu = state.hu(vhu_id).unwrap();
        assert_eq!(cu.status, HuStatus::Reserved);
        assert_eq!(cu.parent_hu_id, Some(tu));
        assert_eq!(state.stock(vhu_id, product), Some(qty));
    }
    assert_eq!(state.hu(u1).unwrap().status, HuStatus::Destroyed);
    assert!(state.stock(u1, product).is_none());
    assert_eq!(state.hu(u2).unwrap().status, HuStatus::Active);
    assert_eq!(state.stock(u2, product), Some(&ea(4)));

    assert_eq!(state.reservations.len(), 2);
    assert!(state
        .reservations
        .iter()
        .all(|row| row.sales_order_line_id == order_line && row.is_active));
    let persisted = state
        .reservations
        .iter()
        .try_fold(ea(0), |sum, row| sum.add(&row.qty_reserved))
        .unwrap();
    assert_eq!(persisted, ea(10));
}

#[tokio::test]
async fn loading_after_reservation_gives_same_total() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let hu = warehouse.add_hu(None, product, ea(20)).await;
    let order_line = OrderLineId::new();
    let service = warehouse.service();

    let made = service
        .make_reservation(request(order_line, vec![hu], product, ea(7)))
        .await
        .unwrap();
    let loaded = service.get_reservation(order_line).await.unwrap();

    assert_eq!(loaded.reserved_qty_sum(), made.reserved_qty_sum());
    assert_eq!(loaded, made);
}

#[tokio::test]
async fn unknown_order_line_has_empty_reservation() {
    let warehouse = InMemoryWarehouse::new();

    let loaded = warehouse.service().get_reservation(OrderLineId::new()).await.unwrap();

    assert!(loaded.is_empty());
    assert!(loaded.reserved_qty_sum().is_none());
}

#[tokio::test]
async fn reservations_of_other_order_lines_are_not_loaded() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let hu = warehouse.add_hu(None, product, ea(10)).await;
    let (first, second) = (OrderLineId::new(), OrderLineId::new());
    let service = warehouse.service();

    service
        .make_reservation(request(first, vec![hu], product, ea(3)))
        .await
        .unwrap();
    service
        .make_reservation(request(second, vec![hu], product, ea(5)))
        .await
        .unwrap();

    assert_eq!(service.get_reservation(first).await.unwrap().reserved_qty_sum(), Some(&ea(3)));
    assert_eq!(service.get_reservation(second).await.unwrap().reserved_qty_sum(), Some(&ea(5)));
}

#[tokio::test]
async fn empty_candidate_list_fails_without_side_effects() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    warehouse.add_hu(None, product, ea(5)).await;
    let before = warehouse.snapshot().await;

    let err = warehouse
        .service()
        .make_reservation(request(OrderLineId::new(), Vec::new(), product, ea(5)))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::InvalidRequest(_)));
    assert!(err.is_business_rule_violation());
    assert_eq!(warehouse.snapshot().await, before);
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let hu = warehouse.add_hu(None, product, ea(5)).await;

    let err = warehouse
        .service()
        .make_reservation(request(OrderLineId::new(), vec![hu], product, ea(0)))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::InvalidRequest(_)));
}

#[tokio::test]
async fn failure_while_marking_rolls_back_the_split() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let hu = warehouse.add_hu(None, product, ea(5)).await;
    let before = warehouse.snapshot().await;
    let service = HuReservationService::new(warehouse.clone(), InMemoryHuReservationRepository, StatusUpdateFails);

    let err = service
        .make_reservation(request(OrderLineId::new(), vec![hu], product, ea(3)))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::Transaction(_)));
    assert!(!err.is_business_rule_violation());
    assert_eq!(warehouse.snapshot().await, before);
}

#[tokio::test]
async fn failure_while_saving_rolls_back_the_split_and_marking() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let hu = warehouse.add_hu(None, product, ea(5)).await;
    let before = warehouse.snapshot().await;
    let service = HuReservationService::new(warehouse.clone(), SaveFails, InMemoryHandlingUnits);

    let result = service
        .make_reservation(request(OrderLineId::new(), vec![hu], product, ea(5)))
        .await;

    assert!(result.is_err());
    let after = warehouse.snapshot().await;
    assert_eq!(after, before);
    assert_eq!(after.hu(hu).unwrap().status, HuStatus::Active);
}

#[tokio::test]
async fn inactive_candidates_are_skipped() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let picked = warehouse
        .add_hu_with_status(None, product, ea(10), HuStatus::Picked)
        .await;
    let active = warehouse.add_hu(None, product, ea(10)).await;

    let reservation = warehouse
        .service()
        .make_reservation(request(OrderLineId::new(), vec![picked, active], product, ea(4)))
        .await
        .unwrap();

    assert_eq!(reservation.reserved_qty_sum(), Some(&ea(4)));
    let state = warehouse.snapshot().await;
    assert_eq!(state.stock(picked, product), Some(&ea(10)));
    assert_eq!(state.stock(active, product), Some(&ea(6)));
}

#[tokio::test]
async fn reserved_cus_are_not_reserved_twice() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let hu = warehouse.add_hu(None, product, ea(5)).await;
    let service = warehouse.service();

    let first = service
        .make_reservation(request(OrderLineId::new(), vec![hu], product, ea(5)))
        .await
        .unwrap();
    let reserved_cus: Vec<HuId> = first.lines().map(|(id, _)| id).collect();

    let second = service
        .make_reservation(request(OrderLineId::new(), reserved_cus, product, ea(5)))
        .await
        .unwrap();

    assert!(second.is_empty());
    assert_eq!(second.reserved_qty_sum(), Some(&ea(0)));
}

#[tokio::test]
async fn under_supply_reserves_what_is_available() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let u1 = warehouse.add_hu(None, product, ea(3)).await;
    let u2 = warehouse.add_hu(None, product, ea(2)).await;

    let reservation = warehouse
        .service()
        .make_reservation(request(OrderLineId::new(), vec![u1, u2], product, ea(10)))
        .await
        .unwrap();

    assert_eq!(reservation.reserved_qty_sum(), Some(&ea(5)));
    assert_eq!(reservation.vhu_id_to_reserved_qty().len(), 2);
}

#[tokio::test]
async fn concurrent_reservations_on_one_hu_do_not_overbook() {
    let warehouse = InMemoryWarehouse::new();
    let service = warehouse.service();
    let product = ProductId::new();
    let hu = warehouse.add_hu(None, product, ea(5)).await;
    let (line_a, line_b) = (OrderLineId::new(), OrderLineId::new());

    let (a, b) = tokio::join!(
        service.make_reservation(request(line_a, vec![hu], product, ea(4))),
        service.make_reservation(request(line_b, vec![hu], product, ea(4))),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let total = a.reserved_qty_sum().unwrap().add(b.reserved_qty_sum().unwrap()).unwrap();
    assert_eq!(total, ea(5));

    let state = warehouse.snapshot().await;
    assert_eq!(state.hu(hu).unwrap().status, HuStatus::Destroyed);
    assert!(state.stock(hu, product).is_none());

    let mut expected: Vec<(OrderLineId, HuId, Quantity)> = a
        .lines()
        .map(|(vhu_id, qty)| (line_a, vhu_id, qty.clone()))
        .chain(b.lines().map(|(vhu_id, qty)| (line_b, vhu_id, qty.clone())))
        .collect();
    let mut stored: Vec<(OrderLineId, HuId, Quantity)> = state
        .reservations
        .iter()
        .map(|row| (row.sales_order_line_id, row.vhu_id, row.qty_reserved.clone()))
        .collect();
    expected.sort_by_key(|(_, vhu_id, _)| *vhu_id);
    stored.sort_by_key(|(_, vhu_id, _)| *vhu_id);
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn other_products_are_left_alone() {
    let warehouse = InMemoryWarehouse::new();
    let (wanted, other) = (ProductId::new(), ProductId::new());
    let hu = warehouse.add_hu(None, other, ea(9)).await;

    let reservation = warehouse
        .service()
        .make_reservation(request(OrderLineId::new(), vec![hu], wanted, ea(2)))
        .await
        .unwrap();

    assert!(reservation.is_empty());
    assert_eq!(warehouse.snapshot().await.stock(hu, other), Some(&ea(9)));
}

#[tokio::test]
async fn unknown_candidate_fails() {
    let warehouse = InMemoryWarehouse::new();
    let missing = HuId::new();

    let err = warehouse
        .service()
        .make_reservation(request(OrderLineId::new(), vec![missing], ProductId::new(), ea(1)))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::HuNotFound(id) if id == missing));
}

#[tokio::test]
async fn stock_in_another_uom_fails_and_rolls_back() {
    let warehouse = InMemoryWarehouse::new();
    let product = ProductId::new();
    let in_ea = warehouse.add_hu(None, product, ea(2)).await;
    let in_kg = warehouse.add_hu(None, product, Quantity::of(5, Uom::new("KG"))).await;
    let before = warehouse.snapshot().await;

    let err = warehouse
        .service()
        .make_reservation(request(OrderLineId::new(), vec![in_ea, in_kg], product, ea(4)))
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::UomConversion { .. }));
    assert_eq!(warehouse.snapshot().await, before);
}

#[tokio::test]
async fn delete_and_retain_are_not_implemented() {
    let warehouse = InMemoryWarehouse::new();
    let service = warehouse.service();

    let err = service.delete_reservation(HuReservationId::new()).unwrap_err();
    assert!(matches!(err, ReservationError::NotImplemented(_)));

    let err = service
        .retain_available_hus_for_order_line(&[HuId::new()], OrderLineId::new())
        .unwrap_err();
    assert!(matches!(err, ReservationError::NotImplemented(_)));

    let err = service
        .retain_available_hus_for_order_line(&[], OrderLineId::new())
        .unwrap_err();
    assert!(matches!(err, ReservationError::NotImplemented(_)));
}

#[tokio::test]
async fn docstatuses_that_allow_reservation() {
    let service = InMemoryWarehouse::new().service();

    let statuses: Vec<DocStatus> = service.get_docstatuses_that_allow_reservation().into_iter().collect();

    assert_eq!(
        statuses,
        vec![
            DocStatus::Drafted,
            DocStatus::InProgress,
            DocStatus::WaitingPayment,
            DocStatus::Completed,
        ]
    );
    assert!(service.is_reservation_allowed(DocStatus::Completed));
    assert!(!service.is_reservation_allowed(DocStatus::Closed));
    assert!(!service.is_reservation_allowed(DocStatus::Voided));
}
