diesel::table! {
    handling_units (id) {
        id -> Uuid,
        parent_hu_id -> Nullable<Uuid>,
        hu_status -> Varchar,
        is_active -> Bool,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    hu_storage (hu_id, product_id) {
        hu_id -> Uuid,
        product_id -> Uuid,
        qty -> Numeric,
        uom -> Varchar,
    }
}

diesel::table! {
    hu_reservations (id) {
        id -> Uuid,
        sales_order_line_id -> Uuid,
        vhu_id -> Uuid,
        qty_reserved -> Numeric,
        uom -> Varchar,
        is_active -> Bool,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    processed_commands (idempotency_key) {
        idempotency_key -> Varchar,
        command_id -> Uuid,
        result -> Nullable<Jsonb>,
        processed_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(hu_storage -> handling_units (hu_id));

diesel::allow_tables_to_appear_in_same_query!(
    handling_units,
    hu_storage,
    hu_reservations,
    processed_commands,
);
