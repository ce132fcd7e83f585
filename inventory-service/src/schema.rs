diesel::table! {
    inventory (product_id, location_id) {
        product_id -> Uuid,
        location_id -> Varchar,
        quantity -> Int4,
        reserved_quantity -> Int4,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    reservations (id) {
        id -> Uuid,
        product_id -> Uuid,
        location_id -> Varchar,
        order_id -> Nullable<Uuid>,
        quantity -> Int4,
        status -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    stock_movements (id) {
        id -> Uuid,
        product_id -> Uuid,
        location_id -> Varchar,
        delta -> Int4,
        reason -> Varchar,
        actor_id -> Nullable<Uuid>,
        order_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    inventory,
    reservations,
    stock_movements,
);
