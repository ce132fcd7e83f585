diesel::table! {
    discount_codes (id) {
        id -> Uuid,
        code -> Varchar,
        discount_type -> Varchar,
        discount_value -> Numeric,
        min_order_amount -> Numeric,
        max_discount_amount -> Nullable<Numeric>,
        starts_at -> Timestamptz,
        ends_at -> Nullable<Timestamptz>,
        usage_limit -> Nullable<Int4>,
        times_used -> Int4,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    order_items (id) {
        id -> Uuid,
        order_id -> Uuid,
        product_id -> Uuid,
        name -> Varchar,
        price_per_item -> Numeric,
        quantity -> Int4,
    }
}

diesel::table! {
    order_requirements (id) {
        id -> Uuid,
        role -> Varchar,
        min_quantity -> Int4,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    order_status_history (id) {
        id -> Uuid,
        order_id -> Uuid,
        status -> Varchar,
        note -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        user_id -> Uuid,
        status -> Varchar,
        subtotal -> Numeric,
        discount_amount -> Numeric,
        shipping_cost -> Numeric,
        taxes -> Numeric,
        total_amount -> Numeric,
        is_wholesale -> Bool,
        total_quantity -> Int4,
        location_id -> Varchar,
        shipping_address -> Jsonb,
        billing_address -> Jsonb,
        payment_method -> Varchar,
        payment_status -> Varchar,
        payment_transaction_id -> Nullable<Varchar>,
        discount_code -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    outbox_events (id) {
        id -> Uuid,
        aggregate_id -> Uuid,
        event_type -> Varchar,
        event_data -> Jsonb,
        processed -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    products (id) {
        id -> Uuid,
        name -> Varchar,
        price -> Numeric,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Varchar,
        name -> Varchar,
        role -> Varchar,
        wholesale_eligibility -> Bool,
        wholesale_approved_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    wholesale_rules (id) {
        id -> Uuid,
        min_quantity -> Int4,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(order_items -> orders (order_id));
diesel::joinable!(order_items -> products (product_id));
diesel::joinable!(order_status_history -> orders (order_id));
diesel::joinable!(orders -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    discount_codes,
    order_items,
    order_requirements,
    order_status_history,
    orders,
    outbox_events,
    products,
    users,
    wholesale_rules,
);
