//! Ledger operations against Postgres.
//!
//! Every function takes the caller's connection so it can run inside a wider
//! transaction (order placement) or be wrapped in its own by [`PgInventoryLedger`].
//!
//! [`PgInventoryLedger`]: crate::ledger::PgInventoryLedger

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::*;
use crate::schema::*;

pub async fn level(conn: &mut AsyncPgConnection, product_id: Uuid, location_id: &str) -> Result<InventoryRecord, LedgerError> {
    let record = inventory::table
        .filter(inventory::product_id.eq(product_id))
        .filter(inventory::location_id.eq(location_id))
        .first::<InventoryRecord>(conn)
        .await
        .optional()?;

    Ok(record.unwrap_or_else(|| InventoryRecord::empty(product_id, location_id)))
}

/// Conditional decrement for one order line.
///
/// The guard lives in the UPDATE itself; zero rows affected means the units
/// were gone at the instant of the attempt, whatever an earlier read said.
pub async fn decrement_for_order(
    conn: &mut AsyncPgConnection,
    product_id: Uuid,
    location_id: &str,
    quantity: i32,
    order_id: Uuid,
    actor_id: Option<Uuid>,
) -> Result<(), LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::InvalidQuantity(quantity));
    }

    let affected = diesel::update(
        inventory::table
            .filter(inventory::product_id.eq(product_id))
            .filter(inventory::location_id.eq(location_id))
            .filter(inventory::quantity.ge(inventory::reserved_quantity + quantity)),
    )
    .set((
        inventory::quantity.eq(inventory::quantity - quantity),
        inventory::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;

    if affected == 0 {
        let available = level(conn, product_id, location_id).await?.available();
        return Err(LedgerError::InsufficientStock {
            product_id,
            location_id: location_id.to_string(),
            requested: quantity,
            available,
        });
    }

    record_movement(
        conn,
        &StockMovement::new(
            product_id,
            location_id,
            -quantity,
            MovementReason::OrderPlacement,
            actor_id,
            Some(order_id),
        ),
    )
    .await
}

pub async fn adjust(conn: &mut AsyncPgConnection, request: &AdjustStock) -> Result<InventoryRecord, LedgerError> {
    let record = match request.delta {
        0 => return Err(LedgerError::InvalidQuantity(0)),
        delta if delta > 0 => credit(conn, request.product_id, &request.location_id, delta).await?,
        delta => {
            let amount = delta.checked_neg().ok_or(LedgerError::InvalidQuantity(delta))?;
            debit(conn, request.product_id, &request.location_id, amount).await?
        }
    };

    record_movement(
        conn,
        &StockMovement::new(
            request.product_id,
            &request.location_id,
            request.delta,
            MovementReason::Adjustment,
            request.actor_id,
            None,
        ),
    )
    .await?;

    Ok(record)
}

pub async fn reserve(conn: &mut AsyncPgConnection, request: &ReserveStock) -> Result<Reservation, LedgerError> {
    if request.quantity <= 0 {
        return Err(LedgerError::InvalidQuantity(request.quantity));
    }

    let affected = diesel::update(
        inventory::table
            .filter(inventory::product_id.eq(request.product_id))
            .filter(inventory::location_id.eq(request.location_id.as_str()))
            .filter(inventory::quantity.ge(inventory::reserved_quantity + request.quantity)),
    )
    .set((
        inventory::reserved_quantity.eq(inventory::reserved_quantity + request.quantity),
        inventory::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;

    if affected == 0 {
        let available = level(conn, request.product_id, &request.location_id).await?.available();
        return Err(LedgerError::InsufficientStock {
            product_id: request.product_id,
            location_id: request.location_id.clone(),
            requested: request.quantity,
            available,
        });
    }

    let reservation = Reservation::new(
        request.product_id,
        &request.location_id,
        request.quantity,
        request.order_id,
    );
    diesel::insert_into(reservations::table)
        .values(&reservation)
        .execute(conn)
        .await?;

    Ok(reservation)
}

pub async fn fulfill(conn: &mut AsyncPgConnection, reservation_id: Uuid, actor_id: Option<Uuid>) -> Result<Reservation, LedgerError> {
    let reservation = open_reservation(conn, reservation_id).await?;

    diesel::update(
        inventory::table
            .filter(inventory::product_id.eq(reservation.product_id))
            .filter(inventory::location_id.eq(reservation.location_id.as_str())),
    )
    .set((
        inventory::quantity.eq(inventory::quantity - reservation.quantity),
        inventory::reserved_quantity.eq(inventory::reserved_quantity - reservation.quantity),
        inventory::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;

    record_movement(
        conn,
        &StockMovement::new(
            reservation.product_id,
            &reservation.location_id,
            -reservation.quantity,
            MovementReason::Fulfillment,
            actor_id,
            reservation.order_id,
        ),
    )
    .await?;

    close_reservation(conn, reservation_id, FULFILLED).await
}

pub async fn release(conn: &mut AsyncPgConnection, reservation_id: Uuid) -> Result<Reservation, LedgerError> {
    let reservation = open_reservation(conn, reservation_id).await?;

    diesel::update(
        inventory::table
            .filter(inventory::product_id.eq(reservation.product_id))
            .filter(inventory::location_id.eq(reservation.location_id.as_str())),
    )
    .set((
        inventory::reserved_quantity.eq(inventory::reserved_quantity - reservation.quantity),
        inventory::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .await?;

    close_reservation(conn, reservation_id, RELEASED).await
}

/// Debits the source and credits the destination. Callers must run this in a
/// transaction; an error after the debit leaves it to the rollback.
pub async fn transfer(conn: &mut AsyncPgConnection, request: &TransferStock) -> Result<TransferReceipt, LedgerError> {
    if request.from_location == request.to_location {
        return Err(LedgerError::SameLocation(request.from_location.clone()));
    }
    if request.quantity <= 0 {
        return Err(LedgerError::InvalidQuantity(request.quantity));
    }

    let source = debit(conn, request.product_id, &request.from_location, request.quantity).await?;
    let destination = credit(conn, request.product_id, &request.to_location, request.quantity).await?;

    for movement in [
        StockMovement::new(
            request.product_id,
            &request.from_location,
            -request.quantity,
            MovementReason::TransferOut,
            request.actor_id,
            None,
        ),
        StockMovement::new(
            request.product_id,
            &request.to_location,
            request.quantity,
            MovementReason::TransferIn,
            request.actor_id,
            None,
        ),
    ] {
        record_movement(conn, &movement).await?;
    }

    Ok(TransferReceipt { source, destination })
}

pub async fn movements(conn: &mut AsyncPgConnection, product_id: Uuid, location_id: &str) -> Result<Vec<StockMovement>, LedgerError> {
    let rows = stock_movements::table
        .filter(stock_movements::product_id.eq(product_id))
        .filter(stock_movements::location_id.eq(location_id))
        .order(stock_movements::created_at.asc())
        .load::<StockMovement>(conn)
        .await?;
    Ok(rows)
}

async fn debit(conn: &mut AsyncPgConnection, product_id: Uuid, location_id: &str, quantity: i32) -> Result<InventoryRecord, LedgerError> {
    let record = diesel::update(
        inventory::table
            .filter(inventory::product_id.eq(product_id))
            .filter(inventory::location_id.eq(location_id))
            .filter(inventory::quantity.ge(inventory::reserved_quantity + quantity)),
    )
    .set((
        inventory::quantity.eq(inventory::quantity - quantity),
        inventory::updated_at.eq(Utc::now()),
    ))
    .get_result::<InventoryRecord>(conn)
    .await
    .optional()?;

    match record {
        Some(record) => Ok(record),
        None => {
            let available = level(conn, product_id, location_id).await?.available();
            Err(LedgerError::InsufficientStock {
                product_id,
                location_id: location_id.to_string(),
                requested: quantity,
                available,
            })
        }
    }
}

async fn credit(conn: &mut AsyncPgConnection, product_id: Uuid, location_id: &str, quantity: i32) -> Result<InventoryRecord, LedgerError> {
    let record = diesel::insert_into(inventory::table)
        .values(&NewInventoryRecord {
            product_id,
            location_id: location_id.to_string(),
            quantity,
            reserved_quantity: 0,
        })
        .on_conflict((inventory::product_id, inventory::location_id))
        .do_update()
        .set((
            inventory::quantity.eq(inventory::quantity + quantity),
            inventory::updated_at.eq(Utc::now()),
        ))
        .get_result::<InventoryRecord>(conn)
        .await?;
    Ok(record)
}

async fn record_movement(conn: &mut AsyncPgConnection, movement: &StockMovement) -> Result<(), LedgerError> {
    diesel::insert_into(stock_movements::table)
        .values(movement)
        .execute(conn)
        .await?;
    Ok(())
}

async fn open_reservation(conn: &mut AsyncPgConnection, reservation_id: Uuid) -> Result<Reservation, LedgerError> {
    let reservation = reservations::table
        .filter(reservations::id.eq(reservation_id))
        .for_update()
        .first::<Reservation>(conn)
        .await
        .optional()?
        .ok_or(LedgerError::ReservationNotFound(reservation_id))?;

    if reservation.status != RESERVED {
        return Err(LedgerError::ReservationClosed {
            id: reservation_id,
            status: reservation.status,
        });
    }
    Ok(reservation)
}

async fn close_reservation(conn: &mut AsyncPgConnection, reservation_id: Uuid, status: &str) -> Result<Reservation, LedgerError> {
    let reservation = diesel::update(reservations::table.filter(reservations::id.eq(reservation_id)))
        .set((
            reservations::status.eq(status),
            reservations::updated_at.eq(Utc::now()),
        ))
        .get_result::<Reservation>(conn)
        .await?;
    Ok(reservation)
}
