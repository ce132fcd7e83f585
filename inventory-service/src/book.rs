use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::*;

/// In-process stock ledger with the same guards as the Postgres tables.
///
/// Multi-step operations stage their changes on a copy and swap it in only
/// when every step succeeded, so a failed call leaves the book untouched.
#[derive(Debug, Clone, Default)]
pub struct StockBook {
    records: HashMap<(Uuid, String), InventoryRecord>,
    reservations: HashMap<Uuid, Reservation>,
    movements: Vec<StockMovement>,
}

impl StockBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts stock on hand, recording it as the initial stocking movement.
    pub fn stock(&mut self, product_id: Uuid, location_id: &str, quantity: i32) -> Result<InventoryRecord, LedgerError> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(quantity));
        }
        let record = self.credit(product_id, location_id, quantity)?.clone();
        self.movements.push(StockMovement::new(
            product_id,
            location_id,
            quantity,
            MovementReason::InitialStock,
            None,
            None,
        ));
        Ok(record)
    }

    pub fn level(&self, product_id: Uuid, location_id: &str) -> InventoryRecord {
        self.records
            .get(&(product_id, location_id.to_string()))
            .cloned()
            .unwrap_or_else(|| InventoryRecord::empty(product_id, location_id))
    }

    pub fn available(&self, product_id: Uuid, location_id: &str) -> i32 {
        self.level(product_id, location_id).available()
    }

    pub fn decrement_for_order(
        &mut self,
        product_id: Uuid,
        location_id: &str,
        quantity: i32,
        order_id: Uuid,
        actor_id: Option<Uuid>,
    ) -> Result<(), LedgerError> {
        if quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(quantity));
        }
        self.debit(product_id, location_id, quantity)?;
        self.movements.push(StockMovement::new(
            product_id,
            location_id,
            -quantity,
            MovementReason::OrderPlacement,
            actor_id,
            Some(order_id),
        ));
        Ok(())
    }

    pub fn adjust(&mut self, request: &AdjustStock) -> Result<InventoryRecord, LedgerError> {
        let record = match request.delta {
            0 => return Err(LedgerError::InvalidQuantity(0)),
            delta if delta > 0 => self.credit(request.product_id, &request.location_id, delta)?.clone(),
            delta => {
                let amount = delta.checked_neg().ok_or(LedgerError::InvalidQuantity(delta))?;
                self.debit(request.product_id, &request.location_id, amount)?.clone()
            }
        };
        self.movements.push(StockMovement::new(
            request.product_id,
            &request.location_id,
            request.delta,
            MovementReason::Adjustment,
            request.actor_id,
            None,
        ));
        Ok(record)
    }

    pub fn reserve(&mut self, request: &ReserveStock) -> Result<Reservation, LedgerError> {
        if request.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(request.quantity));
        }
        let available = self.available(request.product_id, &request.location_id);
        if available < request.quantity {
            return Err(LedgerError::InsufficientStock {
                product_id: request.product_id,
                location_id: request.location_id.clone(),
                requested: request.quantity,
                available,
            });
        }
        let key = (request.product_id, request.location_id.clone());
        if let Some(record) = self.records.get_mut(&key) {
            record.reserved_quantity += request.quantity;
            record.updated_at = Utc::now();
        }
        let reservation = Reservation::new(
            request.product_id,
            &request.location_id,
            request.quantity,
            request.order_id,
        );
        self.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    pub fn fulfill(&mut self, reservation_id: Uuid, actor_id: Option<Uuid>) -> Result<Reservation, LedgerError> {
        let reservation = self.open_reservation(reservation_id)?;
        let key = (reservation.product_id, reservation.location_id.clone());
        if let Some(record) = self.records.get_mut(&key) {
            record.quantity -= reservation.quantity;
            record.reserved_quantity -= reservation.quantity;
            record.updated_at = Utc::now();
        }
        self.movements.push(StockMovement::new(
            reservation.product_id,
            &reservation.location_id,
            -reservation.quantity,
            MovementReason::Fulfillment,
            actor_id,
            reservation.order_id,
        ));
        Ok(self.close_reservation(reservation, FULFILLED))
    }

    pub fn release(&mut self, reservation_id: Uuid) -> Result<Reservation, LedgerError> {
        let reservation = self.open_reservation(reservation_id)?;
        let key = (reservation.product_id, reservation.location_id.clone());
        if let Some(record) = self.records.get_mut(&key) {
            record.reserved_quantity -= reservation.quantity;
            record.updated_at = Utc::now();
        }
        Ok(self.close_reservation(reservation, RELEASED))
    }

    pub fn transfer(&mut self, request: &TransferStock) -> Result<TransferReceipt, LedgerError> {
        if request.from_location == request.to_location {
            return Err(LedgerError::SameLocation(request.from_location.clone()));
        }
        if request.quantity <= 0 {
            return Err(LedgerError::InvalidQuantity(request.quantity));
        }

        let mut staged = self.clone();
        let source = staged
            .debit(request.product_id, &request.from_location, request.quantity)?
            .clone();
        let destination = staged
            .credit(request.product_id, &request.to_location, request.quantity)?
            .clone();
        staged.movements.push(StockMovement::new(
            request.product_id,
            &request.from_location,
            -request.quantity,
            MovementReason::TransferOut,
            request.actor_id,
            None,
        ));
        staged.movements.push(StockMovement::new(
            request.product_id,
            &request.to_location,
            request.quantity,
            MovementReason::TransferIn,
            request.actor_id,
            None,
        ));
        *self = staged;

        Ok(TransferReceipt { source, destination })
    }

    pub fn movements(&self, product_id: Uuid, location_id: &str) -> Vec<StockMovement> {
        self.movements
            .iter()
            .filter(|m| m.product_id == product_id && m.location_id == location_id)
            .cloned()
            .collect()
    }

    fn debit(&mut self, product_id: Uuid, location_id: &str, quantity: i32) -> Result<&mut InventoryRecord, LedgerError> {
        let available = self.available(product_id, location_id);
        if available < quantity {
            return Err(LedgerError::InsufficientStock {
                product_id,
                location_id: location_id.to_string(),
                requested: quantity,
                available,
            });
        }
        let record = self
            .records
            .get_mut(&(product_id, location_id.to_string()))
            .ok_or(LedgerError::InvalidQuantity(quantity))?;
        record.quantity -= quantity;
        record.updated_at = Utc::now();
        Ok(record)
    }

    fn credit(&mut self, product_id: Uuid, location_id: &str, quantity: i32) -> Result<&mut InventoryRecord, LedgerError> {
        let record = self
            .records
            .entry((product_id, location_id.to_string()))
            .or_insert_with(|| InventoryRecord::empty(product_id, location_id));
        record.quantity = record
            .quantity
            .checked_add(quantity)
            .ok_or(LedgerError::InvalidQuantity(quantity))?;
        record.updated_at = Utc::now();
        Ok(record)
    }

    fn open_reservation(&self, reservation_id: Uuid) -> Result<Reservation, LedgerError> {
        let reservation = self
            .reservations
            .get(&reservation_id)
            .ok_or(LedgerError::ReservationNotFound(reservation_id))?;
        if reservation.status != RESERVED {
            return Err(LedgerError::ReservationClosed {
                id: reservation_id,
                status: reservation.status.clone(),
            });
        }
        Ok(reservation.clone())
    }

    fn close_reservation(&mut self, reservation: Reservation, status: &str) -> Reservation {
        let closed = Reservation {
            status: status.to_string(),
            updated_at: Utc::now(),
            ..reservation
        };
        self.reservations.insert(closed.id, closed.clone());
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EAST: &str = "eastern-warehouse";
    const WEST: &str = "western-warehouse";

    fn ledger_sum(book: &StockBook, product_id: Uuid, location_id: &str) -> i32 {
        book.movements(product_id, location_id).iter().map(|m| m.delta).sum()
    }

    #[test]
    fn decrement_refuses_to_oversell() {
        let product = Uuid::new_v4();
        let mut book = StockBook::new();
        book.stock(product, EAST, 5).unwrap();

        book.decrement_for_order(product, EAST, 3, Uuid::new_v4(), None).unwrap();
        let err = book
            .decrement_for_order(product, EAST, 3, Uuid::new_v4(), None)
            .unwrap_err();

        match err {
            LedgerError::InsufficientStock { available, requested, .. } => {
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(book.level(product, EAST).quantity, 2);
    }

    #[test]
    fn decrement_writes_movement_with_order_reference() {
        let product = Uuid::new_v4();
        let order = Uuid::new_v4();
        let mut book = StockBook::new();
        book.stock(product, EAST, 10).unwrap();

        book.decrement_for_order(product, EAST, 4, order, None).unwrap();

        let movements = book.movements(product, EAST);
        let last = movements.last().unwrap();
        assert_eq!(last.delta, -4);
        assert_eq!(last.reason, "order_placement");
        assert_eq!(last.order_id, Some(order));
    }

    #[test]
    fn ledger_sums_to_quantity_after_mixed_operations() {
        let product = Uuid::new_v4();
        let mut book = StockBook::new();
        book.stock(product, EAST, 20).unwrap();
        book.adjust(&AdjustStock {
            product_id: product,
            location_id: EAST.to_string(),
            delta: -3,
            actor_id: None,
        })
        .unwrap();
        book.decrement_for_order(product, EAST, 2, Uuid::new_v4(), None).unwrap();
        let hold = book
            .reserve(&ReserveStock {
                product_id: product,
                location_id: EAST.to_string(),
                quantity: 4,
                order_id: None,
            })
            .unwrap();
        book.fulfill(hold.id, None).unwrap();
        book.transfer(&TransferStock {
            product_id: product,
            from_location: EAST.to_string(),
            to_location: WEST.to_string(),
            quantity: 5,
            actor_id: None,
        })
        .unwrap();

        assert_eq!(book.level(product, EAST).quantity, 6);
        assert_eq!(ledger_sum(&book, product, EAST), 6);
        assert_eq!(book.level(product, WEST).quantity, 5);
        assert_eq!(ledger_sum(&book, product, WEST), 5);
    }

    #[test]
    fn reserved_units_are_not_available_for_orders() {
        let product = Uuid::new_v4();
        let mut book = StockBook::new();
        book.stock(product, EAST, 5).unwrap();
        book.reserve(&ReserveStock {
            product_id: product,
            location_id: EAST.to_string(),
            quantity: 4,
            order_id: None,
        })
        .unwrap();

        assert_eq!(book.available(product, EAST), 1);
        assert!(book
            .decrement_for_order(product, EAST, 2, Uuid::new_v4(), None)
            .is_err());
    }

    #[test]
    fn released_reservation_returns_units_and_cannot_be_fulfilled() {
        let product = Uuid::new_v4();
        let mut book = StockBook::new();
        book.stock(product, EAST, 5).unwrap();
        let hold = book
            .reserve(&ReserveStock {
                product_id: product,
                location_id: EAST.to_string(),
                quantity: 5,
                order_id: None,
            })
            .unwrap();

        let released = book.release(hold.id).unwrap();
        assert_eq!(released.status, RELEASED);
        assert_eq!(book.available(product, EAST), 5);
        assert!(matches!(
            book.fulfill(hold.id, None),
            Err(LedgerError::ReservationClosed { .. })
        ));
    }

    #[test]
    fn failed_transfer_leaves_both_locations_untouched() {
        let product = Uuid::new_v4();
        let mut book = StockBook::new();
        book.stock(product, EAST, 3).unwrap();
        book.stock(product, WEST, i32::MAX - 1).unwrap();

        let err = book
            .transfer(&TransferStock {
                product_id: product,
                from_location: EAST.to_string(),
                to_location: WEST.to_string(),
                quantity: 2,
                actor_id: None,
            })
            .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidQuantity(2)));
        assert_eq!(book.level(product, EAST).quantity, 3);
        assert_eq!(book.level(product, WEST).quantity, i32::MAX - 1);
        assert_eq!(book.movements(product, EAST).len(), 1);
    }

    #[test]
    fn transfer_to_same_location_is_rejected() {
        let product = Uuid::new_v4();
        let mut book = StockBook::new();
        book.stock(product, EAST, 3).unwrap();
        assert!(matches!(
            book.transfer(&TransferStock {
                product_id: product,
                from_location: EAST.to_string(),
                to_location: EAST.to_string(),
                quantity: 1,
                actor_id: None,
            }),
            Err(LedgerError::SameLocation(_))
        ));
    }
}
