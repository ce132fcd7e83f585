use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use inventory_service::{pg as inventory_pg, DbPool};
use shared::*;
use tracing::info;
use uuid::Uuid;

use super::{CheckoutStore, ProductCatalog, RuleStore};
use crate::error::CheckoutError;
use crate::models::*;
use crate::schema::*;

pub struct PgCheckoutStore {
    pool: DbPool,
}

impl PgCheckoutStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleStore for PgCheckoutStore {
    async fn requirement_for_scope(&self, scope: &str) -> anyhow::Result<Option<i32>> {
        let mut conn = self.pool.get().await?;
        let minimum = order_requirements::table
            .filter(order_requirements::role.eq(scope))
            .filter(order_requirements::is_active.eq(true))
            .order(order_requirements::created_at.desc())
            .select(order_requirements::min_quantity)
            .first::<i32>(&mut conn)
            .await
            .optional()?;
        Ok(minimum)
    }

    async fn wholesale_min_quantity(&self) -> anyhow::Result<Option<i32>> {
        let mut conn = self.pool.get().await?;
        let minimum = wholesale_rules::table
            .filter(wholesale_rules::is_active.eq(true))
            .order(wholesale_rules::created_at.desc())
            .select(wholesale_rules::min_quantity)
            .first::<i32>(&mut conn)
            .await
            .optional()?;
        Ok(minimum)
    }

    async fn is_wholesale_eligible(&self, user_id: Uuid) -> anyhow::Result<bool> {
        let mut conn = self.pool.get().await?;
        let eligible = users::table
            .filter(users::id.eq(user_id))
            .select(users::wholesale_eligibility)
            .first::<bool>(&mut conn)
            .await
            .optional()?;
        Ok(eligible.unwrap_or(false))
    }
}

#[async_trait]
impl ProductCatalog for PgCheckoutStore {
    async fn products_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<CatalogProduct>> {
        let mut conn = self.pool.get().await?;
        let rows = products::table
            .filter(products::id.eq_any(ids.to_vec()))
            .load::<DbProduct>(&mut conn)
            .await?;
        Ok(rows.into_iter().map(CatalogProduct::from).collect())
    }
}

#[async_trait]
impl CheckoutStore for PgCheckoutStore {
    async fn available_stock(&self, product_id: Uuid, location_id: &str) -> anyhow::Result<i32> {
        let mut conn = self.pool.get().await?;
        let record = inventory_pg::level(&mut conn, product_id, location_id).await?;
        Ok(record.available())
    }

    async fn find_discount(&self, code: &str) -> anyhow::Result<Option<DiscountCode>> {
        let mut conn = self.pool.get().await?;
        let row = discount_codes::table
            .filter(discount_codes::code.eq(code))
            .first::<DbDiscountCode>(&mut conn)
            .await
            .optional()?;
        row.map(DiscountCode::try_from).transpose()
    }

    async fn customer_contact(&self, user_id: Uuid) -> anyhow::Result<Option<CustomerContact>> {
        let mut conn = self.pool.get().await?;
        let contact = users::table
            .filter(users::id.eq(user_id))
            .select((users::email, users::name))
            .first::<CustomerContact>(&mut conn)
            .await
            .optional()?;
        Ok(contact)
    }

    async fn commit_order(&self, draft: OrderDraft) -> Result<PersistedOrder, CheckoutError> {
        let persisted = PersistedOrder {
            order_id: draft.order_id,
            status: draft.status,
            payment_status: draft.payment_status,
        };
        let order = draft.to_order().map_err(anyhow::Error::from)?;
        let items = draft.to_items();
        let history = NewStatusHistory::new(draft.order_id, draft.status, Some("order placed"));
        let event = DbOutboxEvent::from(
            OutboxEvent::order_placed(&draft.placed_event()).map_err(anyhow::Error::from)?,
        );

        let mut conn = self.pool.get().await.map_err(anyhow::Error::from)?;
        let conn: &mut AsyncPgConnection = &mut conn;
        conn.transaction::<_, CheckoutError, _>(|conn| {
            Box::pin(async move {
                diesel::insert_into(orders::table)
                    .values(&order)
                    .execute(conn)
                    .await?;

                diesel::insert_into(order_items::table)
                    .values(&items)
                    .execute(conn)
                    .await?;

                // Strictly one statement at a time on this connection. Ascending
                // product order keeps concurrent orders from deadlocking on rows.
                let mut lines = draft.lines.clone();
                lines.sort_by_key(|line| line.product_id);
                for line in &lines {
                    inventory_pg::decrement_for_order(
                        conn,
                        line.product_id,
                        &draft.location_id,
                        line.quantity,
                        draft.order_id,
                        Some(draft.user_id),
                    )
                    .await
                    .map_err(|e| CheckoutError::from_ledger(e, &line.name))?;
                }

                if draft.upgrade_to_wholesale {
                    diesel::update(
                        users::table
                            .filter(users::id.eq(draft.user_id))
                            .filter(users::wholesale_eligibility.eq(false)),
                    )
                    .set((
                        users::wholesale_eligibility.eq(true),
                        users::wholesale_approved_at.eq(Some(Utc::now())),
                    ))
                    .execute(conn)
                    .await?;
                }

                if let Some(code) = &draft.discount_code {
                    let redeemed = diesel::update(
                        discount_codes::table
                            .filter(discount_codes::code.eq(code.as_str()))
                            .filter(discount_codes::is_active.eq(true))
                            .filter(
                                discount_codes::ends_at
                                    .is_null()
                                    .or(discount_codes::ends_at.ge(Utc::now())),
                            )
                            .filter(
                                discount_codes::usage_limit
                                    .is_null()
                                    .or(discount_codes::times_used.nullable().lt(discount_codes::usage_limit)),
                            ),
                    )
                    .set(discount_codes::times_used.eq(discount_codes::times_used + 1))
                    .execute(conn)
                    .await?;

                    if redeemed == 0 {
                        return Err(CheckoutError::DiscountExhausted(code.clone()));
                    }
                }

                diesel::insert_into(order_status_history::table)
                    .values(&history)
                    .execute(conn)
                    .await?;

                diesel::insert_into(outbox_events::table)
                    .values(&event)
                    .execute(conn)
                    .await?;

                Ok(())
            })
        })
        .await?;

        Ok(persisted)
    }

    async fn record_payment(&self, order_id: Uuid, result: &PaymentResult) -> anyhow::Result<()> {
        let status = if result.success { result.status } else { PaymentStatus::Failed };
        let transaction_id = result.transaction_id.clone();
        let event = DbOutboxEvent::from(OutboxEvent::payment_recorded(&PaymentRecordedEvent {
            order_id,
            payment_status: status,
            transaction_id: transaction_id.clone(),
        })?);

        let mut conn = self.pool.get().await?;
        let conn: &mut AsyncPgConnection = &mut conn;
        conn.transaction::<_, anyhow::Error, _>(|conn| {
            Box::pin(async move {
                let updated = diesel::update(orders::table.filter(orders::id.eq(order_id)))
                    .set((
                        orders::payment_status.eq(status.as_str()),
                        orders::payment_transaction_id.eq(transaction_id),
                        orders::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)
                    .await?;
                if updated == 0 {
                    anyhow::bail!("order {} not found", order_id);
                }

                diesel::insert_into(outbox_events::table)
                    .values(&event)
                    .execute(conn)
                    .await?;
                Ok(())
            })
        })
        .await?;

        info!("Recorded payment status {} for order {}", status.as_str(), order_id);
        Ok(())
    }
}
