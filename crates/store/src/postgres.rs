use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use common::{EventId, Money, OrderId, RequestId, StoreId};
use domain::{
    FulfillmentRequest, FulfillmentRequestItem, FulfillmentStatus, Provider, ProviderEvent,
    Shipment,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{
    FulfillmentStore, NewFulfillmentRequest, NewProviderEvent, NewShipment, StatusUpdate,
};

const REQUEST_COLUMNS: &str = "id, store_id, order_id, provider, provider_mapping_id, \
     external_id, status, cost_estimate, cost_actual, shipping_cost, tax, currency, \
     refund_id, refund_amount, refund_status, error_message, submitted_at, completed_at, \
     created_at, updated_at";

/// PostgreSQL-backed fulfillment store.
///
/// The `(provider, external_event_id)` partial unique index on
/// `provider_events` is the synchronization primitive for concurrent
/// ingestion; inserts race through `ON CONFLICT DO NOTHING`.
#[derive(Clone)]
pub struct PostgresFulfillmentStore {
    pool: PgPool,
}

impl PostgresFulfillmentStore {
    /// Creates a new PostgreSQL fulfillment store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_request(row: &PgRow) -> Result<FulfillmentRequest> {
        let provider: String = row.try_get("provider")?;
        let status: String = row.try_get("status")?;

        Ok(FulfillmentRequest {
            id: RequestId::from_uuid(row.try_get::<Uuid, _>("id")?),
            store_id: StoreId::from_uuid(row.try_get::<Uuid, _>("store_id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            provider: Provider::from_str(&provider)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            provider_mapping_id: row.try_get("provider_mapping_id")?,
            external_id: row.try_get("external_id")?,
            status: FulfillmentStatus::from_str(&status)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            items: Vec::new(),
            cost_estimate: row
                .try_get::<Option<i64>, _>("cost_estimate")?
                .map(Money::from_cents),
            cost_actual: row
                .try_get::<Option<i64>, _>("cost_actual")?
                .map(Money::from_cents),
            shipping_cost: row
                .try_get::<Option<i64>, _>("shipping_cost")?
                .map(Money::from_cents),
            tax: row.try_get::<Option<i64>, _>("tax")?.map(Money::from_cents),
            currency: row.try_get("currency")?,
            refund_id: row.try_get("refund_id")?,
            refund_amount: row
                .try_get::<Option<i64>, _>("refund_amount")?
                .map(Money::from_cents),
            refund_status: row.try_get("refund_status")?,
            error_message: row.try_get("error_message")?,
            submitted_at: row.try_get("submitted_at")?,
            completed_at: row.try_get("completed_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_item(row: &PgRow) -> Result<FulfillmentRequestItem> {
        Ok(FulfillmentRequestItem {
            id: row.try_get("id")?,
            request_id: RequestId::from_uuid(row.try_get::<Uuid, _>("request_id")?),
            order_item_id: row.try_get("order_item_id")?,
            provider_line_id: row.try_get("provider_line_id")?,
            sku: row.try_get("sku")?,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
        })
    }

    fn row_to_shipment(row: &PgRow) -> Result<Shipment> {
        Ok(Shipment {
            id: row.try_get("id")?,
            request_id: RequestId::from_uuid(row.try_get::<Uuid, _>("request_id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            carrier: row.try_get("carrier")?,
            tracking_number: row.try_get("tracking_number")?,
            tracking_url: row.try_get("tracking_url")?,
            status: row.try_get("status")?,
            shipped_at: row.try_get("shipped_at")?,
            delivered_at: row.try_get("delivered_at")?,
            raw: row.try_get("raw")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_event(row: &PgRow) -> Result<ProviderEvent> {
        let provider: String = row.try_get("provider")?;
        Ok(ProviderEvent {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            provider: Provider::from_str(&provider)
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            external_event_id: row.try_get("external_event_id")?,
            external_order_id: row.try_get("external_order_id")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            received_at: row.try_get("received_at")?,
            processed_at: row.try_get("processed_at")?,
        })
    }

    /// Attaches items to a batch of requests with one query.
    async fn attach_items(&self, requests: &mut [FulfillmentRequest]) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }

        let ids: Vec<Uuid> = requests.iter().map(|r| r.id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, request_id, order_item_id, provider_line_id, sku, quantity
            FROM fulfillment_request_items
            WHERE request_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let item = Self::row_to_item(&row)?;
            if let Some(request) = requests.iter_mut().find(|r| r.id == item.request_id) {
                request.items.push(item);
            }
        }
        Ok(())
    }

    async fn fetch_requests(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<FulfillmentRequest>> {
        let rows = query.fetch_all(&self.pool).await?;
        let mut requests = rows
            .iter()
            .map(Self::row_to_request)
            .collect::<Result<Vec<_>>>()?;
        self.attach_items(&mut requests).await?;
        Ok(requests)
    }
}

#[async_trait]
impl FulfillmentStore for PostgresFulfillmentStore {
    async fn create_request(&self, new: NewFulfillmentRequest) -> Result<FulfillmentRequest> {
        let id = RequestId::new();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO fulfillment_requests
                (id, store_id, order_id, provider, provider_mapping_id, status,
                 cost_estimate, currency, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            "#,
        )
        .bind(id.as_uuid())
        .bind(new.store_id.as_uuid())
        .bind(new.order_id.as_uuid())
        .bind(new.provider.as_str())
        .bind(&new.provider_mapping_id)
        .bind(FulfillmentStatus::Pending.as_str())
        .bind(new.cost_estimate.map(|m| m.cents()))
        .bind(&new.currency)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(new.items.len());
        for item in new.items {
            let item_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO fulfillment_request_items
                    (id, request_id, order_item_id, sku, quantity, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(item_id)
            .bind(id.as_uuid())
            .bind(item.order_item_id)
            .bind(&item.sku)
            .bind(item.quantity as i32)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            items.push(FulfillmentRequestItem {
                id: item_id,
                request_id: id,
                order_item_id: item.order_item_id,
                provider_line_id: None,
                sku: item.sku,
                quantity: item.quantity,
            });
        }

        tx.commit().await?;

        Ok(FulfillmentRequest {
            id,
            store_id: new.store_id,
            order_id: new.order_id,
            provider: new.provider,
            provider_mapping_id: new.provider_mapping_id,
            external_id: None,
            status: FulfillmentStatus::Pending,
            items,
            cost_estimate: new.cost_estimate,
            cost_actual: None,
            shipping_cost: None,
            tax: None,
            currency: new.currency,
            refund_id: None,
            refund_amount: None,
            refund_status: None,
            error_message: None,
            submitted_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<FulfillmentRequest>> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM fulfillment_requests WHERE id = $1");
        let mut requests = self
            .fetch_requests(sqlx::query(&sql).bind(id.as_uuid()))
            .await?;
        Ok(requests.pop())
    }

    async fn find_by_order(&self, order_id: OrderId) -> Result<Vec<FulfillmentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM fulfillment_requests \
             WHERE order_id = $1 ORDER BY created_at ASC"
        );
        self.fetch_requests(sqlx::query(&sql).bind(order_id.as_uuid()))
            .await
    }

    async fn find_by_external_id(
        &self,
        provider: Provider,
        external_id: &str,
    ) -> Result<Option<FulfillmentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM fulfillment_requests \
             WHERE provider = $1 AND external_id = $2"
        );
        let mut requests = self
            .fetch_requests(sqlx::query(&sql).bind(provider.as_str()).bind(external_id))
            .await?;
        Ok(requests.pop())
    }

    async fn list_active_for_provider(
        &self,
        provider: Provider,
    ) -> Result<Vec<FulfillmentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM fulfillment_requests \
             WHERE provider = $1 AND status NOT IN ('delivered', 'cancelled') \
             ORDER BY created_at ASC"
        );
        self.fetch_requests(sqlx::query(&sql).bind(provider.as_str()))
            .await
    }

    async fn list_by_status(
        &self,
        status: FulfillmentStatus,
        provider: Option<Provider>,
    ) -> Result<Vec<FulfillmentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM fulfillment_requests \
             WHERE status = $1 AND ($2::text IS NULL OR provider = $2) \
             ORDER BY created_at ASC"
        );
        self.fetch_requests(
            sqlx::query(&sql)
                .bind(status.as_str())
                .bind(provider.map(|p| p.as_str())),
        )
        .await
    }

    async fn update_status(
        &self,
        id: RequestId,
        new_status: FulfillmentStatus,
        update: StatusUpdate,
    ) -> Result<FulfillmentRequest> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT status, external_id FROM fulfillment_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StoreError::RequestNotFound(id))?;

        let current_str: String = row.try_get("status")?;
        let current = FulfillmentStatus::from_str(&current_str)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let existing_external_id: Option<String> = row.try_get("external_id")?;

        if !current.can_transition(new_status) {
            return Err(StoreError::InvalidTransition {
                from: current,
                to: new_status,
            });
        }

        if let (Some(new_ext), Some(existing)) = (&update.external_id, &existing_external_id)
            && new_ext != existing
        {
            return Err(StoreError::ExternalIdAlreadySet(id));
        }

        let completes = matches!(
            new_status,
            FulfillmentStatus::Shipped | FulfillmentStatus::Delivered
        );

        sqlx::query(
            r#"
            UPDATE fulfillment_requests
            SET status = $2,
                updated_at = now(),
                completed_at = CASE WHEN $3 THEN now() ELSE completed_at END,
                external_id = COALESCE(external_id, $4),
                error_message = CASE WHEN $5 THEN NULL ELSE COALESCE($6, error_message) END,
                cost_actual = COALESCE($7, cost_actual),
                submitted_at = COALESCE($8, submitted_at)
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(new_status.as_str())
        .bind(completes)
        .bind(&update.external_id)
        .bind(update.clear_error)
        .bind(&update.error_message)
        .bind(update.cost_actual.map(|m| m.cents()))
        .bind(update.submitted_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.find_by_id(id)
            .await?
            .ok_or(StoreError::RequestNotFound(id))
    }

    async fn insert_provider_event(
        &self,
        event: NewProviderEvent,
    ) -> Result<Option<ProviderEvent>> {
        let row = sqlx::query(
            r#"
            INSERT INTO provider_events
                (id, provider, external_event_id, external_order_id, event_type, payload, received_at)
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (provider, external_event_id) WHERE external_event_id IS NOT NULL
            DO NOTHING
            RETURNING id, provider, external_event_id, external_order_id, event_type,
                      payload, received_at, processed_at
            "#,
        )
        .bind(EventId::new().as_uuid())
        .bind(event.provider.as_str())
        .bind(&event.external_event_id)
        .bind(&event.external_order_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_event).transpose()
    }

    async fn mark_event_processed(&self, event_id: EventId) -> Result<()> {
        let result = sqlx::query("UPDATE provider_events SET processed_at = now() WHERE id = $1")
            .bind(event_id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::EventNotFound);
        }
        Ok(())
    }

    async fn insert_shipment(&self, shipment: NewShipment) -> Result<Shipment> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let inserted = sqlx::query(
            r#"
            INSERT INTO shipments
                (id, request_id, order_id, carrier, tracking_number, tracking_url,
                 status, shipped_at, raw, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'shipped', $7, $8, $9)
            ON CONFLICT (request_id, tracking_number) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(shipment.request_id.as_uuid())
        .bind(shipment.order_id.as_uuid())
        .bind(&shipment.carrier)
        .bind(&shipment.tracking_number)
        .bind(&shipment.tracking_url)
        .bind(shipment.shipped_at)
        .bind(&shipment.raw)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            tracing::debug!(request_id = %shipment.request_id, "shipment already recorded, skipping");
            let row = sqlx::query(
                r#"
                SELECT id, request_id, order_id, carrier, tracking_number, tracking_url,
                       status, shipped_at, delivered_at, raw, created_at
                FROM shipments
                WHERE request_id = $1 AND tracking_number = $2
                "#,
            )
            .bind(shipment.request_id.as_uuid())
            .bind(&shipment.tracking_number)
            .fetch_one(&self.pool)
            .await?;
            return Self::row_to_shipment(&row);
        }

        Ok(Shipment {
            id,
            request_id: shipment.request_id,
            order_id: shipment.order_id,
            carrier: shipment.carrier,
            tracking_number: shipment.tracking_number,
            tracking_url: shipment.tracking_url,
            status: "shipped".to_string(),
            shipped_at: shipment.shipped_at,
            delivered_at: None,
            raw: shipment.raw,
            created_at: now,
        })
    }
}
