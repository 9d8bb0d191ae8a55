use super::traits::OfferRepository;
use crate::domain::{CounterTerms, Offer, OfferStatus, OfferType};
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

const OFFER_COLUMNS: &str = "id, conversation_id, offer_type, service, description, deliverables, \
     terms, price, currency, delivery_time, revisions, valid_until, status, counter_price, \
     counter_delivery_time, counter_revisions, counter_terms, counter_message, sender_id, \
     recipient_id, parent_offer_id, follow_up_offer_id, created_at, updated_at";

/// Flat row shape; the counter proposal is stored in `counter_*` columns.
#[derive(Debug, FromRow)]
struct OfferRow {
    id: Uuid,
    conversation_id: Uuid,
    offer_type: OfferType,
    service: String,
    description: Option<String>,
    deliverables: Vec<String>,
    terms: Option<String>,
    price: Decimal,
    currency: String,
    delivery_time: i32,
    revisions: i32,
    valid_until: DateTime<Utc>,
    status: OfferStatus,
    counter_price: Option<Decimal>,
    counter_delivery_time: Option<i32>,
    counter_revisions: Option<i32>,
    counter_terms: Option<String>,
    counter_message: Option<String>,
    sender_id: Uuid,
    recipient_id: Uuid,
    parent_offer_id: Option<Uuid>,
    follow_up_offer_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OfferRow> for Offer {
    fn from(row: OfferRow) -> Self {
        let counter_offer = match (
            row.counter_price,
            row.counter_delivery_time,
            row.counter_revisions,
        ) {
            (Some(price), Some(delivery_time), Some(revisions)) => Some(CounterTerms {
                price,
                delivery_time,
                revisions,
                terms: row.counter_terms,
                message: row.counter_message,
            }),
            _ => None,
        };

        Offer {
            id: row.id,
            conversation_id: row.conversation_id,
            offer_type: row.offer_type,
            service: row.service,
            description: row.description,
            deliverables: row.deliverables,
            terms: row.terms,
            price: row.price,
            currency: row.currency,
            delivery_time: row.delivery_time,
            revisions: row.revisions,
            valid_until: row.valid_until,
            status: row.status,
            counter_offer,
            sender_id: row.sender_id,
            recipient_id: row.recipient_id,
            parent_offer_id: row.parent_offer_id,
            follow_up_offer_id: row.follow_up_offer_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct OfferRepositoryImpl {
    pool: PgPool,
}

impl OfferRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_offer<'e, E>(executor: E, offer: &Offer) -> AppResult<Offer>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let counter = offer.counter_offer.as_ref();
    let row = sqlx::query_as::<_, OfferRow>(&format!(
        r#"
        INSERT INTO offers (id, conversation_id, offer_type, service, description, deliverables,
                            terms, price, currency, delivery_time, revisions, valid_until, status,
                            counter_price, counter_delivery_time, counter_revisions, counter_terms,
                            counter_message, sender_id, recipient_id, parent_offer_id,
                            follow_up_offer_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24)
        RETURNING {OFFER_COLUMNS}
        "#
    ))
    .bind(offer.id)
    .bind(offer.conversation_id)
    .bind(offer.offer_type)
    .bind(&offer.service)
    .bind(&offer.description)
    .bind(&offer.deliverables)
    .bind(&offer.terms)
    .bind(offer.price)
    .bind(&offer.currency)
    .bind(offer.delivery_time)
    .bind(offer.revisions)
    .bind(offer.valid_until)
    .bind(offer.status)
    .bind(counter.map(|c| c.price))
    .bind(counter.map(|c| c.delivery_time))
    .bind(counter.map(|c| c.revisions))
    .bind(counter.and_then(|c| c.terms.clone()))
    .bind(counter.and_then(|c| c.message.clone()))
    .bind(offer.sender_id)
    .bind(offer.recipient_id)
    .bind(offer.parent_offer_id)
    .bind(offer.follow_up_offer_id)
    .bind(offer.created_at)
    .bind(offer.updated_at)
    .fetch_one(executor)
    .await?;
    Ok(row.into())
}

#[async_trait]
impl OfferRepository for OfferRepositoryImpl {
    async fn create(&self, offer: &Offer) -> AppResult<Offer> {
        insert_offer(&self.pool, offer).await
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Offer>> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Offer::from))
    }

    async fn find_by_conversation(&self, conversation_id: Uuid) -> AppResult<Vec<Offer>> {
        let rows = sqlx::query_as::<_, OfferRow>(&format!(
            r#"
            SELECT {OFFER_COLUMNS} FROM offers
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Offer::from).collect())
    }

    async fn transition_status(
        &self,
        id: Uuid,
        expected: OfferStatus,
        next: OfferStatus,
        counter: Option<&CounterTerms>,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Offer>> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            r#"
            UPDATE offers
            SET status = $3,
                counter_price = COALESCE($4, counter_price),
                counter_delivery_time = COALESCE($5, counter_delivery_time),
                counter_revisions = COALESCE($6, counter_revisions),
                counter_terms = CASE WHEN $4 IS NULL THEN counter_terms ELSE $7 END,
                counter_message = CASE WHEN $4 IS NULL THEN counter_message ELSE $8 END,
                updated_at = $9
            WHERE id = $1 AND status = $2 AND valid_until >= $9
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected)
        .bind(next)
        .bind(counter.map(|c| c.price))
        .bind(counter.map(|c| c.delivery_time))
        .bind(counter.map(|c| c.revisions))
        .bind(counter.and_then(|c| c.terms.clone()))
        .bind(counter.and_then(|c| c.message.clone()))
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Offer::from))
    }

    async fn spawn_follow_up(
        &self,
        original_id: Uuid,
        follow_up: &Offer,
    ) -> AppResult<Option<Offer>> {
        let mut tx = self.pool.begin().await?;

        let created = insert_offer(&mut *tx, follow_up).await?;
        let claimed = sqlx::query(
            r#"
            UPDATE offers
            SET follow_up_offer_id = $2, updated_at = $3
            WHERE id = $1 AND status = 'countered' AND follow_up_offer_id IS NULL
            "#,
        )
        .bind(original_id)
        .bind(created.id)
        .bind(created.created_at)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(created))
    }

    async fn find_expired_pending(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<Offer>> {
        let rows = sqlx::query_as::<_, OfferRow>(&format!(
            r#"
            SELECT {OFFER_COLUMNS} FROM offers
            WHERE status = 'pending' AND valid_until < $1
            ORDER BY valid_until ASC
            LIMIT $2
            "#
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Offer::from).collect())
    }

    async fn mark_expired(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<Offer>> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            r#"
            UPDATE offers
            SET status = 'expired', updated_at = $2
            WHERE id = $1 AND status = 'pending' AND valid_until < $2
            RETURNING {OFFER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Offer::from))
    }
}
