use crate::schema::{Event, EventFilter, Verification};
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait EventRepository: Send + Sync {
    async fn list(&self, filter: &EventFilter) -> anyhow::Result<Vec<Event>>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Event>>;
    /// Writes the metadata columns of `event`. Verification columns are untouched.
    async fn update_details(&self, event: &Event) -> anyhow::Result<Option<Event>>;
    async fn update_verification(
        &self,
        id: Uuid,
        verification: &Verification,
    ) -> anyhow::Result<Option<Event>>;
}

const EVENT_COLUMNS: &str = r#"
    id, title, description, location, category, starts_at, ends_at,
    is_verified, verified_at, verified_by, verified_badge_image,
    created_at, updated_at
"#;

/// `ILIKE` pattern matching `needle` literally anywhere in the text.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl EventRepository for PgEventRepository {
    async fn list(&self, filter: &EventFilter) -> anyhow::Result<Vec<Event>> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE ($1::text IS NULL OR title ILIKE $1 ESCAPE '\')
              AND ($2::boolean IS NULL OR is_verified = $2)
            ORDER BY starts_at DESC NULLS LAST, created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        );

        let events = sqlx::query_as::<_, Event>(&sql)
            .bind(filter.search.as_deref().map(contains_pattern))
            .bind(filter.verified)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let event = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    async fn update_details(&self, event: &Event) -> anyhow::Result<Option<Event>> {
        let sql = format!(
            r#"
            UPDATE events
            SET title = $2, description = $3, location = $4, category = $5,
                starts_at = $6, ends_at = $7, updated_at = now()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Event>(&sql)
            .bind(event.id)
            .bind(&event.title)
            .bind(event.description.as_deref())
            .bind(event.location.as_deref())
            .bind(event.category.as_deref())
            .bind(event.starts_at)
            .bind(event.ends_at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn update_verification(
        &self,
        id: Uuid,
        verification: &Verification,
    ) -> anyhow::Result<Option<Event>> {
        let sql = format!(
            r#"
            UPDATE events
            SET is_verified = $2, verified_at = $3, verified_by = $4,
                verified_badge_image = $5, updated_at = now()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(verification.is_verified)
            .bind(verification.verified_at)
            .bind(verification.verified_by.as_deref())
            .bind(verification.verified_badge_image.as_deref())
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }
}
