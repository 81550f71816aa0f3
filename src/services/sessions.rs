use crate::schema::Actor;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

/// Resolves an opaque session token to the user behind it.
#[async_trait::async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn resolve(&self, token: &str) -> anyhow::Result<Option<Actor>>;
}

/// Sessions stored as SHA-256 digests of their tokens.
pub struct PgSessionStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SessionUser {
    id: Uuid,
    email: String,
    role: String,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[async_trait::async_trait]
impl SessionVerifier for PgSessionStore {
    async fn resolve(&self, token: &str) -> anyhow::Result<Option<Actor>> {
        let row = sqlx::query_as::<_, SessionUser>(
            r#"
            SELECT u.id, u.email, u.role
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = $1 AND s.expires_at > now()
            "#,
        )
        .bind(token_digest(token))
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Actor {
            id: row.id,
            email: row.email,
            role: row.role.parse()?,
        }))
    }
}
