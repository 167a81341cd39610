//! Database operations for the `influencers` table.

use chrono::{DateTime, Utc};
use influ_core::{Channel, Influencer, InfluencerConfig};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `influencers` table.
#[derive(Clone, sqlx::FromRow)]
pub struct InfluencerRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub social_account_id: Option<String>,
    pub access_token: Option<String>,
    pub channels: Json<Vec<Channel>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for InfluencerRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluencerRow")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("social_account_id", &self.social_account_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("channels", &self.channels.0)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl From<InfluencerRow> for Influencer {
    fn from(row: InfluencerRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            social_account_id: row.social_account_id,
            access_token: row.access_token,
            channels: row.channels.0,
        }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, name, email, social_account_id, access_token, channels, \
                              created_at, updated_at \
                              FROM influencers";

/// Looks up one influencer by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_influencer(pool: &PgPool, id: i64) -> Result<Option<Influencer>, DbError> {
    let row = sqlx::query_as::<_, InfluencerRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(Influencer::from))
}

/// Returns every influencer whose account id and access token are both
/// non-blank, ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_influencers_with_credentials(pool: &PgPool) -> Result<Vec<Influencer>, DbError> {
    let rows = sqlx::query_as::<_, InfluencerRow>(&format!(
        "{SELECT_COLUMNS} \
         WHERE BTRIM(COALESCE(social_account_id, '')) <> '' \
           AND BTRIM(COALESCE(access_token, '')) <> '' \
         ORDER BY id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Influencer::from).collect())
}

/// Upserts influencer identities from config, keyed by lower-cased email.
///
/// Credentials absent from the config keep their stored values, so tokens
/// provisioned outside the seed file survive a re-seed. All upserts run in one
/// transaction.
///
/// Returns the number of influencers processed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is committed.
pub async fn seed_influencers(
    pool: &PgPool,
    influencers: &[InfluencerConfig],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for influencer in influencers {
        sqlx::query(
            "INSERT INTO influencers (name, email, social_account_id, access_token, channels) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (email) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 social_account_id = COALESCE(EXCLUDED.social_account_id, influencers.social_account_id), \
                 access_token = COALESCE(EXCLUDED.access_token, influencers.access_token), \
                 channels = EXCLUDED.channels, \
                 updated_at = NOW()",
        )
        .bind(influencer.name.trim())
        .bind(influencer.email.trim().to_lowercase())
        .bind(&influencer.social_account_id)
        .bind(&influencer.access_token)
        .bind(Json(&influencer.channels))
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
