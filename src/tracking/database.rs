use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use std::path::Path;

use super::types::{Listing, ListingStatus, Platform};
use crate::core::error::{Result, TrackerError};

/// Storage the tracking engine reads candidates from and writes changes to.
///
/// Every write touches a single row and is atomic on its own.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Listings whose status is in `statuses`, ordered by id, starting
    /// strictly after `after_id`.
    async fn find_by_statuses(
        &self,
        statuses: &[ListingStatus],
        after_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Listing>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Listing>>;

    async fn update_status(&self, id: &str, status: ListingStatus) -> Result<()>;

    async fn update_price_and_notes(&self, id: &str, asking_price: f64, notes: &str)
        -> Result<()>;
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ListingRow {
    id: String,
    user_id: String,
    title: String,
    platform: String,
    url: String,
    asking_price: f64,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = TrackerError;

    fn try_from(row: ListingRow) -> Result<Self> {
        Ok(Listing {
            platform: row.platform.parse::<Platform>()?,
            status: row.status.parse::<ListingStatus>()?,
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            url: row.url,
            asking_price: row.asking_price,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub user_id: String,
    pub title: String,
    pub platform: Platform,
    pub url: String,
    pub asking_price: f64,
    pub status: ListingStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingStatistics {
    pub total_listings: usize,
    pub trackable_listings: usize,
    pub by_status: HashMap<String, usize>,
}

pub struct ListingDatabase {
    pool: SqlitePool,
}

impl ListingDatabase {
    pub async fn new(database_path: &str) -> Result<Self> {
        let connection_string = if database_path.starts_with("sqlite:") {
            database_path.to_string()
        } else {
            if let Some(parent) = Path::new(database_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            format!("sqlite://{}?mode=rwc", database_path)
        };

        // Each connection to an in-memory database sees its own empty copy,
        // so keep exactly one alive for the pool's lifetime.
        let options = if connection_string.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(&connection_string).await?;

        let db = Self { pool };
        db.initialize_schema().await?;

        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                platform TEXT NOT NULL,
                url TEXT NOT NULL,
                asking_price REAL NOT NULL,
                status TEXT NOT NULL,
                notes TEXT,
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_listings_status
            ON listings(status, id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("✅ Listing database schema initialized");

        Ok(())
    }

    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn insert_listing(&self, listing: NewListing) -> Result<Listing> {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO listings (
                id, user_id, title, platform, url, asking_price,
                status, notes, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&listing.user_id)
        .bind(&listing.title)
        .bind(listing.platform.as_str())
        .bind(&listing.url)
        .bind(listing.asking_price)
        .bind(listing.status.as_str())
        .bind(&listing.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Listing {
            id,
            user_id: listing.user_id,
            title: listing.title,
            platform: listing.platform,
            url: listing.url,
            asking_price: listing.asking_price,
            status: listing.status,
            notes: listing.notes,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn delete_listing(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM listings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_statistics(&self) -> Result<ListingStatistics> {
        #[derive(sqlx::FromRow)]
        struct StatusCount {
            status: String,
            count: i64,
        }

        let counts = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*) as count FROM listings GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = ListingStatistics::default();
        for row in counts {
            let count = row.count as usize;
            stats.total_listings += count;
            if row
                .status
                .parse::<ListingStatus>()
                .map_or(false, |s| s.is_trackable())
            {
                stats.trackable_listings += count;
            }
            stats.by_status.insert(row.status, count);
        }

        Ok(stats)
    }
}

#[async_trait]
impl ListingRepository for ListingDatabase {
    async fn find_by_statuses(
        &self,
        statuses: &[ListingStatus],
        after_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Listing>> {
        if statuses.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM listings WHERE status IN (");
        let mut separated = query.separated(", ");
        for status in statuses {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(")");

        if let Some(after_id) = after_id {
            query.push(" AND id > ").push_bind(after_id.to_string());
        }
        query.push(" ORDER BY id LIMIT ").push_bind(limit as i64);

        let rows = query
            .build_query_as::<ListingRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Listing>> {
        let row = sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT * FROM listings WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Listing::try_from).transpose()
    }

    async fn update_status(&self, id: &str, status: ListingStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE listings SET status = ?, updated_at = ? WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TrackerError::ListingNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn update_price_and_notes(
        &self,
        id: &str,
        asking_price: f64,
        notes: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE listings SET asking_price = ?, notes = ?, updated_at = ? WHERE id = ?
            "#,
        )
        .bind(asking_price)
        .bind(notes)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TrackerError::ListingNotFound(id.to_string()));
        }
        Ok(())
    }
}
