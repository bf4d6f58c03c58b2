//! SQLite database operations.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::{Feature, Subscription, SubscriptionStatus, UsageRecord, UserAccount, UserId};

use super::QuotaStore;
use super::error::StoreError;
use super::models::{SubscriptionRow, UserRow, parse_timestamp, timestamp};

/// SQLite-backed store.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create the database at the given path.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        debug!(path = %db_path.display(), "database ready");
        Ok(db)
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                email_verified INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS access_tokens (
                token_hash TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_used_at TEXT,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                plan_id TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id, updated_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feature_usage (
                user_id TEXT PRIMARY KEY,
                last_reset TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        self.ensure_usage_columns().await
    }

    /// Add a count column for every feature the table does not have yet.
    async fn ensure_usage_columns(&self) -> Result<(), StoreError> {
        let existing: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('feature_usage')")
                .fetch_all(&self.pool)
                .await?;

        for feature in Feature::ALL {
            let column = feature.column();
            if existing.iter().any(|c| c == column) {
                continue;
            }

            info!(column, "adding usage column");
            sqlx::query(&format!(
                "ALTER TABLE feature_usage ADD COLUMN {column} INTEGER NOT NULL DEFAULT 0"
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    // ==================== User Operations ====================

    /// Create a user account.
    pub async fn create_user(
        &self,
        email: &str,
        email_verified: bool,
    ) -> Result<UserAccount, StoreError> {
        let account = UserAccount {
            id: Uuid::new_v4(),
            email: email.trim().to_lowercase(),
            email_verified,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO users (id, email, email_verified, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(account.id.to_string())
        .bind(&account.email)
        .bind(account.email_verified)
        .bind(timestamp(account.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, format!("user {}", account.email)))?;

        Ok(account)
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserAccount::try_from).transpose()
    }

    // ==================== Access Token Operations ====================

    /// Store a token hash for a user.
    pub async fn insert_access_token(
        &self,
        user_id: UserId,
        name: &str,
        token_hash: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO access_tokens (token_hash, user_id, name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token_hash)
        .bind(user_id.to_string())
        .bind(name)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, format!("access token {}", name)))?;

        Ok(())
    }

    /// Resolve a token hash to its user and record the use.
    pub async fn find_user_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.email, u.email_verified, u.created_at
            FROM access_tokens t
            JOIN users u ON t.user_id = u.id
            WHERE t.token_hash = ?
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query("UPDATE access_tokens SET last_used_at = ? WHERE token_hash = ?")
            .bind(timestamp(Utc::now()))
            .bind(token_hash)
            .execute(&self.pool)
            .await?;

        UserAccount::try_from(row).map(Some)
    }

    // ==================== Subscription Operations ====================

    /// Record a subscription state. The most recently updated row is authoritative.
    pub async fn record_subscription(
        &self,
        user_id: UserId,
        plan_id: &str,
        status: SubscriptionStatus,
    ) -> Result<Subscription, StoreError> {
        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id,
            plan_id: plan_id.to_string(),
            status,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, plan_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(subscription.id.to_string())
        .bind(user_id.to_string())
        .bind(&subscription.plan_id)
        .bind(status.as_str())
        .bind(timestamp(now))
        .bind(timestamp(now))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, format!("user {}", user_id)))?;

        Ok(subscription)
    }

    /// All subscription rows for a user, newest first.
    pub async fn list_subscriptions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT * FROM subscriptions WHERE user_id = ? ORDER BY updated_at DESC, created_at DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}

#[async_trait]
impl QuotaStore for Database {
    async fn latest_subscription(
        &self,
        user_id: UserId,
    ) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT * FROM subscriptions
            WHERE user_id = ?
            ORDER BY updated_at DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    async fn usage(&self, user_id: UserId) -> Result<Option<UsageRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM feature_usage WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let last_reset: String = row.try_get("last_reset")?;
        let mut record = UsageRecord::empty(user_id, parse_timestamp(&last_reset)?);

        for feature in Feature::ALL {
            let count: i64 = row.try_get(feature.column())?;
            let count = u32::try_from(count).map_err(|_| {
                StoreError::Corrupt(format!("{} count out of range: {}", feature, count))
            })?;
            record.counts.insert(feature, count);
        }

        Ok(Some(record))
    }

    async fn increment_usage(
        &self,
        user_id: UserId,
        feature: Feature,
        now: DateTime<Utc>,
    ) -> Result<u32, StoreError> {
        let column = feature.column();

        let count: i64 = sqlx::query_scalar(&format!(
            r#"
            INSERT INTO feature_usage (user_id, last_reset, {column})
            VALUES (?, ?, 1)
            ON CONFLICT(user_id) DO UPDATE SET {column} = {column} + 1
            RETURNING {column}
            "#
        ))
        .bind(user_id.to_string())
        .bind(timestamp(now))
        .fetch_one(&self.pool)
        .await?;

        u32::try_from(count)
            .map_err(|_| StoreError::Corrupt(format!("{} count out of range: {}", feature, count)))
    }

    async fn reset_if_stale(
        &self,
        user_id: UserId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE feature_usage SET {}, last_reset = ? WHERE user_id = ? AND last_reset < ?",
            zero_assignments()
        ))
        .bind(timestamp(now))
        .bind(user_id.to_string())
        .bind(timestamp(cutoff))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn reset_all_usage(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(&format!(
            "UPDATE feature_usage SET {}, last_reset = ?",
            zero_assignments()
        ))
        .bind(timestamp(now))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }
}

/// `ai_chat = 0, ai_detector = 0, ...` for every feature column.
fn zero_assignments() -> String {
    Feature::ALL
        .iter()
        .map(|f| format!("{} = 0", f.column()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    async fn open_db(dir: &tempfile::TempDir) -> Database {
        Database::open(&dir.path().join("toolhub.sqlite"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let user = db.create_user("Ada@Example.com", true).await.unwrap();
        assert_eq!(user.email, "ada@example.com");

        let found = db.find_user_by_email("ADA@example.com").await.unwrap();
        assert_eq!(found, Some(user));
        assert_eq!(db.find_user_by_email("nobody@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        db.create_user("dup@example.com", false).await.unwrap();
        let err = db.create_user("dup@example.com", false).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_token_lookup() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let user = db.create_user("token@example.com", true).await.unwrap();
        db.insert_access_token(user.id, "cli", "abc123").await.unwrap();

        let found = db.find_user_by_token_hash("abc123").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(db.find_user_by_token_hash("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_subscription_wins() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let user = db.create_user("sub@example.com", true).await.unwrap();

        assert!(db.latest_subscription(user.id).await.unwrap().is_none());

        db.record_subscription(user.id, "price_pro", SubscriptionStatus::Active)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.record_subscription(user.id, "price_pro", SubscriptionStatus::Canceled)
            .await
            .unwrap();

        let latest = db.latest_subscription(user.id).await.unwrap().unwrap();
        assert_eq!(latest.status, SubscriptionStatus::Canceled);
        assert_eq!(db.list_subscriptions(user.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_subscription_for_unknown_user_is_not_found() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;

        let err = db
            .record_subscription(Uuid::new_v4(), "price_pro", SubscriptionStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_increment_creates_row_lazily() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let user = db.create_user("count@example.com", true).await.unwrap();

        assert!(db.usage(user.id).await.unwrap().is_none());

        let now = Utc::now();
        assert_eq!(db.increment_usage(user.id, Feature::AiChat, now).await.unwrap(), 1);
        assert_eq!(db.increment_usage(user.id, Feature::AiChat, now).await.unwrap(), 2);
        assert_eq!(
            db.increment_usage(user.id, Feature::UrlShortener, now).await.unwrap(),
            1
        );

        let usage = db.usage(user.id).await.unwrap().unwrap();
        assert_eq!(usage.count(Feature::AiChat), 2);
        assert_eq!(usage.count(Feature::UrlShortener), 1);
        assert_eq!(usage.count(Feature::Translator), 0);
    }

    #[tokio::test]
    async fn test_reset_all_usage() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let alice = db.create_user("alice@example.com", true).await.unwrap();
        let bob = db.create_user("bob@example.com", true).await.unwrap();

        let earlier = Utc.with_ymd_and_hms(2024, 3, 8, 10, 0, 0).unwrap();
        for _ in 0..3 {
            db.increment_usage(alice.id, Feature::CodeRunner, earlier).await.unwrap();
        }
        db.increment_usage(bob.id, Feature::SeoAnalyzer, earlier).await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(db.reset_all_usage(now).await.unwrap(), 2);

        for user in [alice.id, bob.id] {
            let usage = db.usage(user).await.unwrap().unwrap();
            assert!(Feature::ALL.iter().all(|f| usage.count(*f) == 0));
            assert_eq!(usage.last_reset, now);
        }
    }

    #[tokio::test]
    async fn test_reset_if_stale() {
        let dir = tempdir().unwrap();
        let db = open_db(&dir).await;
        let user = db.create_user("stale@example.com", true).await.unwrap();

        let yesterday = Utc.with_ymd_and_hms(2024, 3, 8, 22, 0, 0).unwrap();
        db.increment_usage(user.id, Feature::Translator, yesterday).await.unwrap();

        let now = yesterday + Duration::hours(4);
        let cutoff = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();

        assert!(db.reset_if_stale(user.id, cutoff, now).await.unwrap());
        assert!(!db.reset_if_stale(user.id, cutoff, now).await.unwrap());

        let usage = db.usage(user.id).await.unwrap().unwrap();
        assert_eq!(usage.count(Feature::Translator), 0);
        assert_eq!(usage.last_reset, now);
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let user_id = {
            let db = open_db(&dir).await;
            let user = db.create_user("persist@example.com", true).await.unwrap();
            db.increment_usage(user.id, Feature::AiDetector, Utc::now())
                .await
                .unwrap();
            user.id
        };

        let db = open_db(&dir).await;
        let usage = db.usage(user_id).await.unwrap().unwrap();
        assert_eq!(usage.count(Feature::AiDetector), 1);
    }
}
