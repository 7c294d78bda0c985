use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;


/// Key-value state store with optional per-entry expiry.
#[derive(Clone)]
pub struct StateStore { pool: SqlitePool }


impl StateStore {
pub async fn new(path: &str) -> Result<Self> {
if let Some(parent) = Path::new(path).parent() {
    if !parent.as_os_str().is_empty() {
        tokio::fs::create_dir_all(parent).await?;
    }
}
let options = SqliteConnectOptions::new()
    .filename(path)
    .create_if_missing(true);
let pool = SqlitePoolOptions::new()
    .max_connections(4)
    .connect_with(options)
    .await
    .with_context(|| format!("failed to open state store at {}", path))?;
// run migrations / schema
sqlx::query(include_str!("../../sql/schema.sql")).execute(&pool).await?;
Ok(Self { pool })
}


pub async fn get(&self, key: &str) -> Result<Option<String>> {
    let row = sqlx::query_as::<_, (String,)>(
        "SELECT value FROM state WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)"
    )
    .bind(key)
    .bind(now_secs())
    .fetch_optional(&self.pool)
    .await?;

    Ok(row.map(|(value,)| value))
}

pub async fn put(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
    let expires_at = ttl.map(|ttl| expiry_after(now_secs(), ttl));
    sqlx::query(
        "INSERT INTO state(key, value, expires_at) VALUES (?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at"
    )
    .bind(key)
    .bind(value)
    .bind(expires_at)
    .execute(&self.pool)
    .await?;
    Ok(())
}

/// Returns whether a row was removed.
pub async fn delete(&self, key: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM state WHERE key = ?")
        .bind(key)
        .execute(&self.pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

fn expiry_after(now: i64, ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs())
        .unwrap_or(i64::MAX)
        .saturating_add(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store(dir: &tempfile::TempDir) -> StateStore {
        let path = dir.path().join("state").join("state.db");
        StateStore::new(path.to_str().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn put_get_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        assert_eq!(store.get("BRAND_1").await.unwrap(), None);
        store.put("BRAND_1", "{\"bid\":\"1\"}", None).await.unwrap();
        assert_eq!(store.get("BRAND_1").await.unwrap().as_deref(), Some("{\"bid\":\"1\"}"));

        assert!(store.delete("BRAND_1").await.unwrap());
        assert!(!store.delete("BRAND_1").await.unwrap());
        assert_eq!(store.get("BRAND_1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_value_and_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;

        store.put("token", "old", Some(Duration::ZERO)).await.unwrap();
        assert_eq!(store.get("token").await.unwrap(), None);

        store.put("token", "new", Some(Duration::from_secs(600))).await.unwrap();
        assert_eq!(store.get("token").await.unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn expiry_saturates_for_huge_ttls() {
        assert_eq!(expiry_after(1_000, Duration::from_secs(60)), 1_060);
        assert_eq!(expiry_after(1_000, Duration::from_secs(u64::MAX)), i64::MAX);
        assert_eq!(expiry_after(1_000, Duration::from_secs(i64::MAX as u64)), i64::MAX);
    }

    #[tokio::test]
    async fn huge_ttl_never_expires() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.put("token", "forever", Some(Duration::from_secs(u64::MAX))).await.unwrap();
        assert_eq!(store.get("token").await.unwrap().as_deref(), Some("forever"));
    }

    #[tokio::test]
    async fn reopening_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        store(&dir).await.put("k", "v", None).await.unwrap();
        assert_eq!(store(&dir).await.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
