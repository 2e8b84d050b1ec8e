use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::time::Duration;
use tracing::{info, warn};

use super::{RecordStore, StoreError};

/// Connection settings for the PostGIS store.
#[derive(Debug, Clone)]
pub struct PgSettings {
    /// Full connection URL; when set it replaces host/port/database/user/password.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl: bool,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    /// Kept short so an exhausted pool fails fast instead of queueing requests.
    pub acquire_timeout: Duration,
}

impl Default for PgSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            database: "palo_alto_emergency".to_string(),
            user: "emergency_user".to_string(),
            password: "emergency_pass".to_string(),
            ssl: false,
            max_connections: 20,
            connect_timeout: Duration::from_millis(30_000),
            idle_timeout: Duration::from_millis(30_000),
            acquire_timeout: Duration::from_millis(2_000),
        }
    }
}

impl PgSettings {
    pub fn connect_options(&self) -> Result<PgConnectOptions, StoreError> {
        let options = match &self.url {
            Some(url) => url
                .parse::<PgConnectOptions>()
                .map_err(|e| StoreError::Connect(format!("invalid database url: {}", e)))?,
            None => PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .database(&self.database)
                .username(&self.user)
                .password(&self.password),
        };

        Ok(if self.ssl {
            options.ssl_mode(PgSslMode::Require)
        } else {
            options
        })
    }

    /// Loggable target without credentials.
    pub fn describe(&self) -> String {
        match &self.url {
            Some(_) => "DATABASE_URL (redacted)".to_string(),
            None => format!(
                "{}@{}:{}/{} ssl={}",
                self.user, self.host, self.port, self.database, self.ssl
            ),
        }
    }
}

/// Bounded `sqlx` pool over PostGIS.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open the pool and verify it with `SELECT NOW()`.
    pub async fn connect(settings: &PgSettings) -> Result<Self, StoreError> {
        let options = settings.connect_options()?;

        let pool = tokio::time::timeout(
            settings.connect_timeout,
            PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .acquire_timeout(settings.acquire_timeout)
                .idle_timeout(settings.idle_timeout)
                .connect_with(options),
        )
        .await
        .map_err(|_| StoreError::Timeout(settings.connect_timeout))?
        .map_err(|e| StoreError::Connect(e.to_string()))?;

        let current_time: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()")
            .fetch_one(&pool)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;
        info!(%current_time, db = %settings.describe(), "database connection verified");

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Each row comes back as a single JSON object keyed by column name.
fn as_json_rows(query: &str) -> String {
    format!("SELECT row_to_json(t) FROM ({}) t", query.trim())
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::PoolClosed => StoreError::Connect("pool closed".to_string()),
            sqlx::Error::Io(e) => StoreError::Connect(e.to_string()),
            other => StoreError::Query(other.to_string()),
        }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn fetch_rows(&self, query: &str) -> Result<Vec<Value>, StoreError> {
        let sql = as_json_rows(query);
        let rows: Vec<Value> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!(error = %e, "database ping failed");
                StoreError::from(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_wrapped_as_json_objects() {
        let sql = as_json_rows("\n  SELECT * FROM active_incidents_view LIMIT 10\n");
        assert_eq!(
            sql,
            "SELECT row_to_json(t) FROM (SELECT * FROM active_incidents_view LIMIT 10) t"
        );
    }

    #[test]
    fn test_describe_hides_password() {
        let settings = PgSettings::default();
        let described = settings.describe();
        assert!(described.contains("localhost:5432/palo_alto_emergency"));
        assert!(!described.contains("emergency_pass"));

        let with_url = PgSettings {
            url: Some("postgres://u:secret@db/x".into()),
            ..PgSettings::default()
        };
        assert!(!with_url.describe().contains("secret"));
    }

    #[test]
    fn test_invalid_url_is_connect_error() {
        let settings = PgSettings {
            url: Some("not a url".into()),
            ..PgSettings::default()
        };
        assert!(matches!(settings.connect_options(), Err(StoreError::Connect(_))));
    }

    #[test]
    fn test_pool_timeout_maps_to_exhaustion() {
        assert_eq!(StoreError::from(sqlx::Error::PoolTimedOut), StoreError::PoolExhausted);
    }
}
