//! # Settings Repository
//!
//! Process-wide settings. Today that is the exchange rate.
//!
//! Changing the rate only affects conversions made afterwards. Stored
//! amounts are in the base currency and are never rewritten.

use chrono::Utc;
use rugpos_core::ExchangeRate;
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};
use std::str::FromStr;
use tracing::info;

use super::timestamp_text;
use crate::error::{DbError, DbResult};

const EXCHANGE_RATE_KEY: &str = "exchange_rate";

/// Repository for settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
    /// Rate used until an administrator stores one.
    fallback_rate: ExchangeRate,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool, fallback_rate: ExchangeRate) -> Self {
        SettingsRepository {
            pool,
            fallback_rate,
        }
    }

    /// Returns the current exchange rate.
    pub async fn exchange_rate(&self) -> DbResult<ExchangeRate> {
        let mut conn = self.pool.acquire().await?;
        Self::exchange_rate_on(&mut conn, self.fallback_rate).await
    }

    /// Reads the exchange rate on a connection, so a transaction can take
    /// its snapshot alongside its other reads.
    pub async fn exchange_rate_on(
        conn: &mut SqliteConnection,
        fallback: ExchangeRate,
    ) -> DbResult<ExchangeRate> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
                .bind(EXCHANGE_RATE_KEY)
                .fetch_optional(&mut *conn)
                .await?;

        let Some(text) = stored else {
            return Ok(fallback);
        };

        let value =
            Decimal::from_str(&text).map_err(|e| DbError::decode(EXCHANGE_RATE_KEY, e))?;
        ExchangeRate::new(value).map_err(|e| DbError::decode(EXCHANGE_RATE_KEY, e))
    }

    /// Replaces the exchange rate for future conversions.
    ///
    /// Access control is the caller's concern.
    pub async fn set_exchange_rate(&self, rate: ExchangeRate) -> DbResult<()> {
        let previous = self.exchange_rate().await?;

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(EXCHANGE_RATE_KEY)
        .bind(rate.value().to_string())
        .bind(timestamp_text(Utc::now()))
        .execute(&self.pool)
        .await?;

        info!(previous = %previous, current = %rate, "Exchange rate changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use rugpos_core::ExchangeRate;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_rate_defaults_until_set() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(
            db.settings().exchange_rate().await.unwrap(),
            ExchangeRate::DEFAULT
        );

        let rate = ExchangeRate::new(dec!(12650)).unwrap();
        db.settings().set_exchange_rate(rate).await.unwrap();
        assert_eq!(db.settings().exchange_rate().await.unwrap(), rate);

        let newer = ExchangeRate::new(dec!(12700.5)).unwrap();
        db.settings().set_exchange_rate(newer).await.unwrap();
        assert_eq!(db.settings().exchange_rate().await.unwrap(), newer);
    }

    #[tokio::test]
    async fn test_configured_fallback_rate() {
        let fallback = ExchangeRate::new(dec!(12000)).unwrap();
        let db = Database::new(DbConfig::in_memory().default_rate(fallback))
            .await
            .unwrap();
        assert_eq!(db.settings().exchange_rate().await.unwrap(), fallback);
    }
}
