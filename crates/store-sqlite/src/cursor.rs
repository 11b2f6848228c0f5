//! Watermark cursor storage.
//!
//! Single-row table: the cron wrapper saves the watermark after each
//! successful batch and reloads it on startup.

use async_trait::async_trait;
use alloy_primitives::B256;
use sqlx::Row;
use std::collections::HashSet;

use crate::codec::backend;
use crate::Store;
use tcr_processor::persistence::CursorStore;
use tcr_processor::{StoreError, Watermark};

#[async_trait]
impl CursorStore for Store {
    async fn watermark(&self) -> Result<Watermark, StoreError> {
        let row = sqlx::query("SELECT timestamp, seen FROM cursor WHERE id = 1")
            .fetch_optional(self.pool())
            .await
            .map_err(backend)?
            .ok_or(StoreError::NoResults)?;

        let timestamp: i64 = row.get("timestamp");
        let seen: String = row.get("seen");
        let seen: HashSet<B256> = serde_json::from_str(&seen).map_err(backend)?;

        Ok(Watermark { timestamp, seen })
    }

    async fn save_watermark(&self, watermark: &Watermark) -> Result<(), StoreError> {
        let seen = serde_json::to_string(&watermark.seen).map_err(backend)?;
        sqlx::query(
            r#"
            INSERT INTO cursor (id, timestamp, seen)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                timestamp = excluded.timestamp,
                seen = excluded.seen
            "#,
        )
        .bind(watermark.timestamp)
        .bind(seen)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_store;
    use tcr_processor::optional;

    #[tokio::test]
    async fn test_watermark_round_trip() {
        let (store, _temp_db) = setup_store().await;

        // Nothing persisted yet.
        assert!(optional(store.watermark().await).unwrap().is_none());

        let mut seen = HashSet::new();
        seen.insert(B256::repeat_byte(0xaa));
        seen.insert(B256::repeat_byte(0xbb));
        let watermark = Watermark {
            timestamp: 1_000,
            seen,
        };
        store.save_watermark(&watermark).await.unwrap();
        assert_eq!(store.watermark().await.unwrap(), watermark);

        // A later save overwrites the single row.
        let advanced = Watermark {
            timestamp: 2_000,
            seen: HashSet::new(),
        };
        store.save_watermark(&advanced).await.unwrap();
        assert_eq!(store.watermark().await.unwrap(), advanced);
    }
}
