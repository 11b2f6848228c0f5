//! Governance audit record storage (append-only).

use async_trait::async_trait;
use alloy_primitives::B256;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::BTreeMap;

use crate::codec::{backend, blob_to_address, blob_to_b256, row_to_provenance};
use crate::Store;
use tcr_core::{GovernanceEvent, GovernanceEventCriteria, GovernanceEventPatch};
use tcr_processor::persistence::GovernanceEventStore;
use tcr_processor::StoreError;

const EVENT_COLUMNS: &str = "listing_address, sender, metadata, event_type, created, \
     last_updated, block_number, tx_hash, tx_index, block_hash, log_index, event_hash";

fn row_to_event(row: SqliteRow) -> Result<GovernanceEvent, StoreError> {
    let listing_address: Vec<u8> = row.get("listing_address");
    let sender: Vec<u8> = row.get("sender");
    let metadata: String = row.get("metadata");
    let event_hash: Vec<u8> = row.get("event_hash");

    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata).map_err(backend)?;

    Ok(GovernanceEvent {
        listing_address: blob_to_address(&listing_address)?,
        sender: blob_to_address(&sender)?,
        metadata,
        event_type: row.get("event_type"),
        created: row.get("created"),
        last_updated: row.get("last_updated"),
        provenance: row_to_provenance(&row)?,
        event_hash: blob_to_b256(&event_hash)?,
    })
}

#[async_trait]
impl GovernanceEventStore for Store {
    async fn events_by_criteria(
        &self,
        criteria: &GovernanceEventCriteria,
    ) -> Result<Vec<GovernanceEvent>, StoreError> {
        let mut sql = format!("SELECT {EVENT_COLUMNS} FROM governance_events WHERE 1 = 1");
        if criteria.listing_address.is_some() {
            sql.push_str(" AND listing_address = ?");
        }
        if criteria.created_from.is_some() {
            sql.push_str(" AND created >= ?");
        }
        if criteria.created_before.is_some() {
            sql.push_str(" AND created < ?");
        }
        if criteria.event_type.is_some() {
            sql.push_str(" AND event_type = ?");
        }
        sql.push_str(" ORDER BY id LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(address) = &criteria.listing_address {
            query = query.bind(address.as_slice());
        }
        if let Some(from) = criteria.created_from {
            query = query.bind(from);
        }
        if let Some(before) = criteria.created_before {
            query = query.bind(before);
        }
        if let Some(event_type) = &criteria.event_type {
            query = query.bind(event_type);
        }
        let limit = if criteria.count == 0 {
            -1i64
        } else {
            criteria.count as i64
        };
        let rows = query
            .bind(limit)
            .bind(criteria.offset as i64)
            .fetch_all(self.pool())
            .await
            .map_err(backend)?;

        if rows.is_empty() {
            return Err(StoreError::NoResults);
        }
        rows.into_iter().map(row_to_event).collect()
    }

    async fn event_by_hash(&self, event_hash: B256) -> Result<GovernanceEvent, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM governance_events WHERE event_hash = ?");
        let row = sqlx::query(&sql)
            .bind(event_hash.as_slice())
            .fetch_optional(self.pool())
            .await
            .map_err(backend)?
            .ok_or(StoreError::NoResults)?;
        row_to_event(row)
    }

    async fn create_event(&self, event: &GovernanceEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO governance_events (
                listing_address, sender, metadata, event_type, created,
                last_updated, block_number, tx_hash, tx_index, block_hash,
                log_index, event_hash
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.listing_address.as_slice())
        .bind(event.sender.as_slice())
        .bind(serde_json::to_string(&event.metadata).map_err(backend)?)
        .bind(&event.event_type)
        .bind(event.created)
        .bind(event.last_updated)
        .bind(event.provenance.block_number as i64)
        .bind(event.provenance.tx_hash.as_slice())
        .bind(event.provenance.tx_index as i64)
        .bind(event.provenance.block_hash.as_slice())
        .bind(event.provenance.log_index as i64)
        .bind(event.event_hash.as_slice())
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn update_event(
        &self,
        event_hash: B256,
        patch: &GovernanceEventPatch,
    ) -> Result<(), StoreError> {
        let Some(last_updated) = patch.last_updated else {
            return Ok(());
        };
        let result =
            sqlx::query("UPDATE governance_events SET last_updated = ? WHERE event_hash = ?")
                .bind(last_updated)
                .bind(event_hash.as_slice())
                .execute(self.pool())
                .await
                .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoResults);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_store;
    use alloy_primitives::Address;
    use tcr_core::EventProvenance;

    fn audit_record(event_type: &str, created: i64, log_index: u64) -> GovernanceEvent {
        let provenance = EventProvenance {
            block_number: 100,
            tx_hash: B256::repeat_byte(0xaa),
            tx_index: 0,
            block_hash: B256::repeat_byte(0x01),
            log_index,
        };
        let mut metadata = BTreeMap::new();
        metadata.insert("deposit".to_string(), "1000".to_string());

        GovernanceEvent {
            listing_address: Address::repeat_byte(0x11),
            sender: Address::repeat_byte(0x22),
            metadata,
            event_type: event_type.to_string(),
            created,
            last_updated: created,
            provenance,
            event_hash: provenance.event_hash(),
        }
    }

    #[tokio::test]
    async fn test_event_round_trip_by_hash() {
        let (store, _temp_db) = setup_store().await;

        let expected = audit_record("Application", 1_000, 0);
        store.create_event(&expected).await.unwrap();

        let got = store.event_by_hash(expected.event_hash).await.unwrap();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn test_replay_refreshes_last_updated_only() {
        let (store, _temp_db) = setup_store().await;

        let record = audit_record("Application", 1_000, 0);
        store.create_event(&record).await.unwrap();

        store
            .update_event(
                record.event_hash,
                &GovernanceEventPatch {
                    last_updated: Some(2_000),
                },
            )
            .await
            .unwrap();

        let got = store.event_by_hash(record.event_hash).await.unwrap();
        assert_eq!(got.last_updated, 2_000);
        assert_eq!(got.created, 1_000);
        assert_eq!(got.metadata, record.metadata);
    }

    #[tokio::test]
    async fn test_events_by_criteria() {
        let (store, _temp_db) = setup_store().await;

        store
            .create_event(&audit_record("Application", 1_000, 0))
            .await
            .unwrap();
        store
            .create_event(&audit_record("NewChallenge", 1_100, 1))
            .await
            .unwrap();

        let challenges = store
            .events_by_criteria(&GovernanceEventCriteria {
                event_type: Some("NewChallenge".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(challenges.len(), 1);
        assert_eq!(challenges[0].created, 1_100);

        let all = store
            .events_by_criteria(&GovernanceEventCriteria {
                listing_address: Some(Address::repeat_byte(0x11)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }
}
