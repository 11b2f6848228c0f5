//! Content revision storage.

use async_trait::async_trait;
use alloy_primitives::Address;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::codec::{backend, blob_to_address, blob_to_b256};
use crate::Store;
use tcr_core::ContentRevision;
use tcr_processor::persistence::ContentRevisionStore;
use tcr_processor::StoreError;

const REVISION_COLUMNS: &str = "listing_address, content_id, revision_id, revision_uri, \
     payload_hash, editor, author, body, revision_date";

fn row_to_revision(row: SqliteRow) -> Result<ContentRevision, StoreError> {
    let listing_address: Vec<u8> = row.get("listing_address");
    let content_id: i64 = row.get("content_id");
    let revision_id: i64 = row.get("revision_id");
    let payload_hash: Vec<u8> = row.get("payload_hash");
    let editor: Vec<u8> = row.get("editor");

    Ok(ContentRevision {
        listing_address: blob_to_address(&listing_address)?,
        content_id: content_id as u64,
        revision_id: revision_id as u64,
        revision_uri: row.get("revision_uri"),
        payload_hash: blob_to_b256(&payload_hash)?,
        editor: blob_to_address(&editor)?,
        author: row.get("author"),
        body: row.get("body"),
        revision_date: row.get("revision_date"),
    })
}

#[async_trait]
impl ContentRevisionStore for Store {
    async fn revision(
        &self,
        listing_address: Address,
        content_id: u64,
        revision_id: u64,
    ) -> Result<ContentRevision, StoreError> {
        let sql = format!(
            "SELECT {REVISION_COLUMNS} FROM content_revisions \
             WHERE listing_address = ? AND content_id = ? AND revision_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(listing_address.as_slice())
            .bind(content_id as i64)
            .bind(revision_id as i64)
            .fetch_optional(self.pool())
            .await
            .map_err(backend)?
            .ok_or(StoreError::NoResults)?;
        row_to_revision(row)
    }

    async fn revisions_by_listing(
        &self,
        listing_address: Address,
    ) -> Result<Vec<ContentRevision>, StoreError> {
        let sql = format!(
            "SELECT {REVISION_COLUMNS} FROM content_revisions \
             WHERE listing_address = ? ORDER BY content_id, revision_id"
        );
        let rows = sqlx::query(&sql)
            .bind(listing_address.as_slice())
            .fetch_all(self.pool())
            .await
            .map_err(backend)?;

        if rows.is_empty() {
            return Err(StoreError::NoResults);
        }
        rows.into_iter().map(row_to_revision).collect()
    }

    async fn create_revision(&self, revision: &ContentRevision) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO content_revisions (
                listing_address, content_id, revision_id, revision_uri,
                payload_hash, editor, author, body, revision_date
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(listing_address, content_id, revision_id) DO NOTHING
            "#,
        )
        .bind(revision.listing_address.as_slice())
        .bind(revision.content_id as i64)
        .bind(revision.revision_id as i64)
        .bind(&revision.revision_uri)
        .bind(revision.payload_hash.as_slice())
        .bind(revision.editor.as_slice())
        .bind(&revision.author)
        .bind(&revision.body)
        .bind(revision.revision_date)
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
    use alloy_primitives::keccak256;

    fn revision(content_id: u64, revision_id: u64) -> ContentRevision {
        ContentRevision {
            listing_address: Address::repeat_byte(0x11),
            content_id,
            revision_id,
            revision_uri: "ipfs://rev".to_string(),
            payload_hash: keccak256(b"ipfs://rev"),
            editor: Address::repeat_byte(0x22),
            author: Some("A. Writer".to_string()),
            body: None,
            revision_date: 1_000,
        }
    }

    #[tokio::test]
    async fn test_revision_round_trip() {
        let (store, _temp_db) = setup_store().await;

        let expected = revision(4, 1);
        store.create_revision(&expected).await.unwrap();

        let got = store
            .revision(expected.listing_address, 4, 1)
            .await
            .unwrap();
        assert_eq!(got, expected);

        assert!(matches!(
            store
                .revision(expected.listing_address, 4, 2)
                .await
                .unwrap_err(),
            StoreError::NoResults
        ));
    }

    #[tokio::test]
    async fn test_replayed_revision_keeps_the_original() {
        let (store, _temp_db) = setup_store().await;

        let original = revision(4, 1);
        store.create_revision(&original).await.unwrap();

        let mut replay = original.clone();
        replay.revision_date = 2_000;
        store.create_revision(&replay).await.unwrap();

        let got = store
            .revisions_by_listing(original.listing_address)
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].revision_date, 1_000);
    }
}
