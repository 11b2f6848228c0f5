//! Multisig wallet and owner membership storage.

use async_trait::async_trait;
use alloy_primitives::Address;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::codec::{backend, blob_to_address};
use crate::Store;
use tcr_core::{MultiSig, MultiSigOwner};
use tcr_processor::persistence::MultiSigStore;
use tcr_processor::StoreError;

fn row_to_multi_sig(row: SqliteRow) -> Result<MultiSig, StoreError> {
    let address: Vec<u8> = row.get("address");
    Ok(MultiSig {
        address: blob_to_address(&address)?,
        created: row.get("created"),
        last_updated: row.get("last_updated"),
    })
}

fn row_to_owner(row: SqliteRow) -> Result<MultiSigOwner, StoreError> {
    let multi_sig_address: Vec<u8> = row.get("multi_sig_address");
    let owner_address: Vec<u8> = row.get("owner_address");
    Ok(MultiSigOwner {
        multi_sig_address: blob_to_address(&multi_sig_address)?,
        owner_address: blob_to_address(&owner_address)?,
        added: row.get("added"),
    })
}

#[async_trait]
impl MultiSigStore for Store {
    async fn multi_sig_by_address(&self, address: Address) -> Result<MultiSig, StoreError> {
        let row = sqlx::query(
            "SELECT address, created, last_updated FROM multi_sigs WHERE address = ?",
        )
        .bind(address.as_slice())
        .fetch_optional(self.pool())
        .await
        .map_err(backend)?
        .ok_or(StoreError::NoResults)?;
        row_to_multi_sig(row)
    }

    async fn create_multi_sig(&self, multi_sig: &MultiSig) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO multi_sigs (address, created, last_updated)
            VALUES (?, ?, ?)
            ON CONFLICT(address) DO NOTHING
            "#,
        )
        .bind(multi_sig.address.as_slice())
        .bind(multi_sig.created)
        .bind(multi_sig.last_updated)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn owners(&self, address: Address) -> Result<Vec<MultiSigOwner>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT multi_sig_address, owner_address, added
            FROM multi_sig_owners
            WHERE multi_sig_address = ?
            ORDER BY added, owner_address
            "#,
        )
        .bind(address.as_slice())
        .fetch_all(self.pool())
        .await
        .map_err(backend)?;

        if rows.is_empty() {
            return Err(StoreError::NoResults);
        }
        rows.into_iter().map(row_to_owner).collect()
    }

    async fn add_owner(&self, owner: &MultiSigOwner) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO multi_sig_owners (multi_sig_address, owner_address, added)
            VALUES (?, ?, ?)
            ON CONFLICT(multi_sig_address, owner_address) DO NOTHING
            "#,
        )
        .bind(owner.multi_sig_address.as_slice())
        .bind(owner.owner_address.as_slice())
        .bind(owner.added)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn remove_owner(
        &self,
        multi_sig_address: Address,
        owner_address: Address,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM multi_sig_owners WHERE multi_sig_address = ? AND owner_address = ?",
        )
        .bind(multi_sig_address.as_slice())
        .bind(owner_address.as_slice())
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }
}
