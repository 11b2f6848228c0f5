//! Token purchase and transfer storage (append-only).

use async_trait::async_trait;
use alloy_primitives::Address;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::codec::{backend, blob_to_address, row_to_provenance, text_to_u256};
use crate::Store;
use tcr_core::{TokenPurchase, TokenPurchaseCriteria, TokenTransfer, TokenTransferCriteria};
use tcr_processor::persistence::TokenStore;
use tcr_processor::StoreError;

const PURCHASE_COLUMNS: &str = "purchaser, source, amount, purchase_date, \
     block_number, tx_hash, tx_index, block_hash, log_index";

const TRANSFER_COLUMNS: &str = "to_address, from_address, amount, transfer_date, \
     block_number, tx_hash, tx_index, block_hash, log_index";

fn row_to_purchase(row: SqliteRow) -> Result<TokenPurchase, StoreError> {
    let purchaser: Vec<u8> = row.get("purchaser");
    let source: Vec<u8> = row.get("source");
    let amount: String = row.get("amount");

    Ok(TokenPurchase {
        purchaser: blob_to_address(&purchaser)?,
        source: blob_to_address(&source)?,
        amount: text_to_u256(&amount)?,
        purchase_date: row.get("purchase_date"),
        provenance: row_to_provenance(&row)?,
    })
}

fn row_to_transfer(row: SqliteRow) -> Result<TokenTransfer, StoreError> {
    let to_address: Vec<u8> = row.get("to_address");
    let from_address: Vec<u8> = row.get("from_address");
    let amount: String = row.get("amount");

    Ok(TokenTransfer {
        to_address: blob_to_address(&to_address)?,
        from_address: blob_to_address(&from_address)?,
        amount: text_to_u256(&amount)?,
        transfer_date: row.get("transfer_date"),
        provenance: row_to_provenance(&row)?,
    })
}

#[async_trait]
impl TokenStore for Store {
    async fn purchases_by_purchaser(
        &self,
        purchaser: Address,
    ) -> Result<Vec<TokenPurchase>, StoreError> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM token_purchases WHERE purchaser = ? ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(purchaser.as_slice())
            .fetch_all(self.pool())
            .await
            .map_err(backend)?;

        if rows.is_empty() {
            return Err(StoreError::NoResults);
        }
        rows.into_iter().map(row_to_purchase).collect()
    }

    async fn purchases_by_criteria(
        &self,
        criteria: &TokenPurchaseCriteria,
    ) -> Result<Vec<TokenPurchase>, StoreError> {
        let mut sql = format!("SELECT {PURCHASE_COLUMNS} FROM token_purchases WHERE 1 = 1");
        if criteria.purchaser.is_some() {
            sql.push_str(" AND purchaser = ?");
        }
        if criteria.created_from.is_some() {
            sql.push_str(" AND purchase_date >= ?");
        }
        if criteria.created_before.is_some() {
            sql.push_str(" AND purchase_date < ?");
        }
        sql.push_str(" ORDER BY id LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(purchaser) = &criteria.purchaser {
            query = query.bind(purchaser.as_slice());
        }
        if let Some(from) = criteria.created_from {
            query = query.bind(from);
        }
        if let Some(before) = criteria.created_before {
            query = query.bind(before);
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
        rows.into_iter().map(row_to_purchase).collect()
    }

    async fn create_purchase(&self, purchase: &TokenPurchase) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO token_purchases (
                purchaser, source, amount, purchase_date,
                block_number, tx_hash, tx_index, block_hash, log_index
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(purchase.purchaser.as_slice())
        .bind(purchase.source.as_slice())
        .bind(purchase.amount.to_string())
        .bind(purchase.purchase_date)
        .bind(purchase.provenance.block_number as i64)
        .bind(purchase.provenance.tx_hash.as_slice())
        .bind(purchase.provenance.tx_index as i64)
        .bind(purchase.provenance.block_hash.as_slice())
        .bind(purchase.provenance.log_index as i64)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn transfers_by_criteria(
        &self,
        criteria: &TokenTransferCriteria,
    ) -> Result<Vec<TokenTransfer>, StoreError> {
        let mut sql = format!("SELECT {TRANSFER_COLUMNS} FROM token_transfers WHERE 1 = 1");
        if criteria.to_address.is_some() {
            sql.push_str(" AND to_address = ?");
        }
        if criteria.from_address.is_some() {
            sql.push_str(" AND from_address = ?");
        }
        sql.push_str(" ORDER BY id LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(to) = &criteria.to_address {
            query = query.bind(to.as_slice());
        }
        if let Some(from) = &criteria.from_address {
            query = query.bind(from.as_slice());
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
        rows.into_iter().map(row_to_transfer).collect()
    }

    async fn create_transfer(&self, transfer: &TokenTransfer) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO token_transfers (
                to_address, from_address, amount, transfer_date,
                block_number, tx_hash, tx_index, block_hash, log_index
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transfer.to_address.as_slice())
        .bind(transfer.from_address.as_slice())
        .bind(transfer.amount.to_string())
        .bind(transfer.transfer_date)
        .bind(transfer.provenance.block_number as i64)
        .bind(transfer.provenance.tx_hash.as_slice())
        .bind(transfer.provenance.tx_index as i64)
        .bind(transfer.provenance.block_hash.as_slice())
        .bind(transfer.provenance.log_index as i64)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }
}
