//! Listing storage operations.

use async_trait::async_trait;
use alloy_primitives::Address;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::codec::{addresses_to_json, backend, blob_to_address, json_to_addresses, text_to_u256};
use crate::Store;
use tcr_core::{GovernanceState, Listing, ListingCriteria, ListingPatch};
use tcr_processor::persistence::ListingStore;
use tcr_processor::StoreError;

const LISTING_COLUMNS: &str = "address, name, whitelisted, state, url, charter_uri, \
     owner_addresses, contributor_addresses, application_date, approval_date, \
     last_updated, challenge_id, app_expiry, unstaked_deposit";

fn row_to_listing(row: SqliteRow) -> Result<Listing, StoreError> {
    let address: Vec<u8> = row.get("address");
    let state: String = row.get("state");
    let owner_addresses: String = row.get("owner_addresses");
    let contributor_addresses: String = row.get("contributor_addresses");
    let challenge_id: Option<i64> = row.get("challenge_id");
    let unstaked_deposit: Option<String> = row.get("unstaked_deposit");

    Ok(Listing {
        address: blob_to_address(&address)?,
        name: row.get("name"),
        whitelisted: row.get("whitelisted"),
        state: state.parse::<GovernanceState>().map_err(backend)?,
        url: row.get("url"),
        charter_uri: row.get("charter_uri"),
        owner_addresses: json_to_addresses(&owner_addresses)?,
        contributor_addresses: json_to_addresses(&contributor_addresses)?,
        application_date: row.get("application_date"),
        approval_date: row.get("approval_date"),
        last_updated: row.get("last_updated"),
        challenge_id: challenge_id.map(|id| id as u64),
        app_expiry: row.get("app_expiry"),
        unstaked_deposit: unstaked_deposit
            .as_deref()
            .map(text_to_u256)
            .transpose()?,
    })
}

#[async_trait]
impl ListingStore for Store {
    async fn listing_by_address(&self, address: Address) -> Result<Listing, StoreError> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE address = ?");
        let row = sqlx::query(&sql)
            .bind(address.as_slice())
            .fetch_optional(self.pool())
            .await
            .map_err(backend)?
            .ok_or(StoreError::NoResults)?;
        row_to_listing(row)
    }

    async fn listings_by_criteria(
        &self,
        criteria: &ListingCriteria,
    ) -> Result<Vec<Listing>, StoreError> {
        let mut sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE 1 = 1");
        if criteria.whitelisted_only {
            sql.push_str(" AND whitelisted = 1");
        }
        if criteria.active_challenge {
            sql.push_str(" AND challenge_id IS NOT NULL");
        }
        if criteria.created_from.is_some() {
            sql.push_str(" AND application_date >= ?");
        }
        if criteria.created_before.is_some() {
            sql.push_str(" AND application_date < ?");
        }
        sql.push_str(" ORDER BY address LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(from) = criteria.created_from {
            query = query.bind(from);
        }
        if let Some(before) = criteria.created_before {
            query = query.bind(before);
        }
        // A count of zero means unlimited; SQLite treats -1 as no limit.
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
        rows.into_iter().map(row_to_listing).collect()
    }

    async fn create_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO listings (
                address, name, whitelisted, state, url, charter_uri,
                owner_addresses, contributor_addresses, application_date,
                approval_date, last_updated, challenge_id, app_expiry,
                unstaked_deposit
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(listing.address.as_slice())
        .bind(&listing.name)
        .bind(listing.whitelisted)
        .bind(listing.state.as_str())
        .bind(&listing.url)
        .bind(&listing.charter_uri)
        .bind(addresses_to_json(&listing.owner_addresses)?)
        .bind(addresses_to_json(&listing.contributor_addresses)?)
        .bind(listing.application_date)
        .bind(listing.approval_date)
        .bind(listing.last_updated)
        .bind(listing.challenge_id.map(|id| id as i64))
        .bind(listing.app_expiry)
        .bind(listing.unstaked_deposit.map(|d| d.to_string()))
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn update_listing(
        &self,
        address: Address,
        patch: &ListingPatch,
    ) -> Result<(), StoreError> {
        let fields = patch.field_names();
        if fields.is_empty() {
            return Ok(());
        }
        let sets = fields
            .iter()
            .map(|field| format!("{field} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE listings SET {sets} WHERE address = ?");

        let mut query = sqlx::query(&sql);
        for field in &fields {
            query = match *field {
                "name" => query.bind(patch.name.clone()),
                "whitelisted" => query.bind(patch.whitelisted),
                "state" => query.bind(patch.state.map(|s| s.as_str())),
                "approval_date" => query.bind(patch.approval_date),
                "challenge_id" => query.bind(patch.challenge_id.flatten().map(|id| id as i64)),
                "unstaked_deposit" => query.bind(patch.unstaked_deposit.map(|d| d.to_string())),
                "last_updated" => query.bind(patch.last_updated),
                other => return Err(backend(format!("unknown listing patch field {other}"))),
            };
        }
        let result = query
            .bind(address.as_slice())
            .execute(self.pool())
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoResults);
        }
        Ok(())
    }

    async fn delete_listing(&self, address: Address) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM listings WHERE address = ?")
            .bind(address.as_slice())
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
    use alloy_primitives::U256;
    use tcr_processor::optional;

    fn listing(address: Address, application_date: i64) -> Listing {
        Listing {
            address,
            name: "Example Times".to_string(),
            whitelisted: false,
            state: GovernanceState::Applied,
            url: String::new(),
            charter_uri: "ipfs://charter".to_string(),
            owner_addresses: vec![Address::repeat_byte(0x22)],
            contributor_addresses: Vec::new(),
            application_date: Some(application_date),
            approval_date: None,
            last_updated: application_date,
            challenge_id: None,
            app_expiry: Some(application_date + 1_000),
            unstaked_deposit: Some(U256::from(500u64)),
        }
    }

    #[tokio::test]
    async fn test_listing_round_trip() {
        let (store, _temp_db) = setup_store().await;

        let expected = listing(Address::repeat_byte(0x11), 1_000);
        store.create_listing(&expected).await.unwrap();

        let got = store.listing_by_address(expected.address).await.unwrap();
        assert_eq!(got, expected);

        assert!(
            optional(store.listing_by_address(Address::repeat_byte(0x99)).await)
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_patch_writes_only_set_fields() {
        let (store, _temp_db) = setup_store().await;

        let original = listing(Address::repeat_byte(0x11), 1_000);
        store.create_listing(&original).await.unwrap();

        store
            .update_listing(
                original.address,
                &ListingPatch {
                    whitelisted: Some(true),
                    state: Some(GovernanceState::AppWhitelisted),
                    challenge_id: Some(Some(7)),
                    last_updated: Some(1_500),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let got = store.listing_by_address(original.address).await.unwrap();
        assert!(got.whitelisted);
        assert_eq!(got.state, GovernanceState::AppWhitelisted);
        assert_eq!(got.challenge_id, Some(7));
        assert_eq!(got.last_updated, 1_500);
        // Untouched fields survive.
        assert_eq!(got.name, original.name);
        assert_eq!(got.unstaked_deposit, original.unstaked_deposit);

        // `Some(None)` clears the challenge reference.
        store
            .update_listing(
                original.address,
                &ListingPatch {
                    challenge_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let got = store.listing_by_address(original.address).await.unwrap();
        assert_eq!(got.challenge_id, None);
    }

    #[tokio::test]
    async fn test_patch_on_missing_listing_is_no_results() {
        let (store, _temp_db) = setup_store().await;

        let err = store
            .update_listing(
                Address::repeat_byte(0x11),
                &ListingPatch {
                    whitelisted: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoResults));
    }

    #[tokio::test]
    async fn test_criteria_filter_and_paginate() {
        let (store, _temp_db) = setup_store().await;

        for i in 0u8..4 {
            let mut l = listing(Address::repeat_byte(0x10 + i), 1_000 + i as i64);
            l.whitelisted = i % 2 == 0;
            store.create_listing(&l).await.unwrap();
        }

        let whitelisted = store
            .listings_by_criteria(&ListingCriteria {
                whitelisted_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(whitelisted.len(), 2);
        assert!(whitelisted.iter().all(|l| l.whitelisted));

        let page = store
            .listings_by_criteria(&ListingCriteria {
                offset: 1,
                count: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].address, Address::repeat_byte(0x11));

        let windowed = store
            .listings_by_criteria(&ListingCriteria {
                created_from: Some(1_001),
                created_before: Some(1_003),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(windowed.len(), 2);

        let err = store
            .listings_by_criteria(&ListingCriteria {
                created_from: Some(9_999),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoResults));
    }

    #[tokio::test]
    async fn test_delete_listing() {
        let (store, _temp_db) = setup_store().await;

        let l = listing(Address::repeat_byte(0x11), 1_000);
        store.create_listing(&l).await.unwrap();
        store.delete_listing(l.address).await.unwrap();

        assert!(matches!(
            store.listing_by_address(l.address).await.unwrap_err(),
            StoreError::NoResults
        ));
        assert!(matches!(
            store.delete_listing(l.address).await.unwrap_err(),
            StoreError::NoResults
        ));
    }
}
