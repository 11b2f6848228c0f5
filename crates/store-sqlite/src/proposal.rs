//! Parameter proposal storage, covering both contract families.

use async_trait::async_trait;
use alloy_primitives::B256;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::codec::{backend, blob_to_address, blob_to_b256, text_to_u256};
use crate::Store;
use tcr_core::{GovtParamProposal, ParamProposal, ParamProposalPatch};
use tcr_processor::persistence::ParamProposalStore;
use tcr_processor::StoreError;

fn row_to_proposal(row: SqliteRow) -> Result<ParamProposal, StoreError> {
    let prop_id: Vec<u8> = row.get("prop_id");
    let value: String = row.get("value");
    let deposit: String = row.get("deposit");
    let proposer: Vec<u8> = row.get("proposer");
    let challenge_id: Option<i64> = row.get("challenge_id");

    Ok(ParamProposal {
        prop_id: blob_to_b256(&prop_id)?,
        name: row.get("name"),
        value: text_to_u256(&value)?,
        deposit: text_to_u256(&deposit)?,
        proposer: blob_to_address(&proposer)?,
        app_expiry: row.get("app_expiry"),
        challenge_id: challenge_id.map(|id| id as u64),
        accepted: row.get("accepted"),
        expired: row.get("expired"),
        last_updated: row.get("last_updated"),
    })
}

fn row_to_govt_proposal(row: SqliteRow) -> Result<GovtParamProposal, StoreError> {
    let prop_id: Vec<u8> = row.get("prop_id");
    let value: String = row.get("value");
    let proposer: Vec<u8> = row.get("proposer");

    Ok(GovtParamProposal {
        prop_id: blob_to_b256(&prop_id)?,
        name: row.get("name"),
        value: text_to_u256(&value)?,
        proposer: blob_to_address(&proposer)?,
        accepted: row.get("accepted"),
        expired: row.get("expired"),
        last_updated: row.get("last_updated"),
    })
}

/// Build and run a patch UPDATE against one of the proposal tables.
async fn update_proposal_table(
    store: &Store,
    table: &str,
    prop_id: B256,
    patch: &ParamProposalPatch,
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
    let sql = format!("UPDATE {table} SET {sets} WHERE prop_id = ?");

    let mut query = sqlx::query(&sql);
    for field in &fields {
        query = match *field {
            "accepted" => query.bind(patch.accepted),
            "expired" => query.bind(patch.expired),
            "challenge_id" => query.bind(patch.challenge_id.flatten().map(|id| id as i64)),
            "last_updated" => query.bind(patch.last_updated),
            other => return Err(backend(format!("unknown proposal patch field {other}"))),
        };
    }
    let result = query
        .bind(prop_id.as_slice())
        .execute(store.pool())
        .await
        .map_err(backend)?;
    if result.rows_affected() == 0 {
        return Err(StoreError::NoResults);
    }
    Ok(())
}

#[async_trait]
impl ParamProposalStore for Store {
    async fn proposal_by_id(&self, prop_id: B256) -> Result<ParamProposal, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT prop_id, name, value, deposit, proposer, app_expiry,
                   challenge_id, accepted, expired, last_updated
            FROM param_proposals
            WHERE prop_id = ?
            "#,
        )
        .bind(prop_id.as_slice())
        .fetch_optional(self.pool())
        .await
        .map_err(backend)?
        .ok_or(StoreError::NoResults)?;
        row_to_proposal(row)
    }

    async fn create_proposal(&self, proposal: &ParamProposal) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO param_proposals (
                prop_id, name, value, deposit, proposer, app_expiry,
                challenge_id, accepted, expired, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(proposal.prop_id.as_slice())
        .bind(&proposal.name)
        .bind(proposal.value.to_string())
        .bind(proposal.deposit.to_string())
        .bind(proposal.proposer.as_slice())
        .bind(proposal.app_expiry)
        .bind(proposal.challenge_id.map(|id| id as i64))
        .bind(proposal.accepted)
        .bind(proposal.expired)
        .bind(proposal.last_updated)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn update_proposal(
        &self,
        prop_id: B256,
        patch: &ParamProposalPatch,
    ) -> Result<(), StoreError> {
        update_proposal_table(self, "param_proposals", prop_id, patch).await
    }

    async fn govt_proposal_by_id(&self, prop_id: B256) -> Result<GovtParamProposal, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT prop_id, name, value, proposer, accepted, expired,
                   last_updated
            FROM govt_param_proposals
            WHERE prop_id = ?
            "#,
        )
        .bind(prop_id.as_slice())
        .fetch_optional(self.pool())
        .await
        .map_err(backend)?
        .ok_or(StoreError::NoResults)?;
        row_to_govt_proposal(row)
    }

    async fn create_govt_proposal(&self, proposal: &GovtParamProposal) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO govt_param_proposals (
                prop_id, name, value, proposer, accepted, expired,
                last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(proposal.prop_id.as_slice())
        .bind(&proposal.name)
        .bind(proposal.value.to_string())
        .bind(proposal.proposer.as_slice())
        .bind(proposal.accepted)
        .bind(proposal.expired)
        .bind(proposal.last_updated)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn update_govt_proposal(
        &self,
        prop_id: B256,
        patch: &ParamProposalPatch,
    ) -> Result<(), StoreError> {
        // The government table has no challenge column; drop the field the
        // same way `GovtParamProposal::apply` ignores it.
        let patch = ParamProposalPatch {
            challenge_id: None,
            ..patch.clone()
        };
        update_proposal_table(self, "govt_param_proposals", prop_id, &patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_store;
    use alloy_primitives::{Address, U256};
    use tcr_processor::optional;

    fn proposal(prop_id: B256) -> ParamProposal {
        ParamProposal {
            prop_id,
            name: "minDeposit".to_string(),
            value: U256::from(5_000u64),
            deposit: U256::from(100u64),
            proposer: Address::repeat_byte(0x22),
            app_expiry: Some(9_000),
            challenge_id: None,
            accepted: false,
            expired: false,
            last_updated: 1_000,
        }
    }

    #[tokio::test]
    async fn test_proposal_lifecycle() {
        let (store, _temp_db) = setup_store().await;

        let prop_id = B256::repeat_byte(0x77);
        store.create_proposal(&proposal(prop_id)).await.unwrap();

        store
            .update_proposal(
                prop_id,
                &ParamProposalPatch {
                    challenge_id: Some(Some(4)),
                    last_updated: Some(1_100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let got = store.proposal_by_id(prop_id).await.unwrap();
        assert_eq!(got.challenge_id, Some(4));

        store
            .update_proposal(
                prop_id,
                &ParamProposalPatch {
                    accepted: Some(true),
                    challenge_id: Some(None),
                    last_updated: Some(1_200),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let got = store.proposal_by_id(prop_id).await.unwrap();
        assert!(got.accepted);
        assert!(!got.expired);
        assert_eq!(got.challenge_id, None);
    }

    #[tokio::test]
    async fn test_govt_proposals_are_separate() {
        let (store, _temp_db) = setup_store().await;

        let prop_id = B256::repeat_byte(0x78);
        store
            .create_govt_proposal(&GovtParamProposal {
                prop_id,
                name: "judgeAppealLen".to_string(),
                value: U256::from(3_600u64),
                proposer: Address::repeat_byte(0x22),
                accepted: false,
                expired: false,
                last_updated: 1_000,
            })
            .await
            .unwrap();

        store
            .update_govt_proposal(
                prop_id,
                &ParamProposalPatch {
                    expired: Some(true),
                    last_updated: Some(1_100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let got = store.govt_proposal_by_id(prop_id).await.unwrap();
        assert!(got.expired);

        // Same id does not exist in the parameterizer table.
        assert!(optional(store.proposal_by_id(prop_id).await)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_missing_proposal_is_no_results() {
        let (store, _temp_db) = setup_store().await;

        let err = store
            .update_proposal(
                B256::repeat_byte(0x01),
                &ParamProposalPatch {
                    accepted: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NoResults));
    }
}
