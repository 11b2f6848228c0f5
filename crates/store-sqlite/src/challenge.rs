//! Challenge, poll and appeal storage operations.
//!
//! Challenge lookups hydrate the owning poll and appeal when present, so
//! callers see the same aggregate shape the processors build.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::codec::{backend, blob_to_address, text_to_u256};
use crate::Store;
use tcr_core::{
    Appeal, AppealPatch, Challenge, ChallengeCriteria, ChallengePatch, Poll, PollPatch,
};
use tcr_processor::persistence::{optional, AppealStore, ChallengeStore, PollStore};
use tcr_processor::StoreError;

const CHALLENGE_COLUMNS: &str = "challenge_id, listing_address, statement, reward_pool, \
     challenger, resolved, stake, total_tokens, request_appeal_expiry, last_updated";

fn row_to_challenge(row: SqliteRow) -> Result<Challenge, StoreError> {
    let challenge_id: i64 = row.get("challenge_id");
    let listing_address: Vec<u8> = row.get("listing_address");
    let reward_pool: String = row.get("reward_pool");
    let challenger: Vec<u8> = row.get("challenger");
    let stake: String = row.get("stake");
    let total_tokens: String = row.get("total_tokens");

    Ok(Challenge {
        challenge_id: challenge_id as u64,
        listing_address: blob_to_address(&listing_address)?,
        statement: row.get("statement"),
        reward_pool: text_to_u256(&reward_pool)?,
        challenger: blob_to_address(&challenger)?,
        resolved: row.get("resolved"),
        stake: text_to_u256(&stake)?,
        total_tokens: text_to_u256(&total_tokens)?,
        request_appeal_expiry: row.get("request_appeal_expiry"),
        poll: None,
        appeal: None,
        last_updated: row.get("last_updated"),
    })
}

fn row_to_poll(row: SqliteRow) -> Result<Poll, StoreError> {
    let poll_id: i64 = row.get("poll_id");
    let vote_quorum: String = row.get("vote_quorum");
    let votes_for: String = row.get("votes_for");
    let votes_against: String = row.get("votes_against");

    Ok(Poll {
        poll_id: poll_id as u64,
        commit_end: row.get("commit_end"),
        reveal_end: row.get("reveal_end"),
        vote_quorum: text_to_u256(&vote_quorum)?,
        votes_for: text_to_u256(&votes_for)?,
        votes_against: text_to_u256(&votes_against)?,
    })
}

fn row_to_appeal(row: SqliteRow) -> Result<Appeal, StoreError> {
    let challenge_id: i64 = row.get("challenge_id");
    let requester: Vec<u8> = row.get("requester");
    let appeal_fee: String = row.get("appeal_fee");
    let appeal_challenge_id: Option<i64> = row.get("appeal_challenge_id");

    Ok(Appeal {
        challenge_id: challenge_id as u64,
        requester: blob_to_address(&requester)?,
        appeal_fee: text_to_u256(&appeal_fee)?,
        statement: row.get("statement"),
        granted: row.get("granted"),
        appeal_challenge_id: appeal_challenge_id.map(|id| id as u64),
        last_updated: row.get("last_updated"),
    })
}

impl Store {
    /// Attach the poll and appeal sharing the challenge id, if stored.
    async fn hydrate_challenge(&self, mut challenge: Challenge) -> Result<Challenge, StoreError> {
        challenge.poll = optional(self.poll_by_id(challenge.challenge_id).await)?;
        challenge.appeal = optional(self.appeal_by_challenge_id(challenge.challenge_id).await)?;
        Ok(challenge)
    }
}

#[async_trait]
impl ChallengeStore for Store {
    async fn challenge_by_id(&self, challenge_id: u64) -> Result<Challenge, StoreError> {
        let sql = format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE challenge_id = ?");
        let row = sqlx::query(&sql)
            .bind(challenge_id as i64)
            .fetch_optional(self.pool())
            .await
            .map_err(backend)?
            .ok_or(StoreError::NoResults)?;
        self.hydrate_challenge(row_to_challenge(row)?).await
    }

    async fn challenges_by_criteria(
        &self,
        criteria: &ChallengeCriteria,
    ) -> Result<Vec<Challenge>, StoreError> {
        let mut sql = format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE 1 = 1");
        if criteria.listing_address.is_some() {
            sql.push_str(" AND listing_address = ?");
        }
        if criteria.resolved.is_some() {
            sql.push_str(" AND resolved = ?");
        }
        sql.push_str(" ORDER BY challenge_id LIMIT ? OFFSET ?");

        let mut query = sqlx::query(&sql);
        if let Some(address) = &criteria.listing_address {
            query = query.bind(address.as_slice());
        }
        if let Some(resolved) = criteria.resolved {
            query = query.bind(resolved);
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
        let mut challenges = Vec::with_capacity(rows.len());
        for row in rows {
            challenges.push(self.hydrate_challenge(row_to_challenge(row)?).await?);
        }
        Ok(challenges)
    }

    async fn create_challenge(&self, challenge: &Challenge) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO challenges (
                challenge_id, listing_address, statement, reward_pool,
                challenger, resolved, stake, total_tokens,
                request_appeal_expiry, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(challenge.challenge_id as i64)
        .bind(challenge.listing_address.as_slice())
        .bind(&challenge.statement)
        .bind(challenge.reward_pool.to_string())
        .bind(challenge.challenger.as_slice())
        .bind(challenge.resolved)
        .bind(challenge.stake.to_string())
        .bind(challenge.total_tokens.to_string())
        .bind(challenge.request_appeal_expiry)
        .bind(challenge.last_updated)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn update_challenge(
        &self,
        challenge_id: u64,
        patch: &ChallengePatch,
    ) -> Result<(), StoreError> {
        let fields = patch.field_names();
        if fields.is_empty() {
            return Ok(());
        }
        let sets = fields
            .iter()
            .map(|field| match *field {
                // Resolution is monotone: it never moves back to false.
                "resolved" => "resolved = (resolved OR ?)".to_string(),
                other => format!("{other} = ?"),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE challenges SET {sets} WHERE challenge_id = ?");

        let mut query = sqlx::query(&sql);
        for field in &fields {
            query = match *field {
                "resolved" => query.bind(patch.resolved),
                "reward_pool" => query.bind(patch.reward_pool.map(|v| v.to_string())),
                "total_tokens" => query.bind(patch.total_tokens.map(|v| v.to_string())),
                "request_appeal_expiry" => query.bind(patch.request_appeal_expiry),
                "last_updated" => query.bind(patch.last_updated),
                other => return Err(backend(format!("unknown challenge patch field {other}"))),
            };
        }
        let result = query
            .bind(challenge_id as i64)
            .execute(self.pool())
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoResults);
        }
        Ok(())
    }
}

#[async_trait]
impl PollStore for Store {
    async fn poll_by_id(&self, poll_id: u64) -> Result<Poll, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT poll_id, commit_end, reveal_end, vote_quorum,
                   votes_for, votes_against
            FROM polls
            WHERE poll_id = ?
            "#,
        )
        .bind(poll_id as i64)
        .fetch_optional(self.pool())
        .await
        .map_err(backend)?
        .ok_or(StoreError::NoResults)?;
        row_to_poll(row)
    }

    async fn create_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO polls (
                poll_id, commit_end, reveal_end, vote_quorum,
                votes_for, votes_against
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(poll.poll_id as i64)
        .bind(poll.commit_end)
        .bind(poll.reveal_end)
        .bind(poll.vote_quorum.to_string())
        .bind(poll.votes_for.to_string())
        .bind(poll.votes_against.to_string())
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn update_poll(&self, poll_id: u64, patch: &PollPatch) -> Result<(), StoreError> {
        let fields = patch.field_names();
        if fields.is_empty() {
            return Ok(());
        }
        let sets = fields
            .iter()
            .map(|field| format!("{field} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE polls SET {sets} WHERE poll_id = ?");

        let mut query = sqlx::query(&sql);
        for field in &fields {
            query = match *field {
                "votes_for" => query.bind(patch.votes_for.map(|v| v.to_string())),
                "votes_against" => query.bind(patch.votes_against.map(|v| v.to_string())),
                other => return Err(backend(format!("unknown poll patch field {other}"))),
            };
        }
        let result = query
            .bind(poll_id as i64)
            .execute(self.pool())
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NoResults);
        }
        Ok(())
    }
}

#[async_trait]
impl AppealStore for Store {
    async fn appeal_by_challenge_id(&self, challenge_id: u64) -> Result<Appeal, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT challenge_id, requester, appeal_fee, statement, granted,
                   appeal_challenge_id, last_updated
            FROM appeals
            WHERE challenge_id = ?
            "#,
        )
        .bind(challenge_id as i64)
        .fetch_optional(self.pool())
        .await
        .map_err(backend)?
        .ok_or(StoreError::NoResults)?;
        row_to_appeal(row)
    }

    async fn create_appeal(&self, appeal: &Appeal) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO appeals (
                challenge_id, requester, appeal_fee, statement, granted,
                appeal_challenge_id, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(appeal.challenge_id as i64)
        .bind(appeal.requester.as_slice())
        .bind(appeal.appeal_fee.to_string())
        .bind(&appeal.statement)
        .bind(appeal.granted)
        .bind(appeal.appeal_challenge_id.map(|id| id as i64))
        .bind(appeal.last_updated)
        .execute(self.pool())
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn update_appeal(
        &self,
        challenge_id: u64,
        patch: &AppealPatch,
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
        let sql = format!("UPDATE appeals SET {sets} WHERE challenge_id = ?");

        let mut query = sqlx::query(&sql);
        for field in &fields {
            query = match *field {
                "granted" => query.bind(patch.granted),
                "appeal_challenge_id" => {
                    query.bind(patch.appeal_challenge_id.map(|id| id as i64))
                }
                "last_updated" => query.bind(patch.last_updated),
                other => return Err(backend(format!("unknown appeal patch field {other}"))),
            };
        }
        let result = query
            .bind(challenge_id as i64)
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
    use alloy_primitives::{Address, U256};

    fn challenge(challenge_id: u64) -> Challenge {
        Challenge {
            challenge_id,
            listing_address: Address::repeat_byte(0x11),
            statement: "disputed".to_string(),
            reward_pool: U256::ZERO,
            challenger: Address::repeat_byte(0x33),
            resolved: false,
            stake: U256::from(100u64),
            total_tokens: U256::ZERO,
            request_appeal_expiry: None,
            poll: None,
            appeal: None,
            last_updated: 1_000,
        }
    }

    #[tokio::test]
    async fn test_challenge_round_trip_with_hydration() {
        let (store, _temp_db) = setup_store().await;

        store.create_challenge(&challenge(3)).await.unwrap();
        store
            .create_poll(&Poll {
                poll_id: 3,
                commit_end: 2_000,
                reveal_end: 3_000,
                vote_quorum: U256::from(50u64),
                votes_for: U256::ZERO,
                votes_against: U256::ZERO,
            })
            .await
            .unwrap();
        store
            .create_appeal(&Appeal {
                challenge_id: 3,
                requester: Address::repeat_byte(0x44),
                appeal_fee: U256::from(10u64),
                statement: String::new(),
                granted: false,
                appeal_challenge_id: None,
                last_updated: 1_100,
            })
            .await
            .unwrap();

        let got = store.challenge_by_id(3).await.unwrap();
        assert_eq!(got.challenge_id, 3);
        assert_eq!(got.poll.as_ref().unwrap().commit_end, 2_000);
        assert_eq!(
            got.appeal.as_ref().unwrap().requester,
            Address::repeat_byte(0x44)
        );
    }

    #[tokio::test]
    async fn test_resolved_is_monotone_in_sql() {
        let (store, _temp_db) = setup_store().await;

        store.create_challenge(&challenge(5)).await.unwrap();
        store
            .update_challenge(
                5,
                &ChallengePatch {
                    resolved: Some(true),
                    reward_pool: Some(U256::from(700u64)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // A later patch cannot un-resolve.
        store
            .update_challenge(
                5,
                &ChallengePatch {
                    resolved: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let got = store.challenge_by_id(5).await.unwrap();
        assert!(got.resolved);
        assert_eq!(got.reward_pool, U256::from(700u64));
    }

    #[tokio::test]
    async fn test_challenges_by_criteria() {
        let (store, _temp_db) = setup_store().await;

        store.create_challenge(&challenge(1)).await.unwrap();
        let mut resolved = challenge(2);
        resolved.resolved = true;
        store.create_challenge(&resolved).await.unwrap();

        let open = store
            .challenges_by_criteria(&ChallengeCriteria {
                resolved: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].challenge_id, 1);

        let by_listing = store
            .challenges_by_criteria(&ChallengeCriteria {
                listing_address: Some(Address::repeat_byte(0x11)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_listing.len(), 2);
    }

    #[tokio::test]
    async fn test_poll_tally_updates() {
        let (store, _temp_db) = setup_store().await;

        store
            .create_poll(&Poll {
                poll_id: 9,
                commit_end: 2_000,
                reveal_end: 3_000,
                vote_quorum: U256::from(50u64),
                votes_for: U256::ZERO,
                votes_against: U256::ZERO,
            })
            .await
            .unwrap();

        store
            .update_poll(
                9,
                &PollPatch {
                    votes_for: Some(U256::from(42u64)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let got = store.poll_by_id(9).await.unwrap();
        assert_eq!(got.votes_for, U256::from(42u64));
        assert_eq!(got.votes_against, U256::ZERO);
    }

    #[tokio::test]
    async fn test_appeal_patch() {
        let (store, _temp_db) = setup_store().await;

        store
            .create_appeal(&Appeal {
                challenge_id: 7,
                requester: Address::repeat_byte(0x44),
                appeal_fee: U256::from(10u64),
                statement: String::new(),
                granted: false,
                appeal_challenge_id: None,
                last_updated: 1_000,
            })
            .await
            .unwrap();

        store
            .update_appeal(
                7,
                &AppealPatch {
                    granted: Some(true),
                    appeal_challenge_id: Some(8),
                    last_updated: Some(1_200),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let got = store.appeal_by_challenge_id(7).await.unwrap();
        assert!(got.granted);
        assert_eq!(got.appeal_challenge_id, Some(8));
        assert_eq!(got.last_updated, 1_200);
    }
}
