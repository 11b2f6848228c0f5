//! Watermark for the scheduling boundary.
//!
//! The cron wrapper persists a `(timestamp, event-hash set)` pair after
//! each successful batch. On restart, only events at or after the
//! watermark are replayed, and events sharing the watermark timestamp are
//! deduplicated by their log identity hash.

use alloy_primitives::B256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::event::Event;

/// Last successfully processed point in the event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    /// Timestamp of the newest processed event.
    pub timestamp: i64,

    /// Identity hashes of the processed events sharing that timestamp.
    pub seen: HashSet<B256>,
}

impl Watermark {
    /// Watermark before any event has been processed.
    pub fn genesis() -> Self {
        Self::default()
    }

    /// Events from a fetched batch that are not yet covered by this
    /// watermark, in input order.
    pub fn filter_new<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        events
            .iter()
            .filter(|event| {
                event.timestamp > self.timestamp
                    || (event.timestamp == self.timestamp
                        && !self.seen.contains(&event.event_hash()))
            })
            .collect()
    }

    /// Watermark after successfully processing a batch.
    ///
    /// Moves to the newest event timestamp and records the hashes seen at
    /// that timestamp; hashes from the previous watermark are kept when
    /// the timestamp does not advance.
    pub fn advanced(&self, events: &[Event]) -> Watermark {
        let newest = events
            .iter()
            .map(|event| event.timestamp)
            .max()
            .unwrap_or(self.timestamp);

        if newest < self.timestamp {
            return self.clone();
        }

        let mut seen: HashSet<B256> = if newest == self.timestamp {
            self.seen.clone()
        } else {
            HashSet::new()
        };
        for event in events {
            if event.timestamp == newest {
                seen.insert(event.event_hash());
            }
        }
        Watermark {
            timestamp: newest,
            seen,
        }
    }
}

/// Source of new events for the poll loop.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch events at or after the watermark, in stream order.
    async fn fetch_since(&self, watermark: &Watermark) -> anyhow::Result<Vec<Event>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;
    use tcr_core::{ContractKind, EventProvenance};

    fn event(timestamp: i64, log_index: u64) -> Event {
        Event {
            contract_kind: ContractKind::Token,
            contract_address: alloy_primitives::Address::ZERO,
            name: "Transfer".to_string(),
            payload: EventPayload::new(),
            timestamp,
            provenance: EventProvenance {
                block_number: 1,
                tx_hash: B256::repeat_byte(0xaa),
                tx_index: 0,
                block_hash: B256::ZERO,
                log_index,
            },
        }
    }

    #[test]
    fn filter_drops_already_seen_same_timestamp_events() {
        let batch = vec![event(100, 0), event(100, 1), event(101, 2)];
        let watermark = Watermark::genesis().advanced(&batch[..2]);
        assert_eq!(watermark.timestamp, 100);
        assert_eq!(watermark.seen.len(), 2);

        // Replay of the same fetch: only the newer event survives.
        let fresh = watermark.filter_new(&batch);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].provenance.log_index, 2);
    }

    #[test]
    fn advancing_past_the_timestamp_resets_the_hash_set() {
        let first = vec![event(100, 0)];
        let second = vec![event(200, 1)];

        let watermark = Watermark::genesis().advanced(&first).advanced(&second);
        assert_eq!(watermark.timestamp, 200);
        assert_eq!(watermark.seen.len(), 1);
        assert!(watermark.seen.contains(&second[0].event_hash()));
    }

    #[test]
    fn advancing_on_an_empty_batch_is_a_no_op() {
        let watermark = Watermark::genesis().advanced(&[event(100, 0)]);
        let unchanged = watermark.advanced(&[]);
        assert_eq!(watermark, unchanged);
    }
}
