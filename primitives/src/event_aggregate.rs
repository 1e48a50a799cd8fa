use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, BigNum, ChannelId};

/// Per-event-type counts and the total payout a publisher earned within
/// one aggregate (spec.md §3: `{publisher → {eventCounts, eventPayouts}}`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AggregateEvents {
    pub event_counts: BTreeMap<String, u64>,
    pub event_payouts: BigNum,
}

/// One unconsumed batch of aggregated events for a channel, keyed by
/// publisher. The producer tick folds `events[publisher].event_payouts`
/// into the running balance map in `created` order (spec.md §4.5).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventAggregate {
    pub channel_id: ChannelId,
    pub created: DateTime<Utc>,
    pub events: BTreeMap<Address, AggregateEvents>,
}

impl EventAggregate {
    /// `(publisher, payout)` pairs this aggregate contributes, in
    /// publisher-sorted order.
    pub fn payouts(&self) -> impl Iterator<Item = (&Address, &BigNum)> {
        self.events
            .iter()
            .map(|(publisher, aggregate)| (publisher, &aggregate.event_payouts))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn payouts_iterates_publishers_in_sorted_order() {
        let publisher_a = Address::try_from("0xce07CbB7e054514D590a0262C93070D838bFBA2e").unwrap();
        let publisher_b = Address::try_from("0xc91763d7f14ac5c5ddfbcd012e0d2a61ab9bded3").unwrap();

        let mut events = BTreeMap::new();
        events.insert(
            publisher_a,
            AggregateEvents {
                event_counts: BTreeMap::new(),
                event_payouts: BigNum::from(10_u64),
            },
        );
        events.insert(
            publisher_b,
            AggregateEvents {
                event_counts: BTreeMap::new(),
                event_payouts: BigNum::from(20_u64),
            },
        );

        let aggregate = EventAggregate {
            channel_id: ChannelId::from([0x01; 32]),
            created: Utc::now(),
            events,
        };

        let collected: Vec<_> = aggregate.payouts().collect();
        assert_eq!(2, collected.len());
    }
}
