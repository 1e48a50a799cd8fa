//! The producer tick (spec.md §4.5): folds unconsumed event aggregates into
//! the running `Accounting` balance tree and persists the result. Runs
//! identically on both the leader and the follower, ahead of whichever
//! role-specific tick follows it.

use chrono::{TimeZone, Utc};

use primitives::adapter::Adapter;
use primitives::validator::Accounting;
use primitives::{BalancesMap, ValidatorMessage};

use crate::core::events::merge_aggregates;
use crate::error::Error;
use crate::sentry_interface::SentryApi;

/// The balance tree after this tick (whether or not it changed), and the
/// new `Accounting` record if new aggregates were folded in.
pub type ProducerTick = (BalancesMap, Option<Accounting>);

pub async fn tick<A: Adapter + 'static>(iface: &SentryApi<A>) -> Result<ProducerTick, Error> {
    let accounting = match iface.get_our_latest_message(&["Accounting"]).await? {
        Some(ValidatorMessage::Accounting(accounting)) => accounting,
        _ => Accounting {
            last_event_aggregate: Utc.timestamp_opt(0, 0).unwrap(),
            balances_before_fees: Default::default(),
            balances: Default::default(),
        },
    };

    let aggregates = iface.get_event_aggregates(accounting.last_event_aggregate).await?;

    if aggregates.is_empty() {
        return Ok((accounting.balances, None));
    }

    let new_accounting = merge_aggregates(&accounting, &aggregates, &iface.channel)?;

    let other_validator = if iface.whoami == iface.channel.leader().id {
        iface.channel.follower()
    } else {
        iface.channel.leader()
    };

    iface
        .persist_and_propagate(&[other_validator], ValidatorMessage::Accounting(new_accounting.clone()))
        .await?;

    Ok((new_accounting.balances.clone(), Some(new_accounting)))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use tokio::sync::RwLock;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use adapter::DummyAdapter;
    use primitives::channel::SpecValidators;
    use primitives::test_util::{balances, discard_logger, follower_desc, leader_desc, PUBLISHER, LEADER};
    use primitives::{config, BigNum, Channel, ChannelId};

    use super::*;

    async fn sentry_for_leader(server: &MockServer) -> SentryApi<DummyAdapter> {
        let leader = primitives::ValidatorDesc { url: format!("{}/leader", server.uri()), ..leader_desc(0) };
        let follower = primitives::ValidatorDesc { url: format!("{}/follower", server.uri()), ..follower_desc(0) };

        let channel = Channel::new(
            ChannelId::from([0x04; 32]),
            *PUBLISHER,
            "0x0000000000000000000000000000000000000000".to_string(),
            BigNum::from(10_000_u64),
            Utc::now() + chrono::Duration::days(1),
            SpecValidators::new(leader, follower),
        )
        .expect("valid fixture channel");

        let mut adapter = DummyAdapter::init(*LEADER);
        adapter.unlock().unwrap();

        SentryApi::init(Arc::new(RwLock::new(adapter)), channel, config::configuration("development", None).unwrap(), discard_logger(), *LEADER)
            .expect("should find ourselves in the validator set")
    }

    #[tokio::test]
    async fn returns_unchanged_balances_when_there_are_no_new_aggregates() {
        let server = MockServer::start().await;
        let sentry = sentry_for_leader(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/leader/channel/{}/validator-messages/{}/Accounting", sentry.channel.id, *LEADER)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "validatorMessages": [] })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/leader/channel/{}/events-aggregates", sentry.channel.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "events": [] })))
            .mount(&server)
            .await;

        let (resulting_balances, new_accounting) = tick(&sentry).await.unwrap();
        assert!(new_accounting.is_none());
        assert_eq!(BalancesMap::default(), resulting_balances);
    }

    #[tokio::test]
    async fn folds_aggregates_and_persists_the_new_accounting() {
        let server = MockServer::start().await;
        let sentry = sentry_for_leader(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/leader/channel/{}/validator-messages/{}/Accounting", sentry.channel.id, *LEADER)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "validatorMessages": [] })))
            .mount(&server)
            .await;

        let aggregate = serde_json::json!({
            "channelId": sentry.channel.id.to_string(),
            "created": Utc::now().to_rfc3339(),
            "events": { format!("{}", *PUBLISHER): { "eventCounts": {}, "eventPayouts": "1000" } },
        });

        Mock::given(method("GET"))
            .and(path(format!("/leader/channel/{}/events-aggregates", sentry.channel.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "events": [aggregate] })))
            .mount(&server)
            .await;

        let ok = serde_json::json!({ "success": true });
        Mock::given(method("POST"))
            .and(path(format!("/leader/channel/{}/validator-messages", sentry.channel.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(&ok))
            .mount(&server)
            .await;

        let (resulting_balances, new_accounting) = tick(&sentry).await.unwrap();
        let new_accounting = new_accounting.expect("aggregates were present, an Accounting must be produced");

        assert_eq!(BigNum::from(1_000_u64), new_accounting.balances_before_fees[&*PUBLISHER]);
        assert_eq!(new_accounting.balances, resulting_balances);
    }

    #[tokio::test]
    async fn picks_up_a_previously_persisted_accounting_as_its_starting_point() {
        let server = MockServer::start().await;
        let sentry = sentry_for_leader(&server).await;

        let previous = Accounting {
            last_event_aggregate: Utc::now() - chrono::Duration::hours(1),
            balances_before_fees: balances(&[(*PUBLISHER, 500)]),
            balances: balances(&[(*PUBLISHER, 500)]),
        };

        let envelope = primitives::validator::MessageEnvelope {
            from: *LEADER,
            received: Utc::now(),
            seq: 1,
            msg: ValidatorMessage::Accounting(previous.clone()),
        };

        Mock::given(method("GET"))
            .and(path(format!("/leader/channel/{}/validator-messages/{}/Accounting", sentry.channel.id, *LEADER)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "validatorMessages": [envelope] })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/leader/channel/{}/events-aggregates", sentry.channel.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "events": [] })))
            .mount(&server)
            .await;

        let (resulting_balances, new_accounting) = tick(&sentry).await.unwrap();
        assert!(new_accounting.is_none());
        assert_eq!(previous.balances, resulting_balances);
    }
}
