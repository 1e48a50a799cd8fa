//! Heartbeat (spec.md §4.8): liveness signal emitted when a tick produced
//! nothing new and too long has passed since our last one. Commits to the
//! all-zero state root rather than any real balance tree.

use chrono::Utc;

use primitives::adapter::Adapter;
use primitives::validator::Heartbeat;
use primitives::ValidatorMessage;

use crate::error::Error;
use crate::sentry_interface::SentryApi;
use crate::state_root::keccak256;

pub async fn tick<A: Adapter + 'static>(iface: &SentryApi<A>) -> Result<bool, Error> {
    let our_latest = match iface.get_our_latest_message(&["Heartbeat"]).await? {
        Some(ValidatorMessage::Heartbeat(heartbeat)) => Some(heartbeat),
        _ => None,
    };

    let should_send = our_latest.map_or(true, |heartbeat| {
        let elapsed = (Utc::now() - heartbeat.timestamp)
            .to_std()
            .unwrap_or_default();

        elapsed.as_millis() > u128::from(iface.config.heartbeat_time)
    });

    if !should_send {
        return Ok(false);
    }

    send(iface).await?;
    Ok(true)
}

async fn send<A: Adapter + 'static>(iface: &SentryApi<A>) -> Result<(), Error> {
    let state_root = "00".repeat(32);
    let timestamp = Utc::now();

    // spec.md §4.8: `sign(zeros||timestamp||channelId)`, not the bare zero
    // root, so a heartbeat can't be replayed across channels or timestamps.
    let commitment = hex::encode(keccak256(&[
        &[0_u8; 32],
        &timestamp.timestamp().to_be_bytes(),
        iface.channel.id.as_bytes(),
    ]));

    let signature = iface
        .adapter
        .read()
        .await
        .sign(&commitment)
        .await
        .map_err(|err| Error::AdapterFailure(iface.channel.id, err.to_string()))?;

    let heartbeat = ValidatorMessage::Heartbeat(Heartbeat::new(signature, state_root, timestamp));
    let other_validator = if iface.whoami == iface.channel.leader().id {
        iface.channel.follower()
    } else {
        iface.channel.leader()
    };

    iface.persist_and_propagate(&[other_validator], heartbeat).await
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use tokio::sync::RwLock;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use adapter::DummyAdapter;
    use primitives::channel::SpecValidators;
    use primitives::test_util::{discard_logger, follower_desc, leader_desc, PUBLISHER, LEADER};
    use primitives::{config, BigNum, Channel, ChannelId};

    use super::*;

    async fn sentry_for_leader(server: &MockServer) -> SentryApi<DummyAdapter> {
        let leader = primitives::ValidatorDesc { url: format!("{}/leader", server.uri()), ..leader_desc(0) };
        let follower = primitives::ValidatorDesc { url: format!("{}/follower", server.uri()), ..follower_desc(0) };

        let channel = Channel::new(
            ChannelId::from([0x08; 32]),
            *PUBLISHER,
            "0x0000000000000000000000000000000000000000".to_string(),
            BigNum::from(1_000_u64),
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
    async fn does_nothing_when_the_last_heartbeat_is_still_fresh() {
        let server = MockServer::start().await;
        let sentry = sentry_for_leader(&server).await;

        let fresh = primitives::validator::Heartbeat::new("sig".into(), "00".repeat(32), Utc::now());
        let envelope = primitives::validator::MessageEnvelope {
            from: *LEADER,
            received: Utc::now(),
            seq: 1,
            msg: ValidatorMessage::Heartbeat(fresh),
        };

        Mock::given(method("GET"))
            .and(path(format!("/leader/channel/{}/validator-messages/{}/Heartbeat", sentry.channel.id, *LEADER)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "validatorMessages": [envelope] })))
            .mount(&server)
            .await;

        let sent = tick(&sentry).await.unwrap();
        assert!(!sent);
    }

    #[tokio::test]
    async fn sends_a_new_heartbeat_when_the_last_one_is_stale() {
        let server = MockServer::start().await;
        let sentry = sentry_for_leader(&server).await;

        let stale = primitives::validator::Heartbeat::new("sig".into(), "00".repeat(32), Utc::now() - Duration::minutes(10));
        let envelope = primitives::validator::MessageEnvelope {
            from: *LEADER,
            received: Utc::now(),
            seq: 1,
            msg: ValidatorMessage::Heartbeat(stale),
        };

        Mock::given(method("GET"))
            .and(path(format!("/leader/channel/{}/validator-messages/{}/Heartbeat", sentry.channel.id, *LEADER)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "validatorMessages": [envelope] })))
            .mount(&server)
            .await;

        let ok = serde_json::json!({ "success": true });
        Mock::given(method("POST"))
            .and(path(format!("/leader/channel/{}/validator-messages", sentry.channel.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(&ok))
            .mount(&server)
            .await;

        let sent = tick(&sentry).await.unwrap();
        assert!(sent);
    }

    #[tokio::test]
    async fn sends_when_we_have_never_heartbeat_before() {
        let server = MockServer::start().await;
        let sentry = sentry_for_leader(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/leader/channel/{}/validator-messages/{}/Heartbeat", sentry.channel.id, *LEADER)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "validatorMessages": [] })))
            .mount(&server)
            .await;

        let ok = serde_json::json!({ "success": true });
        Mock::given(method("POST"))
            .and(path(format!("/leader/channel/{}/validator-messages", sentry.channel.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(&ok))
            .mount(&server)
            .await;

        let sent = tick(&sentry).await.unwrap();
        assert!(sent);
    }
}
