//! The HTTP client side of the Sentry interface (spec.md §4.4): fetching
//! typed validator messages, persisting our own, and propagating to peers.
//! Authentication is out of this worker's scope — requests carry no
//! credentials, matching the Sentry service's own ingestion boundary.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use slog::{warn, Logger};
use tokio::sync::RwLock;

use primitives::adapter::Adapter;
use primitives::{Channel, Config, EventAggregate, MessageEnvelope, ValidatorDesc, ValidatorId, ValidatorMessage};

use crate::error::Error;

#[derive(Debug, Clone)]
pub struct SentryApi<A: Adapter> {
    pub adapter: Arc<RwLock<A>>,
    pub validator_url: String,
    pub client: Client,
    pub logger: Logger,
    pub channel: Channel,
    pub config: Config,
    pub whoami: ValidatorId,
}

impl<A: Adapter + 'static> SentryApi<A> {
    /// Resolves `whoami`'s own entry in the channel's validator set and
    /// builds the base URL this node's ticks read from and write to.
    pub fn init(
        adapter: Arc<RwLock<A>>,
        channel: Channel,
        config: Config,
        logger: Logger,
        whoami: ValidatorId,
    ) -> Result<Self, Error> {
        let us = channel
            .spec
            .validators
            .find(&whoami)
            .ok_or_else(|| Error::ChannelNotOurs(channel.id))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout.into()))
            .build()
            .map_err(|source| Error::SentryUnreachable {
                channel: channel.id,
                url: us.url.clone(),
                source,
            })?;

        let validator_url = format!("{}/channel/{}", us.url, channel.id);

        Ok(Self {
            adapter,
            validator_url,
            client,
            logger,
            channel,
            config,
            whoami,
        })
    }

    /// `getLatestMsg`: the newest message of one of `message_types` from
    /// validator `from`.
    pub async fn get_latest_message(
        &self,
        from: &ValidatorId,
        message_types: &[&str],
    ) -> Result<Option<ValidatorMessage>, Error> {
        let url = format!(
            "{}/validator-messages/{}/{}?limit=1",
            self.validator_url,
            from,
            message_types.join("+")
        );

        let response: ValidatorMessagesResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| Error::SentryUnreachable { channel: self.channel.id, url: url.clone(), source })?
            .json()
            .await
            .map_err(|source| Error::SentryUnreachable { channel: self.channel.id, url, source })?;

        Ok(response.validator_messages.into_iter().next().map(|envelope| envelope.msg))
    }

    /// `getOurLatestMsg`: convenience for the leader, reading its own
    /// previously-emitted messages back.
    pub async fn get_our_latest_message(
        &self,
        message_types: &[&str],
    ) -> Result<Option<ValidatorMessage>, Error> {
        self.get_latest_message(&self.whoami, message_types).await
    }

    /// `getLastApproved`: the last mutually agreed `{newState, approveState}`
    /// pair, if the channel has ever converged on one.
    pub async fn get_last_approved(&self) -> Result<LastApproved, Error> {
        let url = format!("{}/last-approved", self.validator_url);

        let response: LastApprovedResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| Error::SentryUnreachable { channel: self.channel.id, url: url.clone(), source })?
            .json()
            .await
            .map_err(|source| Error::SentryUnreachable { channel: self.channel.id, url, source })?;

        Ok(response.last_approved.unwrap_or_default())
    }

    /// `propagate`: `POST`s `messages` to each of `validators`' own
    /// `/validator-messages` endpoint. Per-peer failures are logged and
    /// otherwise swallowed — one unreachable peer must never block the
    /// others.
    pub async fn propagate(&self, validators: &[&ValidatorDesc], messages: &[ValidatorMessage]) {
        for validator in validators {
            if let Err(err) = self.propagate_to(validator, messages).await {
                warn!(self.logger, "propagation failed"; "validator" => %validator.id, "error" => %err);
            }
        }
    }

    async fn propagate_to(&self, validator: &ValidatorDesc, messages: &[ValidatorMessage]) -> Result<(), Error> {
        let url = format!("{}/channel/{}/validator-messages", validator.url, self.channel.id);

        let _response: SuccessResponse = self
            .client
            .post(&url)
            .json(&PropagationBody { messages })
            .send()
            .await
            .map_err(|source| Error::PropagationFailure {
                channel: self.channel.id,
                validator: validator.id.to_string(),
                source,
            })?
            .json()
            .await
            .map_err(|source| Error::PropagationFailure {
                channel: self.channel.id,
                validator: validator.id.to_string(),
                source,
            })?;

        Ok(())
    }

    /// `persistAndPropagate`: writes `message` to our own sentry first —
    /// that write must succeed before anything is sent onward — then
    /// propagates to `other_validators`. A failed propagation never undoes
    /// the local persist.
    pub async fn persist_and_propagate(
        &self,
        other_validators: &[&ValidatorDesc],
        message: ValidatorMessage,
    ) -> Result<(), Error> {
        let url = format!("{}/validator-messages", self.validator_url);

        let _response: SuccessResponse = self
            .client
            .post(&url)
            .json(&PropagationBody { messages: &[message.clone()] })
            .send()
            .await
            .map_err(|source| Error::SentryUnreachable { channel: self.channel.id, url: url.clone(), source })?
            .json()
            .await
            .map_err(|source| Error::SentryUnreachable { channel: self.channel.id, url, source })?;

        self.propagate(other_validators, &[message]).await;
        Ok(())
    }

    /// `getEventAggregates`: unconsumed aggregates created after `after`,
    /// in `created` order.
    pub async fn get_event_aggregates(&self, after: DateTime<Utc>) -> Result<Vec<EventAggregate>, Error> {
        let url = format!("{}/events-aggregates?after={}", self.validator_url, after.timestamp_millis());

        let response: EventAggregateResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| Error::SentryUnreachable { channel: self.channel.id, url: url.clone(), source })?
            .json()
            .await
            .map_err(|source| Error::SentryUnreachable { channel: self.channel.id, url, source })?;

        Ok(response.events)
    }
}

/// `GET /channel/list?validator=<id>`.
pub async fn all_channels(client: &Client, sentry_url: &str, whoami: &ValidatorId) -> Result<Vec<Channel>, reqwest::Error> {
    let url = format!("{}/channel/list?validator={}", sentry_url, whoami);
    let response: ChannelListResponse = client.get(&url).send().await?.json().await?;
    Ok(response.channels)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidatorMessagesResponse {
    validator_messages: Vec<MessageEnvelope>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LastApproved {
    pub new_state: Option<MessageEnvelope>,
    pub approve_state: Option<MessageEnvelope>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastApprovedResponse {
    last_approved: Option<LastApproved>,
}

#[derive(Deserialize)]
struct EventAggregateResponse {
    events: Vec<EventAggregate>,
}

#[derive(Deserialize)]
struct ChannelListResponse {
    channels: Vec<Channel>,
}

#[derive(Deserialize)]
struct SuccessResponse {
    #[allow(dead_code)]
    success: bool,
}

#[derive(Serialize)]
struct PropagationBody<'a> {
    messages: &'a [ValidatorMessage],
}
