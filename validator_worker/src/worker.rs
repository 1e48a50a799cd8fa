//! The top-level tick loop (spec.md §5): fetch all channels this identity
//! validates, tick each one concurrently with a per-channel deadline, sleep
//! between cycles, and drain the in-flight cycle on SIGTERM before exiting.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use slog::{error, info, warn, Logger};
use tokio::sync::RwLock;
use tokio::time::timeout;

use primitives::adapter::Adapter;
use primitives::{Channel, ChannelId, Config, ValidatorId};

use crate::error::Error;
use crate::sentry_interface::{all_channels, SentryApi};
use crate::{channel as channel_tick};

#[derive(Debug, Clone)]
pub struct Worker<A: Adapter> {
    pub adapter: Arc<RwLock<A>>,
    pub config: Config,
    pub logger: Logger,
    pub sentry_url: String,
    pub whoami: ValidatorId,
}

impl<A: Adapter + 'static> Worker<A> {
    pub fn new(adapter: Arc<RwLock<A>>, config: Config, logger: Logger, sentry_url: String, whoami: ValidatorId) -> Self {
        Self { adapter, config, logger, sentry_url, whoami }
    }

    /// Runs either exactly one cycle (`single_tick`) or the infinite loop,
    /// on a fresh multi-threaded runtime.
    pub fn run(self, single_tick: bool) -> Result<(), std::io::Error> {
        let runtime = tokio::runtime::Runtime::new()?;

        if single_tick {
            runtime.block_on(self.all_channels_tick());
        } else {
            runtime.block_on(self.infinite());
        }

        Ok(())
    }

    async fn infinite(&self) {
        let mut shutdown = Box::pin(tokio::signal::ctrl_c());

        loop {
            self.all_channels_tick().await;

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(self.config.wait_time.into())) => {}
                _ = &mut shutdown => {
                    info!(self.logger, "received shutdown signal, exiting after the current cycle");
                    break;
                }
            }
        }
    }

    async fn all_channels_tick(&self) {
        let client = Client::new();

        let channels = match all_channels(&client, &self.sentry_url, &self.whoami).await {
            Ok(channels) => channels,
            Err(err) => {
                error!(self.logger, "failed to fetch channel list"; "error" => %err);
                return;
            }
        };

        let channels_size = channels.len();
        if channels_size as u32 >= self.config.max_channels {
            warn!(self.logger, "channel count at or above the configured limit"; "count" => channels_size, "max_channels" => self.config.max_channels);
        }

        let results = join_all(channels.into_iter().map(|channel| self.channel_tick(channel))).await;

        for (channel_id, err) in results.into_iter().flatten() {
            error!(self.logger, "channel tick failed"; "channel" => %channel_id, "error" => %err);
        }

        info!(self.logger, "processed channels"; "count" => channels_size);
    }

    async fn channel_tick(&self, channel: Channel) -> Option<(ChannelId, Error)> {
        let channel_id = channel.id;

        let iface = match SentryApi::init(self.adapter.clone(), channel, self.config.clone(), self.logger.clone(), self.whoami) {
            Ok(iface) => iface,
            Err(err) => return Some((channel_id, err)),
        };

        let deadline = Duration::from_millis(self.config.validator_tick_timeout.into());

        match timeout(deadline, channel_tick::tick(&iface)).await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some((channel_id, err)),
            Err(_) => Some((channel_id, Error::TickTimeout(channel_id))),
        }
    }
}
