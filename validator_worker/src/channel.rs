//! One channel's tick cycle: role dispatch (leader vs. follower) followed
//! by the heartbeat fallback when nothing new was emitted.

use slog::info;

use primitives::adapter::Adapter;

use crate::error::Error;
use crate::follower::FollowerState;
use crate::sentry_interface::SentryApi;
use crate::{follower, heartbeat, leader};

/// Runs one full tick for whichever role `iface.whoami` plays in this
/// channel, then falls back to a heartbeat if nothing was emitted.
pub async fn tick<A: Adapter + 'static>(iface: &SentryApi<A>) -> Result<(), Error> {
    let emitted = if iface.whoami == iface.channel.leader().id {
        leader::tick(iface).await?
    } else if iface.whoami == iface.channel.follower().id {
        !matches!(follower::tick(iface).await?, FollowerState::Idle)
    } else {
        return Err(Error::ChannelNotOurs(iface.channel.id));
    };

    if !emitted {
        let sent_heartbeat = heartbeat::tick(iface).await?;
        if sent_heartbeat {
            info!(iface.logger, "sent heartbeat"; "channel" => %iface.channel.id);
        }
    }

    Ok(())
}
