//! Moderator invite acceptance

use tracing::{debug, info};

use crate::RUN_TARGET;
use crate::error::BotResult;
use crate::platform::Platform;

/// Counts from one pass over the inbox
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InviteReport {
    /// Invites that were accepted
    pub accepted: usize,
    /// Messages that were not a valid invite
    pub skipped: usize,
}

/// Drain the unread inbox and accept every message as a moderator invite.
///
/// Every unread message is marked read. There is no check that a message
/// really is an invite; a message that isn't one fails acceptance and is
/// counted as skipped.
///
/// # Errors
///
/// Returns an error for failures that are not skippable (auth, transport).
pub async fn accept_invites<P: Platform + ?Sized>(platform: &P) -> BotResult<InviteReport> {
    let mut report = InviteReport::default();

    for message in platform.unread_messages().await? {
        platform.mark_read(&message).await?;

        let Some(community) = message.community.as_deref() else {
            debug!(
                "Message {} ({:?}) has no community, skipping",
                message.id, message.subject
            );
            report.skipped += 1;
            continue;
        };

        match platform.accept_moderator_invite(community).await {
            Ok(()) => {
                info!(
                    target: RUN_TARGET,
                    community = %community,
                    event = "invite_accepted",
                    "Accepted moderator invite"
                );
                report.accepted += 1;
            }
            Err(e) if e.is_skippable() => {
                debug!(
                    "{:?} from /r/{community} is not a valid invite: {e}",
                    message.subject
                );
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(report)
}
