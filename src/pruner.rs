//! Ban list pruning
//!
//! Walks a community's ban list and lifts every ban held by an account that
//! is already known to be gone or that the probe now reports as gone.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::RUN_TARGET;
use crate::cache::GoneCache;
use crate::error::BotResult;
use crate::platform::Platform;
use crate::probe::ExistenceProbe;

/// Result of pruning one community
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub community: String,
    /// Size of the ban list before pruning
    pub original_count: usize,
    /// Users whose bans were lifted, in ban-list order
    pub pruned: Vec<String>,
    /// Ban removals the platform refused
    pub removal_skips: usize,
}

impl PruneReport {
    #[must_use]
    pub fn pruned_count(&self) -> usize {
        self.pruned.len()
    }

    /// Bans still in place after pruning
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.original_count.saturating_sub(self.pruned.len())
    }
}

/// How a single banned user was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Found in the cache
    KnownGone,
    /// Probe reported the account gone
    Gone,
    /// Account still exists
    Kept,
}

/// Classifies banned users and lifts bans for gone accounts
pub struct BanPruner<Q> {
    cache: GoneCache,
    /// Names confirmed present during this run
    retained: HashSet<String>,
    probe: Q,
}

impl<Q: ExistenceProbe> BanPruner<Q> {
    pub fn new(cache: GoneCache, probe: Q) -> Self {
        Self {
            cache,
            retained: HashSet::new(),
            probe,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &GoneCache {
        &self.cache
    }

    #[must_use]
    pub fn into_cache(self) -> GoneCache {
        self.cache
    }

    /// Whether `username` was confirmed present earlier in this run
    #[must_use]
    pub fn is_retained(&self, username: &str) -> bool {
        self.retained.contains(username)
    }

    async fn classify(&mut self, username: &str) -> Verdict {
        if self.retained.contains(username) {
            return Verdict::Kept;
        }
        if self.cache.contains(username) {
            return Verdict::KnownGone;
        }
        if self.probe.is_gone(username).await {
            self.cache.insert(username);
            Verdict::Gone
        } else {
            self.retained.insert(username.to_string());
            Verdict::Kept
        }
    }

    /// Prune the ban list of `community`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ban list cannot be fetched or a ban removal
    /// fails in a way that cannot be skipped.
    pub async fn prune<P: Platform + ?Sized>(
        &mut self,
        platform: &P,
        community: &str,
    ) -> BotResult<PruneReport> {
        info!("Processing the bans in: /r/{community}");
        let banned = platform.banned_users(community).await?;

        let mut report = PruneReport {
            community: community.to_string(),
            original_count: banned.len(),
            ..Default::default()
        };

        for username in banned {
            let verdict = self.classify(&username).await;
            debug!(
                community = %community,
                username = %username,
                verdict = ?verdict,
                "Classified banned user"
            );
            if verdict == Verdict::Kept {
                continue;
            }

            match platform.remove_ban(community, &username).await {
                Ok(()) => {}
                Err(e) if e.is_skippable() => {
                    warn!("Could not remove ban for /u/{username} in /r/{community}: {e}");
                    report.removal_skips += 1;
                }
                Err(e) => return Err(e.into()),
            }
            report.pruned.push(username);
        }

        info!(
            target: RUN_TARGET,
            community = %community,
            original_count = report.original_count,
            pruned = report.pruned_count(),
            removal_skips = report.removal_skips,
            event = "pruned",
            "Finished pruning ban list"
        );
        Ok(report)
    }
}
