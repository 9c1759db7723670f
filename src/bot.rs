//! Run driver
//!
//! Accepts invites, prunes every moderated community, reports back to each
//! one and resigns, then saves the cache.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::cache::GoneCache;
use crate::config::BotConfig;
use crate::error::BotResult;
use crate::invites::{InviteReport, accept_invites};
use crate::platform::{Community, Platform};
use crate::probe::ExistenceProbe;
use crate::pruner::{BanPruner, PruneReport};
use crate::summary::{SUMMARY_SUBJECT, Summary, render_message, write_summary_to_disk};
use crate::{RUN_TARGET, logging};

/// Everything a run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub invites: InviteReport,
    pub communities: Vec<PruneReport>,
}

impl RunReport {
    /// Total bans lifted across all communities
    #[must_use]
    pub fn total_pruned(&self) -> usize {
        self.communities.iter().map(PruneReport::pruned_count).sum()
    }
}

/// Whether `community` belongs to the bot account itself.
///
/// Covers both the bare account name and the `u_<name>` profile community.
fn is_own_community(community: &Community, bot_name: &str) -> bool {
    community.name.eq_ignore_ascii_case(bot_name)
        || community
            .name
            .strip_prefix("u_")
            .is_some_and(|name| name.eq_ignore_ascii_case(bot_name))
}

/// The ban pruning bot
pub struct Bot<P, Q> {
    config: BotConfig,
    platform: P,
    pruner: BanPruner<Q>,
    /// Overrides today's date for summary pages
    date: Option<NaiveDate>,
}

impl<P: Platform, Q: ExistenceProbe> Bot<P, Q> {
    pub fn new(config: BotConfig, platform: P, probe: Q, cache: GoneCache) -> Self {
        Self {
            config,
            platform,
            pruner: BanPruner::new(cache, probe),
            date: None,
        }
    }

    /// Use a fixed date for summary page names
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn cache(&self) -> &GoneCache {
        self.pruner.cache()
    }

    #[must_use]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    fn today(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }

    fn cache_path(&self) -> PathBuf {
        self.config.cache_path()
    }

    /// Prune one community, send it the summary and resign as moderator.
    ///
    /// # Errors
    ///
    /// Returns an error if pruning, publishing the summary or resigning
    /// fails in a way that cannot be skipped.
    pub async fn process_community(&mut self, community: &Community) -> BotResult<PruneReport> {
        let bot_name = self.platform.me();
        let report = self.pruner.prune(&self.platform, &community.name).await?;

        let summary = Summary::select(
            &report.pruned,
            self.config.summary_threshold,
            &community.name,
            &bot_name,
            self.today(),
        );

        if let Summary::External {
            wiki_community,
            page,
            content,
        } = &summary
        {
            let path = write_summary_to_disk(&self.config.base_dir, page, content).await?;
            info!("Wrote summary for {community} to {}", path.display());
            self.platform
                .edit_wiki_page(wiki_community, page, content)
                .await?;
        }

        let message = render_message(&summary, &report);
        self.platform
            .send_community_message(&community.name, SUMMARY_SUBJECT, &message)
            .await?;

        if !is_own_community(community, &bot_name) {
            self.platform
                .remove_moderator(&community.name, &bot_name)
                .await?;
            info!(
                target: RUN_TARGET,
                community = %community,
                event = "resigned",
                "Removed self from moderators"
            );
        }

        logging::log_community_summary(&report);
        Ok(report)
    }

    /// Run the whole job once.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; the cache is only saved when every
    /// community was processed.
    pub async fn run(&mut self) -> BotResult<RunReport> {
        let mut run = RunReport {
            invites: accept_invites(&self.platform).await?,
            ..Default::default()
        };
        info!(
            target: RUN_TARGET,
            accepted = run.invites.accepted,
            skipped = run.invites.skipped,
            event = "invites",
            "Processed moderator invites"
        );

        let bot_name = self.platform.me();
        for community in self.platform.moderated_communities().await? {
            if is_own_community(&community, &bot_name) {
                debug!("Skipping own community {community}");
                continue;
            }
            let report = self.process_community(&community).await?;
            run.communities.push(report);
        }

        self.pruner.cache().save(self.cache_path()).await?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MockPlatform;
    use crate::probe::MockExistenceProbe;
    use mockall::predicate::{always, eq};

    const BOT: &str = "prunebot";

    fn bot_with(
        platform: MockPlatform,
        base_dir: &std::path::Path,
    ) -> Bot<MockPlatform, MockExistenceProbe> {
        let config = BotConfig {
            username: BOT.to_string(),
            base_dir: base_dir.to_path_buf(),
            ..Default::default()
        };
        Bot::new(config, platform, MockExistenceProbe::new(), GoneCache::new())
    }

    fn platform_with_empty_bans() -> MockPlatform {
        let mut platform = MockPlatform::new();
        platform.expect_me().returning(|| BOT.to_string());
        platform.expect_banned_users().returning(|_| Ok(Vec::new()));
        platform
    }

    #[test]
    fn test_is_own_community() {
        assert!(is_own_community(&Community::new("prunebot"), BOT));
        assert!(is_own_community(&Community::new("u_prunebot"), BOT));
        assert!(is_own_community(&Community::new("PruneBot"), BOT));
        assert!(!is_own_community(&Community::new("testsub"), BOT));
        assert!(!is_own_community(&Community::new("u_someoneelse"), BOT));
    }

    #[tokio::test]
    async fn test_own_community_gets_message_but_no_resignation() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        for name in [BOT, "u_prunebot"] {
            let mut platform = platform_with_empty_bans();
            platform
                .expect_send_community_message()
                .with(eq(name), eq(SUMMARY_SUBJECT), always())
                .times(1)
                .returning(|_, _, _| Ok(()));
            platform.expect_remove_moderator().never();

            let mut bot = bot_with(platform, dir.path());
            let report = bot
                .process_community(&Community::new(name))
                .await
                .expect("Processing failed");
            assert_eq!(report.original_count, 0);
        }
    }

    #[tokio::test]
    async fn test_other_community_resigns() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let mut platform = platform_with_empty_bans();
        platform
            .expect_send_community_message()
            .times(1)
            .returning(|_, _, _| Ok(()));
        platform
            .expect_remove_moderator()
            .with(eq("testsub"), eq(BOT))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut bot = bot_with(platform, dir.path());
        bot.process_community(&Community::new("testsub"))
            .await
            .expect("Processing failed");
    }
}
