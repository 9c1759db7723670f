//! Summary message sent to a community after pruning

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::BotResult;
use crate::pruner::PruneReport;

/// Subject line of the summary message
pub const SUMMARY_SUBJECT: &str = "Pruned Bans";
/// Summary line used when nothing was pruned
pub const NOTHING_REMOVED: &str = "* There were no deleted or shadowbanned users removed.";

/// How the list of pruned users is presented
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    /// Nothing was pruned
    Nothing,
    /// Numbered list inlined into the message
    Inline(String),
    /// List too long for a message; published as a wiki page instead
    External {
        /// Community whose wiki holds the page (the bot's own)
        wiki_community: String,
        /// Page path, `summaries/<community>/<YYYYMMDD>`
        page: String,
        content: String,
    },
}

impl Summary {
    /// Pick a presentation for `pruned`.
    ///
    /// Lists longer than `threshold` go to a page in `bot_name`'s wiki named
    /// after `community` and `date`.
    #[must_use]
    pub fn select(
        pruned: &[String],
        threshold: usize,
        community: &str,
        bot_name: &str,
        date: NaiveDate,
    ) -> Self {
        if pruned.is_empty() {
            Self::Nothing
        } else if pruned.len() > threshold {
            Self::External {
                wiki_community: bot_name.to_string(),
                page: summary_page(community, date),
                content: bullet_list(pruned),
            }
        } else {
            Self::Inline(numbered_list(pruned))
        }
    }

    /// Text placed in the message body in place of the list
    #[must_use]
    pub fn message_text(&self) -> String {
        match self {
            Self::Nothing => NOTHING_REMOVED.to_string(),
            Self::Inline(list) => list.clone(),
            Self::External {
                wiki_community,
                page,
                ..
            } => format!("* Full summary can be found at /r/{wiki_community}/w/{page}"),
        }
    }
}

/// Wiki page path for a community's summary on `date`
#[must_use]
pub fn summary_page(community: &str, date: NaiveDate) -> String {
    format!("summaries/{community}/{}", date.format("%Y%m%d"))
}

fn numbered_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("1. /u/{name}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn bullet_list(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("* /u/{name}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Full message body for a pruning report
#[must_use]
pub fn render_message(summary: &Summary, report: &PruneReport) -> String {
    format!(
        "I've just completed pruning your ban list, so here's a summary of what I've removed:\
         \n\n{}\n\n   Your subreddit had a total of {} bans. {} of them were shadowbanned or \
         deleted and were removed from the list.  You now have {} bans.  I have now removed \
         myself from your moderator list.  Feel free to re-add me at any time.  If you're \
         satisfied with the job I've done, please consider leaving feedback at \
         /r/ban_pruner/w/feedback.",
        summary.message_text(),
        report.original_count,
        report.pruned_count(),
        report.remaining(),
    )
}

/// Write a summary page under `base_dir`, creating folders as needed.
///
/// Returns the path written.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub async fn write_summary_to_disk(
    base_dir: &Path,
    page: &str,
    content: &str,
) -> BotResult<PathBuf> {
    let path = base_dir.join(page);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, content).await?;
    Ok(path)
}
