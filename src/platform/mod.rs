//! Platform capability interface
//!
//! The bot only talks to the discussion platform through [`Platform`]. The
//! production implementation is [`RedditClient`]; tests supply fakes or the
//! generated `MockPlatform`.

mod error;
mod reddit;

pub use error::PlatformError;
pub use reddit::RedditClient;

use derive_more::Display;

/// A community (subreddit) the bot can act on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display("/r/{name}")]
pub struct Community {
    pub name: String,
}

impl Community {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// An unread inbox message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    /// Platform identifier used to mark the message read
    pub id: String,
    /// Community the message was sent from, if any
    pub community: Option<String>,
    pub subject: String,
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Operations the bot needs from the platform
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Platform: Send + Sync {
    /// Name of the authenticated account
    fn me(&self) -> String;

    /// All unread inbox messages
    async fn unread_messages(&self) -> PlatformResult<Vec<InboxMessage>>;

    async fn mark_read(&self, message: &InboxMessage) -> PlatformResult<()>;

    /// Accept a pending moderator invite for `community`
    async fn accept_moderator_invite(&self, community: &str) -> PlatformResult<()>;

    /// Full ban list of a community, in platform enumeration order
    async fn banned_users(&self, community: &str) -> PlatformResult<Vec<String>>;

    async fn remove_ban(&self, community: &str, username: &str) -> PlatformResult<()>;

    /// Send a private message to the moderators of `community`
    async fn send_community_message(
        &self,
        community: &str,
        subject: &str,
        body: &str,
    ) -> PlatformResult<()>;

    async fn edit_wiki_page(&self, community: &str, page: &str, content: &str)
    -> PlatformResult<()>;

    async fn remove_moderator(&self, community: &str, username: &str) -> PlatformResult<()>;

    /// Communities the account moderates
    async fn moderated_communities(&self) -> PlatformResult<Vec<Community>>;
}
