pub mod bot;
pub mod cache;
pub mod config;
pub mod error;
pub mod invites;
pub mod logging;
pub mod platform;
pub mod probe;
pub mod pruner;
pub mod summary;

// Logging targets shared across the crate
pub const BOT_NAME: &str = "ban_pruner";
pub const RUN_TARGET: &str = "ban_pruner::run";
pub const ERROR_TARGET: &str = "ban_pruner::error";
pub const CONSOLE_TARGET: &str = "ban_pruner";

pub use bot::{Bot, RunReport};
pub use cache::GoneCache;
pub use config::BotConfig;
pub use error::{BotError, BotResult};
pub use platform::{Platform, PlatformError, RedditClient};
pub use probe::{ExistenceProbe, HttpProbe};
pub use pruner::{BanPruner, PruneReport};
