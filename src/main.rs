use std::process::ExitCode;

use ban_pruner::{Bot, BotConfig, BotError, GoneCache, HttpProbe, RedditClient, logging};
use tracing::info;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Main function to run the bot
async fn async_main(config: BotConfig) -> Result<(), BotError> {
    let platform = RedditClient::login(&config).await?;
    let probe = HttpProbe::new(&config)?;
    let cache = GoneCache::load(config.cache_path()).await;

    let mut bot = Bot::new(config, platform, probe, cache);
    let report = bot.run().await?;

    logging::log_console(format!(
        "Processed {} communities, lifted {} bans, accepted {} invites",
        report.communities.len(),
        report.total_pruned(),
        report.invites.accepted
    ));
    Ok(())
}

fn run() -> Result<(), Error> {
    let config_path = BotConfig::config_path();
    let config = BotConfig::load(&config_path)?;
    logging::init(&config.log_dir)?;
    // Anything logged while loading the config predates the subscriber
    logging::log_config_source(&config_path);
    info!("Starting {}...", ban_pruner::BOT_NAME);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    if let Err(err) = runtime.block_on(async_main(config)) {
        logging::log_fatal(&err);
        return Err(err.into());
    }
    Ok(())
}

fn main() -> ExitCode {
    // Handle any errors that occurred during execution
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
