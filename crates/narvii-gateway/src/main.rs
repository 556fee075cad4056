//! Ping bot
//!
//! Run with:
//! ```bash
//! cargo run -p narvii-gateway --bin ping-bot
//! ```
//!
//! Credentials are loaded from environment variables (`NARVII_EMAIL`,
//! `NARVII_PASSWORD`).

use narvii_common::{try_init_tracing_with_config, BotConfig, TracingConfig};
use narvii_gateway::{ArgSpec, Bot, CommandSpec};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Bot stopped");
        std::process::exit(1);
    }
}

async fn run(config: BotConfig) -> Result<(), Box<dyn std::error::Error>> {
    let config = if config.prefix.is_empty() {
        config.with_prefix("/")
    } else {
        config
    };
    info!(env = ?config.env, prefix = %config.prefix, "Configuration loaded");

    let mut bot = Bot::from_config(config)?;

    bot.on_ready(|profile| async move {
        info!(
            nickname = profile.nickname.as_deref().unwrap_or_default(),
            "Ready"
        );
        Ok(())
    });

    bot.command(
        CommandSpec::new(["ping"]).description("Replies with Pong!"),
        |ctx, _args| async move {
            ctx.typing(ctx.reply("Pong!")).await?;
            Ok(())
        },
    )?;

    bot.command(
        CommandSpec::new(["echo"])
            .description("Repeats the text after the command")
            .arg(ArgSpec::rest("text")),
        |ctx, args| async move {
            let text = args.str("text")?.to_string();
            ctx.reply(text).await?;
            Ok(())
        },
    )?;

    bot.run().await?;
    Ok(())
}
