//! chatlog CLI: run the archive bot, log the user account in, export archived messages, print
//! statistics. Config from env and optional CLI args.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chatlog_cli::export;
use chatlog_cli::{ArchiverConfig, Cli, Commands, ExportFormat};
use chatlog_core::init_tracing;
use chatlog_core::Transport;
use chatlog_telegram::{
    login, run_dispatcher, ArchiveBot, BotApiTransport, TelegramConfig, TelegramReplier,
    UserAccountConfig, UserAccountTransport,
};
use clap::Parser;
use ingest::Archiver;
use storage::ArchiveStore;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = ArchiverConfig::load();

    match cli.command {
        Commands::Run { token } => handle_run(config, token).await,
        Commands::Login { phone } => handle_login(phone).await,
        Commands::Export { format } => handle_export(config, format).await,
        Commands::Stats => handle_stats(config).await,
    }
}

async fn open_store(config: &ArchiverConfig) -> Result<ArchiveStore> {
    ArchiveStore::open(&config.database_url).await.map_err(|e| {
        error!(error = %e, database_url = %config.database_url, "Failed to initialize archive storage");
        anyhow::anyhow!("Failed to initialize archive storage: {}", e)
    })
}

/// Handle the run command: wire storage, transport and archiver, then dispatch updates.
async fn handle_run(config: ArchiverConfig, token: Option<String>) -> Result<()> {
    let telegram = TelegramConfig::from_env(token)?;
    telegram.validate()?;
    init_tracing(&config.log_file)?;

    info!(database_url = %config.database_url, "Initializing archiver");

    let store = open_store(&config).await?;
    let bot = telegram.build_bot();
    let transport = BotApiTransport::new(bot.clone());
    let history: Arc<dyn Transport> = match telegram.user_account {
        Some(ref account) => {
            info!(session_file = %account.session_file, "History walks use the user account");
            Arc::new(UserAccountTransport::connect(account).await?)
        }
        None => {
            warn!("API_ID/API_HASH not set: /parse cannot read chat history through the Bot API");
            Arc::new(transport.clone())
        }
    };
    let archiver = Archiver::new(Arc::new(store), history, config.backfill.clone());
    let archive_bot = Arc::new(ArchiveBot::new(
        archiver,
        transport,
        Arc::new(TelegramReplier::new(bot.clone())),
        telegram.admin_user_ids.clone(),
    ));

    run_dispatcher(bot, archive_bot).await
}

async fn handle_login(phone: String) -> Result<()> {
    init_console_tracing();
    let account = UserAccountConfig::from_env()?
        .ok_or_else(|| anyhow::anyhow!("API_ID and API_HASH must be set to log in"))?;

    let me = login(&account, &phone, prompt).await?;
    println!(
        "✅ Logged in as {} (id {}); session saved to {}",
        me.username.as_deref().or(me.first_name.as_deref()).unwrap_or("unknown"),
        me.id,
        account.session_file
    );
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Console-only tracing for the one-shot commands, so storage logs stay visible.
fn init_console_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_target(false)
        .init();
}

async fn handle_export(config: ArchiverConfig, format: ExportFormat) -> Result<()> {
    init_console_tracing();
    let store = open_store(&config).await?;

    match format {
        ExportFormat::Json { output } => {
            let count = export::export_json(&store, Path::new(&output)).await?;
            println!("✅ Exported {} messages to {}", count, output);
        }
        ExportFormat::Csv { output } => {
            let count = export::export_csv(&store, Path::new(&output)).await?;
            println!("✅ Exported {} messages to {}", count, output);
        }
        ExportFormat::Chat { chat_id, output } => {
            let output = output
                .unwrap_or_else(|| export::default_chat_export_path(chat_id, chrono::Utc::now()));
            let exported = export::export_chat(&store, chat_id, Path::new(&output))
                .await
                .with_context(|| format!("Export of chat {} failed", chat_id))?;
            println!(
                "✅ Exported {} messages from '{}' to {}",
                exported.total_messages, exported.chat_title, output
            );
        }
    }

    Ok(())
}

async fn handle_stats(config: ArchiverConfig) -> Result<()> {
    init_console_tracing();
    let store = open_store(&config).await?;
    let stats = export::stats(&store).await?;
    println!("{}", export::format_stats(&stats));
    Ok(())
}
