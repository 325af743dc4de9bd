//! CLI parser.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatlog")]
#[command(about = "Telegram chat archiver: run, login, export, stats", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the archive bot (config from env; token can override BOT_TOKEN).
    Run {
        #[arg(short, long)]
        token: Option<String>,
    },
    /// Sign the user account in (API_ID, API_HASH) and write the SESSION_NAME session file.
    Login {
        /// Phone number in international format.
        phone: String,
    },
    /// Export archived messages to a file.
    Export {
        #[command(subcommand)]
        format: ExportFormat,
    },
    /// Print archive statistics.
    Stats,
}

#[derive(Subcommand)]
pub enum ExportFormat {
    /// All messages as JSON, newest first.
    Json {
        #[arg(default_value = "messages_export.json")]
        output: String,
    },
    /// All messages as CSV, newest first, without raw_data.
    Csv {
        #[arg(default_value = "messages_export.csv")]
        output: String,
    },
    /// One chat as JSON, oldest first (default file messages_<id>_<YYYYMMDD>.json).
    Chat {
        #[arg(allow_negative_numbers = true)]
        chat_id: i64,
        output: Option<String>,
    },
}
