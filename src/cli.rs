use clap::{Parser, Subcommand};

/// meetbridge: per-transaction meeting provisioning and translation API
#[derive(Parser)]
#[command(name = "meetbridge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind (defaults to PORT, then 3500)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Query or provision meetings on a running server
    Meeting {
        #[command(subcommand)]
        command: MeetingCommands,
    },

    /// Translate a message through a running server
    Translate {
        /// Target language, e.g. "Spanish"
        #[arg(long)]
        to: String,
        text: String,
        /// Server base URL (defaults to MEETBRIDGE_API_URL)
        #[arg(long)]
        api_url: Option<String>,
    },

    /// Exchange the configured Zoom credentials for a token and print its expiry
    ZoomToken,
}

#[derive(Subcommand)]
pub enum MeetingCommands {
    /// Get or create the meeting for a transaction
    Ensure {
        transaction_id: String,
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Show the cached meeting for a transaction, without creating one
    Get {
        transaction_id: String,
        #[arg(long)]
        api_url: Option<String>,
    },
}
