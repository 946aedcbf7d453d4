use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "walletlist")]
#[command(author, version, about = "Telegram bot that collects whitelist wallet registrations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Store the spreadsheet link, as /setlink does
    SetLink {
        /// Google spreadsheet link, or a Drive/OneDrive/direct file link
        url: String,
    },

    /// Print the stored spreadsheet link
    GetLink,

    /// Open the configured spreadsheet through each credential context
    CheckSheet,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
