use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;

use walletlist::cli::{Cli, Commands};
use walletlist::core::{config, init_logger, log_startup_configuration};
use walletlist::flow::RegistrationFlow;
use walletlist::i18n;
use walletlist::storage::link::{classify, LinkTarget};
use walletlist::storage::{build_contexts, FileTarget, LinkStore, RegistrationStore, SheetGateway};
use walletlist::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramTransport};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, credentials, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load environment variables from .env if present, before any config is read
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run) => run_bot().await,
        Some(Commands::SetLink { url }) => run_set_link(&url).await,
        Some(Commands::GetLink) => run_get_link().await,
        Some(Commands::CheckSheet) => run_check_sheet().await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot().await
        }
    }
}

/// Link store, gateway and file target from the environment configuration
async fn build_store() -> Result<Arc<RegistrationStore>> {
    let links = Arc::new(LinkStore::open(config::SHEET_LINK_FILE.as_str()).await);
    let contexts = build_contexts(
        config::SHEETS_PRIMARY_CREDENTIALS.as_str(),
        config::SHEETS_SECONDARY_CREDENTIALS.as_str(),
    );
    let gateway = SheetGateway::new(contexts, config::sheets::timeout());
    Ok(Arc::new(RegistrationStore::new(links, gateway, FileTarget::new()?)))
}

async fn run_bot() -> Result<()> {
    log::info!("Starting bot...");
    log_startup_configuration();

    let bot = create_bot()?;
    let store = build_store().await?;
    if !store.is_configured().await {
        log::warn!("⚠️ No spreadsheet link set yet, registrations are closed until /setlink");
    }

    let transport = Arc::new(TelegramTransport::new(bot.clone()));
    let flow = Arc::new(RegistrationFlow::new(
        store,
        transport,
        *config::ADMIN_ID,
        i18n::lang_from_code(&config::ADMIN_LANGUAGE),
    ));

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    Dispatcher::builder(bot, schema(HandlerDeps::new(flow)))
        .enable_ctrlc_handler()
        .error_handler(LoggingErrorHandler::with_custom_text("An error in the update handler"))
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

async fn run_set_link(url: &str) -> Result<()> {
    let links = LinkStore::open(config::SHEET_LINK_FILE.as_str()).await;
    links.set(url).await?;
    println!("✅ Link saved to {}", links.path().display());
    Ok(())
}

async fn run_get_link() -> Result<()> {
    let links = LinkStore::open(config::SHEET_LINK_FILE.as_str()).await;
    match links.get().await {
        Some(link) => println!("{}", link),
        None => println!("❌ No link set ({})", links.path().display()),
    }
    Ok(())
}

async fn run_check_sheet() -> Result<()> {
    let store = build_store().await?;
    let link = store.link().require().await?;

    match classify(&link)? {
        LinkTarget::Spreadsheet { sheet_id } => {
            println!("Spreadsheet {} via contexts {:?}", sheet_id, store.gateway().context_names());
            let context = store.gateway().probe(&link).await?;
            println!("✅ Spreadsheet reachable through the {} context", context);
        }
        LinkTarget::File { url } => {
            let table = FileTarget::new()?.load(&url).await?;
            println!(
                "📄 Generic file link, {} registration row(s) readable; rows are not written back",
                table.rows.len()
            );
        }
    }
    Ok(())
}
