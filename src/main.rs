use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ncw_tx_sync::api::wallet::EmbeddedWalletClient;
use ncw_tx_sync::commands::{self, console::ConsoleListener, CommandOutcome};
use ncw_tx_sync::config::Config;
use ncw_tx_sync::session::{DeferredSigner, WalletSession};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ncw_tx_sync=debug".parse().expect("static directive"))
                .add_directive("reqwest=warn".parse().expect("static directive"))
                .add_directive("hyper=warn".parse().expect("static directive")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting embedded wallet transaction sync...");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let client = EmbeddedWalletClient::with_base_url(
        config.api_token.clone(),
        config.wallet_id.clone(),
        config.api_base_url.clone(),
    );
    let session = WalletSession::new(config, Arc::new(client), Arc::new(DeferredSigner));

    let console = Arc::new(ConsoleListener);
    session.manager().add_transaction_listener(console.clone());
    session.manager().add_event_listener(console);

    match session.refresh_transactions().await {
        Ok(count) => info!("Initial sync fetched {} transaction(s)", count),
        Err(e) => warn!("Initial sync failed: {}", e),
    }
    if let Err(e) = session.start_polling() {
        error!("Failed to start polling: {}", e);
        return;
    }

    println!("{}", commands::help::help_text());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                };
                match commands::handle_line(&session, &line).await {
                    CommandOutcome::Quit => break,
                    CommandOutcome::Reply(reply) if reply.is_empty() => {}
                    CommandOutcome::Reply(reply) => println!("{}", reply),
                }
            }
        }
    }

    session.sign_out();
    info!("Goodbye");
}
