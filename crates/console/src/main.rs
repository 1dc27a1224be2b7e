use std::io::Write;
use std::sync::Arc;

use shared::config::Config;
use shared::llm::{GroqGateway, GroqGatewayConfig};
use shared::session::{GatewayAvailability, Session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "console=debug".to_string()))
        .init();

    let gateway_config = match GroqGatewayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to read provider config: {err}");
            std::process::exit(1);
        }
    };
    let gateway = match GroqGateway::new(gateway_config) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to build provider client: {err}");
            std::process::exit(1);
        }
    };

    let config = Config::from_env();
    let mut session = match Session::start(&config, Arc::new(gateway)).await {
        Ok(session) => session,
        Err(err) => {
            error!("failed to start session: {err}");
            std::process::exit(1);
        }
    };

    if session.availability() == GatewayAvailability::Degraded {
        println!("(assistant service unreachable, answering from web search only)");
    }
    info!("console ready, type 'exit' to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            _ = signal::ctrl_c() => {
                println!("\nGoodbye!");
                break;
            }
            line = lines.next_line() => line,
        };

        let utterance = match line {
            Ok(Some(line)) => line.trim().to_string(),
            Ok(None) => break,
            Err(err) => {
                error!("failed to read input: {err}");
                break;
            }
        };

        if utterance.is_empty() {
            continue;
        }
        if utterance.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        let outcome = session.handle(&utterance).await;
        for action in &outcome.actions {
            println!("[action] {action}");
        }
        if let Some(answer) = outcome.answer {
            println!("{answer}");
        }
    }
}
