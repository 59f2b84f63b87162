use anyhow::Result;
use checkin_frontend::components::{ministry_command, parse_command, render_view, KioskInput};
use checkin_frontend::{ApiClient, CheckInConfig, CheckInWorkflow};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interleave with the rendered screen
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = CheckInConfig::from_env();
    info!("Connecting kiosk to {}", config.api_base_url);

    let api = Arc::new(ApiClient::with_base_url(config.api_base_url.clone()));
    let workflow = CheckInWorkflow::spawn(api, config);

    let mut views = workflow.subscribe();
    let renderer = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let screen = render_view(&views.borrow_and_update());
            println!("\n{}", screen);
        }
    });

    println!("{}", checkin_frontend::components::kiosk::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(KioskInput::Command(command)) => {
                if !workflow.send(command) {
                    warn!("Workflow is no longer running");
                    break;
                }
            }
            Ok(KioskInput::PickMinistry(index)) => match ministry_command(&workflow.view(), index) {
                Ok(command) => {
                    workflow.send(command);
                }
                Err(message) => println!("{}", message),
            },
            Ok(KioskInput::Show) => println!("\n{}", render_view(&workflow.view())),
            Ok(KioskInput::Help) => println!("{}", checkin_frontend::components::kiosk::HELP),
            Ok(KioskInput::Quit) => break,
            Err(message) => println!("{}", message),
        }
    }

    workflow.shutdown().await;
    renderer.abort();
    info!("Kiosk stopped");
    Ok(())
}
