//! buspass: send a message body to an Azure Service Bus queue or topic.

use buspass::config::normalize_args;
use buspass::error::EXIT_USAGE;
use buspass::payload::load_body;
use buspass::{BuspassError, Cli, Config, DispatchReport, Message, dispatch, telemetry};
use buspass_servicebus::{DefaultCredential, ServiceBusClient};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

async fn run(cli: Cli) -> Result<DispatchReport, BuspassError> {
    let config = Config::from_cli(cli)?;
    let body = load_body(&config.body).await?;
    let message = Message::new(body, config.priority);

    let credential = Arc::new(DefaultCredential::from_env());
    let client = ServiceBusClient::connect(&config.namespace, credential).await?;
    dispatch(&client, &config.entity, &message, config.repeat).await
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    match run(cli).await {
        Ok(report) => {
            println!("{}", report.summary());
            ExitCode::SUCCESS
        }
        Err(e) if e.is_usage() => {
            println!("{e}");
            ExitCode::from(EXIT_USAGE)
        }
        Err(e) => {
            eprintln!("buspass: {e}");
            eprintln!("{e:#?}");
            ExitCode::from(e.exit_code())
        }
    }
}
