//! # HttpRule CLI Entry Point
//!
//! The main executable for the `httprule` tool. This file drives the application lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs the log subscriber.
//! 2. **Schema Resolution**: Loads the descriptor set given on the command line.
//! 3. **Execution**: Delegates the call to the `RuleClient`, which speaks HTTP/JSON to the server.
//! 4. **Presentation**: Formats and prints the resulting data or error status to standard output/error.
mod cli;
mod formatter;
mod settings;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use formatter::{FormattedString, Headers, RouteList};
use httprule_core::{
    RuleClient, Transport,
    client::{DynamicRequest, DynamicResponse},
    prost_reflect::DescriptorPool,
};
use settings::Settings;
use std::{path::Path, process};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::load(args.config.as_deref()) {
        Ok(settings) => settings.with_token(args.token),
        Err(err) => exit_with(err),
    };

    match args.command {
        Commands::Call {
            endpoint,
            body,
            headers,
            file_descriptor_set,
        } => {
            let (service, method) = endpoint;
            let request = DynamicRequest {
                service,
                method,
                body,
                headers,
            };
            run_call(&args.server, &settings, &file_descriptor_set, request).await;
        }
        Commands::Routes {
            file_descriptor_set,
        } => list_routes(&args.server, &settings, &file_descriptor_set),
    }
}

fn exit_with(err: anyhow::Error) -> ! {
    eprintln!("{}", FormattedString::from(err));
    process::exit(1);
}

fn load_client(
    server: &str,
    settings: &Settings,
    file_descriptor_set: &Path,
) -> anyhow::Result<RuleClient> {
    let bytes = std::fs::read(file_descriptor_set).with_context(|| {
        format!(
            "Failed to read file descriptor set '{}'",
            file_descriptor_set.display()
        )
    })?;

    let pool = DescriptorPool::decode(bytes.as_slice())
        .context("Failed to parse file descriptor set")?;

    let transport = Transport::new(settings.transport_config(server))
        .with_defaults(settings.call_defaults());

    Ok(RuleClient::new(pool, transport))
}

fn list_routes(server: &str, settings: &Settings, file_descriptor_set: &Path) {
    match load_client(server, settings, file_descriptor_set) {
        Ok(client) => println!("{}", FormattedString::from(RouteList(client.list_routes()))),
        Err(err) => exit_with(err),
    }
}

async fn run_call(
    server: &str,
    settings: &Settings,
    file_descriptor_set: &Path,
    request: DynamicRequest,
) {
    let client = match load_client(server, settings, file_descriptor_set) {
        Ok(client) => client,
        Err(err) => exit_with(err),
    };

    tracing::info!(
        service = %request.service,
        method = %request.method,
        "calling"
    );

    match client.dynamic(request).await {
        Ok(DynamicResponse {
            headers,
            result: Ok(value),
        }) => {
            if !headers.is_empty() {
                eprintln!("{}", FormattedString::from(Headers(&headers)));
            }
            println!("{}", FormattedString::from(value));
        }
        Ok(DynamicResponse {
            result: Err(err), ..
        }) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
        Err(err) => exit_with(err.into()),
    }
}
