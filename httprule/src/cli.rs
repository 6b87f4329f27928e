//! # CLI
//!
//! This module defines the command-line interface of `httprule` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring headers are `key:value`).
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "httprule",
    version,
    about = "Call gRPC methods over HTTP/JSON using their google.api.http rules"
)]
pub struct Cli {
    /// Base address of the HTTP server (e.g. https://library.example.com)
    pub server: String,

    /// JSON file with transport settings (authorization, default headers)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Bearer token sent in the `authorization` header. Takes precedence over the config file
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Perform a unary call through the method's HTTP binding
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// httprule https://library.example.com call library.Library/GetBook \
    ///     --file-descriptor-set library.bin --body '{"name": "shelves/1/books/2"}'
    /// ```
    Call {
        /// Endpoint (package.Service/Method)
        #[arg(value_parser = parse_endpoint)]
        endpoint: (String, String),

        /// JSON request message
        #[arg(long, value_parser = parse_body)]
        body: serde_json::Value,

        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Path to the descriptor set (.bin)
        #[arg(long)]
        file_descriptor_set: PathBuf,
    },

    /// List the HTTP binding of every method in a descriptor set
    Routes {
        /// Path to the descriptor set (.bin)
        #[arg(long)]
        file_descriptor_set: PathBuf,
    },
}

fn parse_endpoint(value: &str) -> Result<(String, String), String> {
    let (service, method) = value.split_once('/').ok_or_else(|| {
        format!("Invalid endpoint format: '{value}'. Expected 'package.Service/Method'")
    })?;

    if service.trim().is_empty() || method.trim().is_empty() {
        return Err("Service and Method names cannot be empty".to_string());
    }

    Ok((service.to_string(), method.to_string()))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}

fn parse_body(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|e| format!("Invalid JSON: {e}"))
}
