//! FogBugz MCP Server
//!
//! Run with: fogbugz-mcp

use std::fs::OpenOptions;
use std::sync::Arc;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fogbugz_mcp::client::HttpGateway;
use fogbugz_mcp::config::Config;
use fogbugz_mcp::error::Result;
use fogbugz_mcp::mcp::{FogbugzHandler, McpServer};
use fogbugz_mcp::tracker::Tracker;

#[derive(Parser, Debug)]
#[command(name = "fogbugz-mcp")]
#[command(about = "FogBugz MCP server", version)]
struct Args {
    /// FogBugz API endpoint, e.g. https://acme.fogbugz.com/api.asp
    #[arg(long, env = "FOGBUGZ_BASE")]
    base_url: Option<String>,

    /// FogBugz API token
    #[arg(long, env = "FOGBUGZ_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log requests and responses at debug level (accepts 1/true)
    #[arg(
        long,
        env = "FOGBUGZ_MCP_DEBUG",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    debug: bool,

    /// Also append logs to this file
    #[arg(long, env = "FOGBUGZ_MCP_LOG_FILE")]
    log_file: Option<String>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Config {
            base_url: non_empty(args.base_url),
            token: non_empty(args.token),
            debug: args.debug,
            log_file: non_empty(args.log_file),
        }
    }
}

/// Logs always go to stderr (stdout is for MCP protocol). The returned
/// guard flushes the file writer and must live until shutdown.
fn init_tracing(config: &Config) -> Result<Option<WorkerGuard>> {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Arc::new(Config::from(args));
    let _guard = init_tracing(&config)?;

    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }

    let gateway = Arc::new(HttpGateway::new(Arc::clone(&config)));
    let tracker = Tracker::new(gateway, Arc::clone(&config));
    let server = McpServer::new(FogbugzHandler::new(tracker));

    tracing::info!(
        base_url = config.base_url.as_deref().unwrap_or("<unset>"),
        "FogBugz MCP server starting..."
    );
    server.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_map_to_config() {
        let args = Args::try_parse_from([
            "fogbugz-mcp",
            "--base-url",
            "https://acme.fogbugz.com/api.asp",
            "--token",
            "",
            "--debug",
        ])
        .unwrap();
        let config = Config::from(args);
        assert_eq!(
            config.base_url.as_deref(),
            Some("https://acme.fogbugz.com/api.asp")
        );
        assert!(config.token.is_none());
        assert!(config.debug);
    }
}
