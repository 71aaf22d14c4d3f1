//! Command-line interface: flags plus the verbosity-driven tracing setup,
//! mapping a `-v` count (and `-q`) onto a log level before anything else
//! runs.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mcgravity", about = "Reverse proxy / aggregator for MCP servers", version)]
pub struct Cli {
    /// Upstream MCP server URLs to federate, e.g. https://weather.example.com/sse
    pub upstreams: Vec<String>,

    /// Path to a YAML config file listing named upstreams.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host to bind the frontend HTTP server on.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port to bind the frontend HTTP server on.
    #[arg(long, default_value_t = 3001)]
    pub port: u16,

    /// Name advertised for the federated server's own identity.
    #[arg(long, default_value = "mcgravity")]
    pub mcp_name: String,

    /// Version advertised for the federated server's own identity.
    #[arg(long, default_value = "1.0.0")]
    pub mcp_version: String,

    /// Increase log verbosity. Repeatable: -v, -vv, -vvv.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all but error-level logs.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Install the global tracing subscriber at the verbosity this CLI was
    /// invoked with. Call once, before anything else in `main`.
    pub fn init_tracing(&self) {
        let level = if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cli = Cli::parse_from(["mcgravity"]);
        assert_eq!(cli.host, "localhost");
        assert_eq!(cli.port, 3001);
        assert_eq!(cli.mcp_name, "mcgravity");
        assert_eq!(cli.mcp_version, "1.0.0");
        assert!(cli.upstreams.is_empty());
        assert!(cli.config.is_none());
    }

    #[test]
    fn accepts_positional_upstream_urls() {
        let cli = Cli::parse_from(["mcgravity", "https://a.example.com/sse", "https://b.example.com/sse"]);
        assert_eq!(cli.upstreams.len(), 2);
    }

    #[test]
    fn verbosity_count_accumulates() {
        let cli = Cli::parse_from(["mcgravity", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }
}
