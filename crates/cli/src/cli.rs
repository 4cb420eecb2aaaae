use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "onionfetch",
    about = "Fetch web pages through a Tor SOCKS proxy with an on-disk cache",
    version,
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub fetch: FetchArgs,
}

/// Arguments for the default fetch action.
#[derive(ClapArgs, Debug)]
pub struct FetchArgs {
    /// Target URL (e.g. http://examplev3address.onion/)
    #[arg(required = true)]
    pub url: Option<String>,

    /// Write the document to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Neither read nor write the cache
    #[arg(long)]
    pub no_cache: bool,

    /// Maximum cache entry age in seconds
    #[arg(long, value_name = "SECS")]
    pub ttl: Option<u64>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect or clear the document cache
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show the cache entry for a URL
    Show {
        url: String,

        /// Maximum age in seconds used to report freshness
        #[arg(long, value_name = "SECS")]
        ttl: Option<u64>,
    },

    /// Delete the cache entry for a URL
    Remove { url: String },

    /// Delete all cache entries, or only those for one host
    Purge {
        /// Only purge entries whose URL has this host
        #[arg(long)]
        host: Option<String>,
    },
}
