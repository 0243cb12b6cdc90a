//! CLI structure and argument parsing.
//!
//! Standard command-subcommand pattern built with clap derive. Global
//! `--verbose`/`--quiet` flags control log verbosity; each subcommand maps
//! onto one core operation.
//!
//! ```bash
//! freectl add https://github.com/awesome/list --name awesome --type git
//! freectl update
//! freectl process
//! freectl search "koala" --preprocessed
//! freectl serve --port 8080
//! ```

use clap::{Parser, Subcommand};
use freectl_core::SourceType;

/// Validates that limit is at least 1.
fn validate_limit(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        Err("limit must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

fn parse_source_type(s: &str) -> Result<SourceType, String> {
    s.parse::<SourceType>().map_err(|e| e.to_string())
}

/// Main CLI structure for the `freectl` command.
#[derive(Parser, Clone, Debug)]
#[command(name = "freectl")]
#[command(version)]
#[command(about = "freectl - local meta-search over curated link collections", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All freectl subcommands.
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Add a source and fetch its content
    Add {
        /// URL to fetch the source from
        url: String,
        /// Unique display name for the source
        #[arg(long)]
        name: String,
        /// Source type: git, reddit_wiki, html, rss, hn5000
        #[arg(long = "type", value_name = "TYPE", value_parser = parse_source_type)]
        source_type: SourceType,
    },

    /// Delete a source's cache and settings entry
    Delete {
        /// Name of the source to delete
        name: String,
        /// Remove the settings entry even if the cache cannot be removed
        #[arg(long)]
        force: bool,
    },

    /// List configured sources
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Fetch fresh content for enabled sources
    Update {
        /// Update only the named source
        #[arg(long)]
        name: Option<String>,
    },

    /// Enable or disable a source
    Toggle {
        /// Name of the source to toggle
        name: String,
    },

    /// Extract and normalize link records from fetched sources
    Process {
        /// Process only the named source
        #[arg(long)]
        source: Option<String>,
        /// Process even when the artifact is up to date
        #[arg(long)]
        force: bool,
        /// Process sources one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Search across sources
    Search {
        /// The query text
        query: Vec<String>,
        /// Restrict to a single source
        #[arg(long)]
        source: Option<String>,
        /// Restrict to a category
        #[arg(long)]
        category: Option<String>,
        /// Maximum number of results
        #[arg(long, value_parser = validate_limit)]
        limit: Option<usize>,
        /// Search preprocessed artifacts instead of raw markdown
        #[arg(long)]
        preprocessed: bool,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show aggregate statistics for one or all sources
    Stats {
        /// Source to show; all sources when omitted
        name: Option<String>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage pinned links
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommands,
    },

    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

/// Subcommands of `freectl favorites`.
#[derive(Subcommand, Clone, Debug)]
pub enum FavoritesCommands {
    /// List pinned links
    List,
    /// Pin a link
    Add {
        /// URL to pin
        link: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
        /// Optional category
        #[arg(long)]
        category: Option<String>,
        /// Optional source name
        #[arg(long)]
        source: Option<String>,
    },
    /// Unpin a link
    Remove {
        /// URL to unpin
        link: String,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_common_invocations() {
        let cases: Vec<Vec<&str>> = vec![
            vec!["freectl", "add", "https://github.com/x/y", "--name", "y", "--type", "git"],
            vec!["freectl", "delete", "y", "--force"],
            vec!["freectl", "list", "--json"],
            vec!["freectl", "update", "--name", "y"],
            vec!["freectl", "toggle", "y"],
            vec!["freectl", "process", "--source", "y", "--force"],
            vec!["freectl", "search", "koala", "bears", "--limit", "5", "--preprocessed"],
            vec!["freectl", "stats"],
            vec!["freectl", "favorites", "list"],
            vec!["freectl", "favorites", "add", "https://a.com", "--name", "A"],
            vec!["freectl", "serve", "--port", "9000"],
        ];
        for case in cases {
            assert!(Cli::try_parse_from(&case).is_ok(), "should parse {case:?}");
        }
    }

    #[test]
    fn rejects_invalid_invocations() {
        let cases: Vec<Vec<&str>> = vec![
            vec!["freectl", "add", "https://x.com", "--name", "x", "--type", "svn"],
            vec!["freectl", "add", "https://x.com"],
            vec!["freectl", "search", "q", "--limit", "0"],
            vec!["freectl", "favorites", "add", "https://a.com"],
            vec!["freectl", "unknown"],
        ];
        for case in cases {
            assert!(Cli::try_parse_from(&case).is_err(), "should reject {case:?}");
        }
    }

    #[test]
    fn search_query_collects_words() {
        let cli = Cli::try_parse_from(["freectl", "search", "koala", "bears"]).unwrap();
        match cli.command {
            Commands::Search { query, .. } => assert_eq!(query, vec!["koala", "bears"]),
            other => panic!("expected search, got {other:?}"),
        }
    }
}
