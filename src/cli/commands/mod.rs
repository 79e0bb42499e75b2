//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `library`: Import, list, group and like library songs
//! - `search`: Remote search, play URLs, metadata matching and lyrics
//! - `play`: Play a queue through the native audio output
//! - `radio`: Radio regions and stations

mod library;
mod play;
mod radio;
mod search;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::db::SqliteLibrary;
use crate::enrichment::{MusicApi, NeteaseClient};

pub use library::{cmd_albums, cmd_import, cmd_like, cmd_list};
pub use play::{QueueFilter, cmd_play};
pub use radio::{cmd_regions, cmd_stations};
pub use search::{cmd_lyrics, cmd_match, cmd_search, cmd_url};

/// tunebridge CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Import every audio file under a directory into the library
    Import {
        /// Path to the directory to import
        path: PathBuf,
    },
    /// List library songs
    List {
        /// Only show liked songs
        #[arg(long)]
        liked: bool,
    },
    /// List library songs grouped by album, liked songs first
    Albums,
    /// Play songs through the default audio device
    Play {
        /// Song ids (e.g. local:3, netease:186016); the whole library when empty
        ids: Vec<String>,
        /// Only liked songs
        #[arg(long, conflicts_with = "album")]
        liked: bool,
        /// Only songs of this album
        #[arg(long)]
        album: Option<String>,
        /// Volume level (0.0 - 1.0), defaults to the configured level
        #[arg(long)]
        volume: Option<f32>,
    },
    /// Search the music service for playable songs
    Search {
        /// Keywords
        query: String,
        /// Result page, starting at 1
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Results per page
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Look up the playable URL of a remote song
    Url {
        /// Remote song id
        id: u64,
    },
    /// Find cover art and lyrics for a library song
    Match {
        /// Library song id (e.g. local:12)
        id: String,
        /// Save what was found to the library
        #[arg(long)]
        write: bool,
    },
    /// Show the time-coded lyrics of a remote song
    Lyrics {
        /// Remote song id
        id: u64,
        /// Only show the line active at this many seconds
        #[arg(long)]
        at: Option<f64>,
        /// Show the translation instead of the original
        #[arg(long)]
        translation: bool,
    },
    /// Like or unlike a library song
    Like {
        /// Library song id
        id: String,
    },
    /// Browse the radio directory
    Radio {
        #[command(subcommand)]
        command: RadioCommands,
    },
    /// Show the configuration, or write the defaults
    Config {
        /// Write a config file with the current settings
        #[arg(long)]
        init: bool,
    },
}

/// Radio subcommands
#[derive(Subcommand)]
pub enum RadioCommands {
    /// List the regions of the configured country
    Regions,
    /// List live stations in a region
    Stations {
        /// Region name (defaults to the configured region)
        region: Option<String>,
        /// Maximum number of stations
        #[arg(short, long)]
        limit: Option<u32>,
    },
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command was
/// specified (usage has been printed).
pub fn run_command(cli: &Cli, config: &Config) -> anyhow::Result<bool> {
    let Some(command) = &cli.command else {
        Cli::command().print_help()?;
        return Ok(false);
    };

    let rt = Runtime::new()?;

    match command {
        Commands::Import { path } => cmd_import(&rt, config, path)?,
        Commands::List { liked } => cmd_list(&rt, config, *liked)?,
        Commands::Albums => cmd_albums(&rt, config)?,
        Commands::Play {
            ids,
            liked,
            album,
            volume,
        } => {
            let filter = match (album.as_deref(), *liked) {
                (Some(name), _) => QueueFilter::Album(name),
                (None, true) => QueueFilter::Liked,
                (None, false) => QueueFilter::All,
            };
            cmd_play(&rt, config, ids, filter, *volume)?
        }
        Commands::Search { query, page, limit } => cmd_search(&rt, config, query, *page, *limit)?,
        Commands::Url { id } => cmd_url(&rt, config, *id)?,
        Commands::Match { id, write } => cmd_match(&rt, config, id, *write)?,
        Commands::Lyrics {
            id,
            at,
            translation,
        } => cmd_lyrics(&rt, config, *id, *at, *translation)?,
        Commands::Like { id } => cmd_like(&rt, config, id)?,
        Commands::Radio { command } => match command {
            RadioCommands::Regions => cmd_regions(&rt, config)?,
            RadioCommands::Stations { region, limit } => {
                cmd_stations(&rt, config, region.as_deref(), *limit)?
            }
        },
        Commands::Config { init } => cmd_config(config, *init)?,
    }

    Ok(true)
}

/// Print the effective configuration, optionally saving it.
pub fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    if init {
        let path = config::save(config)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    match config::config_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory"),
    }
    println!("# library: {}", config::db_path(config).display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Open the library database the config points at.
pub(crate) async fn open_library(config: &Config) -> anyhow::Result<SqliteLibrary> {
    let path = config::db_path(config);
    SqliteLibrary::open(&path)
        .await
        .with_context(|| format!("Failed to open library at {}", path.display()))
}

/// Client for the music service proxy.
pub(crate) fn music_api(config: &Config) -> anyhow::Result<Arc<dyn MusicApi>> {
    let client = NeteaseClient::new(&config.proxy).context("Failed to create music client")?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_search() {
        let cli = Cli::parse_from(["tunebridge", "search", "blue in green", "--page", "2"]);
        match cli.command {
            Some(Commands::Search { query, page, limit }) => {
                assert_eq!(query, "blue in green");
                assert_eq!(page, 2);
                assert_eq!(limit, 20);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_parse_radio_stations() {
        let cli = Cli::parse_from(["tunebridge", "radio", "stations", "Shanghai", "-l", "5"]);
        match cli.command {
            Some(Commands::Radio {
                command: RadioCommands::Stations { region, limit },
            }) => {
                assert_eq!(region.as_deref(), Some("Shanghai"));
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected radio stations"),
        }
    }

    #[test]
    fn test_parse_play() {
        let cli = Cli::parse_from(["tunebridge", "play", "local:1", "netease:5", "--volume", "0.5"]);
        match cli.command {
            Some(Commands::Play {
                ids,
                liked,
                album,
                volume,
            }) => {
                assert_eq!(ids, vec!["local:1", "netease:5"]);
                assert!(!liked);
                assert_eq!(album, None);
                assert_eq!(volume, Some(0.5));
            }
            _ => panic!("expected play"),
        }
    }

    #[test]
    fn test_play_liked_conflicts_with_album() {
        let result = Cli::try_parse_from(["tunebridge", "play", "--liked", "--album", "Blue"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_lyrics_at() {
        let cli = Cli::parse_from(["tunebridge", "lyrics", "186016", "--at", "12.5"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Lyrics { id: 186016, at: Some(t), translation: false }) if t == 12.5
        ));
    }
}
