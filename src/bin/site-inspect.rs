//! site-inspect CLI tool
//!
//! Command-line interface for looking into a launchpad site JSON file with launchpad-site.
//!
//! ## Commands
//!
//! - `groups <site>`: Groups in display order with their resolved tiles and links
//! - `bookmarks <site> <url>`: Bookmarks pointing at a target url
//! - `resolve <site> <tile-id>`: Display descriptor of a single tile

use clap::{Parser, Subcommand};
use launchpad_site::{
    adapter::SiteAdapter,
    bookmarks::BookmarkQuery,
    config::{AdapterConfig, ConfigProvider, TomlConfigProvider},
    service::{JsonFileSiteService, LocalResolutionService},
    SiteError,
};
use std::{path::PathBuf, sync::Arc};

#[derive(Parser)]
#[command(name = "site-inspect")]
#[command(author, version, about = "A tool for looking into launchpad site documents", long_about = None)]
struct Cli {
    /// Adapter configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List groups in display order with their tiles and links
    Groups {
        /// Path to the site JSON document
        site: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Count and list bookmarks pointing at a url
    Bookmarks {
        /// Path to the site JSON document
        site: PathBuf,

        /// Target url, e.g. `#SO-action?a=1`
        url: String,

        /// Only bookmarks of this visualization type
        #[arg(long)]
        viz_type: Option<String>,

        /// Only bookmarks from this content provider
        #[arg(long)]
        content_provider: Option<String>,
    },

    /// Resolve a single tile and print its display descriptor
    Resolve {
        /// Path to the site JSON document
        site: PathBuf,

        /// Tile or link id
        tile_id: String,
    },
}

fn adapter_for(
    site: PathBuf,
    config: AdapterConfig,
) -> SiteAdapter<JsonFileSiteService, LocalResolutionService> {
    SiteAdapter::new(
        Arc::new(JsonFileSiteService::new(site)),
        Arc::new(LocalResolutionService::new()),
        config,
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => TomlConfigProvider::new(path).get_config()?,
        None => AdapterConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match cli.command {
        Commands::Groups { site, verbose } => {
            let adapter = adapter_for(site, config);
            runtime.block_on(async {
                for group in adapter.get_groups().await {
                    let mut flags = Vec::new();
                    if group.is_default() {
                        flags.push("default");
                    }
                    if group.is_locked() {
                        flags.push("locked");
                    }
                    if !group.is_visible() {
                        flags.push("hidden");
                    }
                    println!("{} '{}' {:?}", group.id(), group.title(), flags);

                    let tiles = adapter.get_group_tiles(group.id()).await?;
                    let links = adapter.get_links(group.id()).await?;
                    for tile in tiles.iter().chain(links.iter()) {
                        let kind = if tile.is_link { "link" } else { "tile" };
                        println!("  [{kind}] {} '{}' -> {}", tile.tile_id, tile.title, tile.tile_intent);
                        if verbose {
                            println!(
                                "         size {} component {:?} navigation {:?}",
                                tile.size, tile.component_name, tile.navigation_mode
                            );
                        }
                    }
                }
                Ok::<(), SiteError>(())
            })?;
            Ok(())
        }

        Commands::Bookmarks {
            site,
            url,
            viz_type,
            content_provider,
        } => {
            let adapter = adapter_for(site, config);
            let mut query = BookmarkQuery::new(url);
            if let Some(viz_type) = viz_type {
                query = query.with_viz_type(viz_type);
            }
            if let Some(content_provider) = content_provider {
                query = query.with_content_provider(content_provider);
            }

            let bookmarks = runtime.block_on(adapter.get_bookmarks(&query))?;
            println!("=== {} bookmark(s) ===", bookmarks.len());
            for (group_id, tile) in bookmarks {
                println!(
                    "{group_id}/{} '{}'",
                    tile.id,
                    tile.title.as_deref().unwrap_or_default()
                );
            }
            Ok(())
        }

        Commands::Resolve { site, tile_id } => {
            let adapter = adapter_for(site, config);
            let resolved = runtime.block_on(adapter.resolve_tile(&tile_id))?;
            println!("{}", serde_json::to_string_pretty(resolved.as_ref())?);
            Ok(())
        }
    }
}
