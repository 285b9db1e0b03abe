use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nearloo::Finder;
use nearloo_core::Config;
use nearloo_directory::{server, PlaceDirectory};
use nearloo_offline::CacheManager;
use nearloo_search::{format_distance, Coordinate, FixedPosition, RankedList, SearchRequest};

/// Results shown in emergency mode.
const EMERGENCY_LIST_LEN: usize = 8;
const LIST_LEN: usize = 30;

/// Find the nearest public toilet.
///
/// Examples:
///   nearloo search --lat 45.4642 --lon 9.19
///   nearloo search --lat 45.4642 --lon 9.19 --emergency
///   nearloo serve --port 8888
///   nearloo cache activate
#[derive(Parser)]
#[command(name = "nearloo", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search around a position and print the ranked list.
    Search {
        /// Latitude (-90 to 90). Searching needs both coordinates: there is no device positioning.
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        /// Longitude (-180 to 180).
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Search radius in meters (50 to 5000). Defaults to the configured radius.
        #[arg(long)]
        radius: Option<f64>,

        /// Also list bars, cafés and other places that likely have a toilet.
        #[arg(long)]
        likely: bool,

        /// Stay within 300 m and show only the closest few.
        #[arg(long)]
        emergency: bool,

        /// Route the search through the offline cache even when it is disabled.
        #[arg(long)]
        offline: bool,

        /// Print the ranked list as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Serve the place directory endpoints over the local store.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,

        #[arg(long, default_value_t = 8888)]
        port: u16,
    },

    /// Manage the offline cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Precache the app shell, offline page and pinned assets.
    Install,
    /// Delete caches of other versions and make this version current.
    Activate,
    /// Show the cache versions on disk.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    nearloo_core::init()?;

    let cli = Cli::parse();
    let (mut config, _) = Config::load_validated()?;

    match cli.command {
        Command::Search {
            lat,
            lon,
            radius,
            likely,
            emergency,
            offline,
            json,
        } => {
            if offline {
                config.offline.enabled = true;
            }
            let radius = radius.unwrap_or(f64::from(config.search.default_radius_meters));
            let include_likely = likely || config.search.include_likely;

            let geo = match lat.zip(lon) {
                Some((lat, lon)) => FixedPosition::new(Coordinate::validated(lat, lon)?),
                None => FixedPosition::unsupported(),
            };
            let finder = Finder::new(config, geo)?;
            let position = finder.locate().await.map_err(|e| {
                anyhow::anyhow!("{} ({})", e.user_message(), e)
            })?;
            let request = SearchRequest::new(position.coordinate, radius, include_likely)?
                .with_emergency(emergency);

            let ranked = finder.find_at(&request).await?;
            let shown = if emergency { EMERGENCY_LIST_LEN } else { LIST_LEN };
            if json {
                let top = RankedList {
                    entries: ranked.top(shown).to_vec(),
                };
                println!("{}", serde_json::to_string_pretty(&top)?);
            } else {
                print_ranked(&ranked, shown, request.radius_meters());
            }
            finder.settle().await;
        }
        Command::Serve { host, port } => {
            let directory = PlaceDirectory::open_local(&config)?;
            server::serve(directory, SocketAddr::new(host, port)).await;
        }
        Command::Cache { action } => {
            let cache = CacheManager::from_config(&config)?;
            match action {
                CacheAction::Install => {
                    let count = cache.install().await.with_context(|| {
                        format!("Failed to precache from {}", config.offline.app_origin)
                    })?;
                    println!("Precached {} entries into {}", count, cache.static_cache());
                }
                CacheAction::Activate => {
                    let deleted = cache.activate().await?;
                    println!("Active cache version: {}", cache.version());
                    for name in deleted {
                        println!("  deleted {}", name);
                    }
                }
                CacheAction::Status => {
                    let active = cache.active_version().await?;
                    println!(
                        "Active cache version: {}",
                        active.as_deref().unwrap_or("(none)")
                    );
                    for name in cache.cache_names().await? {
                        println!("  {}", name);
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_ranked(ranked: &RankedList, shown: usize, radius_meters: f64) {
    if ranked.is_empty() {
        println!("No toilets found within {}.", format_distance(radius_meters));
        return;
    }

    println!("{} places within {}:", ranked.len(), format_distance(radius_meters));
    for (i, entry) in ranked.top(shown).iter().enumerate() {
        let place = &entry.place;
        println!(
            "{:>3}. {:<36} {:>8}  [{}]",
            i + 1,
            place.name,
            format_distance(entry.distance_meters),
            place.source()
        );
        if let Some(address) = &place.attributes.address {
            println!("     {}", address);
        }
    }
}
