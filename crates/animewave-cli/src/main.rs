mod format;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use animewave_api::types::{SortField, SortOrder, TranslationId};
use animewave_api::CatalogClient;
use animewave_core::config::AppConfig;
use animewave_core::error::CoreError;
use animewave_core::identity::{IdentityStore, UserIdentity};
use animewave_core::models::FilterUpdate;
use animewave_core::session::{CatalogSession, FavoriteToggle, FetchOutcome};

use crate::format::Output;

#[derive(Parser)]
#[command(name = "animewave")]
#[command(about = "Browse the AnimeWave catalog, history and favorites")]
struct Cli {
    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
    /// Print JSON instead of tables.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    /// Backend base URL, overriding config and environment.
    #[arg(long, global = true)]
    backend: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recently updated titles.
    Recent,
    /// Filtered catalog page.
    List {
        /// Item type (`anime-serial` or `anime`).
        #[arg(long = "type")]
        item_type: Option<String>,
        /// `tv`, `ova`, `ona`, `movie`, `special`.
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        year: Option<u32>,
        /// `updated` or `created`.
        #[arg(long)]
        sort: Option<SortField>,
        /// `asc` or `desc`.
        #[arg(long)]
        order: Option<SortOrder>,
    },
    /// Search titles.
    Search { query: String },
    Genres,
    /// Watch history.
    History,
    /// Remove a title from watch history.
    HistoryRemove { anime_id: String },
    Favorites,
    /// Add or remove a favorite.
    Favorite { anime_id: String },
    /// Print the stream link for a title and record it in history.
    Play {
        anime_id: String,
        #[arg(long)]
        translation: Option<String>,
        #[arg(long)]
        season: Option<u32>,
        #[arg(long)]
        episode: Option<u32>,
    },
    /// Show the local user id and check the backend.
    Whoami,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(url) = cli.backend.as_deref() {
        config.backend.base_url = url.to_string();
    }

    let directive = if cli.verbose {
        "animewave=debug"
    } else {
        config.logging.filter.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<(), CoreError> {
    let identity = UserIdentity::load_or_create(&IdentityStore::default_location())?;
    let client =
        CatalogClient::new(&config.backend.base_url).map_err(|e| CoreError::Api(e.to_string()))?;
    tracing::debug!(backend = %client.base_url(), user_id = %identity, "starting");

    let out = Output::new(cli.json);

    if let Command::Whoami = cli.command {
        let health = client.health().await;
        return out.whoami(&identity, client.base_url().as_str(), health);
    }

    let session = CatalogSession::new(client, identity, config.catalog);

    match cli.command {
        Command::Recent => {
            ensure(session.refresh_recent().await, "recent")?;
            out.items(&session.snapshot().await.recent_items)
        }
        Command::List {
            item_type,
            kind,
            year,
            sort,
            order,
        } => {
            let mut updates = vec![
                FilterUpdate::Type(item_type),
                FilterUpdate::Kind(kind),
                FilterUpdate::Year(year),
            ];
            updates.extend(sort.map(FilterUpdate::Sort));
            updates.extend(order.map(FilterUpdate::Order));

            let outcome = match session.apply_filters(updates).await {
                FetchOutcome::Skipped => session.reload_catalog().await,
                outcome => outcome,
            };
            ensure(outcome, "catalog")?;
            let state = session.snapshot().await;
            out.page(&state.catalog_items, state.catalog_total)
        }
        Command::Search { query } => {
            if session.search(&query).await == FetchOutcome::Failed {
                return Err(failed("search"));
            }
            out.items(&session.snapshot().await.search_results)
        }
        Command::Genres => {
            ensure(session.refresh_genres().await, "genres")?;
            out.genres(&session.snapshot().await.genres)
        }
        Command::History => {
            ensure(session.refresh_history().await, "history")?;
            out.history(&session.snapshot().await.history)
        }
        Command::HistoryRemove { anime_id } => {
            ensure(session.remove_history(&anime_id).await, "history")?;
            out.history(&session.snapshot().await.history)
        }
        Command::Favorites => {
            ensure(session.refresh_favorites().await, "favorites")?;
            out.favorites(&session.snapshot().await.favorites)
        }
        Command::Favorite { anime_id } => {
            ensure(session.refresh_favorites().await, "favorites")?;
            let item = session.item(&anime_id).await?;
            match session.toggle_favorite(&item).await {
                Some(FavoriteToggle::Added) => println!("added {} to favorites", item.title),
                Some(FavoriteToggle::Removed) => {
                    println!("removed {} from favorites", item.title)
                }
                None => return Err(failed("favorite")),
            }
            Ok(())
        }
        Command::Play {
            anime_id,
            translation,
            season,
            episode,
        } => {
            let item = session.item(&anime_id).await?;
            session.open_playback(item.clone()).await;
            if let Some(id) = translation {
                let id = TranslationId::new(id);
                if !session.select_translation(&id).await {
                    return Err(CoreError::Api(format!(
                        "{} has no translation {id}",
                        item.title
                    )));
                }
            }

            let link = session.resolve_stream_link().await;
            let playback = session.snapshot().await.playback;
            out.playback(playback.as_ref(), link.as_deref())?;

            let recorded = match episode {
                Some(episode) => session.record_episode(&item, season, episode).await,
                None => session.record_history(&item).await,
            };
            if recorded == FetchOutcome::Failed {
                tracing::warn!(anime_id = %item.id, "watch was not recorded in history");
            }
            Ok(())
        }
        Command::Whoami => Ok(()),
    }
}

fn ensure(outcome: FetchOutcome, what: &str) -> Result<(), CoreError> {
    match outcome {
        FetchOutcome::Failed => Err(failed(what)),
        _ => Ok(()),
    }
}

fn failed(what: &str) -> CoreError {
    CoreError::Api(format!("{what} request failed; rerun with --verbose for details"))
}
