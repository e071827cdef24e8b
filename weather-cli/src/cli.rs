use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use weather_gateway::{
    Config, FavoritesStore, FileFavoritesStore, GatewayError, Units, WeatherGateway,
    WeatherProvider, WeatherQuery, provider::MAX_SEARCH_LIMIT,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the OpenWeather API key and preferred units.
    Configure,

    /// Show current conditions for a city or a coordinate pair.
    Show {
        /// City name, optionally with a country code, e.g. "London,GB".
        #[arg(required_unless_present = "lat", conflicts_with_all = ["lat", "lon"])]
        city: Option<String>,

        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Look up cities matching a free-text query.
    Search {
        text: String,

        /// Maximum number of matches (1-10).
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Check whether the weather service is reachable.
    Health,

    /// Manage favorite cities.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// List saved cities.
    List,

    /// Save the best match for a city name.
    Add { city: String },

    /// Remove a saved city by id.
    Remove { id: Uuid },

    /// Show current conditions for a saved city.
    Show { id: Uuid },
}

/// Commands that talk to the weather service.
#[derive(Debug)]
enum GatewayCommand {
    Show { city: Option<String>, lat: Option<f64>, lon: Option<f64> },
    Search { text: String, limit: usize },
    Health,
    Favorites(FavoritesCommand),
}

impl Command {
    /// `None` for commands that run without a gateway.
    fn into_gateway_command(self) -> Option<GatewayCommand> {
        match self {
            Command::Configure => None,
            Command::Show { city, lat, lon } => Some(GatewayCommand::Show { city, lat, lon }),
            Command::Search { text, limit } => Some(GatewayCommand::Search { text, limit }),
            Command::Health => Some(GatewayCommand::Health),
            Command::Favorites { action } => Some(GatewayCommand::Favorites(action)),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command.into_gateway_command() {
            None => configure(),
            Some(command) => run_with_gateway(command).await,
        }
    }
}

async fn run_with_gateway(command: GatewayCommand) -> anyhow::Result<()> {
    let config = Config::load()?;
    let gateway = WeatherGateway::new(config.gateway_config()?).map_err(friendly)?;
    let units = gateway.config().units;
    let cancel = cancel_on_ctrl_c();
    tracing::debug!(%units, base_url = %gateway.config().base_url, "gateway ready");

    match command {
        GatewayCommand::Show { city, lat, lon } => {
            let query = match (city, lat, lon) {
                (Some(city), _, _) => WeatherQuery::parse(&city).map_err(friendly)?,
                (None, Some(lat), Some(lon)) => WeatherQuery::coordinates(lat, lon),
                _ => bail!("Provide a city name or both --lat and --lon"),
            };

            let conditions =
                gateway.get_current_conditions(&query, &cancel).await.map_err(friendly)?;
            println!("{}", render::conditions(&conditions, units));
        }
        GatewayCommand::Search { text, limit } => {
            if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
                bail!("--limit must be between 1 and {MAX_SEARCH_LIMIT}");
            }

            let cities = gateway.search_cities(&text, limit, &cancel).await.map_err(friendly)?;
            println!("{}", render::cities(&cities));
        }
        GatewayCommand::Health => {
            if gateway.is_healthy().await {
                println!("Weather service is reachable.");
            } else {
                bail!("Weather service is not reachable. Run with RUST_LOG=debug for details.");
            }
        }
        GatewayCommand::Favorites(action) => {
            let store = FileFavoritesStore::new(config.favorites_file_path()?);
            store.ensure_ready()?;
            run_favorites(action, &store, &gateway, units, &cancel).await?;
        }
    }

    Ok(())
}

async fn run_favorites(
    action: FavoritesCommand,
    store: &impl FavoritesStore,
    gateway: &WeatherGateway,
    units: Units,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    match action {
        FavoritesCommand::List => {
            println!("{}", render::favorites(&store.list()?));
        }
        FavoritesCommand::Add { city } => {
            let best = gateway
                .search_cities(&city, 1, cancel)
                .await
                .map_err(friendly)?
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("No city matching '{city}' was found"))?;

            if store.exists_by_city_country(&best.name, &best.country)? {
                println!("{} is already a favorite.", best.display_name());
                return Ok(());
            }

            let favorite = store.add(
                &best.name,
                &best.country,
                best.coordinates.latitude,
                best.coordinates.longitude,
            )?;
            println!("Saved {} ({})", best.display_name(), favorite.id);
        }
        FavoritesCommand::Remove { id } => {
            if store.remove(id)? {
                println!("Removed favorite {id}.");
            } else {
                bail!("No favorite with id {id}");
            }
        }
        FavoritesCommand::Show { id } => {
            let favorite =
                store.get_by_id(id)?.with_context(|| format!("No favorite with id {id}"))?;

            let conditions = gateway
                .get_current_conditions(&favorite.query(), cancel)
                .await
                .map_err(friendly)?;
            store.touch_last_accessed(id)?;

            println!("{}", render::conditions(&conditions, units));
        }
    }

    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let units = inquire::Select::new("Units requested from the weather API:", Units::all().to_vec())
        .prompt()
        .context("Failed to read units")?;

    config.set_api_key(api_key.trim().to_string());
    config.gateway.units = units;
    config.gateway_config()?;
    config.save()?;

    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

/// Cancel in-flight requests when the user presses Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling in-flight requests");
            token.cancel();
        }
    });
    cancel
}

/// Lead with the end-user message, keep the technical detail as the cause.
fn friendly(err: GatewayError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}
