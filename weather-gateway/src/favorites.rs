//! Favorite cities, persisted as a small TOML table.
//!
//! All favorites live in one logical partition; each entity has a unique row
//! id. [`FavoritesStore::ensure_ready`] must be called once before use.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Coordinates, WeatherQuery};

pub const FAVORITES_PARTITION: &str = "favorites";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCity {
    pub partition_key: String,
    pub id: Uuid,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl FavoriteCity {
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    pub fn query(&self) -> WeatherQuery {
        WeatherQuery::Coordinates(self.coordinates())
    }
}

pub trait FavoritesStore: Send + Sync {
    /// Create the backing storage if needed. Idempotent.
    fn ensure_ready(&self) -> Result<()>;

    /// All favorites, oldest first.
    fn list(&self) -> Result<Vec<FavoriteCity>>;

    fn get_by_id(&self, id: Uuid) -> Result<Option<FavoriteCity>>;

    fn add(
        &self,
        city: &str,
        country: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<FavoriteCity>;

    /// Returns whether an entity was removed.
    fn remove(&self, id: Uuid) -> Result<bool>;

    /// Returns whether an entity was found and updated.
    fn touch_last_accessed(&self, id: Uuid) -> Result<bool>;

    /// Case-insensitive match on city and country.
    fn exists_by_city_country(&self, city: &str, country: &str) -> Result<bool>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct FavoritesFile {
    #[serde(default)]
    favorites: Vec<FavoriteCity>,
}

#[derive(Debug)]
pub struct FileFavoritesStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileFavoritesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<FavoritesFile> {
        if !self.path.exists() {
            return Err(anyhow!(
                "Favorites store at {} is not initialized; call ensure_ready() first",
                self.path.display()
            ));
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read favorites file: {}", self.path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse favorites file: {}", self.path.display()))
    }

    fn write(&self, file: &FavoritesFile) -> Result<()> {
        let toml = toml::to_string_pretty(file).context("Failed to serialize favorites to TOML")?;

        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, toml)
            .with_context(|| format!("Failed to write favorites file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace favorites file: {}", self.path.display()))?;

        Ok(())
    }
}

impl FavoritesStore for FileFavoritesStore {
    fn ensure_ready(&self) -> Result<()> {
        let _guard = self.lock.lock();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create favorites directory: {}", parent.display())
            })?;
        }

        if !self.path.exists() {
            self.write(&FavoritesFile::default())?;
            tracing::info!(path = %self.path.display(), "created favorites store");
        }

        Ok(())
    }

    fn list(&self) -> Result<Vec<FavoriteCity>> {
        let _guard = self.lock.lock();
        let mut favorites = self.read()?.favorites;
        favorites.sort_by_key(|f| f.created_at);
        Ok(favorites)
    }

    fn get_by_id(&self, id: Uuid) -> Result<Option<FavoriteCity>> {
        let _guard = self.lock.lock();
        Ok(self.read()?.favorites.into_iter().find(|f| f.id == id))
    }

    fn add(
        &self,
        city: &str,
        country: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<FavoriteCity> {
        let city = city.trim();
        let country = country.trim();
        if city.is_empty() || country.is_empty() {
            return Err(anyhow!("City and country must not be empty"));
        }
        Coordinates::new(latitude, longitude).validate()?;

        let _guard = self.lock.lock();
        let mut file = self.read()?;

        let now = Utc::now();
        let favorite = FavoriteCity {
            partition_key: FAVORITES_PARTITION.to_string(),
            id: Uuid::new_v4(),
            city: city.to_string(),
            country: country.to_string(),
            latitude,
            longitude,
            created_at: now,
            last_accessed: now,
        };

        file.favorites.push(favorite.clone());
        self.write(&file)?;

        tracing::info!(id = %favorite.id, city = %favorite.city, "favorite added");
        Ok(favorite)
    }

    fn remove(&self, id: Uuid) -> Result<bool> {
        let _guard = self.lock.lock();
        let mut file = self.read()?;

        let before = file.favorites.len();
        file.favorites.retain(|f| f.id != id);
        if file.favorites.len() == before {
            return Ok(false);
        }

        self.write(&file)?;
        tracing::info!(%id, "favorite removed");
        Ok(true)
    }

    fn touch_last_accessed(&self, id: Uuid) -> Result<bool> {
        let _guard = self.lock.lock();
        let mut file = self.read()?;

        let Some(favorite) = file.favorites.iter_mut().find(|f| f.id == id) else {
            return Ok(false);
        };
        favorite.last_accessed = Utc::now();

        self.write(&file)?;
        Ok(true)
    }

    fn exists_by_city_country(&self, city: &str, country: &str) -> Result<bool> {
        let _guard = self.lock.lock();
        let city = city.trim();
        let country = country.trim();

        Ok(self.read()?.favorites.iter().any(|f| {
            f.city.eq_ignore_ascii_case(city) && f.country.eq_ignore_ascii_case(country)
        }))
    }
}
