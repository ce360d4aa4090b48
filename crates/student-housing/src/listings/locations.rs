use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use super::domain::{GeoPoint, NewCity, NewNeighborhood};
use super::repository::{ListingRepository, RepositoryError};

/// Cities and their neighborhoods as shipped in a JSON seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationSeed {
    pub cities: Vec<SeedCity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCity {
    pub name: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    #[serde(default)]
    pub neighborhoods: Vec<SeedNeighborhood>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedNeighborhood {
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub cities: usize,
    pub neighborhoods: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum LocationSeedError {
    #[error("unable to read location seed {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("location seed is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

fn default_country() -> String {
    "France".to_string()
}

impl LocationSeed {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LocationSeedError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| LocationSeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, LocationSeedError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Registers every city and neighborhood of the seed in one transaction;
    /// any conflict leaves the store untouched.
    pub fn apply<R: ListingRepository>(
        &self,
        repository: &R,
    ) -> Result<SeedSummary, LocationSeedError> {
        let summary = repository.transaction(|uow| -> Result<_, LocationSeedError> {
            let mut summary = SeedSummary::default();
            for seed in &self.cities {
                let city = uow.insert_city(NewCity {
                    name: seed.name.clone(),
                    postal_code: seed.postal_code.clone(),
                    country: seed.country.clone(),
                    coordinates: seed.coordinates,
                })?;
                summary.cities += 1;

                for neighborhood in &seed.neighborhoods {
                    uow.insert_neighborhood(NewNeighborhood {
                        city_id: city.id,
                        name: neighborhood.name.clone(),
                        coordinates: neighborhood.coordinates,
                    })?;
                    summary.neighborhoods += 1;
                }
            }
            Ok(summary)
        })?;

        info!(
            cities = summary.cities,
            neighborhoods = summary.neighborhoods,
            "location seed applied"
        );
        Ok(summary)
    }
}
