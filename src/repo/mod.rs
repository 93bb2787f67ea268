/// Repository layer for catalog snapshots
use crate::domain::{CatalogFile, Catalogs, Keyed};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("duplicate aircraft id {0}")]
    DuplicateAircraft(String),
    #[error("duplicate pilot id {0}")]
    DuplicatePilot(String),
    #[error("duplicate airport IATA code {0}")]
    DuplicateAirport(String),
}

/// Index a seed file into lookup-friendly catalogs
pub fn build_catalogs(file: CatalogFile) -> Result<Catalogs, CatalogError> {
    let aircraft = Keyed::from_items(file.aircraft, |a| a.id.as_str())
        .map_err(CatalogError::DuplicateAircraft)?;
    let pilots =
        Keyed::from_items(file.pilots, |p| p.id.as_str()).map_err(CatalogError::DuplicatePilot)?;

    for (i, airport) in file.airports.iter().enumerate() {
        if file.airports[..i].iter().any(|a| a.iata == airport.iata) {
            return Err(CatalogError::DuplicateAirport(airport.iata.clone()));
        }
    }

    Ok(Catalogs {
        aircraft,
        airports: file.airports,
        pilots,
        maintenance: file.maintenance_programs,
        taxes: file.taxes,
        globals: file.globals,
    })
}

/// In-memory catalog store; readers get their own copy per calculation
#[derive(Clone)]
pub struct CatalogRepo {
    catalogs: Arc<RwLock<Catalogs>>,
}

impl CatalogRepo {
    pub fn new(catalogs: Catalogs) -> Self {
        Self {
            catalogs: Arc::new(RwLock::new(catalogs)),
        }
    }

    /// Load catalogs from a JSON seed file
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading catalog file {}", path.display()))?;
        let file: CatalogFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing catalog file {}", path.display()))?;
        let catalogs = build_catalogs(file)?;

        info!(
            aircraft = catalogs.aircraft.len(),
            airports = catalogs.airports.len(),
            pilots = catalogs.pilots.len(),
            taxes = catalogs.taxes.len(),
            "catalogs loaded from {}",
            path.display()
        );
        Ok(Self::new(catalogs))
    }

    /// Consistent copy of every catalog
    pub async fn snapshot(&self) -> Catalogs {
        self.catalogs.read().await.clone()
    }

    /// Apply a change to the catalogs held by this repo
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Catalogs),
    {
        let mut guard = self.catalogs.write().await;
        f(&mut guard);
    }
}
