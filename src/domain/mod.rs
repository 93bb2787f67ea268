/// Domain models for the application
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One GPS fix of a flight track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    pub timestamp_seconds: i64,
}

/// Aircraft catalog entry; `id` is the registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aircraft {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub registration: String,
    pub passengers: u32,
    pub average_speed_kmh: f64,
    #[serde(alias = "fuelConsumptionLph")]
    pub fuel_consumption_liters_per_hour: f64,
    #[serde(alias = "fovCostPerFh")]
    pub fixed_operating_cost_per_flight_hour: f64,
    #[serde(alias = "weightTon")]
    pub weight_tons: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pilot {
    pub id: String,
    pub name: String,
    pub cost_per_hour: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    pub iata: String,
    pub oaci: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub landing_fee: f64,
    pub handling_fee_per_ton: f64,
}

/// Scheduled maintenance cost, prorated per flight hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceProgram {
    pub id: String,
    pub aircraft_id: String,
    pub name: String,
    #[serde(alias = "cost")]
    pub total_cost: f64,
    #[serde(alias = "intervalFh")]
    pub interval_flight_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    #[serde(alias = "Nacional")]
    National,
    #[serde(alias = "Internacional")]
    International,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingUnit {
    #[serde(alias = "Por Pasajero")]
    PerPassenger,
    #[serde(alias = "Por Tonelada")]
    PerTon,
    #[serde(alias = "Por Vuelo")]
    PerFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxStatus {
    #[serde(alias = "Activo")]
    Active,
    #[serde(alias = "Inactivo")]
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportTax {
    pub id: String,
    pub airport_iata: String,
    pub concept: String,
    pub operation_type: OperationType,
    pub base_rate: f64,
    /// Reserved; not applied by any billing unit yet.
    #[serde(default)]
    pub critical_hour_rate: f64,
    pub billing_unit: BillingUnit,
    pub effective_date: NaiveDate,
    pub status: TaxStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Process-wide cost tunables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalCostParameters {
    pub fuel_price_per_liter: f64,
    pub navigation_charge_per_km: f64,
}

/// Selections plus raw track submitted for one calculation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationInput {
    #[serde(default)]
    pub aircraft_id: String,
    pub pilot_in_command_id: String,
    pub first_officer_id: String,
    #[serde(alias = "flightDataCsv")]
    pub flight_track_csv: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedTax {
    pub concept: String,
    pub cost: f64,
}

/// Itemized result of a flight cost calculation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationBreakdown {
    pub aircraft: Aircraft,
    pub distance_km: f64,
    pub flight_hours: f64,
    pub origin_airport: Airport,
    pub destination_airport: Airport,
    pub operation_type: OperationType,
    pub pilot_in_command: Pilot,
    pub first_officer: Pilot,
    pub fuel_cost: f64,
    pub maintenance_cost: f64,
    pub crew_cost: f64,
    pub fov_cost: f64,
    pub landing_and_handling_cost: f64,
    pub navigation_cost: f64,
    pub tax_cost: f64,
    pub applied_taxes: Vec<AppliedTax>,
    pub total_cost: f64,
    pub cost_per_hour: f64,
}

/// Catalog seed file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    #[serde(default)]
    pub aircraft: Vec<Aircraft>,
    #[serde(default)]
    pub airports: Vec<Airport>,
    #[serde(default)]
    pub pilots: Vec<Pilot>,
    #[serde(default)]
    pub maintenance_programs: Vec<MaintenanceProgram>,
    #[serde(default)]
    pub taxes: Vec<AirportTax>,
    pub globals: GlobalCostParameters,
}

/// Catalog entries in seed order, indexed by their unique key
#[derive(Debug, Clone)]
pub struct Keyed<T> {
    items: Vec<T>,
    index: BTreeMap<String, usize>,
}

impl<T> Keyed<T> {
    /// Build from seed entries; `Err` carries the first repeated key
    pub fn from_items(items: Vec<T>, key: impl Fn(&T) -> &str) -> Result<Self, String> {
        let mut index = BTreeMap::new();
        for (i, item) in items.iter().enumerate() {
            let k = key(item);
            if index.insert(k.to_string(), i).is_some() {
                return Err(k.to_string());
            }
        }
        Ok(Self { items, index })
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Immutable snapshot of every catalog a calculation reads.
///
/// Every catalog keeps seed order. Aircraft and pilots are also indexed by
/// id. Nearest-airport ties, callsign matches and the order of applied
/// taxes all follow seed order.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub aircraft: Keyed<Aircraft>,
    pub airports: Vec<Airport>,
    pub pilots: Keyed<Pilot>,
    pub maintenance: Vec<MaintenanceProgram>,
    pub taxes: Vec<AirportTax>,
    pub globals: GlobalCostParameters,
}

impl Catalogs {
    pub fn maintenance_for<'a>(
        &'a self,
        aircraft_id: &'a str,
    ) -> impl Iterator<Item = &'a MaintenanceProgram> + 'a {
        self.maintenance
            .iter()
            .filter(move |p| p.aircraft_id == aircraft_id)
    }

    /// Flatten back into the seed file layout
    pub fn to_file(&self) -> CatalogFile {
        CatalogFile {
            aircraft: self.aircraft.iter().cloned().collect(),
            airports: self.airports.clone(),
            pilots: self.pilots.iter().cloned().collect(),
            maintenance_programs: self.maintenance.clone(),
            taxes: self.taxes.clone(),
            globals: self.globals,
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}
