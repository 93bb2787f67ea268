/// Business logic services layer
pub mod taxes;

use crate::domain::{
    Aircraft, Airport, CalculationBreakdown, CalculationInput, Catalogs, MaintenanceProgram,
};
use crate::errors::{ApiError, ApiResult};
use crate::repo::CatalogRepo;
use crate::track::{analyze_track, parse_flight_track, TrackError, TrackSummary};
use crate::utils::{eq_ignore_case, haversine_km};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Nearest airport to a coordinate; the first of equally near airports wins
pub fn find_closest_airport(lat: f64, lon: f64, airports: &[Airport]) -> Option<&Airport> {
    let mut closest = None;
    let mut min_distance = f64::INFINITY;
    for airport in airports {
        let distance = haversine_km(lat, lon, airport.lat, airport.lon);
        if distance < min_distance {
            min_distance = distance;
            closest = Some(airport);
        }
    }
    closest
}

/// Combined maintenance reserve per flight hour; programs without a positive interval are ignored
pub fn maintenance_cost_per_hour<'a>(
    programs: impl IntoIterator<Item = &'a MaintenanceProgram>,
) -> f64 {
    programs
        .into_iter()
        .filter(|p| p.interval_flight_hours > 0.0)
        .map(|p| p.total_cost / p.interval_flight_hours)
        .sum()
}

/// First aircraft, in catalog order, whose registration matches a track callsign
pub fn match_aircraft_by_callsign<'a>(
    callsign: &str,
    catalogs: &'a Catalogs,
) -> Option<&'a Aircraft> {
    catalogs
        .aircraft
        .iter()
        .find(|a| eq_ignore_case(&a.registration, callsign))
}

/// Compute the full cost breakdown of one flight.
///
/// `Err` means the CSV header is unusable. `Ok(None)` means the inputs
/// are not enough to price the flight: too few points, unknown aircraft or
/// pilot, no airports, or a non-positive duration.
pub fn compute_flight_cost(
    input: &CalculationInput,
    catalogs: &Catalogs,
    as_of: NaiveDate,
) -> Result<Option<CalculationBreakdown>, TrackError> {
    if input.flight_track_csv.trim().is_empty() {
        debug!("empty flight track");
        return Ok(None);
    }

    let parsed = parse_flight_track(&input.flight_track_csv)?;
    let track = parsed.track;
    let [origin_point, .., destination_point] = track.as_slice() else {
        debug!(points = track.len(), "not enough track points");
        return Ok(None);
    };

    let (Some(aircraft), Some(pilot_in_command), Some(first_officer)) = (
        catalogs.aircraft.get(&input.aircraft_id),
        catalogs.pilots.get(&input.pilot_in_command_id),
        catalogs.pilots.get(&input.first_officer_id),
    ) else {
        debug!(
            aircraft = %input.aircraft_id,
            pic = %input.pilot_in_command_id,
            fo = %input.first_officer_id,
            "unresolved aircraft or pilot"
        );
        return Ok(None);
    };

    let (Some(origin), Some(destination)) = (
        find_closest_airport(origin_point.lat, origin_point.lon, &catalogs.airports),
        find_closest_airport(destination_point.lat, destination_point.lon, &catalogs.airports),
    ) else {
        debug!("airport catalog is empty");
        return Ok(None);
    };

    let TrackSummary {
        distance_km,
        flight_hours,
    } = analyze_track(&track);
    if flight_hours <= 0.0 {
        debug!(flight_hours, "non-positive flight duration");
        return Ok(None);
    }

    let globals = &catalogs.globals;
    let maintenance_cost =
        flight_hours * maintenance_cost_per_hour(catalogs.maintenance_for(&aircraft.id));
    let fuel_cost =
        flight_hours * aircraft.fuel_consumption_liters_per_hour * globals.fuel_price_per_liter;
    let crew_cost = flight_hours * (pilot_in_command.cost_per_hour + first_officer.cost_per_hour);
    let fov_cost = flight_hours * aircraft.fixed_operating_cost_per_flight_hour;
    let landing_and_handling_cost =
        destination.landing_fee + destination.handling_fee_per_ton * aircraft.weight_tons;
    let navigation_cost = distance_km * globals.navigation_charge_per_km;

    let operation_type = taxes::operation_type_for(origin, destination);
    let (applied_taxes, tax_cost) = taxes::apply_taxes(
        taxes::applicable_taxes(destination, operation_type, as_of, &catalogs.taxes),
        aircraft,
    );

    let total_cost = fuel_cost
        + maintenance_cost
        + crew_cost
        + fov_cost
        + landing_and_handling_cost
        + navigation_cost
        + tax_cost;

    Ok(Some(CalculationBreakdown {
        aircraft: aircraft.clone(),
        distance_km,
        flight_hours,
        origin_airport: origin.clone(),
        destination_airport: destination.clone(),
        operation_type,
        pilot_in_command: pilot_in_command.clone(),
        first_officer: first_officer.clone(),
        fuel_cost,
        maintenance_cost,
        crew_cost,
        fov_cost,
        landing_and_handling_cost,
        navigation_cost,
        tax_cost,
        applied_taxes,
        total_cost,
        cost_per_hour: total_cost / flight_hours,
    }))
}

/// Catalog magnitudes large enough to overflow `f64` must not reach the client
fn ensure_finite(breakdown: &CalculationBreakdown) -> anyhow::Result<()> {
    anyhow::ensure!(
        breakdown.total_cost.is_finite() && breakdown.cost_per_hour.is_finite(),
        "cost of flight with aircraft {} overflowed",
        breakdown.aircraft.id
    );
    Ok(())
}

/// Quick look at a pasted track before pricing it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPreview {
    pub points: usize,
    #[serde(flatten)]
    pub summary: TrackSummary,
    pub callsign: Option<String>,
    pub suggested_aircraft_id: Option<String>,
}

/// Flight cost service
pub struct CostService {
    repo: CatalogRepo,
}

impl CostService {
    pub fn new(repo: CatalogRepo) -> Self {
        Self { repo }
    }

    pub async fn catalogs(&self) -> Catalogs {
        self.repo.snapshot().await
    }

    /// Parse and summarize a track, suggesting an aircraft from its callsign
    pub async fn preview(&self, csv: &str) -> ApiResult<TrackPreview> {
        let parsed = parse_flight_track(csv)?;
        let catalogs = self.repo.snapshot().await;
        let suggested_aircraft_id = parsed
            .callsign
            .as_deref()
            .and_then(|c| match_aircraft_by_callsign(c, &catalogs))
            .map(|a| a.id.clone());

        Ok(TrackPreview {
            points: parsed.track.len(),
            summary: analyze_track(&parsed.track),
            callsign: parsed.callsign,
            suggested_aircraft_id,
        })
    }

    /// Validate the selections and price the flight against today's catalogs
    pub async fn calculate(&self, mut input: CalculationInput) -> ApiResult<CalculationBreakdown> {
        if input.flight_track_csv.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "flight track data is required".to_string(),
            ));
        }
        if input.pilot_in_command_id == input.first_officer_id {
            return Err(ApiError::InvalidInput(
                "pilot in command and first officer must be different pilots".to_string(),
            ));
        }

        let catalogs = self.repo.snapshot().await;
        if catalogs.aircraft.is_empty()
            || catalogs.airports.len() < 2
            || catalogs.pilots.len() < 2
        {
            return Err(ApiError::IncompleteData(
                "catalogs need at least one aircraft, two airports and two pilots".to_string(),
            ));
        }

        if input.aircraft_id.trim().is_empty() {
            let parsed = parse_flight_track(&input.flight_track_csv)?;
            if let Some(aircraft) = parsed
                .callsign
                .as_deref()
                .and_then(|c| match_aircraft_by_callsign(c, &catalogs))
            {
                debug!(aircraft = %aircraft.id, "aircraft selected from callsign");
                input.aircraft_id = aircraft.id.clone();
            }
        }

        let today = Utc::now().date_naive();
        match compute_flight_cost(&input, &catalogs, today)? {
            Some(breakdown) => {
                ensure_finite(&breakdown)?;
                info!(
                    aircraft = %breakdown.aircraft.id,
                    origin = %breakdown.origin_airport.iata,
                    destination = %breakdown.destination_airport.iata,
                    total_cost = breakdown.total_cost,
                    "flight cost calculated"
                );
                Ok(breakdown)
            }
            None => Err(ApiError::IncompleteData(
                "insufficient or inconsistent data to calculate the flight cost".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AirportTax, BillingUnit, CatalogFile, GlobalCostParameters, OperationType, Pilot,
        TaxStatus,
    };

    fn airport(iata: &str, country: &str, lat: f64, lon: f64) -> Airport {
        Airport {
            iata: iata.to_string(),
            oaci: format!("MM{iata}"),
            name: format!("{iata} airport"),
            city: iata.to_string(),
            country: country.to_string(),
            lat,
            lon,
            landing_fee: 1500.0,
            handling_fee_per_ton: 100.0,
        }
    }

    fn program(id: &str, aircraft_id: &str, total_cost: f64, interval: f64) -> MaintenanceProgram {
        MaintenanceProgram {
            id: id.to_string(),
            aircraft_id: aircraft_id.to_string(),
            name: id.to_string(),
            total_cost,
            interval_flight_hours: interval,
            description: None,
        }
    }

    fn pilot(id: &str, cost_per_hour: f64) -> Pilot {
        Pilot {
            id: id.to_string(),
            name: id.to_string(),
            cost_per_hour,
        }
    }

    fn catalog_file() -> CatalogFile {
        CatalogFile {
            aircraft: vec![Aircraft {
                id: "N501RS".to_string(),
                brand: "LearJet".to_string(),
                model: "LJ31".to_string(),
                registration: "N501RS".to_string(),
                passengers: 8,
                average_speed_kmh: 780.0,
                fuel_consumption_liters_per_hour: 900.0,
                fixed_operating_cost_per_flight_hour: 200.0,
                weight_tons: 7.0,
            }],
            airports: vec![
                airport("MEX", "México", 19.4384, -99.0655111),
                airport("MTY", "México", 25.7781556, -100.1061889),
                airport("SAT", "USA", 29.5331278, -98.4705444),
            ],
            pilots: vec![pilot("pilot_1", 150.0), pilot("pilot_3", 90.0)],
            maintenance_programs: vec![
                program("maint_1", "N501RS", 150000.0, 3600.0),
                program("maint_2", "N501RS", 25000.0, 200.0),
                program("maint_3", "XB-KRB", 5000.0, 100.0),
            ],
            taxes: vec![],
            globals: GlobalCostParameters {
                fuel_price_per_liter: 1.5,
                navigation_charge_per_km: 0.5,
            },
        }
    }

    fn catalogs() -> Catalogs {
        crate::repo::build_catalogs(catalog_file()).unwrap()
    }

    fn input(csv: &str) -> CalculationInput {
        CalculationInput {
            aircraft_id: "N501RS".to_string(),
            pilot_in_command_id: "pilot_1".to_string(),
            first_officer_id: "pilot_3".to_string(),
            flight_track_csv: csv.to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const MEX_TO_MTY: &str = concat!(
        "Timestamp,Position,Callsign\n",
        "1000,\"19.43,-99.06\",N501RS\n",
        "4600,\"22.5,-99.5\",\n",
        "8200,\"25.77,-100.10\",\n",
    );

    #[test]
    fn test_find_closest_airport() {
        let airports = catalogs().airports;
        assert_eq!(find_closest_airport(19.5, -99.1, &airports).unwrap().iata, "MEX");
        assert_eq!(find_closest_airport(29.0, -98.0, &airports).unwrap().iata, "SAT");
        assert!(find_closest_airport(0.0, 0.0, &[]).is_none());
    }

    #[test]
    fn test_single_airport_always_wins() {
        let only = vec![airport("TEB", "USA", 40.85, -74.06)];
        for (lat, lon) in [(-33.9, 151.2), (0.0, 0.0), (89.0, 179.0)] {
            assert_eq!(find_closest_airport(lat, lon, &only).unwrap().iata, "TEB");
        }
    }

    #[test]
    fn test_closest_airport_tie_keeps_catalog_order() {
        let airports = vec![
            airport("AAA", "X", 10.0, 0.0),
            airport("BBB", "X", -10.0, 0.0),
        ];
        assert_eq!(find_closest_airport(0.0, 0.0, &airports).unwrap().iata, "AAA");
    }

    #[test]
    fn test_maintenance_cost_per_hour() {
        let programs = vec![
            program("a", "N501RS", 150000.0, 3600.0),
            program("b", "N501RS", 25000.0, 200.0),
            program("zero", "N501RS", 1000.0, 0.0),
            program("negative", "N501RS", 1000.0, -5.0),
        ];
        let per_hour = maintenance_cost_per_hour(&programs);
        assert!((2.0 * per_hour - 333.33).abs() < 0.01);
    }

    #[test]
    fn test_full_breakdown() {
        let catalogs = catalogs();
        let breakdown = compute_flight_cost(&input(MEX_TO_MTY), &catalogs, date(2025, 1, 1))
            .unwrap()
            .unwrap();

        assert_eq!(breakdown.origin_airport.iata, "MEX");
        assert_eq!(breakdown.destination_airport.iata, "MTY");
        assert_eq!(breakdown.operation_type, OperationType::National);
        assert_eq!(breakdown.flight_hours, 2.0);
        assert_eq!(breakdown.fuel_cost, 2700.0);
        assert!((breakdown.maintenance_cost - 333.33).abs() < 0.01);
        assert_eq!(breakdown.crew_cost, 480.0);
        assert_eq!(breakdown.fov_cost, 400.0);
        assert_eq!(breakdown.landing_and_handling_cost, 1500.0 + 100.0 * 7.0);
        assert!((breakdown.navigation_cost - breakdown.distance_km * 0.5).abs() < 1e-9);
        assert!(breakdown.applied_taxes.is_empty());
        assert_eq!(breakdown.tax_cost, 0.0);

        let sum = breakdown.fuel_cost
            + breakdown.maintenance_cost
            + breakdown.crew_cost
            + breakdown.fov_cost
            + breakdown.landing_and_handling_cost
            + breakdown.navigation_cost
            + breakdown.tax_cost;
        assert_eq!(breakdown.total_cost, sum);
        let recombined = breakdown.cost_per_hour * breakdown.flight_hours;
        assert!((recombined - breakdown.total_cost).abs() < 1e-6);
    }

    #[test]
    fn test_taxes_for_destination_are_applied() {
        let mut file = catalog_file();
        file.taxes = vec![
            AirportTax {
                id: "tua".to_string(),
                airport_iata: "MTY".to_string(),
                concept: "TUA".to_string(),
                operation_type: OperationType::National,
                base_rate: 10.0,
                critical_hour_rate: 0.0,
                billing_unit: BillingUnit::PerPassenger,
                effective_date: date(2024, 1, 1),
                status: TaxStatus::Active,
                description: None,
                notes: None,
            },
            AirportTax {
                id: "origin_only".to_string(),
                airport_iata: "MEX".to_string(),
                concept: "Origin".to_string(),
                operation_type: OperationType::National,
                base_rate: 500.0,
                critical_hour_rate: 0.0,
                billing_unit: BillingUnit::PerFlight,
                effective_date: date(2024, 1, 1),
                status: TaxStatus::Active,
                description: None,
                notes: None,
            },
        ];
        let catalogs = crate::repo::build_catalogs(file).unwrap();
        let breakdown = compute_flight_cost(&input(MEX_TO_MTY), &catalogs, date(2025, 1, 1))
            .unwrap()
            .unwrap();

        assert_eq!(breakdown.applied_taxes.len(), 1);
        assert_eq!(breakdown.applied_taxes[0].concept, "TUA");
        assert_eq!(breakdown.tax_cost, 80.0);

        let before = compute_flight_cost(&input(MEX_TO_MTY), &catalogs, date(2023, 12, 31))
            .unwrap()
            .unwrap();
        assert!(before.applied_taxes.is_empty());
    }

    #[test]
    fn test_international_flight() {
        let csv = "Timestamp,Position\n0,\"25.77,-100.10\"\n5400,\"29.53,-98.47\"\n";
        let breakdown = compute_flight_cost(&input(csv), &catalogs(), date(2025, 1, 1))
            .unwrap()
            .unwrap();
        assert_eq!(breakdown.destination_airport.iata, "SAT");
        assert_eq!(breakdown.operation_type, OperationType::International);
    }

    #[test]
    fn test_incomplete_inputs_yield_none() {
        let catalogs = catalogs();
        let today = date(2025, 1, 1);

        assert!(compute_flight_cost(&input("   "), &catalogs, today).unwrap().is_none());
        assert!(compute_flight_cost(&input("Timestamp,Position\n"), &catalogs, today)
            .unwrap()
            .is_none());
        let single_point = input("Timestamp,Position\n0,\"19.4,-99.0\"\n");
        assert!(compute_flight_cost(&single_point, &catalogs, today)
            .unwrap()
            .is_none());

        let mut unknown_aircraft = input(MEX_TO_MTY);
        unknown_aircraft.aircraft_id = "XX-NOPE".to_string();
        assert!(compute_flight_cost(&unknown_aircraft, &catalogs, today).unwrap().is_none());

        let mut unknown_pilot = input(MEX_TO_MTY);
        unknown_pilot.first_officer_id = "ghost".to_string();
        assert!(compute_flight_cost(&unknown_pilot, &catalogs, today).unwrap().is_none());

        let mut no_airports = catalogs.clone();
        no_airports.airports.clear();
        assert!(compute_flight_cost(&input(MEX_TO_MTY), &no_airports, today).unwrap().is_none());
    }

    #[test]
    fn test_non_positive_duration_yields_none() {
        let catalogs = catalogs();
        let today = date(2025, 1, 1);
        let same_time = "Timestamp,Position\n0,\"19.4,-99.0\"\n0,\"25.7,-100.1\"\n";
        let backwards = "Timestamp,Position\n7200,\"19.4,-99.0\"\n0,\"25.7,-100.1\"\n";
        assert!(compute_flight_cost(&input(same_time), &catalogs, today).unwrap().is_none());
        assert!(compute_flight_cost(&input(backwards), &catalogs, today).unwrap().is_none());
    }

    #[test]
    fn test_malformed_header_is_an_error() {
        let csv = "Timestamp,Lat,Lon\n0,1,2\n60,1,3\n";
        let result = compute_flight_cost(&input(csv), &catalogs(), date(2025, 1, 1));
        assert!(matches!(result, Err(TrackError::MissingColumns(_))));
    }

    #[test]
    fn test_same_pilot_for_both_roles_is_not_checked_by_core() {
        // Pilot distinctness is a host precondition, enforced by CostService::calculate.
        let mut same = input(MEX_TO_MTY);
        same.first_officer_id = "pilot_1".to_string();
        let breakdown = compute_flight_cost(&same, &catalogs(), date(2025, 1, 1))
            .unwrap()
            .unwrap();
        assert_eq!(breakdown.crew_cost, 2.0 * 300.0);
    }

    #[test]
    fn test_match_aircraft_by_callsign_ignores_case() {
        let catalogs = catalogs();
        assert_eq!(match_aircraft_by_callsign("n501rs", &catalogs).unwrap().id, "N501RS");
        assert!(match_aircraft_by_callsign("AMX123", &catalogs).is_none());
    }

    #[test]
    fn test_callsign_match_follows_catalog_order() {
        let mut file = catalog_file();
        let mut upper = file.aircraft[0].clone();
        upper.id = "ZZ-CASE".to_string();
        upper.registration = "XA-ABC".to_string();
        let mut lower = file.aircraft[0].clone();
        lower.id = "AA-CASE".to_string();
        lower.registration = "xa-abc".to_string();
        file.aircraft = vec![upper, lower];
        let catalogs = crate::repo::build_catalogs(file).unwrap();

        let matched = match_aircraft_by_callsign("Xa-Abc", &catalogs).unwrap();
        assert_eq!(matched.id, "ZZ-CASE");
    }

    #[test]
    fn test_extreme_timestamps_are_priced() {
        let csv = concat!(
            "Timestamp,Position\n",
            "-9223372036854775808,\"19.43,-99.06\"\n",
            "9223372036854775807,\"25.77,-100.10\"\n",
        );
        let breakdown = compute_flight_cost(&input(csv), &catalogs(), date(2025, 1, 1))
            .unwrap()
            .unwrap();
        assert!(breakdown.flight_hours > 0.0);
        assert!(breakdown.total_cost.is_finite());
    }

    fn service() -> CostService {
        CostService::new(CatalogRepo::new(catalogs()))
    }

    #[tokio::test]
    async fn test_service_rejects_same_pilot() {
        let mut same = input(MEX_TO_MTY);
        same.first_officer_id = "pilot_1".to_string();
        let err = service().calculate(same).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_service_rejects_blank_track() {
        let err = service().calculate(input("  \n ")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_service_selects_aircraft_from_callsign() {
        let mut no_aircraft = input(MEX_TO_MTY);
        no_aircraft.aircraft_id = String::new();
        let breakdown = service().calculate(no_aircraft).await.unwrap();
        assert_eq!(breakdown.aircraft.id, "N501RS");
    }

    #[tokio::test]
    async fn test_service_requires_minimum_catalogs() {
        let mut small = catalogs();
        small.airports.truncate(1);
        let service = CostService::new(CatalogRepo::new(small));
        let err = service.calculate(input(MEX_TO_MTY)).await.unwrap_err();
        assert!(matches!(err, ApiError::IncompleteData(_)));
    }

    #[tokio::test]
    async fn test_service_reports_overflowing_cost_as_internal() {
        let mut huge = catalogs();
        huge.globals.fuel_price_per_liter = f64::MAX;
        let service = CostService::new(CatalogRepo::new(huge));
        let err = service.calculate(input(MEX_TO_MTY)).await.unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert!(err.to_string().contains("N501RS"));
    }

    #[tokio::test]
    async fn test_service_maps_malformed_track() {
        let err = service()
            .calculate(input("Position\n\"19.4,-99.0\"\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_preview_suggests_aircraft() {
        let preview = service().preview(MEX_TO_MTY).await.unwrap();
        assert_eq!(preview.points, 3);
        assert_eq!(preview.summary.flight_hours, 2.0);
        assert_eq!(preview.callsign.as_deref(), Some("N501RS"));
        assert_eq!(preview.suggested_aircraft_id.as_deref(), Some("N501RS"));
    }
}
