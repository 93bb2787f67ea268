/// Airport tax selection and costing
use crate::domain::{
    Aircraft, Airport, AirportTax, AppliedTax, BillingUnit, OperationType, TaxStatus,
};
use chrono::NaiveDate;

/// International when the two airports are in different countries
pub fn operation_type_for(origin: &Airport, destination: &Airport) -> OperationType {
    if origin.country != destination.country {
        OperationType::International
    } else {
        OperationType::National
    }
}

/// Active taxes of the destination airport, in force on `as_of`, for this operation type
pub fn applicable_taxes<'a>(
    destination: &'a Airport,
    operation_type: OperationType,
    as_of: NaiveDate,
    catalog: &'a [AirportTax],
) -> impl Iterator<Item = &'a AirportTax> + 'a {
    catalog.iter().filter(move |tax| {
        tax.airport_iata == destination.iata
            && tax.status == TaxStatus::Active
            && tax.effective_date <= as_of
            && tax.operation_type == operation_type
    })
}

/// Monetary amount of one tax for one flight of `aircraft`
pub fn tax_cost(tax: &AirportTax, aircraft: &Aircraft) -> f64 {
    match tax.billing_unit {
        BillingUnit::PerPassenger => tax.base_rate * f64::from(aircraft.passengers),
        BillingUnit::PerTon => tax.base_rate * aircraft.weight_tons,
        BillingUnit::PerFlight => tax.base_rate,
    }
}

/// Line items for every applicable tax with a positive cost, plus their sum
pub fn apply_taxes<'a>(
    taxes: impl Iterator<Item = &'a AirportTax>,
    aircraft: &Aircraft,
) -> (Vec<AppliedTax>, f64) {
    let applied: Vec<AppliedTax> = taxes
        .map(|tax| AppliedTax {
            concept: tax.concept.clone(),
            cost: tax_cost(tax, aircraft),
        })
        .filter(|line| line.cost > 0.0)
        .collect();
    let total = applied.iter().map(|line| line.cost).sum();
    (applied, total)
}
