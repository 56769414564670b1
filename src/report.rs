//! Itinerary/pricing extraction: parse a correlated payload and flatten it
//! into one report row.
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};

use crate::error::{ReconcileError, Result};

/// Column labels of the report, in row order. The spelling of the two
/// arrival-date labels is what existing consumers of the CSV key on.
pub const HEADERS: [&str; 20] = [
    "Pais",
    "Tipo",
    "validatingCarrier",
    "Precio",
    "Moneda",
    "Adultos",
    "Infantes",
    "Niños",
    "Origen",
    "Codigo Origen",
    "Fecha Salida",
    "Destino",
    "Codigo Destino",
    "Fecha Llegaga",
    "Origen Regreso",
    "Codigo Origen Regreso",
    "Fecha Salida Regreso",
    "Destino Regreso",
    "Codigo Destino Regreso",
    "Fecha LLegada Regreso",
];

/// Cells in a one-way row.
pub const ONE_WAY_LEN: usize = 14;
/// Cells in a round-trip row.
pub const ROUND_TRIP_LEN: usize = 20;

pub type ReportRow = Vec<String>;

/// Fields of one leg as they appear in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegSummary {
    pub origin_city: String,
    pub origin_code: String,
    pub departure_date: String,
    pub destination_city: String,
    pub destination_code: String,
    pub arrival_date: String,
}

impl LegSummary {
    fn push_cells(&self, row: &mut ReportRow) {
        row.extend([
            self.origin_city.clone(),
            self.origin_code.clone(),
            self.departure_date.clone(),
            self.destination_city.clone(),
            self.destination_code.clone(),
            self.arrival_date.clone(),
        ]);
    }

    fn from_leg(leg: &Leg) -> Self {
        Self {
            origin_city: leg.origin.city_name.clone(),
            origin_code: leg.origin.code.clone(),
            departure_date: leg.departure_date.clone(),
            destination_city: leg.destination.city_name.clone(),
            destination_code: leg.destination.code.clone(),
            arrival_date: leg.arrival_date.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightReport {
    pub country_code: String,
    pub flight_type: String,
    pub validating_carrier: String,
    /// Adult total fare, already rendered with one decimal.
    pub adult_total_fare: String,
    pub currency: String,
    pub adults: i64,
    pub infants: i64,
    pub children: i64,
    pub outbound: LegSummary,
    /// Present only for two-segment itineraries.
    pub inbound: Option<LegSummary>,
}

impl FlightReport {
    pub fn is_round_trip(&self) -> bool {
        self.inbound.is_some()
    }

    /// Project into the column order of [`HEADERS`]. Inbound cells are left
    /// out entirely for one-way trips.
    pub fn to_row(&self) -> ReportRow {
        let mut row = Vec::with_capacity(ROUND_TRIP_LEN);
        row.extend([
            self.country_code.clone(),
            self.flight_type.clone(),
            self.validating_carrier.clone(),
            self.adult_total_fare.clone(),
            self.currency.clone(),
            self.adults.to_string(),
            self.infants.to_string(),
            self.children.to_string(),
        ]);
        self.outbound.push_cells(&mut row);
        if let Some(inbound) = &self.inbound {
            inbound.push_cells(&mut row);
        }
        row
    }
}

/// Parse a payload and pick out the reported fields.
pub fn extract(payload: &str) -> Result<FlightReport> {
    let doc: ItineraryDocument = serde_json::from_str(payload)
        .map_err(|err| ReconcileError::MalformedPayload(format!("invalid itinerary JSON: {err}")))?;

    let first_segment = doc
        .segments
        .first()
        .ok_or_else(|| ReconcileError::MalformedPayload("itinerary has no segments".into()))?;
    let outbound = first_segment.legs.first().ok_or_else(|| {
        ReconcileError::MalformedPayload("first segment has no legs".into())
    })?;

    let inbound = match doc.segments.as_slice() {
        [_, second] => {
            let leg = second.legs.last().ok_or_else(|| {
                ReconcileError::MalformedPayload("second segment has no legs".into())
            })?;
            Some(LegSummary::from_leg(leg))
        }
        _ => None,
    };

    let price = &doc.price_info;
    Ok(FlightReport {
        country_code: doc.country_code.clone(),
        flight_type: doc.flight_type.clone(),
        validating_carrier: doc.validating_carrier.clone(),
        adult_total_fare: format_fare(price.adults.total_fare),
        currency: price.currency.clone(),
        adults: price.adults.quantity,
        infants: price.infants.quantity,
        children: price.children.quantity,
        outbound: LegSummary::from_leg(outbound),
        inbound,
    })
}

/// Render a fare with exactly one decimal, rounding half away from zero on
/// the shortest decimal form of the value (`850.25` becomes `850.3`).
/// Values beyond the decimal range fall back to plain float formatting.
pub fn format_fare(value: f64) -> String {
    match Decimal::from_f64(value) {
        Some(decimal) => {
            let mut rounded =
                decimal.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(1);
            rounded.to_string()
        }
        None => format!("{value:.1}"),
    }
}

// Upstream serializers emit `null` for unset strings; treat it like absent.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ItineraryDocument {
    #[serde(deserialize_with = "null_as_default")]
    segments: Vec<Segment>,
    #[serde(deserialize_with = "null_as_default")]
    price_info: PriceInfo,
    #[serde(deserialize_with = "null_as_default")]
    validating_carrier: String,
    #[serde(deserialize_with = "null_as_default")]
    flight_type: String,
    #[serde(deserialize_with = "null_as_default")]
    country_code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Segment {
    #[serde(deserialize_with = "null_as_default")]
    legs: Vec<Leg>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Leg {
    #[serde(deserialize_with = "null_as_default")]
    origin: Airport,
    #[serde(deserialize_with = "null_as_default")]
    destination: Airport,
    #[serde(deserialize_with = "null_as_default")]
    departure_date: String,
    #[serde(deserialize_with = "null_as_default")]
    arrival_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Airport {
    #[serde(deserialize_with = "null_as_default")]
    code: String,
    #[serde(deserialize_with = "null_as_default")]
    city_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PriceInfo {
    #[serde(deserialize_with = "null_as_default")]
    adults: PassengerPrice,
    #[serde(deserialize_with = "null_as_default")]
    children: PassengerPrice,
    #[serde(deserialize_with = "null_as_default")]
    infants: PassengerPrice,
    #[serde(deserialize_with = "null_as_default")]
    currency: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PassengerPrice {
    #[serde(deserialize_with = "null_as_default")]
    total_fare: f64,
    #[serde(deserialize_with = "null_as_default")]
    quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn leg(from: (&str, &str), to: (&str, &str), dep: &str, arr: &str) -> Value {
        json!({
            "origin": { "code": from.0, "cityName": from.1, "name": "ignored" },
            "destination": { "code": to.0, "cityName": to.1 },
            "departureDate": dep,
            "departureTime": "10:00",
            "arrivalDate": arr,
            "marketingCarrier": { "code": "AR", "name": "Aerolineas" },
        })
    }

    fn document(segments: Vec<Vec<Value>>) -> String {
        let segments: Vec<Value> = segments
            .into_iter()
            .map(|legs| json!({ "legs": legs, "baggageMessage": "1PC" }))
            .collect();
        json!({
            "segments": segments,
            "priceInfo": {
                "adults": { "totalFare": 850, "quantity": 2, "passengerType": "ADT" },
                "children": { "totalFare": 400.5, "quantity": 1 },
                "infants": { "totalFare": 0, "quantity": 0 },
                "currency": "ARS",
                "conversionRate": 1.0
            },
            "validatingCarrier": "AR",
            "provider": "AMA",
            "flightType": "INTERNATIONAL",
            "domestic": false,
            "countryCode": "AR",
        })
        .to_string()
    }

    fn outbound() -> Value {
        leg(("EZE", "Buenos Aires"), ("MIA", "Miami"), "2019-03-01", "2019-03-02")
    }

    #[test]
    fn one_way_row_has_fourteen_cells() {
        let report = extract(&document(vec![vec![outbound()]])).unwrap();
        assert!(!report.is_round_trip());
        let row = report.to_row();
        assert_eq!(row.len(), ONE_WAY_LEN);
        assert_eq!(
            row,
            vec![
                "AR", "INTERNATIONAL", "AR", "850.0", "ARS", "2", "0", "1",
                "Buenos Aires", "EZE", "2019-03-01", "Miami", "MIA", "2019-03-02",
            ]
        );
    }

    #[test]
    fn round_trip_row_has_twenty_cells() {
        let inbound = leg(("MIA", "Miami"), ("EZE", "Buenos Aires"), "2019-03-10", "2019-03-11");
        let report = extract(&document(vec![vec![outbound()], vec![inbound]])).unwrap();
        let row = report.to_row();
        assert_eq!(row.len(), ROUND_TRIP_LEN);
        assert_eq!(&row[14..], ["Miami", "MIA", "2019-03-10", "Buenos Aires", "EZE", "2019-03-11"]);
    }

    #[test]
    fn inbound_uses_last_leg_of_second_segment() {
        let second = vec![
            leg(("MIA", "Miami"), ("ATL", "Atlanta"), "2019-03-10", "2019-03-10"),
            leg(("ATL", "Atlanta"), ("GRU", "Sao Paulo"), "2019-03-10", "2019-03-11"),
            leg(("GRU", "Sao Paulo"), ("EZE", "Buenos Aires"), "2019-03-11", "2019-03-11"),
        ];
        let report = extract(&document(vec![vec![outbound()], second])).unwrap();
        let inbound = report.inbound.unwrap();
        assert_eq!(inbound.origin_code, "GRU");
        assert_eq!(inbound.destination_city, "Buenos Aires");
        assert_eq!(inbound.departure_date, "2019-03-11");
    }

    #[test]
    fn outbound_uses_first_leg_of_first_segment() {
        let first = vec![
            outbound(),
            leg(("MIA", "Miami"), ("JFK", "New York"), "2019-03-02", "2019-03-02"),
        ];
        let report = extract(&document(vec![first])).unwrap();
        assert_eq!(report.outbound.destination_code, "MIA");
    }

    #[test]
    fn more_than_two_segments_is_one_way() {
        let segments = vec![vec![outbound()], vec![outbound()], vec![outbound()]];
        let row = extract(&document(segments)).unwrap().to_row();
        assert_eq!(row.len(), ONE_WAY_LEN);
    }

    #[test]
    fn zero_segments_is_malformed() {
        let err = extract(&document(vec![])).unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedPayload(_)));
    }

    #[test]
    fn empty_legs_are_malformed() {
        let err = extract(&document(vec![vec![]])).unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedPayload(_)));

        let err = extract(&document(vec![vec![outbound()], vec![]])).unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedPayload(_)));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = extract("not json").unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedPayload(_)));
    }

    #[test]
    fn nulls_and_missing_fields_default() {
        let payload = json!({
            "segments": [ { "legs": [ { "origin": null, "destination": { "code": "MIA" } } ] } ],
            "validatingCarrier": null,
        })
        .to_string();
        let row = extract(&payload).unwrap().to_row();
        assert_eq!(row[2], "");
        assert_eq!(row[3], "0.0");
        assert_eq!(row[5], "0");
        assert_eq!(row[12], "MIA");
    }

    #[test]
    fn fare_has_one_decimal() {
        assert_eq!(format_fare(850.0), "850.0");
        assert_eq!(format_fare(850.25), "850.3");
        assert_eq!(format_fare(850.24), "850.2");
        assert_eq!(format_fare(1234.5678), "1234.6");
        assert_eq!(format_fare(-3.25), "-3.3");
    }

    #[test]
    fn fare_beyond_decimal_range_still_formats() {
        let rendered = format_fare(1e30);
        assert!(rendered.starts_with("1000000000000000"));
        assert!(rendered.ends_with(".0"));

        let payload = document(vec![vec![outbound()]]).replace("\"totalFare\":850", "\"totalFare\":1e30");
        let report = extract(&payload).unwrap();
        assert!(report.adult_total_fare.ends_with(".0"));
        assert_ne!(report.adult_total_fare, "850.0");
    }

    #[test]
    fn headers_cover_round_trip_row() {
        assert_eq!(HEADERS.len(), ROUND_TRIP_LEN);
        assert_eq!(HEADERS[13], "Fecha Llegaga");
        assert_eq!(HEADERS[19], "Fecha LLegada Regreso");
    }
}
