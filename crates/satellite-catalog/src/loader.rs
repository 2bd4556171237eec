//! Catalog loading from JSON files

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::{Catalog, CatalogError, Result, Rgb, SatelliteRecord};

/// Validate latitude is in valid range
fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && lat.is_finite()
}

/// Validate longitude is in valid range
fn is_valid_longitude(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && lon.is_finite()
}

/// Numbers may arrive as JSON numbers, numeric strings, "" or null
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Ids and dates may arrive as strings or numbers
fn lenient_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Null) | None => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        other => other,
    })
}

/// Raw catalog row from JSON
#[derive(Debug, Deserialize)]
struct RawSatellite {
    #[serde(default, deserialize_with = "lenient_value")]
    jcat: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_value")]
    launch_date: Option<Value>,
    #[serde(default, deserialize_with = "lenient_value")]
    end_date: Option<Value>,
    #[serde(default)]
    owner_e_name: Option<String>,
    #[serde(default)]
    owner_color: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    perigee: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    apogee: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    inc: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    launch_site_latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    launch_site_longitude: Option<f64>,
}

/// Parse a catalog timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and
/// `YYYY-MM-DD` (UTC midnight).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// String date or Unix milliseconds
fn value_to_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RawSatellite {
    /// Validate into a record; `None` = row skipped
    fn into_record(self, row: usize) -> Option<SatelliteRecord> {
        let lat = self.launch_site_latitude.filter(|&l| is_valid_latitude(l))?;
        let lon = self.launch_site_longitude.filter(|&l| is_valid_longitude(l))?;
        let launch = self.launch_date.as_ref().and_then(value_to_date)?;

        // Unparseable end date reads as "still active"
        let end = self.end_date.as_ref().and_then(value_to_date);

        let id = self
            .jcat
            .as_ref()
            .and_then(value_to_id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("row-{}", row));
        let name = self.name.unwrap_or_else(|| id.clone());

        let owner_color = self
            .owner_color
            .as_deref()
            .and_then(Rgb::from_hex)
            .unwrap_or(Rgb::DEFAULT_OWNER);

        let record = SatelliteRecord::new(
            id,
            name,
            launch,
            end,
            self.perigee.unwrap_or(f64::NAN),
            self.apogee.unwrap_or(f64::NAN),
            self.inc.filter(|i| i.is_finite()).unwrap_or(0.0),
            lat,
            lon,
        )
        .with_owner(self.owner_e_name.unwrap_or_default(), owner_color);

        Some(record)
    }
}

fn build(rows: Vec<RawSatellite>) -> Result<Catalog> {
    let total = rows.len();
    let mut records = Vec::with_capacity(total);
    let mut skipped = 0;

    for (i, row) in rows.into_iter().enumerate() {
        match row.into_record(i) {
            Some(record) => records.push(record),
            None => {
                debug!("Skipping catalog row {} (missing launch date or site)", i);
                skipped += 1;
            }
        }
    }

    if records.is_empty() {
        return Err(CatalogError::Empty(skipped));
    }

    let catalog = Catalog::with_skipped(records, skipped);
    info!(
        "Loaded {} satellites ({} of {} rows skipped)",
        catalog.len(),
        catalog.skipped(),
        total
    );

    Ok(catalog)
}

/// Parse a catalog from a JSON string
pub fn parse_catalog(json: &str) -> Result<Catalog> {
    let rows: Vec<RawSatellite> = serde_json::from_str(json)?;
    build(rows)
}

/// Load a catalog from a JSON file
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Catalog> {
    let path = path.as_ref();
    info!("Loading satellite catalog from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let rows: Vec<RawSatellite> = serde_json::from_reader(reader)?;
    build(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_mechanics::OrbitType;
    use std::io::Write;

    const SAMPLE: &str = r##"[
        {"jcat": "S25544", "name": "ISS (ZARYA)", "launch_date": "1998-11-20",
         "end_date": null, "owner_e_name": "Roscosmos", "owner_color": "#d62728",
         "perigee": 413, "apogee": "422", "inc": 51.64,
         "launch_site_latitude": 45.92, "launch_site_longitude": 63.34},
        {"jcat": "S00004", "name": "SPUTNIK 2", "launch_date": "1957-11-03T02:30:00Z",
         "end_date": "1958-04-14 00:00:00", "owner_e_name": "USSR", "owner_color": "bogus",
         "perigee": 212, "apogee": 1660, "inc": 65.3,
         "launch_site_latitude": 45.92, "launch_site_longitude": 63.34},
        {"jcat": "S00100", "name": "NO SITE", "launch_date": "1960-01-01",
         "perigee": 300, "apogee": 400, "inc": 10},
        {"jcat": "S00200", "name": "NO DATE", "perigee": 300, "apogee": 400,
         "launch_site_latitude": 28.5, "launch_site_longitude": -80.6},
        {"jcat": 5, "name": "LUNA 1", "launch_date": "1959-01-02", "end_date": "",
         "perigee": 500, "apogee": "-", "inc": "",
         "launch_site_latitude": 45.92, "launch_site_longitude": 63.34}
    ]"##;

    #[test]
    fn test_parse_sample() {
        let catalog = parse_catalog(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.skipped(), 2);

        let iss = catalog.get("S25544").unwrap();
        assert_eq!(iss.apogee_km, 422.0);
        assert_eq!(iss.orbit_type, OrbitType::Leo);
        assert_eq!(iss.owner_color, Rgb::new(0xd6, 0x27, 0x28));
        assert!(iss.end.is_none());

        let sputnik = catalog.get("S00004").unwrap();
        assert_eq!(sputnik.owner_color, Rgb::DEFAULT_OWNER);
        assert!(sputnik.end.is_some());

        let luna = catalog.get("5").unwrap();
        assert_eq!(luna.orbit_type, OrbitType::Escape);
        assert!(luna.apogee_km.is_nan());
        assert_eq!(luna.inclination_deg, 0.0);
        assert!(luna.end.is_none());
    }

    #[test]
    fn test_out_of_range_site_skipped() {
        let json = r#"[{"jcat": "X", "launch_date": "2000-01-01", "perigee": 400, "apogee": 400,
                        "launch_site_latitude": 95.0, "launch_site_longitude": 0.0}]"#;
        match parse_catalog(json) {
            Err(CatalogError::Empty(1)) => {}
            other => panic!("expected Empty(1), got {:?}", other),
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let a = parse_date("2021-03-04").unwrap();
        let b = parse_date("2021-03-04 00:00:00").unwrap();
        let c = parse_date("2021-03-04T00:00:00Z").unwrap();
        let d = parse_date("2021-03-04T02:00:00+02:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn test_millisecond_dates() {
        let json = r#"[{"jcat": "X", "launch_date": 946684800000, "perigee": 400, "apogee": 400,
                        "launch_site_latitude": 5.2, "launch_site_longitude": -52.8}]"#;
        let catalog = parse_catalog(json).unwrap();
        assert_eq!(catalog.records()[0].launch, parse_date("2000-01-01").unwrap());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_catalog("/definitely/not/here.json"),
            Err(CatalogError::Io(_))
        ));
    }
}
