use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A weather station from the station history file.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub usaf: String,
    pub wban: String,
    pub name: String,
    pub call: String,
    pub country: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
}

impl Station {
    /// Composite identity, `"<usaf>-<wban>"`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.usaf, self.wban)
    }
}

/// A station placed in virtual coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct StationLocation {
    pub station: Station,
    pub x: f64,
    pub y: f64,
}

/// A postal code record. `pop` holds the total population of every
/// record sharing `city` once [`aggregate_city_populations`] has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Zip {
    pub code: String,
    pub city: String,
    pub pop: u64,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

/// Replaces every zip's population with the sum over all zips that share its city name.
pub fn aggregate_city_populations(zips: &mut [Zip]) {
    let mut totals = std::collections::HashMap::<String, u64>::new();
    for zip in zips.iter() {
        *totals.entry(zip.city.clone()).or_default() += zip.pop;
    }
    for zip in zips.iter_mut() {
        zip.pop = totals[&zip.city];
    }
}

/// One decoded day of observations for a station. Missing values keep
/// the archive's sentinels (9999.9 / 999.9 / 99.99).
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub station_id: String,
    pub day: NaiveDate,
    pub wind_avg: f64,
    pub wind_max: f64,
    pub temp_avg: f64,
    pub temp_max: f64,
    pub temp_min: f64,
    pub precip: f64,
    pub snow_depth: f64,
}

/// A temperature preference profile in degrees Fahrenheit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempPref {
    pub name: String,
    pub avg_min: f64,
    pub avg_max: f64,
    pub abs_min: f64,
    pub abs_max: f64,
}

impl TempPref {
    pub fn new(name: &str, avg_min: f64, avg_max: f64, abs_min: f64, abs_max: f64) -> Self {
        Self {
            name: name.to_string(),
            avg_min,
            avg_max,
            abs_min,
            abs_max,
        }
    }

    /// `norm`, `warm` and `cool`.
    pub fn builtin() -> Vec<TempPref> {
        vec![
            TempPref::new("norm", 55.0, 75.0, 45.0, 85.0),
            TempPref::new("warm", 65.0, 85.0, 55.0, 95.0),
            TempPref::new("cool", 45.0, 65.0, 35.0, 65.0),
        ]
    }
}
