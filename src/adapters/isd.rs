use crate::domain::model::Station;
use crate::utils::error::{CoriolisError, Result};
use std::io::Read;
use std::path::Path;

/// Stations known to report bad data even though they pass the bounds check.
const EXCLUDED_WBAN: &[&str] = &["12848"];
const EXCLUDED_USAF: &[&str] = &["724995"];

/// Decodes a signed thousandths-of-a-degree field such as `"+40123"`.
/// Blank fields decode to 0.
pub fn parse_lat_lon(field: &str) -> std::result::Result<f64, String> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(0.0);
    }

    let (negative, digits) = match field.as_bytes()[0] {
        b'-' => (true, &field[1..]),
        b'+' => (false, &field[1..]),
        _ => (false, field),
    };
    let n: i64 = digits
        .parse()
        .map_err(|e| format!("bad coordinate '{}': {}", field, e))?;
    let n = if negative { -n } else { n };
    Ok(n as f64 / 1000.0)
}

fn in_us_bounds(s: &Station) -> bool {
    if s.lat == 0.0 || s.lon == 0.0 {
        return false;
    }
    if s.lat.trunc() == -99.0 || s.lon.trunc() == -99.0 {
        return false;
    }
    s.lat >= 20.0 && (-130.0..=-60.0).contains(&s.lon)
}

/// Continental US stations only: no Alaska, Hawaii or offshore buoys.
pub fn in_continental_us(s: &Station) -> bool {
    s.country == "US"
        && s.state != "AK"
        && s.state != "HI"
        && !s.name.contains("BUOY")
        && in_us_bounds(s)
        && !EXCLUDED_WBAN.contains(&s.wban.as_str())
        && !EXCLUDED_USAF.contains(&s.usaf.as_str())
}

/// Reads every station row of a history table, header skipped.
pub fn read_stations<R: Read>(reader: R, source_name: &str) -> Result<Vec<Station>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut stations = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        // 標題列佔第一行
        let line = idx + 2;
        let field = |n: usize| record.get(n).unwrap_or("").to_string();
        if record.len() < 9 {
            return Err(CoriolisError::parse(
                source_name,
                line,
                format!("expected at least 9 columns, found {}", record.len()),
            ));
        }

        let lat = parse_lat_lon(&field(7)).map_err(|m| CoriolisError::parse(source_name, line, m))?;
        let lon = parse_lat_lon(&field(8)).map_err(|m| CoriolisError::parse(source_name, line, m))?;

        stations.push(Station {
            usaf: field(0),
            wban: field(1),
            name: field(2),
            country: field(3),
            state: field(5),
            call: field(6),
            lat,
            lon,
        });
    }
    Ok(stations)
}

/// Loads the continental US stations from the history file at `path`.
pub fn load_stations(path: &Path) -> Result<Vec<Station>> {
    let file = std::fs::File::open(path)?;
    let all = read_stations(file, &path.display().to_string())?;
    let total = all.len();
    let stations: Vec<Station> = all.into_iter().filter(in_continental_us).collect();
    tracing::debug!(
        "Loaded {} of {} stations from {}",
        stations.len(),
        total,
        path.display()
    );
    Ok(stations)
}
