use crate::domain::model::Zip;
use crate::utils::error::{CoriolisError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

pub const STATES_FILE: &str = "states.csv";
pub const POPULATION_FILE: &str = "population-by-zip.csv";
pub const ZIPS_FILE: &str = "zips";

#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub code: u32,
    pub name: String,
    pub abbr: String,
}

fn parse_err(source_name: &str, line: usize, message: impl Into<String>) -> CoriolisError {
    CoriolisError::parse(source_name, line, message)
}

/// `name, abbr, code` rows, no header. Keyed by numeric state code.
pub fn read_states<R: Read>(reader: R, source_name: &str) -> Result<HashMap<u32, State>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut states = HashMap::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let line = idx + 1;
        let (Some(name), Some(abbr), Some(code)) = (record.get(0), record.get(1), record.get(2)) else {
            return Err(parse_err(source_name, line, "expected name, abbr, code"));
        };
        let code: u32 = code
            .trim()
            .parse()
            .map_err(|e| parse_err(source_name, line, format!("state code '{}': {}", code, e)))?;
        states.insert(
            code,
            State {
                code,
                name: name.to_string(),
                abbr: abbr.to_string(),
            },
        );
    }
    Ok(states)
}

/// `zip, population` rows after a header.
pub fn read_populations<R: Read>(reader: R, source_name: &str) -> Result<HashMap<String, u64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut pops = HashMap::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let line = idx + 2;
        let (Some(zip), Some(pop)) = (record.get(0), record.get(1)) else {
            return Err(parse_err(source_name, line, "expected zip, population"));
        };
        let pop: u64 = pop
            .trim()
            .parse()
            .map_err(|e| parse_err(source_name, line, format!("population '{}': {}", pop, e)))?;
        pops.insert(zip.to_string(), pop);
    }
    Ok(pops)
}

/// A sign character followed by a decimal degree value, e.g. `"-122.41"`.
pub fn parse_signed_degrees(field: &str) -> std::result::Result<f64, String> {
    let mut chars = field.chars();
    let sign = chars.next().ok_or("empty coordinate")?;
    let value: f64 = chars
        .as_str()
        .trim()
        .parse()
        .map_err(|e| format!("coordinate '{}': {}", field, e))?;
    Ok(if sign == '-' { -value } else { value })
}

/// Tab-separated gazetteer rows: code, lat, lon, _, city, state code.
pub fn read_zips<R: Read>(
    reader: R,
    source_name: &str,
    states: &HashMap<u32, State>,
    pops: &HashMap<String, u64>,
) -> Result<Vec<Zip>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let mut zips = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let line = idx + 1;
        if record.len() < 6 {
            return Err(parse_err(
                source_name,
                line,
                format!("expected 6 columns, found {}", record.len()),
            ));
        }
        let col = |n: usize| record.get(n).unwrap_or("");

        let lat = parse_signed_degrees(col(1)).map_err(|m| parse_err(source_name, line, m))?;
        let lon = parse_signed_degrees(col(2)).map_err(|m| parse_err(source_name, line, m))?;
        let state_code: u32 = col(5)
            .trim()
            .parse()
            .map_err(|e| parse_err(source_name, line, format!("state code '{}': {}", col(5), e)))?;
        let state = states
            .get(&state_code)
            .ok_or_else(|| parse_err(source_name, line, format!("unknown state code {}", state_code)))?;

        let code = col(0).to_string();
        zips.push(Zip {
            city: format!("{}, {}", col(4), state.abbr),
            pop: pops.get(&code).copied().unwrap_or(0),
            code,
            lat,
            lon,
            x: 0.0,
            y: 0.0,
        });
    }
    Ok(zips)
}

fn open(data_dir: &Path, name: &str) -> Result<std::fs::File> {
    Ok(std::fs::File::open(data_dir.join(name))?)
}

/// Joins the three census tables in `data_dir` into zip records.
pub fn load_zips(data_dir: &Path) -> Result<Vec<Zip>> {
    let states = read_states(open(data_dir, STATES_FILE)?, STATES_FILE)?;
    let pops = read_populations(open(data_dir, POPULATION_FILE)?, POPULATION_FILE)?;
    let zips = read_zips(open(data_dir, ZIPS_FILE)?, ZIPS_FILE, &states, &pops)?;
    tracing::debug!(
        "Census tables: {} states, {} populations, {} zips",
        states.len(),
        pops.len(),
        zips.len()
    );
    Ok(zips)
}
