//! Yearly daily-summary archives: `gsod_<YYYY>.tar`, one gzip member per
//! station, fixed-width text lines inside.

use crate::domain::model::Summary;
use crate::utils::error::{CoriolisError, Result};
use chrono::NaiveDate;
use flate2::read::GzDecoder;
use regex::Regex;
use std::collections::HashSet;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

const HEADER_PREFIX: &str = "STN--- WBAN   YEARMODA";

/// Shortest line that still holds every field we decode.
const MIN_LINE_LEN: usize = 130;

pub fn archive_name(year: i32) -> String {
    format!("gsod_{}.tar", year)
}

pub fn archive_path(data_dir: &Path, year: i32) -> PathBuf {
    data_dir.join(archive_name(year))
}

/// Years that have an archive in `data_dir`, ascending.
pub fn discover_years(data_dir: &Path) -> Result<Vec<i32>> {
    let pattern = Regex::new(r"^gsod_(\d{4})\.tar$")
        .map_err(|e| CoriolisError::configuration(format!("archive pattern: {}", e)))?;

    let mut years = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(caps) = pattern.captures(name) {
            if let Ok(year) = caps[1].parse::<i32>() {
                years.push(year);
            }
        }
    }
    years.sort_unstable();
    Ok(years)
}

/// `"<usaf>-<wban>"` of a data line.
pub fn station_id_of(line: &str) -> Option<String> {
    Some(format!("{}-{}", line.get(0..6)?, line.get(7..12)?))
}

fn field<'l>(line: &'l str, range: std::ops::Range<usize>) -> std::result::Result<&'l str, String> {
    line.get(range.clone())
        .map(str::trim)
        .ok_or_else(|| format!("missing columns {}..{}", range.start, range.end))
}

fn number<T: std::str::FromStr>(line: &str, range: std::ops::Range<usize>) -> std::result::Result<T, String>
where
    T::Err: std::fmt::Display,
{
    let raw = field(line, range.clone())?;
    raw.parse::<T>()
        .map_err(|e| format!("columns {}..{} ('{}'): {}", range.start, range.end, raw, e))
}

/// Decodes one fixed-width data line.
pub fn parse_summary_line(line: &str) -> std::result::Result<Summary, String> {
    if line.len() < MIN_LINE_LEN {
        return Err(format!("line too short ({} bytes)", line.len()));
    }
    let station_id = station_id_of(line).ok_or("missing station id")?;

    let year: i32 = number(line, 14..18)?;
    let month: u32 = number(line, 18..20)?;
    let day: u32 = number(line, 20..22)?;
    let day = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("invalid date {:04}{:02}{:02}", year, month, day))?;

    Ok(Summary {
        station_id,
        day,
        temp_avg: number(line, 24..30)?,
        wind_avg: number(line, 78..83)?,
        wind_max: number(line, 88..93)?,
        temp_max: number(line, 102..108)?,
        temp_min: number(line, 110..116)?,
        precip: number(line, 118..123)?,
        snow_depth: number(line, 125..130)?,
    })
}

/// Streams every summary of a tar archive whose station is in `known`,
/// handing each to `visit`. Headers and unknown stations are skipped.
pub fn for_each_summary<R, F>(
    archive: R,
    source_name: &str,
    known: &HashSet<String>,
    mut visit: F,
) -> Result<usize>
where
    R: Read,
    F: FnMut(&Summary),
{
    let mut tar = tar::Archive::new(archive);
    let mut count = 0;

    for entry in tar.entries()? {
        let entry = entry?;
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let reader = BufReader::new(GzDecoder::new(entry));
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.starts_with(HEADER_PREFIX) {
                continue;
            }
            let Some(id) = station_id_of(&line) else {
                continue;
            };
            if !known.contains(&id) {
                continue;
            }

            let summary = parse_summary_line(&line)
                .map_err(|m| CoriolisError::parse(source_name, idx + 1, m))?;
            visit(&summary);
            count += 1;
        }
    }
    Ok(count)
}

/// Opens the archive for `year` and streams it through [`for_each_summary`].
pub fn for_each_summary_in_year<F>(
    data_dir: &Path,
    year: i32,
    known: &HashSet<String>,
    visit: F,
) -> Result<usize>
where
    F: FnMut(&Summary),
{
    let path = archive_path(data_dir, year);
    let file = std::fs::File::open(&path)?;
    for_each_summary(BufReader::new(file), &archive_name(year), known, visit)
}
