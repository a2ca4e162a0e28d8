use crate::core::grid::Grid;
use crate::domain::model::{Summary, TempPref};
use crate::domain::ports::StatsOverride;
use crate::utils::error::{CoriolisError, Result};
use chrono::Datelike;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::AddAssign;

/// Whether a day counts as pleasant under `pref`. Temperatures of 999 and
/// above, precipitation of 99 and above and snow depth of 999 and above are
/// the archive's "missing" sentinels and never disqualify a day.
pub fn is_pleasant(s: &Summary, pref: &TempPref) -> bool {
    if s.temp_avg < 999.0 && (s.temp_avg < pref.avg_min || s.temp_avg > pref.avg_max) {
        return false;
    }

    if s.temp_max < 999.0 && s.temp_max > pref.abs_max {
        return false;
    }

    if s.temp_min < pref.abs_min {
        return false;
    }

    if s.precip < 99.0 && s.precip > 0.000001 {
        return false;
    }

    if s.snow_depth < 999.0 && s.snow_depth > 0.25 {
        return false;
    }

    true
}

/// Pleasant days `a` out of observed days `b`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pct {
    pub a: u64,
    pub b: u64,
}

impl Pct {
    /// Packs the ratio into a byte; 0 means no data, 1..=255 the ratio.
    pub fn to_byte(&self) -> u8 {
        if self.b == 0 {
            return 0;
        }
        let f = 255.0 * self.a as f64 / self.b as f64;
        if f >= 255.0 {
            return 255;
        }
        1 + f as u8
    }
}

impl AddAssign for Pct {
    fn add_assign(&mut self, other: Self) {
        self.a += other.a;
        self.b += other.b;
    }
}

pub type MonthlyTally = [Pct; 12];

/// Monthly pleasant-day tallies per profile, keyed by station id.
///
/// Ingest workers each fill a private instance; [`StationTallies::merge`]
/// is plain addition so the merge order does not matter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationTallies {
    profiles: Vec<HashMap<String, MonthlyTally>>,
}

impl StationTallies {
    pub fn new(profile_count: usize) -> Self {
        Self {
            profiles: vec![HashMap::new(); profile_count],
        }
    }

    pub fn record(&mut self, summary: &Summary, prefs: &[TempPref]) {
        let month = summary.day.month0() as usize;
        for (tally, pref) in self.profiles.iter_mut().zip(prefs) {
            let pct = &mut tally
                .entry(summary.station_id.clone())
                .or_insert_with(|| [Pct::default(); 12])[month];
            if is_pleasant(summary, pref) {
                pct.a += 1;
            }
            pct.b += 1;
        }
    }

    pub fn merge(&mut self, other: StationTallies) {
        if self.profiles.len() < other.profiles.len() {
            self.profiles.resize_with(other.profiles.len(), HashMap::new);
        }
        for (mine, theirs) in self.profiles.iter_mut().zip(other.profiles) {
            for (station_id, months) in theirs {
                let entry = mine
                    .entry(station_id)
                    .or_insert_with(|| [Pct::default(); 12]);
                for (m, pct) in months.into_iter().enumerate() {
                    entry[m] += pct;
                }
            }
        }
    }

    pub fn get(&self, profile: usize, station_id: &str) -> Option<&MonthlyTally> {
        self.profiles.get(profile)?.get(station_id)
    }

    pub fn station_count(&self, profile: usize) -> usize {
        self.profiles.get(profile).map_or(0, HashMap::len)
    }
}

/// Aggregated statistics of one region, in the front-end's field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStats {
    #[serde(rename = "I")]
    pub i: usize,
    #[serde(rename = "J")]
    pub j: usize,
    #[serde(rename = "Stations")]
    pub stations: Vec<String>,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Months")]
    pub months: [u8; 12],
    #[serde(rename = "Total")]
    pub total: u8,
}

/// One `<profile>.json` document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsDocument {
    #[serde(skip)]
    pub profile: String,
    #[serde(rename = "W")]
    pub width: usize,
    #[serde(rename = "H")]
    pub height: usize,
    #[serde(rename = "Regions")]
    pub regions: Vec<RegionStats>,
}

/// Sums the tallies of each region's nearest stations.
pub fn region_stats(grid: &Grid<'_>, tallies: &StationTallies, profile: usize) -> Vec<RegionStats> {
    grid.regions()
        .map(|region| {
            let mut months = [Pct::default(); 12];
            for loc in &region.nearest {
                if let Some(tally) = tallies.get(profile, &loc.station.id()) {
                    for (m, pct) in tally.iter().enumerate() {
                        months[m] += *pct;
                    }
                }
            }

            let mut overall = Pct::default();
            let mut bytes = [0u8; 12];
            for (m, pct) in months.iter().enumerate() {
                bytes[m] = pct.to_byte();
                overall += *pct;
            }

            RegionStats {
                i: region.i,
                j: region.j,
                stations: region.nearest.iter().map(|l| l.station.id()).collect(),
                city: region.city.clone(),
                months: bytes,
                total: overall.to_byte(),
            }
        })
        .collect()
}

/// Copies `Months` and `Total` from each override's source region onto its
/// target. Used to patch cells whose raw station data is known to be bad.
pub fn apply_overrides(stats: &mut [RegionStats], overrides: &[StatsOverride]) -> Result<()> {
    let position: HashMap<(usize, usize), usize> = stats
        .iter()
        .enumerate()
        .map(|(idx, s)| ((s.i, s.j), idx))
        .collect();

    for o in overrides {
        let lookup = |[i, j]: [usize; 2]| {
            position.get(&(i, j)).copied().ok_or_else(|| {
                CoriolisError::DataInconsistencyError {
                    message: format!("override references missing region ({}, {})", i, j),
                }
            })
        };
        let target = lookup(o.target)?;
        let source = lookup(o.source)?;

        let (months, total) = (stats[source].months, stats[source].total);
        stats[target].months = months;
        stats[target].total = total;
        tracing::debug!(
            "Override: region {:?} takes stats of {:?}{}",
            o.target,
            o.source,
            o.reason
                .as_deref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// Region stats for one profile, overrides applied, sorted by descending total.
pub fn build_stats_document(
    grid: &Grid<'_>,
    tallies: &StationTallies,
    profile: usize,
    pref: &TempPref,
    overrides: &[StatsOverride],
) -> Result<StatsDocument> {
    let mut regions = region_stats(grid, tallies, profile);
    apply_overrides(&mut regions, overrides)?;
    regions.sort_by(|a, b| b.total.cmp(&a.total));

    Ok(StatsDocument {
        profile: pref.name.clone(),
        width: grid.width(),
        height: grid.height(),
        regions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::tests::{config, loc};
    use crate::core::grid::SearchOptions;
    use chrono::NaiveDate;

    fn day(station_id: &str, month: u32, temp_avg: f64) -> Summary {
        Summary {
            station_id: station_id.to_string(),
            day: NaiveDate::from_ymd_opt(2012, month, 10).unwrap(),
            wind_avg: 5.0,
            wind_max: 10.0,
            temp_avg,
            temp_max: temp_avg + 8.0,
            temp_min: temp_avg - 8.0,
            precip: 0.0,
            snow_depth: 999.9,
        }
    }

    fn norm() -> TempPref {
        TempPref::new("norm", 55.0, 75.0, 45.0, 85.0)
    }

    #[test]
    fn test_is_pleasant() {
        let pref = norm();
        assert!(is_pleasant(&day("s", 5, 65.0), &pref));
        assert!(!is_pleasant(&day("s", 5, 50.0), &pref));
        assert!(!is_pleasant(&day("s", 5, 80.0), &pref));

        let mut rainy = day("s", 5, 65.0);
        rainy.precip = 0.2;
        assert!(!is_pleasant(&rainy, &pref));
        rainy.precip = 99.99;
        assert!(is_pleasant(&rainy, &pref));

        let mut snowy = day("s", 1, 60.0);
        snowy.snow_depth = 2.0;
        assert!(!is_pleasant(&snowy, &pref));

        let mut missing = day("s", 5, 9999.9);
        missing.temp_max = 9999.9;
        missing.temp_min = 9999.9;
        assert!(is_pleasant(&missing, &pref));

        let mut cold_night = day("s", 5, 60.0);
        cold_night.temp_min = 40.0;
        assert!(!is_pleasant(&cold_night, &pref));
    }

    #[test]
    fn test_pct_to_byte() {
        assert_eq!(Pct { a: 0, b: 0 }.to_byte(), 0);
        assert_eq!(Pct { a: 0, b: 10 }.to_byte(), 1);
        assert_eq!(Pct { a: 10, b: 10 }.to_byte(), 255);
        assert_eq!(Pct { a: 1, b: 2 }.to_byte(), 128);
    }

    #[test]
    fn test_merge_is_addition() {
        let prefs = vec![norm()];
        let mut first = StationTallies::new(1);
        first.record(&day("a", 3, 65.0), &prefs);
        first.record(&day("a", 3, 40.0), &prefs);

        let mut second = StationTallies::new(1);
        second.record(&day("a", 3, 60.0), &prefs);
        second.record(&day("b", 7, 60.0), &prefs);

        let mut forward = first.clone();
        forward.merge(second.clone());
        let mut backward = second;
        backward.merge(first);
        assert_eq!(forward, backward);

        let a = forward.get(0, "a").unwrap();
        assert_eq!(a[2], Pct { a: 2, b: 3 });
        assert_eq!(forward.station_count(0), 2);
    }

    #[test]
    fn test_document_sums_nearest_and_sorts_by_total() {
        let cfg = config(2, 1, 10, &[[0, 0], [1, 0]]);
        let stations = vec![loc("000001", 5.0, 5.0), loc("000002", 15.0, 5.0)];
        let grid = Grid::build(
            &cfg,
            &stations,
            &[],
            SearchOptions {
                nearest: 1,
                max_radius: None,
            },
        )
        .unwrap();

        let prefs = vec![norm()];
        let mut tallies = StationTallies::new(1);
        // 000001 全部不舒適，000002 全部舒適
        tallies.record(&day("000001-99999", 6, 30.0), &prefs);
        tallies.record(&day("000002-99999", 6, 65.0), &prefs);

        let doc = build_stats_document(&grid, &tallies, 0, &prefs[0], &[]).unwrap();
        assert_eq!((doc.width, doc.height), (2, 1));
        assert_eq!(doc.regions[0].i, 1);
        assert_eq!(doc.regions[0].total, 255);
        assert_eq!(doc.regions[0].months[5], 255);
        assert_eq!(doc.regions[0].months[0], 0);
        assert_eq!(doc.regions[0].stations, vec!["000002-99999"]);
        assert_eq!(doc.regions[1].total, 1);

        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("profile").is_none());
        assert_eq!(json["Regions"][0]["Months"].as_array().unwrap().len(), 12);
    }

    #[test]
    fn test_overrides_copy_source_stats() {
        let mut stats = vec![
            RegionStats {
                i: 77,
                j: 42,
                stations: vec![],
                city: "KEY LARGO, FL".to_string(),
                months: [3; 12],
                total: 3,
            },
            RegionStats {
                i: 77,
                j: 43,
                stations: vec![],
                city: "LONG KEY, FL".to_string(),
                months: [200; 12],
                total: 200,
            },
        ];
        let overrides = vec![StatsOverride {
            target: [77, 42],
            source: [77, 43],
            reason: Some("bad station data".to_string()),
        }];
        apply_overrides(&mut stats, &overrides).unwrap();
        assert_eq!(stats[0].total, 200);
        assert_eq!(stats[0].months, [200; 12]);
        assert_eq!(stats[0].city, "KEY LARGO, FL");

        let missing = vec![StatsOverride {
            target: [1, 1],
            source: [77, 43],
            reason: None,
        }];
        let err = apply_overrides(&mut stats, &missing).unwrap_err();
        assert!(matches!(err, CoriolisError::DataInconsistencyError { .. }));
    }
}
