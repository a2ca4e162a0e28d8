use crate::adapters::gsod;
use crate::app::stats::StationTallies;
use crate::domain::model::TempPref;
use crate::utils::error::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Tallies every archived year in parallel, at most `workers` archives at
/// a time. Each worker fills its own [`StationTallies`]; results are
/// summed as they complete.
pub async fn ingest_years(
    data_dir: PathBuf,
    years: &[i32],
    known: Arc<HashSet<String>>,
    prefs: Arc<Vec<TempPref>>,
    workers: usize,
) -> Result<StationTallies> {
    let workers = workers.max(1);
    let mut tallies = StationTallies::new(prefs.len());
    let mut set = JoinSet::new();

    for &year in years {
        // 控制同時解壓的年份數量
        while set.len() >= workers {
            if let Some(done) = set.join_next().await {
                merge_year(&mut tallies, done??);
            }
        }

        let data_dir = data_dir.clone();
        let known = Arc::clone(&known);
        let prefs = Arc::clone(&prefs);
        set.spawn_blocking(move || -> Result<(i32, usize, StationTallies)> {
            let mut local = StationTallies::new(prefs.len());
            let count = gsod::for_each_summary_in_year(&data_dir, year, &known, |s| {
                local.record(s, &prefs)
            })?;
            Ok((year, count, local))
        });
    }

    while let Some(done) = set.join_next().await {
        merge_year(&mut tallies, done??);
    }

    tracing::info!(
        "Ingested {} years, {} stations with data",
        years.len(),
        tallies.station_count(0)
    );
    Ok(tallies)
}

fn merge_year(tallies: &mut StationTallies, (year, count, local): (i32, usize, StationTallies)) {
    tracing::debug!("Year {}: {} summaries", year, count);
    tallies.merge(local);
}
