use crate::adapters::{gsod, isd};
use crate::app::info::{region_infos, to_ndjson, RegionInfo};
use crate::app::ingest::ingest_years;
use crate::app::stats::{build_stats_document, StatsDocument};
use crate::app::zip_index::{build_zip_index, collect_entries, ZipIndexFile};
use crate::config::grid_config::GridConfig;
use crate::core::grid::{Grid, SearchOptions};
use crate::core::projection::{Projection, Rect};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{aggregate_city_populations, Station, TempPref, Zip};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

pub const ZIPS_JSON: &str = "zips.json";
pub const INFO_JSON: &str = "info.json";
pub const ZIP_INDEX_DIR: &str = "z";

/// Everything read from disk before the grid is built. The yearly archives
/// are only listed here; they are ingested once the grid is known to be valid.
#[derive(Debug)]
pub struct GridSources {
    pub grid_config: GridConfig,
    pub stations: Vec<Station>,
    pub zips: Vec<Zip>,
    pub prefs: Vec<TempPref>,
    pub years: Vec<i32>,
}

/// Owned output documents; the grid itself borrows from [`GridSources`]
/// and does not outlive `transform`.
#[derive(Debug)]
pub struct GridOutputs {
    pub infos: Vec<RegionInfo>,
    pub documents: Vec<StatsDocument>,
    pub zip_index: Vec<ZipIndexFile>,
}

/// `build-grid`: stations, zips and yearly archives into the grid outputs.
/// Storage is rooted at the work directory.
pub struct GridPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> GridPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for GridPipeline<S, C> {
    type Extracted = GridSources;
    type Transformed = GridOutputs;

    async fn extract(&self) -> Result<GridSources> {
        let grid_path = self.config.grid_file();
        tracing::debug!("Reading grid config: {}", grid_path.display());
        let grid_config = GridConfig::from_json_slice(&tokio::fs::read(&grid_path).await?)?;

        let history = self.config.history_file();
        let stations = tokio::task::spawn_blocking(move || isd::load_stations(&history)).await??;
        tracing::info!("📍 {} continental stations", stations.len());

        let zips: Vec<Zip> = serde_json::from_slice(&self.storage.read_file(ZIPS_JSON).await?)?;
        tracing::info!("📮 {} zips", zips.len());

        let prefs = self.config.preferences()?;
        let years = gsod::discover_years(self.config.data_dir())?;

        Ok(GridSources {
            grid_config,
            stations,
            zips,
            prefs,
            years,
        })
    }

    async fn transform(&self, data: GridSources) -> Result<GridOutputs> {
        let GridSources {
            grid_config,
            stations,
            mut zips,
            prefs,
            years,
        } = data;

        aggregate_city_populations(&mut zips);

        let (width, height) = self.config.projection_size();
        let target = Rect::new(0, 0, width as i64, height as i64);
        let projection = Projection::from_stations(&stations, target)?;
        let locations = projection.place_stations(&stations);
        projection.place_zips(&mut zips);

        let options = SearchOptions {
            nearest: self.config.nearest(),
            max_radius: self.config.max_radius(),
        };
        let grid = Grid::build(&grid_config, &locations, &zips, options)?;

        // 網格與最近測站都成立之後才讀取年度封存檔
        tracing::info!("📅 {} yearly archives to ingest", years.len());
        let known: HashSet<String> = stations.iter().map(Station::id).collect();
        let tallies = ingest_years(
            self.config.data_dir().to_path_buf(),
            &years,
            Arc::new(known),
            Arc::new(prefs.clone()),
            self.config.ingest_workers(),
        )
        .await?;

        let infos = region_infos(&grid);
        let documents = prefs
            .iter()
            .enumerate()
            .map(|(idx, pref)| {
                build_stats_document(&grid, &tallies, idx, pref, self.config.overrides())
            })
            .collect::<Result<Vec<_>>>()?;
        let zip_index = build_zip_index(&collect_entries(&grid), self.config.zip_completions());

        tracing::info!(
            "🗺️  {} regions, {} profiles, {} index files",
            infos.len(),
            documents.len(),
            zip_index.len()
        );
        Ok(GridOutputs {
            infos,
            documents,
            zip_index,
        })
    }

    async fn load(&self, result: GridOutputs) -> Result<String> {
        self.storage
            .write_file(INFO_JSON, &to_ndjson(&result.infos)?)
            .await?;

        for doc in &result.documents {
            let name = format!("{}.json", doc.profile);
            self.storage
                .write_file(&name, &serde_json::to_vec(doc)?)
                .await?;
            tracing::debug!("Wrote {} ({} regions)", name, doc.regions.len());
        }

        for file in &result.zip_index {
            let path = format!("{}/{}", ZIP_INDEX_DIR, file.path);
            self.storage
                .write_file(&path, &serde_json::to_vec(&file.prefixes)?)
                .await?;
        }

        Ok(self.config.work_dir().display().to_string())
    }
}
