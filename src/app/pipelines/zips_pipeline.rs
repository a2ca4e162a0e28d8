use crate::adapters::census;
use crate::app::pipelines::grid_pipeline::ZIPS_JSON;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::Zip;
use crate::utils::error::Result;
use async_trait::async_trait;

/// `build-zips`: joins the census tables in the data directory into
/// `zips.json` in the work directory.
pub struct ZipsPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ZipsPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ZipsPipeline<S, C> {
    type Extracted = Vec<Zip>;
    type Transformed = Vec<u8>;

    async fn extract(&self) -> Result<Vec<Zip>> {
        let data_dir = self.config.data_dir().to_path_buf();
        tracing::debug!("Reading census tables from {}", data_dir.display());
        let zips = tokio::task::spawn_blocking(move || census::load_zips(&data_dir)).await??;
        Ok(zips)
    }

    async fn transform(&self, zips: Vec<Zip>) -> Result<Vec<u8>> {
        let unpopulated = zips.iter().filter(|z| z.pop == 0).count();
        tracing::info!("📮 {} zips ({} without population)", zips.len(), unpopulated);
        Ok(serde_json::to_vec_pretty(&zips)?)
    }

    async fn load(&self, result: Vec<u8>) -> Result<String> {
        self.storage.write_file(ZIPS_JSON, &result).await?;
        Ok(self.config.work_dir().join(ZIPS_JSON).display().to_string())
    }
}
