use crate::domain::model::TempPref;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A cell pair whose aggregated statistics get replaced by another cell's.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StatsOverride {
    pub target: [usize; 2],
    pub source: [usize; 2],
    #[serde(default)]
    pub reason: Option<String>,
}

pub trait ConfigProvider: Send + Sync {
    fn data_dir(&self) -> &Path;
    fn work_dir(&self) -> &Path;
    fn history_file(&self) -> PathBuf;
    fn grid_file(&self) -> PathBuf;
    fn projection_size(&self) -> (u32, u32);
    fn nearest(&self) -> usize;
    fn max_radius(&self) -> Option<usize>;
    fn ingest_workers(&self) -> usize;
    fn preferences(&self) -> Result<Vec<TempPref>>;
    fn overrides(&self) -> &[StatsOverride];
    fn zip_completions(&self) -> usize;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send;
    type Transformed: Send;

    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    async fn load(&self, result: Self::Transformed) -> Result<String>;
}
