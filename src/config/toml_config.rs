use crate::domain::model::TempPref;
use crate::domain::ports::{ConfigProvider, StatsOverride};
use crate::utils::error::{CoriolisError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub paths: PathsConfig,
    pub projection: ProjectionConfig,
    pub grid: GridSearchConfig,
    pub ingest: IngestConfig,
    pub stats: StatsConfig,
    pub zip_index: ZipIndexConfig,
    pub download: DownloadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub work_dir: PathBuf,
    /// Relative to `data_dir`.
    pub history_file: String,
    /// Relative to `data_dir`.
    pub grid_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            work_dir: PathBuf::from("work"),
            history_file: "ish-history.csv".to_string(),
            grid_file: "grid.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchConfig {
    pub nearest: usize,
    pub max_radius: Option<usize>,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            nearest: 20,
            max_radius: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Names of the profiles to emit, in output order.
    pub profiles: Vec<String>,
    /// Extra profiles; a name matching a built-in replaces it.
    pub preferences: Vec<TempPref>,
    pub overrides: Vec<StatsOverride>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            profiles: vec!["norm".to_string()],
            preferences: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZipIndexConfig {
    pub completions: usize,
}

impl Default for ZipIndexConfig {
    fn default() -> Self {
        Self { completions: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub base_url: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www1.ncdc.noaa.gov/pub/data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 載入配置；檔案不存在時使用預設值
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${DATA_ROOT})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| CoriolisError::configuration(format!("env pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 命令列參數覆蓋檔案中的目錄設定
    pub fn with_dirs(mut self, data_dir: Option<PathBuf>, work_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.paths.data_dir = dir;
        }
        if let Some(dir) = work_dir {
            self.paths.work_dir = dir;
        }
        self
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn download_base_url(&self) -> &str {
        &self.download.base_url
    }

    pub fn history_file_name(&self) -> &str {
        &self.paths.history_file
    }

    /// Built-in profiles merged with configured ones, keyed by name.
    fn known_preferences(&self) -> Vec<TempPref> {
        let mut all = TempPref::builtin();
        for pref in &self.stats.preferences {
            match all.iter_mut().find(|p| p.name == pref.name) {
                Some(existing) => *existing = pref.clone(),
                None => all.push(pref.clone()),
            }
        }
        all
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_path(
            "paths.data_dir",
            &self.paths.data_dir.to_string_lossy(),
        )?;
        validate_path(
            "paths.work_dir",
            &self.paths.work_dir.to_string_lossy(),
        )?;
        validate_non_empty_string("paths.history_file", &self.paths.history_file)?;
        validate_non_empty_string("paths.grid_file", &self.paths.grid_file)?;

        validate_positive_number("projection.width", self.projection.width as usize, 1)?;
        validate_positive_number("projection.height", self.projection.height as usize, 1)?;
        validate_positive_number("grid.nearest", self.grid.nearest, 1)?;
        validate_positive_number("ingest.workers", self.ingest.workers, 1)?;
        validate_positive_number("zip_index.completions", self.zip_index.completions, 1)?;
        validate_url("download.base_url", &self.download.base_url)?;

        if self.stats.profiles.is_empty() {
            return Err(CoriolisError::MissingConfigError {
                field: "stats.profiles".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for name in &self.stats.profiles {
            if !seen.insert(name.as_str()) {
                return Err(CoriolisError::InvalidConfigValueError {
                    field: "stats.profiles".to_string(),
                    value: name.clone(),
                    reason: "profile listed more than once".to_string(),
                });
            }
        }
        for pref in &self.stats.preferences {
            validate_non_empty_string("stats.preferences.name", &pref.name)?;
            for (field, value) in [
                ("stats.preferences.avg_min", pref.avg_min),
                ("stats.preferences.avg_max", pref.avg_max),
                ("stats.preferences.abs_min", pref.abs_min),
                ("stats.preferences.abs_max", pref.abs_max),
            ] {
                validate_range(field, value, -100.0, 150.0)?;
            }
            if pref.avg_min > pref.avg_max || pref.abs_min > pref.abs_max {
                return Err(CoriolisError::InvalidConfigValueError {
                    field: "stats.preferences".to_string(),
                    value: pref.name.clone(),
                    reason: "minimum exceeds maximum".to_string(),
                });
            }
        }

        // 確認所有設定檔名稱都能解析
        self.preferences()?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn data_dir(&self) -> &Path {
        &self.paths.data_dir
    }

    fn work_dir(&self) -> &Path {
        &self.paths.work_dir
    }

    fn history_file(&self) -> PathBuf {
        self.paths.data_dir.join(&self.paths.history_file)
    }

    fn grid_file(&self) -> PathBuf {
        self.paths.data_dir.join(&self.paths.grid_file)
    }

    fn projection_size(&self) -> (u32, u32) {
        (self.projection.width, self.projection.height)
    }

    fn nearest(&self) -> usize {
        self.grid.nearest
    }

    fn max_radius(&self) -> Option<usize> {
        self.grid.max_radius
    }

    fn ingest_workers(&self) -> usize {
        self.ingest.workers
    }

    fn preferences(&self) -> Result<Vec<TempPref>> {
        let known = self.known_preferences();
        self.stats
            .profiles
            .iter()
            .map(|name| {
                known
                    .iter()
                    .find(|p| &p.name == name)
                    .cloned()
                    .ok_or_else(|| CoriolisError::configuration(format!("unknown profile '{}'", name)))
            })
            .collect()
    }

    fn overrides(&self) -> &[StatsOverride] {
        &self.stats.overrides
    }

    fn zip_completions(&self) -> usize {
        self.zip_index.completions
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
