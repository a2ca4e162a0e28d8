use crate::adapters::gsod;
use crate::utils::error::{CoriolisError, Result};
use reqwest::Client;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use url::Url;

/// Parses `YYYY` and inclusive `FROM-TO` arguments into a sorted,
/// de-duplicated list of years.
pub fn years_from_args<S: AsRef<str>>(args: &[S]) -> Result<Vec<i32>> {
    let invalid = |arg: &str, reason: &str| CoriolisError::InvalidConfigValueError {
        field: "years".to_string(),
        value: arg.to_string(),
        reason: reason.to_string(),
    };

    let mut years = BTreeSet::new();
    for arg in args {
        let arg = arg.as_ref();
        let parts: Vec<&str> = arg.split('-').collect();
        match parts.as_slice() {
            [year] => {
                let year: i32 = year.trim().parse().map_err(|_| invalid(arg, "not a year"))?;
                years.insert(year);
            }
            [from, to] => {
                let from: i32 = from.trim().parse().map_err(|_| invalid(arg, "bad range start"))?;
                let to: i32 = to.trim().parse().map_err(|_| invalid(arg, "bad range end"))?;
                years.extend(from..=to);
            }
            _ => return Err(invalid(arg, "expected YEAR or FROM-TO")),
        }
    }
    Ok(years.into_iter().collect())
}

/// Fetches the station history file and yearly archives into the data dir.
pub struct Downloader {
    client: Client,
    base: Url,
    data_dir: PathBuf,
}

impl Downloader {
    pub fn new(base_url: &str, data_dir: impl Into<PathBuf>) -> Result<Self> {
        // Url::join 需要結尾斜線才會保留最後一段路徑
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized).map_err(|e| CoriolisError::InvalidConfigValueError {
            field: "download.base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client: Client::new(),
            base,
            data_dir: data_dir.into(),
        })
    }

    fn url_for(&self, relative: &str) -> Result<Url> {
        self.base
            .join(relative)
            .map_err(|e| CoriolisError::invalid_input(format!("download url '{}': {}", relative, e)))
    }

    pub fn history_url(&self, history_file: &str) -> Result<Url> {
        self.url_for(&format!("noaa/{}", history_file))
    }

    pub fn archive_url(&self, year: i32) -> Result<Url> {
        self.url_for(&format!("gsod/{}/{}", year, gsod::archive_name(year)))
    }

    /// Downloads `url` to `dst` unless `dst` already exists, in which case
    /// only its modification time is refreshed. Returns whether a request
    /// was made.
    pub async fn ensure_download(&self, url: &Url, dst: &Path) -> Result<bool> {
        if tokio::fs::try_exists(dst).await? {
            let file = std::fs::OpenOptions::new().write(true).open(dst)?;
            file.set_modified(SystemTime::now())?;
            tracing::debug!("Already present, touched: {}", dst.display());
            return Ok(false);
        }

        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::info!("⬇️  {}", url);
        let response = self.client.get(url.clone()).send().await?;
        tracing::debug!("Download response status: {}", response.status());
        let bytes = response.error_for_status()?.bytes().await?;
        tokio::fs::write(dst, &bytes).await?;
        tracing::debug!("Wrote {} bytes to {}", bytes.len(), dst.display());
        Ok(true)
    }

    /// Ensures the history file and every requested year are present.
    /// Returns the number of files actually fetched.
    pub async fn download_all(&self, history_file: &str, years: &[i32]) -> Result<usize> {
        tokio::fs::create_dir_all(&self.data_dir).await?;

        let mut fetched = 0;
        let history = self.history_url(history_file)?;
        if self
            .ensure_download(&history, &self.data_dir.join(history_file))
            .await?
        {
            fetched += 1;
        }

        for &year in years {
            let url = self.archive_url(year)?;
            if self
                .ensure_download(&url, &gsod::archive_path(&self.data_dir, year))
                .await?
            {
                fetched += 1;
            }
        }
        Ok(fetched)
    }
}
