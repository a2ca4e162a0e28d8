use crate::utils::error::{CoriolisError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Upper bound on W x H; every cell gets a region slot and a station bucket.
pub const MAX_CELLS: i64 = 1 << 20;

/// Grid shape and the explicit list of active cells, as stored in `grid.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(rename = "W")]
    pub width: i64,
    #[serde(rename = "H")]
    pub height: i64,
    #[serde(rename = "Size")]
    pub size: i64,
    #[serde(rename = "Active")]
    pub active: Vec<[i64; 2]>,
}

impl GridConfig {
    /// 解析並驗證 grid.json，任何越界的啟用格都在此失敗
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let config: GridConfig = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn height(&self) -> usize {
        self.height as usize
    }

    pub fn cell_size(&self) -> f64 {
        self.size as f64
    }

    /// Active cells in configuration order, duplicates removed.
    /// Only meaningful after [`Validate::validate`] succeeded.
    pub fn active_cells(&self) -> Vec<(usize, usize)> {
        let mut seen = HashSet::new();
        let mut cells = Vec::with_capacity(self.active.len());
        for &[i, j] in &self.active {
            let cell = (i as usize, j as usize);
            if seen.insert(cell) {
                cells.push(cell);
            } else {
                tracing::warn!("Active cell ({}, {}) listed more than once", i, j);
            }
        }
        cells
    }
}

impl Validate for GridConfig {
    fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(CoriolisError::configuration(format!(
                "grid must have positive dimensions, got {}x{}",
                self.width, self.height
            )));
        }

        if self.size <= 0 {
            return Err(CoriolisError::configuration(format!(
                "cell size must be positive, got {}",
                self.size
            )));
        }

        let too_many = match self.width.checked_mul(self.height) {
            Some(cells) => cells > MAX_CELLS,
            None => true,
        };
        if too_many {
            return Err(CoriolisError::configuration(format!(
                "grid {}x{} exceeds the limit of {} cells",
                self.width, self.height, MAX_CELLS
            )));
        }

        // 格子矩形的右下角是 W*Size、H*Size，必須能以 i64 表示
        if self.width.checked_mul(self.size).is_none()
            || self.height.checked_mul(self.size).is_none()
        {
            return Err(CoriolisError::configuration(format!(
                "cell size {} is too large for a {}x{} grid",
                self.size, self.width, self.height
            )));
        }

        for &[i, j] in &self.active {
            if i < 0 || j < 0 || i >= self.width || j >= self.height {
                return Err(CoriolisError::configuration(format!(
                    "active cell ({}, {}) is outside the {}x{} grid",
                    i, j, self.width, self.height
                )));
            }
        }

        Ok(())
    }
}
