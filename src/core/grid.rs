use crate::config::grid_config::GridConfig;
use crate::core::labeler::label_for;
use crate::core::nearest::nearest_n;
use crate::core::projection::Rect;
use crate::domain::model::{StationLocation, Zip};
use crate::utils::error::{CoriolisError, Result};
use crate::utils::validation::Validate;

/// One active cell of the grid. Stations and zips are borrowed from the
/// caller's collections, which outlive the grid.
#[derive(Debug, Clone)]
pub struct Region<'a> {
    pub i: usize,
    pub j: usize,
    pub rect: Rect,
    pub stations: Vec<&'a StationLocation>,
    pub zips: Vec<&'a Zip>,
    pub nearest: Vec<&'a StationLocation>,
    pub city: String,
}

/// Options for the per-region nearest station search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub nearest: usize,
    pub max_radius: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            nearest: 20,
            max_radius: None,
        }
    }
}

/// A W x H matrix of optional regions. `region(i, j)` is `Some` iff the
/// cell was listed as active.
///
/// Every in-bounds cell also keeps a station bucket, active or not, so the
/// ring search can reach stations that sit in inactive cells.
#[derive(Debug, Clone)]
pub struct Grid<'a> {
    width: usize,
    height: usize,
    cell_size: i64,
    regions: Vec<Option<Region<'a>>>,
    buckets: Vec<Vec<&'a StationLocation>>,
}

impl<'a> Grid<'a> {
    /// Partition, search and label in one sequential pass.
    pub fn build(
        config: &GridConfig,
        stations: &'a [StationLocation],
        zips: &'a [Zip],
        options: SearchOptions,
    ) -> Result<Self> {
        let mut grid = Self::partition(config, stations, zips)?;
        let active = config.active_cells();

        // 必須等整個網格分配完成，標籤才能讀到鄰格的郵遞區號
        for &(i, j) in &active {
            let nearest = nearest_n(&grid, i, j, options.nearest, options.max_radius)?;
            if let Some(region) = grid.region_mut(i, j) {
                region.nearest = nearest;
            }
        }

        for &(i, j) in &active {
            let city = label_for(&grid, i, j);
            if let Some(region) = grid.region_mut(i, j) {
                region.city = city;
            }
        }

        tracing::debug!(
            "Resolved {} nearest stations and labels for {} regions",
            options.nearest,
            active.len()
        );
        Ok(grid)
    }

    /// Allocates the regions and buckets stations and zips into their cells.
    pub fn partition(
        config: &GridConfig,
        stations: &'a [StationLocation],
        zips: &'a [Zip],
    ) -> Result<Self> {
        config.validate()?;
        let width = config.width();
        let height = config.height();
        let size = config.size;

        let mut grid = Self {
            width,
            height,
            cell_size: size,
            regions: vec![None; width * height],
            buckets: vec![Vec::new(); width * height],
        };

        for (i, j) in config.active_cells() {
            let idx = grid.index(i, j);
            grid.regions[idx] = Some(Region {
                i,
                j,
                rect: grid.cell_rect(i, j),
                stations: Vec::new(),
                zips: Vec::new(),
                nearest: Vec::new(),
                city: String::new(),
            });
        }

        for loc in stations {
            let (i, j) = grid.cell_of(loc.x, loc.y).ok_or_else(|| {
                CoriolisError::invalid_input(format!(
                    "station {} at ({:.2}, {:.2}) falls outside the {}x{} grid",
                    loc.station.id(),
                    loc.x,
                    loc.y,
                    width,
                    height
                ))
            })?;
            let idx = grid.index(i, j);
            grid.buckets[idx].push(loc);
            if let Some(region) = grid.regions[idx].as_mut() {
                region.stations.push(loc);
            }
        }

        let mut dropped = 0usize;
        for zip in zips {
            let Some((i, j)) = grid.cell_of(zip.x, zip.y) else {
                dropped += 1;
                continue;
            };
            let idx = grid.index(i, j);
            if let Some(region) = grid.regions[idx].as_mut() {
                region.zips.push(zip);
            }
        }

        if dropped > 0 {
            tracing::debug!("Skipped {} zips outside the grid", dropped);
        }
        tracing::debug!(
            "Partitioned {} stations and {} zips into a {}x{} grid",
            stations.len(),
            zips.len() - dropped,
            width,
            height
        );

        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn region(&self, i: usize, j: usize) -> Option<&Region<'a>> {
        if i >= self.width || j >= self.height {
            return None;
        }
        self.regions[self.index(i, j)].as_ref()
    }

    fn region_mut(&mut self, i: usize, j: usize) -> Option<&mut Region<'a>> {
        if i >= self.width || j >= self.height {
            return None;
        }
        let idx = self.index(i, j);
        self.regions[idx].as_mut()
    }

    /// Active regions, `i` outer and `j` inner.
    pub fn regions(&self) -> impl Iterator<Item = &Region<'a>> {
        self.regions.iter().flatten()
    }

    /// Every station whose virtual point falls in cell (i, j), active or not.
    pub fn stations_in(&self, i: usize, j: usize) -> &[&'a StationLocation] {
        if i >= self.width || j >= self.height {
            return &[];
        }
        &self.buckets[self.index(i, j)]
    }

    pub fn cell_rect(&self, i: usize, j: usize) -> Rect {
        let (i, j) = (i as i64, j as i64);
        let size = self.cell_size;
        Rect::new(i * size, j * size, (i + 1) * size, (j + 1) * size)
    }

    /// The in-bounds cell at offset (di, dj) from (i, j).
    pub fn neighbor(&self, i: usize, j: usize, di: i64, dj: i64) -> Option<(usize, usize)> {
        let ni = i as i64 + di;
        let nj = j as i64 + dj;
        if ni < 0 || nj < 0 || ni >= self.width as i64 || nj >= self.height as i64 {
            return None;
        }
        Some((ni as usize, nj as usize))
    }

    fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let size = self.cell_size as f64;
        let fi = (x / size).floor();
        let fj = (y / size).floor();
        if !fi.is_finite() || !fj.is_finite() || fi < 0.0 || fj < 0.0 {
            return None;
        }
        let (i, j) = (fi as usize, fj as usize);
        if i >= self.width || j >= self.height {
            return None;
        }
        Some((i, j))
    }

    // 以 i 為外層，讓 regions() 的順序與輸出檔一致
    fn index(&self, i: usize, j: usize) -> usize {
        i * self.height + j
    }
}
