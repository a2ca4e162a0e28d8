use crate::domain::model::{Station, StationLocation, Zip};
use crate::utils::error::{CoriolisError, Result};

/// Integer rectangle, half-open on the max edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl Rect {
    pub fn new(min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn dx(&self) -> i64 {
        self.max_x - self.min_x
    }

    pub fn dy(&self) -> i64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.min_x as f64 + self.dx() as f64 / 2.0,
            self.min_y as f64 + self.dy() as f64 / 2.0,
        )
    }
}

/// Linear lat/lon to virtual-space transform.
///
/// A single scale factor is derived from the longitude span and used for
/// both axes, so the projected height is not tied to the target
/// rectangle's height. This is a crude placement, not a map projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    min_lon: f64,
    max_lat: f64,
    scale: f64,
}

impl Projection {
    pub fn from_stations(stations: &[Station], target: Rect) -> Result<Self> {
        let first = stations.first().ok_or_else(|| {
            CoriolisError::invalid_input("cannot compute a projection from an empty station set")
        })?;

        let (mut min_lat, mut max_lat) = (first.lat, first.lat);
        let (mut min_lon, mut max_lon) = (first.lon, first.lon);
        for station in stations {
            if !station.lat.is_finite() || !station.lon.is_finite() {
                return Err(CoriolisError::invalid_input(format!(
                    "station {} has malformed coordinates ({}, {})",
                    station.id(),
                    station.lat,
                    station.lon
                )));
            }
            min_lat = min_lat.min(station.lat);
            max_lat = max_lat.max(station.lat);
            min_lon = min_lon.min(station.lon);
            max_lon = max_lon.max(station.lon);
        }

        let span = max_lon - min_lon;
        if span <= 0.0 {
            return Err(CoriolisError::invalid_input(
                "station longitudes span zero degrees; scale is undefined",
            ));
        }

        let scale = target.dx() as f64 / span;
        tracing::debug!(
            "Projection: lat [{}, {}], lon [{}, {}], scale {:.4}",
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            scale
        );

        Ok(Self {
            min_lon,
            max_lat,
            scale,
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        (
            (lon - self.min_lon) * self.scale,
            (self.max_lat - lat) * self.scale,
        )
    }

    pub fn place_stations(&self, stations: &[Station]) -> Vec<StationLocation> {
        stations
            .iter()
            .map(|station| {
                let (x, y) = self.project(station.lat, station.lon);
                StationLocation {
                    station: station.clone(),
                    x,
                    y,
                }
            })
            .collect()
    }

    pub fn place_zips(&self, zips: &mut [Zip]) {
        for zip in zips {
            let (x, y) = self.project(zip.lat, zip.lon);
            zip.x = x;
            zip.y = y;
        }
    }
}
