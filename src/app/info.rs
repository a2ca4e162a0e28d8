use crate::core::grid::Grid;
use crate::domain::model::Zip;
use crate::utils::error::Result;
use serde::Serialize;

/// One line of `info.json`: a region's label and the zips bucketed in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionInfo {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "I")]
    pub i: usize,
    #[serde(rename = "J")]
    pub j: usize,
    #[serde(rename = "Zips")]
    pub zips: Vec<Zip>,
}

pub fn region_infos(grid: &Grid<'_>) -> Vec<RegionInfo> {
    grid.regions()
        .map(|region| RegionInfo {
            city: region.city.clone(),
            i: region.i,
            j: region.j,
            zips: region.zips.iter().map(|z| (*z).clone()).collect(),
        })
        .collect()
}

/// Newline-delimited JSON, one object per region.
pub fn to_ndjson(infos: &[RegionInfo]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for info in infos {
        serde_json::to_writer(&mut out, info)?;
        out.push(b'\n');
    }
    Ok(out)
}
