use crate::core::grid::Grid;
use std::collections::BTreeMap;

/// Neighbour offsets in lookup order, with the prefix used when the
/// neighbour's city names the cell. The prefix says where this cell lies
/// relative to the neighbour's city.
const NEIGHBOR_LABELS: [(i64, i64, &str); 8] = [
    (-1, 0, "EAST OF"),
    (-1, -1, "SE OF"),
    (-1, 1, "NE OF"),
    (1, 0, "WEST OF"),
    (1, -1, "SW OF"),
    (1, 1, "NW OF"),
    (0, -1, "SOUTH OF"),
    (0, 1, "NORTH OF"),
];

/// The most populous city among the zips of cell (i, j), with its summed
/// population. Ties go to the lexicographically smallest name. Inactive
/// cells and cells without populated zips have no major city.
pub fn major_city_of(grid: &Grid<'_>, i: usize, j: usize) -> Option<(String, u64)> {
    let region = grid.region(i, j)?;

    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for zip in &region.zips {
        *totals.entry(zip.city.as_str()).or_default() += zip.pop;
    }

    let mut best: Option<(&str, u64)> = None;
    for (name, pop) in totals {
        if name.is_empty() || pop == 0 {
            continue;
        }
        match best {
            Some((_, best_pop)) if pop <= best_pop => {}
            _ => best = Some((name, pop)),
        }
    }

    best.map(|(name, pop)| (name.to_string(), pop))
}

/// Display label for cell (i, j): its major city, else the best
/// `"<DIR> OF <city>"` built from directly adjacent cities, else empty.
pub fn label_for(grid: &Grid<'_>, i: usize, j: usize) -> String {
    if let Some((name, _)) = major_city_of(grid, i, j) {
        return name;
    }

    let mut candidates: Vec<(String, u64)> = NEIGHBOR_LABELS
        .iter()
        .filter_map(|&(di, dj, prefix)| {
            let (ni, nj) = grid.neighbor(i, j, di, dj)?;
            let (name, pop) = major_city_of(grid, ni, nj)?;
            Some((format!("{} {}", prefix, name), pop))
        })
        .collect();

    // 穩定排序，人口相同時保留查找順序
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates
        .into_iter()
        .next()
        .map(|(label, _)| label)
        .unwrap_or_default()
}
