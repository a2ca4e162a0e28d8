use crate::core::grid::Grid;
use crate::domain::model::StationLocation;
use crate::utils::error::{CoriolisError, Result};

pub fn distance(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let (dx, dy) = (x1 - x0, y1 - y0);
    (dx * dx + dy * dy).sqrt()
}

/// Appends the stations of every cell on the square ring at Chebyshev
/// distance `r` from (i, j). Rows first (`j - r`, `j + r` across
/// `i - r ..= i + r`), then the columns without their corners. Cells
/// outside the grid are skipped.
pub fn stations_around<'a>(
    grid: &Grid<'a>,
    i: usize,
    j: usize,
    r: usize,
    out: &mut Vec<&'a StationLocation>,
) {
    let mut take = |di: i64, dj: i64| {
        if let Some((ci, cj)) = grid.neighbor(i, j, di, dj) {
            out.extend_from_slice(grid.stations_in(ci, cj));
        }
    };

    if r == 0 {
        take(0, 0);
        return;
    }

    let r = r as i64;
    for k in -r..=r {
        take(k, -r);
        take(k, r);
    }

    let n = r - 1;
    for k in -n..=n {
        take(-r, k);
        take(r, k);
    }
}

/// The `n` stations closest to the centre of cell (i, j), nearest first.
///
/// Rings are accumulated outward until at least `n` candidates exist, then
/// all candidates are stably sorted by distance, so equal distances keep
/// ring-then-bucket order. Fails with `InsufficientDataError` once the ring
/// has left the grid or passed `max_radius` without reaching `n`.
pub fn nearest_n<'a>(
    grid: &Grid<'a>,
    i: usize,
    j: usize,
    n: usize,
    max_radius: Option<usize>,
) -> Result<Vec<&'a StationLocation>> {
    if n == 0 {
        return Ok(Vec::new());
    }

    let (cx, cy) = grid.cell_rect(i, j).center();
    // 超過此半徑後整個環都在網格外
    let reach = i
        .max(grid.width().saturating_sub(1).saturating_sub(i))
        .max(j)
        .max(grid.height().saturating_sub(1).saturating_sub(j));

    let mut locs = Vec::new();
    let mut radius = 0usize;
    loop {
        stations_around(grid, i, j, radius, &mut locs);
        if locs.len() >= n {
            break;
        }

        let capped = max_radius.is_some_and(|max| radius >= max);
        if radius >= reach || capped {
            return Err(CoriolisError::InsufficientDataError {
                i,
                j,
                wanted: n,
                found: locs.len(),
            });
        }
        radius += 1;
    }

    let mut ranked: Vec<(f64, &'a StationLocation)> = locs
        .into_iter()
        .map(|loc| (distance(loc.x, loc.y, cx, cy), loc))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked.truncate(n);

    tracing::trace!(
        "Region ({}, {}) resolved {} stations within radius {}",
        i,
        j,
        n,
        radius
    );
    Ok(ranked.into_iter().map(|(_, loc)| loc).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::tests::{config, loc};

    fn ids(locs: &[&StationLocation]) -> Vec<String> {
        locs.iter().map(|l| l.station.usaf.clone()).collect()
    }

    #[test]
    fn test_ring_zero_is_own_cell() {
        let cfg = config(4, 4, 10, &[[0, 0], [1, 1]]);
        let stations = vec![loc("a", 1.0, 1.0), loc("b", 15.0, 15.0), loc("c", 25.0, 25.0)];
        let grid = Grid::partition(&cfg, &stations, &[]).unwrap();

        let nearest = nearest_n(&grid, 1, 1, 1, None).unwrap();
        assert_eq!(ids(&nearest), vec!["b"]);
        assert_eq!((nearest[0].x, nearest[0].y), (15.0, 15.0));
    }

    #[test]
    fn test_inactive_cells_contribute_to_rings() {
        let cfg = config(4, 4, 10, &[[0, 0], [1, 1]]);
        let stations = vec![loc("a", 1.0, 1.0), loc("b", 15.0, 15.0), loc("c", 25.0, 25.0)];
        let grid = Grid::partition(&cfg, &stations, &[]).unwrap();

        // (2,2) 未啟用，但其測站仍可被 (1,1) 找到
        let nearest = nearest_n(&grid, 1, 1, 3, None).unwrap();
        assert_eq!(ids(&nearest), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_ring_enumeration_covers_perimeter_once() {
        // 5x5 每格一個測站，半徑 1 的環應剛好是八個鄰格
        let cfg = config(5, 5, 10, &[[2, 2]]);
        let mut stations = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                stations.push(loc(
                    &format!("{}{}", i, j),
                    i as f64 * 10.0 + 5.0,
                    j as f64 * 10.0 + 5.0,
                ));
            }
        }
        let grid = Grid::partition(&cfg, &stations, &[]).unwrap();

        let mut ring = Vec::new();
        stations_around(&grid, 2, 2, 1, &mut ring);
        let mut found = ids(&ring);
        found.sort();
        assert_eq!(found, vec!["11", "12", "13", "21", "23", "31", "32", "33"]);

        let mut ring = Vec::new();
        stations_around(&grid, 2, 2, 2, &mut ring);
        assert_eq!(ring.len(), 16);

        // 角落格的環只取網格內的部分
        let mut ring = Vec::new();
        stations_around(&grid, 0, 0, 1, &mut ring);
        let mut found = ids(&ring);
        found.sort();
        assert_eq!(found, vec!["01", "10", "11"]);
    }

    #[test]
    fn test_results_sorted_by_distance_and_truncated() {
        let cfg = config(5, 5, 10, &[[2, 2]]);
        let stations = vec![
            loc("far", 49.0, 49.0),
            loc("mid", 35.0, 25.0),
            loc("near", 26.0, 24.0),
            loc("edge", 10.0, 10.0),
        ];
        let grid = Grid::partition(&cfg, &stations, &[]).unwrap();

        let nearest = nearest_n(&grid, 2, 2, 3, None).unwrap();
        assert_eq!(nearest.len(), 3);
        let (cx, cy) = (25.0, 25.0);
        let dists: Vec<f64> = nearest.iter().map(|l| distance(l.x, l.y, cx, cy)).collect();
        assert!(dists.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ids(&nearest), vec!["near", "mid", "edge"]);
    }

    #[test]
    fn test_equal_distances_keep_ring_order() {
        let cfg = config(3, 3, 10, &[[1, 1]]);
        // 兩個測站與中心等距，分屬上方與下方的格子
        let stations = vec![loc("below", 15.0, 25.0), loc("above", 15.0, 5.0)];
        let grid = Grid::partition(&cfg, &stations, &[]).unwrap();

        let nearest = nearest_n(&grid, 1, 1, 2, None).unwrap();
        // 同一欄時上方的格子先被列舉
        assert_eq!(ids(&nearest), vec!["above", "below"]);
    }

    #[test]
    fn test_search_keeps_whole_outer_ring() {
        // 第一環就補足數量時，仍要對整環排序後才截斷
        let cfg = config(3, 3, 10, &[[1, 1]]);
        let stations = vec![loc("corner", 0.5, 0.5), loc("side", 20.5, 15.0)];
        let grid = Grid::partition(&cfg, &stations, &[]).unwrap();

        let nearest = nearest_n(&grid, 1, 1, 1, None).unwrap();
        assert_eq!(ids(&nearest), vec!["side"]);
    }

    #[test]
    fn test_insufficient_stations_fail_instead_of_looping() {
        let cfg = config(3, 3, 10, &[[0, 0]]);
        let stations = vec![loc("only", 25.0, 25.0)];
        let grid = Grid::partition(&cfg, &stations, &[]).unwrap();

        let err = nearest_n(&grid, 0, 0, 2, None).unwrap_err();
        match err {
            CoriolisError::InsufficientDataError { wanted, found, .. } => {
                assert_eq!(wanted, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_max_radius_caps_search() {
        let cfg = config(5, 5, 10, &[[0, 0]]);
        let stations = vec![loc("distant", 45.0, 45.0)];
        let grid = Grid::partition(&cfg, &stations, &[]).unwrap();

        assert!(nearest_n(&grid, 0, 0, 1, Some(2)).is_err());
        assert_eq!(nearest_n(&grid, 0, 0, 1, Some(4)).unwrap().len(), 1);
    }

    #[test]
    fn test_zero_requested_is_empty() {
        let cfg = config(1, 1, 10, &[[0, 0]]);
        let grid = Grid::partition(&cfg, &[], &[]).unwrap();
        assert!(nearest_n(&grid, 0, 0, 0, None).unwrap().is_empty());
    }
}
