use crate::config::DensityConfig;
use crate::types::{HexCell, NeighborhoodCount, PubRecord};
use geo::{Centroid, MultiPoint, Point};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

pub const UNKNOWN_NEIGHBORHOOD: &str = "Unknown";

// Metres per degree on a local equirectangular projection.
const METRES_PER_DEG_LAT: f64 = 110_574.0;
const METRES_PER_DEG_LON: f64 = 111_320.0;

pub fn filter_by_names<'a, S: AsRef<str>>(records: &'a [PubRecord], selected: &[S]) -> Vec<&'a PubRecord> {
    let wanted: HashSet<&str> = selected.iter().map(|s| s.as_ref()).collect();
    records.iter()
        .filter(|r| wanted.contains(r.name.as_str()))
        .collect()
}

/// Counts records per neighborhood, largest first (ties alphabetical).
pub fn neighborhood_counts<'a, I>(records: I) -> Vec<NeighborhoodCount>
where
    I: IntoIterator<Item = &'a PubRecord>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let key = if record.local_authority.is_empty() {
            UNKNOWN_NEIGHBORHOOD
        } else {
            record.local_authority.as_str()
        };
        *counts.entry(key).or_default() += 1;
    }

    let mut table: Vec<NeighborhoodCount> = counts.into_iter()
        .map(|(neighborhood, count)| NeighborhoodCount {
            neighborhood: neighborhood.to_string(),
            count,
        })
        .collect();
    table.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.neighborhood.cmp(&b.neighborhood)));
    table
}

/// All records named `name`, ordered by postcode then dataset order.
/// The first entry is the one a detail map centers on.
pub fn lookup_pub<'a>(records: &'a [PubRecord], name: &str) -> Vec<&'a PubRecord> {
    let mut matches: Vec<&PubRecord> = records.iter()
        .filter(|r| r.name == name && r.has_coordinates())
        .collect();
    // stable: equal postcodes keep dataset order
    matches.sort_by(|a, b| a.postcode.cmp(&b.postcode));
    matches
}

/// Arithmetic mean of all record positions.
pub fn mean_center(records: &[PubRecord]) -> Option<Point<f64>> {
    let points: MultiPoint<f64> = records.iter().map(PubRecord::point).collect();
    points.centroid()
}

/// Bins records into pointy-top hexagons of `config.radius` metres around `origin`.
///
/// Elevation is linear in the cell count over `[0, max_count]`, mapped onto
/// `elevation_range` and multiplied by `elevation_scale`.
pub fn hex_bins(records: &[PubRecord], origin: Point<f64>, config: &DensityConfig) -> Vec<HexCell> {
    if records.is_empty() || config.radius <= 0.0 {
        return Vec::new();
    }

    let grid = HexGrid::new(origin, config.radius);

    let counts: HashMap<(i64, i64), usize> = records.par_iter()
        .fold(HashMap::new, |mut acc, record| {
            *acc.entry(grid.cell_of(record.point())).or_insert(0) += 1;
            acc
        })
        .reduce(HashMap::new, |mut a, b| {
            for (cell, n) in b {
                *a.entry(cell).or_insert(0) += n;
            }
            a
        });

    let max_count = counts.values().copied().max().unwrap_or(0).max(1) as f64;
    let [lo, hi] = config.elevation_range;

    let mut cells: Vec<HexCell> = counts.into_iter()
        .map(|(cell, count)| {
            let center = grid.center_of(cell);
            HexCell {
                longitude: center.x(),
                latitude: center.y(),
                count,
                elevation: (lo + (hi - lo) * count as f64 / max_count) * config.elevation_scale,
            }
        })
        .collect();
    cells.sort_by(|a, b| {
        b.count.cmp(&a.count)
            .then_with(|| a.latitude.total_cmp(&b.latitude))
            .then_with(|| a.longitude.total_cmp(&b.longitude))
    });
    cells
}

struct HexGrid {
    origin: Point<f64>,
    radius: f64,
    lon_scale: f64,
}

impl HexGrid {
    fn new(origin: Point<f64>, radius: f64) -> Self {
        Self {
            origin,
            radius,
            lon_scale: METRES_PER_DEG_LON * origin.y().to_radians().cos(),
        }
    }

    fn to_metres(&self, p: Point<f64>) -> (f64, f64) {
        (
            (p.x() - self.origin.x()) * self.lon_scale,
            (p.y() - self.origin.y()) * METRES_PER_DEG_LAT,
        )
    }

    fn cell_of(&self, p: Point<f64>) -> (i64, i64) {
        let (x, y) = self.to_metres(p);
        let q = (3f64.sqrt() / 3.0 * x - y / 3.0) / self.radius;
        let r = (2.0 / 3.0 * y) / self.radius;
        cube_round(q, r)
    }

    fn center_of(&self, (q, r): (i64, i64)) -> Point<f64> {
        let (q, r) = (q as f64, r as f64);
        let x = self.radius * 3f64.sqrt() * (q + r / 2.0);
        let y = self.radius * 1.5 * r;
        Point::new(
            self.origin.x() + x / self.lon_scale,
            self.origin.y() + y / METRES_PER_DEG_LAT,
        )
    }
}

// Rounds fractional axial coordinates to the containing hexagon.
fn cube_round(q: f64, r: f64) -> (i64, i64) {
    let s = -q - r;
    let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
    let (dq, dr, ds) = ((rq - q).abs(), (rr - r).abs(), (rs - s).abs());
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    (rq as i64, rr as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests::sample_store;

    fn record(name: &str, postcode: &str, authority: &str, lat: f64, lon: f64) -> PubRecord {
        PubRecord {
            name: name.to_string(),
            address: format!("{} address", name),
            postcode: postcode.to_string(),
            local_authority: authority.to_string(),
            latitude: lat,
            longitude: lon,
        }
    }

    #[test]
    fn test_filter_by_names() {
        let store = sample_store();
        let filtered = filter_by_names(store.records(), &["The Crown", "The Lamb"]);
        assert_eq!(filtered.len(), 3);
        assert!(filtered.iter().all(|r| r.name == "The Crown" || r.name == "The Lamb"));
    }

    #[test]
    fn test_neighborhood_counts_sorted() {
        let store = sample_store();
        let counts = neighborhood_counts(store.records());
        assert_eq!(counts[0], NeighborhoodCount { neighborhood: "Southwark".into(), count: 2 });
        let rest: Vec<&str> = counts[1..].iter().map(|c| c.neighborhood.as_str()).collect();
        assert_eq!(rest, vec!["Camden", "Merton", "Tower Hamlets"]);
    }

    #[test]
    fn test_counts_sum_to_filtered_rows() {
        let store = sample_store();
        let names = store.pub_names();
        for k in 0..=names.len() {
            let selected = &names[..k];
            let filtered = filter_by_names(store.records(), selected);
            let total: usize = neighborhood_counts(filtered.iter().copied()).iter().map(|c| c.count).sum();
            let expected = store.records().iter().filter(|r| selected.contains(&r.name)).count();
            assert_eq!(total, expected);
        }
    }

    #[test]
    fn test_empty_selection_has_no_rows() {
        let store = sample_store();
        let none: [&str; 0] = [];
        let filtered = filter_by_names(store.records(), &none);
        assert!(neighborhood_counts(filtered).is_empty());
    }

    #[test]
    fn test_missing_neighborhood_counted_as_unknown() {
        let records = vec![
            record("A", "E1", "", 51.5, -0.1),
            record("B", "E2", "Hackney", 51.5, -0.1),
        ];
        let counts = neighborhood_counts(&records);
        assert_eq!(counts.len(), 2);
        assert!(counts.iter().any(|c| c.neighborhood == UNKNOWN_NEIGHBORHOOD && c.count == 1));
    }

    #[test]
    fn test_every_listed_name_is_found() {
        let store = sample_store();
        for name in store.pub_names() {
            let matches = lookup_pub(store.records(), name);
            assert!(!matches.is_empty(), "no match for {}", name);
            assert!(matches.iter().all(|r| r.has_coordinates()));
        }
    }

    #[test]
    fn test_lookup_orders_duplicates_by_postcode() {
        let records = vec![
            record("The Crown", "SW19 5AL", "Merton", 51.425, -0.216),
            record("The Crown", "E1 6AN", "Tower Hamlets", 51.515, -0.072),
            record("The Crown", "E1 6AN", "Tower Hamlets", 51.516, -0.073),
        ];
        let matches = lookup_pub(&records, "The Crown");
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].latitude, 51.515);
        assert_eq!(matches[1].latitude, 51.516);
        assert_eq!(matches[2].postcode, "SW19 5AL");
    }

    #[test]
    fn test_lookup_unknown_is_empty() {
        let store = sample_store();
        assert!(lookup_pub(store.records(), "The Nowhere Arms").is_empty());
    }

    #[test]
    fn test_mean_center() {
        let records = vec![
            record("A", "", "", 51.0, -1.0),
            record("B", "", "", 52.0, 1.0),
        ];
        let center = mean_center(&records).unwrap();
        assert!((center.y() - 51.5).abs() < 1e-9);
        assert!(center.x().abs() < 1e-9);
        assert!(mean_center(&[]).is_none());
    }

    #[test]
    fn test_hex_bins_cover_all_points() {
        let store = sample_store();
        let origin = mean_center(store.records()).unwrap();
        let cells = hex_bins(store.records(), origin, &DensityConfig::default());
        let total: usize = cells.iter().map(|c| c.count).sum();
        assert_eq!(total, store.len());
    }

    #[test]
    fn test_hex_bins_group_nearby_points() {
        let config = DensityConfig::default();
        let records = vec![
            record("A", "", "", 51.50000, -0.10000),
            record("B", "", "", 51.50010, -0.10010),
            record("C", "", "", 51.50005, -0.10005),
            record("D", "", "", 51.60000, -0.20000),
        ];
        let origin = Point::new(-0.1, 51.5);
        let cells = hex_bins(&records, origin, &config);
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].count, 3);
        assert_eq!(cells[0].elevation, 1000.0 * config.elevation_scale);
        assert_eq!(cells[1].count, 1);
        assert!((cells[1].elevation - 1000.0 / 3.0 * config.elevation_scale).abs() < 1e-9);
        // the busy cell's center sits within one radius of its points
        assert!((cells[0].latitude - 51.5).abs() * METRES_PER_DEG_LAT < config.radius);
    }

    #[test]
    fn test_cube_round_origin() {
        assert_eq!(cube_round(0.1, -0.2), (0, 0));
        assert_eq!(cube_round(0.9, 0.05), (1, 0));
    }
}
