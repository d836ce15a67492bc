use geo::Point;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PubRecord {
    pub name: String,
    pub address: String,
    pub postcode: String,
    pub local_authority: String, // neighborhood
    pub latitude: f64,
    pub longitude: f64,
}

impl PubRecord {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// One row of the per-neighborhood table, keyed the way the chart encodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborhoodCount {
    #[serde(rename = "Neighborhood")]
    pub neighborhood: String,
    #[serde(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HexCell {
    pub longitude: f64,
    pub latitude: f64,
    pub count: usize,
    pub elevation: f64,
}
