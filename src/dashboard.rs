use crate::config::AppConfig;
use crate::data::PubStore;
use crate::processing;
use crate::render::{self, ChartSpec, DeckSpec};
use crate::types::{HexCell, NeighborhoodCount, PubRecord};
use anyhow::Result;
use geo::Point;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DENSITY_HEADING: &str = "Advanced Map Visualization - Pub Concentrations";
pub const NEIGHBORHOOD_HEADING: &str = "Number of Pubs per Neighborhood";
pub const CHART_TITLE: &str = "Pubs per Neighborhood";

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub title: String,
    pub density_heading: String,
    pub neighborhood_heading: String,
    pub multiselect_label: String,
    pub selectbox_label: String,
    pub pubs: Vec<String>,
    pub default_selection: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DensityView {
    pub deck: DeckSpec,
    pub cells: Vec<HexCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NeighborhoodView {
    pub selected: Vec<String>,
    pub counts: Vec<NeighborhoodCount>,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PubDetailRow {
    pub address: String,
    pub postcode: String,
    pub local_authority: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetailView {
    Found {
        heading: String,
        rows: Vec<PubDetailRow>,
        map: DeckSpec,
    },
    NotFound {
        message: String,
    },
}

/// Request handlers over one loaded dataset. The density view is built once.
pub struct Dashboard {
    store: Arc<PubStore>,
    config: AppConfig,
    density: DensityView,
}

impl Dashboard {
    pub fn new(store: Arc<PubStore>, config: AppConfig) -> Self {
        if store.is_empty() {
            warn!("No pubs with coordinates were loaded; the dashboard will be empty");
        }
        let center = processing::mean_center(store.records()).unwrap_or_else(|| Point::new(0.0, 0.0));
        let cells = processing::hex_bins(store.records(), center, &config.density);
        info!(
            "Density map centered at ({:.4}, {:.4}) with {} hexagons",
            center.y(),
            center.x(),
            cells.len()
        );
        let density = DensityView {
            deck: render::density_deck(store.records(), center, &config.density),
            cells,
        };

        Self { store, config, density }
    }

    pub fn store(&self) -> &PubStore {
        &self.store
    }

    pub fn page(&self) -> PageView {
        PageView {
            title: self.config.dashboard.title.clone(),
            density_heading: DENSITY_HEADING.to_string(),
            neighborhood_heading: NEIGHBORHOOD_HEADING.to_string(),
            multiselect_label: "Select pubs to view".to_string(),
            selectbox_label: "Select a pub".to_string(),
            pubs: self.store.pub_names().to_vec(),
            default_selection: self.default_selection().to_vec(),
        }
    }

    pub fn default_selection(&self) -> &[String] {
        self.store.default_selection(self.config.dashboard.default_selection)
    }

    pub fn density(&self) -> &DensityView {
        &self.density
    }

    pub fn set_filter<S: AsRef<str>>(&self, selected: &[S]) -> Result<NeighborhoodView> {
        let filtered = processing::filter_by_names(self.store.records(), selected);
        let counts = processing::neighborhood_counts(filtered.iter().copied());
        debug!("{} selected pubs matched {} rows in {} neighborhoods", selected.len(), filtered.len(), counts.len());
        let chart = render::bar_chart(&counts, "Neighborhood", "Count", CHART_TITLE)?;

        Ok(NeighborhoodView {
            selected: selected.iter().map(|s| s.as_ref().to_string()).collect(),
            counts,
            chart,
        })
    }

    pub fn select_pub(&self, name: &str) -> DetailView {
        let matches = processing::lookup_pub(self.store.records(), name);
        match render::detail_deck(&matches, &self.config.detail) {
            Some(map) => DetailView::Found {
                heading: format!("Details for {}", name),
                rows: matches.iter().map(|r| PubDetailRow {
                    address: r.address.clone(),
                    postcode: r.postcode.clone(),
                    local_authority: r.local_authority.clone(),
                }).collect(),
                map,
            },
            None => {
                debug!("No pub named {:?}", name);
                DetailView::NotFound {
                    message: format!("No details found for {}", name),
                }
            }
        }
    }

    pub fn sample(&self, rows: Option<usize>) -> Result<Vec<&PubRecord>> {
        self.store.sample(rows)
    }
}
