// deck.gl specs in the JSON shape `@deck.gl/json` converts, plus Vega-Lite charts.

use crate::config::{DensityConfig, DetailConfig};
use crate::types::PubRecord;
use anyhow::{Context, Result};
use geo::Point;
use serde::Serialize;
use serde_json::Value;

pub const DENSITY_TOOLTIP: &str = "Concentration of pubs";
pub const DETAIL_TOOLTIP: &str = "Name: <br/> <b>{name}</b>";
const POSITION_ACCESSOR: &str = "@@=[longitude, latitude]";
const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSpec {
    pub initial_view_state: ViewState,
    pub layers: Vec<Layer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_style: Option<String>,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "@@type")]
pub enum Layer {
    HexagonLayer(HexagonLayer),
    ScatterplotLayer(ScatterplotLayer),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HexagonLayer {
    pub id: String,
    pub data: Vec<MapPoint>,
    pub get_position: String,
    pub radius: f64,
    pub elevation_scale: f64,
    pub elevation_range: [f64; 2],
    pub pickable: bool,
    pub extruded: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScatterplotLayer {
    pub id: String,
    pub data: Vec<MapPoint>,
    pub get_position: String,
    pub get_radius: f64,
    pub get_fill_color: [u8; 3],
    pub pickable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl From<&PubRecord> for MapPoint {
    fn from(record: &PubRecord) -> Self {
        Self {
            name: record.name.clone(),
            longitude: record.longitude,
            latitude: record.latitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Tooltip {
    Text { text: String },
    Html { html: String },
}

pub fn density_deck(records: &[PubRecord], center: Point<f64>, config: &DensityConfig) -> DeckSpec {
    DeckSpec {
        initial_view_state: ViewState {
            latitude: center.y(),
            longitude: center.x(),
            zoom: config.zoom,
            pitch: config.pitch,
            bearing: 0.0,
        },
        layers: vec![Layer::HexagonLayer(HexagonLayer {
            id: "pub-density".to_string(),
            data: records.iter().map(MapPoint::from).collect(),
            get_position: POSITION_ACCESSOR.to_string(),
            radius: config.radius,
            elevation_scale: config.elevation_scale,
            elevation_range: config.elevation_range,
            pickable: true,
            extruded: true,
        })],
        map_style: None,
        tooltip: Tooltip::Text { text: DENSITY_TOOLTIP.to_string() },
    }
}

/// Close-up map centered on the first match. `None` when there is nothing to show.
pub fn detail_deck(matches: &[&PubRecord], config: &DetailConfig) -> Option<DeckSpec> {
    let first = matches.first()?;
    Some(DeckSpec {
        initial_view_state: ViewState {
            latitude: first.latitude,
            longitude: first.longitude,
            zoom: config.zoom,
            pitch: 0.0,
            bearing: 0.0,
        },
        layers: vec![Layer::ScatterplotLayer(ScatterplotLayer {
            id: "pub-detail".to_string(),
            data: matches.iter().map(|r| MapPoint::from(*r)).collect(),
            get_position: POSITION_ACCESSOR.to_string(),
            get_radius: config.radius,
            get_fill_color: config.fill_color,
            pickable: true,
        })],
        map_style: Some(config.map_style.clone()),
        tooltip: Tooltip::Html { html: DETAIL_TOOLTIP.to_string() },
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub title: String,
    pub width: String,
    pub data: ChartData,
    pub mark: String,
    pub encoding: Encoding,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartData {
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Encoding {
    pub x: FieldDef,
    pub y: FieldDef,
    pub tooltip: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDef {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Nominal,
    Quantitative,
}

/// Bar chart of `x` against `y` over any serializable rows.
///
/// Field types are read off the first row: numbers are quantitative, anything
/// else nominal. With no rows, `x` is nominal and `y` quantitative.
pub fn bar_chart<T: Serialize>(data: &[T], x: &str, y: &str, title: &str) -> Result<ChartSpec> {
    let values = data.iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()
        .context("Failed to serialize chart rows")?;

    let x_def = FieldDef { field: x.to_string(), kind: infer_type(&values, x, FieldType::Nominal) };
    let y_def = FieldDef { field: y.to_string(), kind: infer_type(&values, y, FieldType::Quantitative) };

    Ok(ChartSpec {
        schema: VEGA_LITE_SCHEMA.to_string(),
        title: title.to_string(),
        width: "container".to_string(),
        data: ChartData { values },
        mark: "bar".to_string(),
        encoding: Encoding {
            tooltip: vec![x_def.clone(), y_def.clone()],
            x: x_def,
            y: y_def,
        },
    })
}

fn infer_type(values: &[Value], field: &str, fallback: FieldType) -> FieldType {
    match values.first().and_then(|row| row.get(field)) {
        Some(Value::Number(_)) => FieldType::Quantitative,
        Some(_) => FieldType::Nominal,
        None => fallback,
    }
}
