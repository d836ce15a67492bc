use crate::types::PubRecord;
use anyhow::{Context, Result, anyhow, bail};
use csv::ReaderBuilder;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const REQUIRED_COLUMNS: [&str; 6] = [
    "name",
    "address",
    "postcode",
    "local_authority",
    "latitude",
    "longitude",
];

// Cell values read as missing in addition to the configured null marker.
const NULL_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
    "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a",
    "nan", "null",
];

fn is_null(value: &str, null_marker: &str) -> bool {
    value == null_marker || NULL_TOKENS.contains(&value)
}

/// The cleaned pub dataset. Immutable once built; every record has coordinates.
#[derive(Debug, Default)]
pub struct PubStore {
    records: Vec<PubRecord>,
    names: Vec<String>, // distinct, first-appearance order
}

pub fn load_data(path: &Path, null_marker: &str) -> Result<PubStore> {
    info!("Loading pubs from {:?}", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let store = load_from_reader(file, null_marker)
        .with_context(|| format!("Failed to load pubs from {:?}", path))?;
    info!("Loaded {} pubs ({} distinct names)", store.len(), store.pub_names().len());
    Ok(store)
}

pub fn load_from_reader<R: Read>(reader: R, null_marker: &str) -> Result<PubStore> {
    let mut rdr = ReaderBuilder::new().from_reader(reader);
    let headers = rdr.headers()?.clone();

    let mut idx = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, column) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = headers.iter().position(|h| h.trim() == column)
            .ok_or_else(|| anyhow!("Required column '{}' not found in CSV", column))?;
    }
    let [name_i, address_i, postcode_i, authority_i, lat_i, lon_i] = idx;

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        let text = |i: usize| -> String {
            match row.get(i) {
                Some(v) if !is_null(v, null_marker) => v.to_string(),
                _ => String::new(),
            }
        };
        let coord = |i: usize, column: &str| -> Result<Option<f64>> {
            match row.get(i).map(str::trim) {
                None => Ok(None),
                Some(v) if is_null(v, null_marker) => Ok(None),
                Some(v) => {
                    let parsed: f64 = v.parse()
                        .with_context(|| format!("Invalid {} '{}' on line {}", column, v, line))?;
                    if !parsed.is_finite() {
                        bail!("Non-finite {} '{}' on line {}", column, v, line);
                    }
                    Ok(Some(parsed))
                }
            }
        };

        let (Some(latitude), Some(longitude)) = (coord(lat_i, "latitude")?, coord(lon_i, "longitude")?) else {
            dropped += 1;
            continue;
        };

        records.push(PubRecord {
            name: text(name_i),
            address: text(address_i),
            postcode: text(postcode_i),
            local_authority: text(authority_i),
            latitude,
            longitude,
        });
    }

    if dropped > 0 {
        debug!("Dropped {} rows without coordinates", dropped);
    }

    Ok(PubStore::from_records(records))
}

impl PubStore {
    /// Builds a store, dropping any record without usable coordinates.
    pub fn from_records(records: Vec<PubRecord>) -> Self {
        let records: Vec<PubRecord> = records.into_iter()
            .filter(PubRecord::has_coordinates)
            .collect();

        let names = {
            let mut seen = HashSet::new();
            records.iter()
                .filter(|r| !r.name.is_empty())
                .filter(|r| seen.insert(r.name.as_str()))
                .map(|r| r.name.clone())
                .collect()
        };

        Self { records, names }
    }

    pub fn records(&self) -> &[PubRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pub_names(&self) -> &[String] {
        &self.names
    }

    pub fn default_selection(&self, n: usize) -> &[String] {
        &self.names[..n.min(self.names.len())]
    }

    /// `None` returns every record; `Some(k)` draws `k` distinct records at random.
    pub fn sample(&self, rows: Option<usize>) -> Result<Vec<&PubRecord>> {
        match rows {
            None => Ok(self.records.iter().collect()),
            Some(k) if k > self.records.len() => {
                bail!("Cannot sample {} rows from {} pubs", k, self.records.len())
            }
            Some(k) => {
                let mut rng = rand::thread_rng();
                Ok(self.records.choose_multiple(&mut rng, k).collect())
            }
        }
    }
}
