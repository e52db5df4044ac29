//! The in-memory zone table, built once per session and read-only after.

use crate::config::ColumnConfig;
use crate::data::RawRow;
use crate::types::ZoneRecord;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::Hasher;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct ZoneTable {
    records: Vec<ZoneRecord>,
    rejected: usize,
    version: u64,
}

/// Per-group totals. Sums skip missing values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub zones: usize,
    pub total_population: f64,
    pub total_area: f64,
    pub average_population: Option<f64>,
}

impl ZoneTable {
    /// Validates raw rows into zone records. Rows without an identifier or a
    /// country are rejected; unusable numbers become missing values.
    pub fn load(rows: Vec<RawRow>, columns: &ColumnConfig) -> Self {
        let mut records = Vec::with_capacity(rows.len());
        let mut rejected = 0;
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for (line, row) in rows.into_iter().enumerate() {
            let (Some(id), Some(country)) = (row.text(&columns.id), row.text(&columns.country))
            else {
                debug!(row = line, "rejecting row without zone id or country");
                rejected += 1;
                continue;
            };

            // ids are unique per country; the first row wins
            if !seen.insert((country.clone(), id.clone())) {
                warn!(row = line, zone = %id, country = %country, "rejecting duplicate zone id");
                rejected += 1;
                continue;
            }

            let quantity = |column: &str| match row.number(column) {
                Some(v) if v < 0.0 => {
                    warn!(zone = %id, column, value = v, "negative value treated as missing");
                    None
                }
                other => other,
            };

            records.push(ZoneRecord {
                population: quantity(&columns.population),
                area: quantity(&columns.area),
                road_length: quantity(&columns.roads),
                region: row.text(&columns.region),
                geometry: row.text(&columns.geometry),
                id,
                country,
            });
        }

        if rejected > 0 {
            warn!(rejected, "rows without a unique zone id or a country were skipped");
        }
        let mut table = Self::from_records(records);
        table.rejected = rejected;
        info!(zones = table.len(), rejected, version = table.version, "zone table ready");
        table
    }

    pub fn from_records(records: Vec<ZoneRecord>) -> Self {
        let version = fingerprint(&records);
        ZoneTable {
            records,
            rejected: 0,
            version,
        }
    }

    pub fn records(&self) -> &[ZoneRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Fingerprint of the loaded records, stable for the session.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Zones of one group in source order. No match gives an empty list.
    pub fn filter_by_group(&self, group: &str) -> Vec<&ZoneRecord> {
        self.records().iter().filter(|r| r.country == group).collect()
    }

    /// Distinct group keys, ascending.
    pub fn available_groups(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.country.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn find(&self, group: &str, id: &str) -> Option<&ZoneRecord> {
        self.records
            .iter()
            .find(|r| r.country == group && r.id == id)
    }

    pub fn summaries(&self) -> Vec<GroupSummary> {
        let mut groups: BTreeMap<&str, Vec<&ZoneRecord>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.country.as_str()).or_default().push(record);
        }

        groups
            .into_iter()
            .map(|(group, zones)| {
                let populations: Vec<f64> = zones.iter().filter_map(|z| z.population).collect();
                let total_population = populations.iter().sum::<f64>();
                GroupSummary {
                    group: group.to_string(),
                    zones: zones.len(),
                    total_population,
                    total_area: zones.iter().filter_map(|z| z.area).sum(),
                    average_population: (!populations.is_empty())
                        .then(|| total_population / populations.len() as f64),
                }
            })
            .collect()
    }
}

fn fingerprint(records: &[ZoneRecord]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write_usize(records.len());
    for record in records {
        hasher.write(record.id.as_bytes());
        hasher.write(record.country.as_bytes());
        for value in [record.population, record.area, record.road_length] {
            hasher.write_u64(value.map_or(u64::MAX, f64::to_bits));
        }
        if let Some(geometry) = &record.geometry {
            hasher.write(geometry.as_bytes());
        }
    }
    hasher.finish()
}
