//! CSV reader for AIS exports.
//!
//! The first line is a header. Columns are matched by name, case-insensitive:
//! `mmsi`, `lon`/`longitude`, `lat`/`latitude`, `speed`/`sog`,
//! `course`/`cog`, `timestamp`/`time` (epoch ms) and an optional `heading`.
//! Extra columns are ignored.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{info, warn};

use crate::ais::record::AisRecord;
use crate::error::{Error, Result};
use crate::geo::GeoPoint;

/// AIS sentinel for "heading not available".
const HEADING_UNAVAILABLE: f64 = 511.0;

/// Records parsed from one source plus the number of rows skipped.
#[derive(Debug, Clone, Default)]
pub struct AisBatch {
    pub records: Vec<AisRecord>,
    pub rejected: usize,
}

struct Columns {
    mmsi: usize,
    lon: usize,
    lat: usize,
    sog: usize,
    cog: usize,
    timestamp: usize,
    heading: Option<usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self> {
        let names: Vec<String> = header
            .iter()
            .map(|s| s.trim_start_matches('\u{feff}').to_ascii_lowercase())
            .collect();
        let find = |aliases: &[&str]| names.iter().position(|n| aliases.contains(&n.as_str()));
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| Error::AisParse {
                line: 1,
                reason: format!("missing column {}", aliases.join("|")),
            })
        };

        Ok(Self {
            mmsi: require(&["mmsi"])?,
            lon: require(&["lon", "longitude"])?,
            lat: require(&["lat", "latitude"])?,
            sog: require(&["speed", "sog"])?,
            cog: require(&["course", "cog"])?,
            timestamp: require(&["timestamp", "time"])?,
            heading: find(&["heading"]),
        })
    }

    fn parse_row(&self, fields: &StringRecord) -> std::result::Result<AisRecord, String> {
        let field = |idx: usize| fields.get(idx).ok_or_else(|| format!("missing field {idx}"));
        let number = |idx: usize| -> std::result::Result<f64, String> {
            let raw = field(idx)?;
            let value: f64 = raw.parse().map_err(|_| format!("bad number {raw:?}"))?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(format!("non-finite value {raw:?}"))
            }
        };

        let raw_mmsi = field(self.mmsi)?;
        let mmsi: u32 = raw_mmsi
            .parse()
            .map_err(|_| format!("bad mmsi {raw_mmsi:?}"))?;

        let raw_ts = field(self.timestamp)?;
        let timestamp = match raw_ts.parse::<i64>() {
            Ok(ts) => ts,
            Err(_) => number(self.timestamp)?.round() as i64,
        };

        let lat = number(self.lat)?;
        let lon = number(self.lon)?;
        if !GeoPoint::new(lat, lon).is_valid() {
            return Err(format!("coordinates out of range ({lat}, {lon})"));
        }

        let sog = number(self.sog)?;
        if sog < 0.0 {
            return Err(format!("negative speed {sog}"));
        }
        let cog = number(self.cog)?.rem_euclid(360.0);

        let heading = match self.heading {
            Some(idx) => number(idx)
                .ok()
                .filter(|h| *h != HEADING_UNAVAILABLE && (0.0..360.0).contains(h)),
            None => None,
        };

        Ok(AisRecord {
            mmsi,
            timestamp,
            lat,
            lon,
            sog,
            cog,
            heading,
        })
    }
}

/// Parse AIS CSV text. Malformed rows are logged and skipped; a missing
/// header or required column is an error.
pub fn parse_csv<R: Read>(reader: R) -> Result<AisBatch> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let header = reader.headers()?.clone();
    if header.is_empty() {
        return Ok(AisBatch::default());
    }
    let columns = Columns::from_header(&header)?;

    let mut batch = AisBatch::default();
    for result in reader.records() {
        let parsed = result.map_err(|e| e.to_string()).and_then(|record| {
            if record.iter().all(str::is_empty) {
                return Ok(None);
            }
            columns.parse_row(&record).map(Some).map_err(|reason| {
                let line = record.position().map_or(0, |p| p.line());
                format!("line {line}: {reason}")
            })
        });
        match parsed {
            Ok(Some(record)) => batch.records.push(record),
            Ok(None) => {}
            Err(reason) => {
                warn!(%reason, "skipping malformed AIS row");
                batch.rejected += 1;
            }
        }
    }
    Ok(batch)
}

pub fn read_csv_file(path: impl AsRef<Path>) -> Result<AisBatch> {
    let path = path.as_ref();
    let batch = parse_csv(std::fs::File::open(path)?)?;
    info!(
        path = %path.display(),
        records = batch.records.len(),
        rejected = batch.rejected,
        "loaded AIS records"
    );
    Ok(batch)
}
