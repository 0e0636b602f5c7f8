// Data structures for recording documents and the normalized model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =======================
// Raw document (ingestion boundary)
// =======================

/// A recording document as it arrives over the wire. Every field is optional
/// here; the normalizer decides what is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_count: Option<u32>,
    #[serde(default)]
    pub digital_sensors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<RawEntry>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawEntry {
    #[serde(default)]
    pub second: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Producers emit either `label` or `labels`.
    #[serde(default, rename = "label", alias = "labels")]
    pub labels: Option<Vec<RawLabel>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub avg_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_color: Option<String>,
    /// Flat map of `"<sensor>": "ON"|"OFF"` and `"<sensor>_color": "<css>"`.
    #[serde(default)]
    pub digital_status: BTreeMap<String, String>,
}

// =======================
// Normalized model
// =======================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Digital,
    Analog,
}

impl ChartType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "digital" => Some(ChartType::Digital),
            "analog" => Some(ChartType::Analog),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SensorState {
    On,
    Off,
}

impl SensorState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ON" => Some(SensorState::On),
            "OFF" => Some(SensorState::Off),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SensorState::On => "ON",
            SensorState::Off => "OFF",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalStatus {
    pub state: SensorState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSnapshot {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    pub max_value: f64,
    pub min_value: f64,
    pub avg_value: f64,
    /// Left unset when the document carries none; defaulting is up to the renderer.
    pub chart_type: Option<ChartType>,
    pub label_color: String,
    pub chart_color: String,
    pub digital_status: BTreeMap<String, DigitalStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub second: u32,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub labels: Vec<LabelSnapshot>,
}

impl Entry {
    pub fn label(&self, title: &str) -> Option<&LabelSnapshot> {
        self.labels.iter().find(|l| l.title == title)
    }

    /// Position with a usable fix, if any.
    pub fn position(&self) -> Option<GeoPoint> {
        let has_fix = self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude != 0.0
            && self.longitude != 0.0;

        has_fix.then_some(GeoPoint {
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Inclusive second range covered by a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondBounds {
    pub start: u32,
    pub end: u32,
}

impl SecondBounds {
    pub fn clamp(&self, second: i64) -> u32 {
        second.clamp(self.start as i64, self.end as i64) as u32
    }
}

/// A normalized recording. Entries are sorted by second and seconds are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub date: Option<String>,
    pub start_timestamp: Option<DateTime<Utc>>,
    pub end_timestamp: Option<DateTime<Utc>>,
    pub total_seconds: Option<u64>,
    pub label_count: Option<u32>,
    pub digital_sensor_names: Vec<String>,
    pub entries: Vec<Entry>,
}

impl Recording {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `None` for a recording with zero entries.
    pub fn bounds(&self) -> Option<SecondBounds> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        Some(SecondBounds {
            start: first.second,
            end: last.second,
        })
    }

    pub fn start_time_string(&self) -> Option<String> {
        self.entries.first().map(|e| e.timestamp.to_rfc3339())
    }

    pub fn end_time_string(&self) -> Option<String> {
        self.entries.last().map(|e| e.timestamp.to_rfc3339())
    }

    /// Titles of the first entry's labels, in document order.
    pub fn label_titles(&self) -> Vec<String> {
        self.entries
            .first()
            .map(|e| e.labels.iter().map(|l| l.title.clone()).collect())
            .unwrap_or_default()
    }

    pub fn route(&self) -> Vec<GeoPoint> {
        self.entries.iter().filter_map(Entry::position).collect()
    }

    pub fn entries_in_range(&self, start: u32, end: u32) -> impl Iterator<Item = &Entry> {
        let from = self.entries.partition_point(|e| e.second < start);
        let to = self.entries.partition_point(|e| e.second <= end);
        self.entries[from..to.max(from)].iter()
    }

    /// Elapsed second matching `timestamp`, measured from the first entry.
    pub fn second_at(&self, timestamp: DateTime<Utc>) -> Option<u32> {
        let first = self.entries.first()?;
        let offset = (timestamp - first.timestamp).num_seconds();
        u32::try_from(first.second as i64 + offset).ok()
    }
}

// =======================
// Projection output
// =======================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub second: u32,
    pub timestamp: DateTime<Utc>,
    pub avg_value: f64,
    pub max_value: f64,
    pub min_value: f64,
    pub chart_color: String,
    pub chart_type: Option<ChartType>,
    pub digital_status: BTreeMap<String, DigitalStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub label: String,
    pub chart_type: Option<ChartType>,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
