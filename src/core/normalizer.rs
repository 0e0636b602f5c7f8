// Turns a raw recording document into a normalized Recording

use crate::core::constants::*;
use crate::core::error::SchemaError;
use crate::core::format::*;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::debug;

pub fn normalize(doc: RecordingDocument) -> Result<Recording, SchemaError> {
    let start_timestamp = parse_header_time("startTime", doc.start_time.as_deref())?;
    let end_timestamp = parse_header_time("endTime", doc.end_time.as_deref())?;

    let raw_entries = doc.data.unwrap_or_default();
    let mut entries = Vec::with_capacity(raw_entries.len());
    for (pos, raw) in raw_entries.into_iter().enumerate() {
        entries.push(normalize_entry(pos, raw)?);
    }

    entries.sort_by_key(|e| e.second);
    if let Some(pair) = entries.windows(2).find(|w| w[0].second == w[1].second) {
        return Err(SchemaError::DuplicateSecond(pair[0].second));
    }

    debug!(
        "Normalized {} entries ({} labels in first entry)",
        entries.len(),
        entries.first().map(|e| e.labels.len()).unwrap_or(0)
    );

    Ok(Recording {
        date: doc.date,
        start_timestamp,
        end_timestamp,
        total_seconds: doc.total_seconds,
        label_count: doc.label_count,
        digital_sensor_names: doc.digital_sensors,
        entries,
    })
}

fn parse_header_time(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, SchemaError> {
    value
        .map(|v| {
            parse_timestamp(v).map_err(|reason| SchemaError::InvalidHeader { field, reason })
        })
        .transpose()
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("{value:?}: {e}"))
}

fn normalize_entry(pos: usize, raw: RawEntry) -> Result<Entry, SchemaError> {
    let missing = |field| SchemaError::MissingField { field, entry: pos };

    let second = raw.second.ok_or_else(|| missing("second"))?;
    let second = u32::try_from(second)
        .ok()
        .filter(|s| *s <= MAX_SECOND)
        .ok_or_else(|| SchemaError::InvalidField {
            field: "second",
            entry: pos,
            reason: format!("{second} is not a valid elapsed second (0..={MAX_SECOND})"),
        })?;

    let timestamp = raw.timestamp.ok_or_else(|| missing("timestamp"))?;
    let timestamp = parse_timestamp(&timestamp).map_err(|reason| SchemaError::InvalidField {
        field: "timestamp",
        entry: pos,
        reason,
    })?;

    let latitude = raw.latitude.ok_or_else(|| missing("latitude"))?;
    let longitude = raw.longitude.ok_or_else(|| missing("longitude"))?;

    let labels = raw
        .labels
        .ok_or_else(|| missing("label"))?
        .into_iter()
        .enumerate()
        .map(|(i, label)| normalize_label(pos, i, label))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Entry {
        second,
        timestamp,
        latitude,
        longitude,
        labels,
    })
}

fn normalize_label(pos: usize, i: usize, raw: RawLabel) -> Result<LabelSnapshot, SchemaError> {
    let missing = |field| SchemaError::MissingField { field, entry: pos };

    let title = match raw.title {
        Some(title) if !title.is_empty() => title,
        _ => format!("{} {}", DEFAULT_TITLE_PREFIX, i + 1),
    };

    let chart_type = raw
        .chart_type
        .map(|ct| {
            ChartType::parse(&ct).ok_or_else(|| SchemaError::InvalidField {
                field: "chartType",
                entry: pos,
                reason: format!("unknown chart type {ct:?} on `{title}`"),
            })
        })
        .transpose()?;

    let digital_status = normalize_digital_status(pos, &raw.digital_status)?;

    Ok(LabelSnapshot {
        time: raw.time,
        max_value: raw.max_value.ok_or_else(|| missing("maxValue"))?,
        min_value: raw.min_value.ok_or_else(|| missing("minValue"))?,
        avg_value: raw.avg_value.ok_or_else(|| missing("avgValue"))?,
        chart_type,
        label_color: raw
            .label_color
            .unwrap_or_else(|| LABEL_PALETTE[i % LABEL_PALETTE.len()].to_string()),
        chart_color: raw
            .chart_color
            .unwrap_or_else(|| CHART_PALETTE[i % CHART_PALETTE.len()].to_string()),
        digital_status,
        title,
    })
}

/// Folds the flat `{"<name>": state, "<name>_color": css}` layout into one
/// record per sensor. Color keys without a matching state are ignored.
fn normalize_digital_status(
    pos: usize,
    raw: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, DigitalStatus>, SchemaError> {
    let mut out = BTreeMap::new();

    for (name, value) in raw {
        if name.ends_with(DIGITAL_COLOR_SUFFIX) {
            continue;
        }

        let state = SensorState::parse(value).ok_or_else(|| SchemaError::InvalidField {
            field: "digitalStatus",
            entry: pos,
            reason: format!("sensor `{name}` has state {value:?}"),
        })?;
        let color = raw.get(&format!("{name}{DIGITAL_COLOR_SUFFIX}")).cloned();

        out.insert(name.clone(), DigitalStatus { state, color });
    }

    Ok(out)
}
