// Synthetic recording generator

use crate::core::constants::*;
use crate::core::format::{RawEntry, RawLabel, RecordingDocument, SensorState};
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_seconds")]
    pub seconds: u32,
    #[serde(default = "default_label_count")]
    pub label_count: u32,
    #[serde(default = "default_start")]
    pub start: DateTime<Utc>,
    /// Fixed seed for reproducible output; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_seconds() -> u32 {
    10_800
}

fn default_label_count() -> u32 {
    52
}

fn default_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seconds: default_seconds(),
            label_count: default_label_count(),
            start: default_start(),
            seed: None,
        }
    }
}

/// One entry per second with `label_count` labels titled `Sensor {n}`, a
/// random-walk GPS track and a fixed set of digital sensors. Digital states
/// are memoryless coin flips drawn independently every second.
pub fn generate(config: &GeneratorConfig) -> RecordingDocument {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (mut lat, mut lng) = SYNTHETIC_ORIGIN;
    let mut data = Vec::with_capacity(config.seconds as usize);

    for sec in 0..config.seconds {
        lat += (rng.gen::<f64>() - 0.5) * 0.0001;
        lng += (rng.gen::<f64>() - 0.5) * 0.0001;

        let mut digital_status = BTreeMap::new();
        for (name, color) in SYNTHETIC_DIGITAL_SENSORS {
            let state = if rng.gen_bool(0.5) {
                SensorState::On
            } else {
                SensorState::Off
            };
            digital_status.insert(name.to_string(), state.as_str().to_string());
            digital_status.insert(format!("{name}{DIGITAL_COLOR_SUFFIX}"), color.to_string());
        }

        let max_value = duty_profile(sec);
        let labels = (0..config.label_count as usize)
            .map(|i| RawLabel {
                time: Some(sec as i64),
                title: Some(format!("Sensor {}", i + 1)),
                max_value: Some(max_value),
                min_value: Some(0.0),
                avg_value: Some(round_to(max_value / 2.0, 2)),
                chart_type: Some(if i % 2 == 0 { "digital" } else { "analog" }.to_string()),
                label_color: Some(LABEL_PALETTE[i % LABEL_PALETTE.len()].to_string()),
                chart_color: Some(CHART_PALETTE[i % CHART_PALETTE.len()].to_string()),
                digital_status: digital_status.clone(),
            })
            .collect();

        data.push(RawEntry {
            second: Some(sec as i64),
            timestamp: Some(iso(config.start + Duration::seconds(sec as i64))),
            latitude: Some(round_to(lat, 6)),
            longitude: Some(round_to(lng, 6)),
            labels: Some(labels),
        });
    }

    RecordingDocument {
        date: Some(config.start.format("%Y-%m-%d").to_string()),
        start_time: Some(iso(config.start)),
        end_time: Some(iso(config.start + Duration::seconds(config.seconds as i64))),
        total_seconds: Some(config.seconds as u64),
        label_count: Some(config.label_count),
        digital_sensors: SYNTHETIC_DIGITAL_SENSORS
            .iter()
            .map(|(name, _)| name.to_string())
            .collect(),
        data: Some(data),
    }
}

// Two busy stretches on an otherwise idle recording
fn duty_profile(sec: u32) -> f64 {
    match sec {
        201..=1999 => 50.0,
        6001..=6999 => 25.0,
        _ => 0.0,
    }
}

fn iso(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
