// Projects recording entries into per-label chart series

use crate::core::error::SchemaError;
use crate::core::format::{ChartPoint, ChartSeries, Entry, LabelSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Label titles requested for projection. Membership ignores order and
/// duplicates; iteration keeps the order titles were first supplied in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct VisibilitySet {
    titles: Vec<String>,
}

impl VisibilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for VisibilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let titles = iter
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| seen.insert(t.clone()))
            .collect();
        Self { titles }
    }
}

impl From<Vec<String>> for VisibilitySet {
    fn from(titles: Vec<String>) -> Self {
        titles.into_iter().collect()
    }
}

impl From<VisibilitySet> for Vec<String> {
    fn from(set: VisibilitySet) -> Self {
        set.titles
    }
}

/// One series per visible title, one point per entry. A title missing from
/// any entry means the recording is not rectangular and fails the whole
/// projection rather than producing a gap that looks like telemetry.
pub fn project(entries: &[Entry], visibility: &VisibilitySet) -> Result<Vec<ChartSeries>, SchemaError> {
    visibility
        .titles()
        .iter()
        .map(|title| project_label(entries, title))
        .collect()
}

fn project_label(entries: &[Entry], title: &str) -> Result<ChartSeries, SchemaError> {
    let mut points = Vec::with_capacity(entries.len());
    // Labels sit at the same position in every entry of a rectangular
    // recording, so the previous hit is checked before scanning.
    let mut hint = 0usize;

    for entry in entries {
        let label = match find_label(entry, title, hint) {
            Some((pos, label)) => {
                hint = pos;
                label
            }
            None => {
                warn!("Label {} missing at second {}", title, entry.second);
                return Err(SchemaError::MissingLabel {
                    title: title.to_string(),
                    second: entry.second,
                });
            }
        };

        points.push(ChartPoint {
            second: entry.second,
            timestamp: entry.timestamp,
            avg_value: label.avg_value,
            max_value: label.max_value,
            min_value: label.min_value,
            chart_color: label.chart_color.clone(),
            chart_type: label.chart_type,
            digital_status: label.digital_status.clone(),
            time: label.time,
        });
    }

    Ok(ChartSeries {
        label: title.to_string(),
        chart_type: points.first().and_then(|p| p.chart_type),
        points,
    })
}

fn find_label<'a>(entry: &'a Entry, title: &str, hint: usize) -> Option<(usize, &'a LabelSnapshot)> {
    match entry.labels.get(hint) {
        Some(label) if label.title == title => Some((hint, label)),
        _ => entry
            .labels
            .iter()
            .enumerate()
            .find(|(_, l)| l.title == title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::format::{ChartType, DigitalStatus, SensorState};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn label(title: &str, avg: f64, chart_type: Option<ChartType>) -> LabelSnapshot {
        LabelSnapshot {
            title: title.to_string(),
            time: None,
            max_value: avg * 2.0,
            min_value: 0.0,
            avg_value: avg,
            chart_type,
            label_color: "#FF5733".into(),
            chart_color: "#33C1FF".into(),
            digital_status: BTreeMap::new(),
        }
    }

    fn entry(second: u32, labels: Vec<LabelSnapshot>) -> Entry {
        Entry {
            second,
            timestamp: Utc.timestamp_opt(1_761_955_200 + second as i64, 0).unwrap(),
            latitude: 28.6,
            longitude: 77.2,
            labels,
        }
    }

    #[test]
    fn test_single_label_scenario() {
        let entries = vec![
            entry(0, vec![label("Sensor 1", 10.0, Some(ChartType::Analog))]),
            entry(1, vec![label("Sensor 1", 20.0, Some(ChartType::Analog))]),
            entry(2, vec![label("Sensor 1", 30.0, Some(ChartType::Analog))]),
        ];
        let visibility: VisibilitySet = ["Sensor 1"].into_iter().collect();

        let series = project(&entries, &visibility).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, "Sensor 1");
        assert_eq!(series[0].chart_type, Some(ChartType::Analog));
        let points: Vec<(u32, f64)> = series[0].points.iter().map(|p| (p.second, p.avg_value)).collect();
        assert_eq!(points, vec![(0, 10.0), (1, 20.0), (2, 30.0)]);
    }

    #[test]
    fn test_preserves_caller_order_and_drops_duplicates() {
        let labels = || vec![label("A", 1.0, None), label("B", 2.0, None), label("C", 3.0, None)];
        let entries = vec![entry(0, labels()), entry(1, labels())];
        let visibility: VisibilitySet = ["C", "A", "C"].into_iter().collect();

        let series = project(&entries, &visibility).unwrap();
        let names: Vec<&str> = series.iter().map(|s| s.label.as_str()).collect();

        assert_eq!(names, vec!["C", "A"]);
        assert!(series.iter().all(|s| s.points.len() == entries.len()));
    }

    #[test]
    fn test_chart_type_comes_from_first_point() {
        let entries = vec![
            entry(0, vec![label("S", 1.0, Some(ChartType::Digital))]),
            entry(1, vec![label("S", 1.0, Some(ChartType::Analog))]),
        ];
        let visibility: VisibilitySet = ["S"].into_iter().collect();

        let series = project(&entries, &visibility).unwrap();
        assert_eq!(series[0].chart_type, Some(ChartType::Digital));
        assert_eq!(series[0].points[1].chart_type, Some(ChartType::Analog));
    }

    #[test]
    fn test_carries_digital_status() {
        let mut digital = label("Door", 0.0, Some(ChartType::Digital));
        digital.digital_status.insert(
            "EWP Stowed".into(),
            DigitalStatus {
                state: SensorState::On,
                color: Some("#FF69B4".into()),
            },
        );
        let entries = vec![entry(0, vec![digital])];
        let visibility: VisibilitySet = ["Door"].into_iter().collect();

        let series = project(&entries, &visibility).unwrap();
        assert_eq!(series[0].points[0].digital_status["EWP Stowed"].state, SensorState::On);
    }

    #[test]
    fn test_label_found_when_position_shifts() {
        let entries = vec![
            entry(0, vec![label("A", 1.0, None), label("B", 2.0, None)]),
            entry(1, vec![label("B", 4.0, None), label("A", 3.0, None)]),
        ];
        let visibility: VisibilitySet = ["B"].into_iter().collect();

        let series = project(&entries, &visibility).unwrap();
        let values: Vec<f64> = series[0].points.iter().map(|p| p.avg_value).collect();
        assert_eq!(values, vec![2.0, 4.0]);
    }

    #[test]
    fn test_non_rectangular_recording_is_an_error() {
        let entries = vec![
            entry(0, vec![label("A", 1.0, None)]),
            entry(7, vec![label("B", 1.0, None)]),
        ];
        let visibility: VisibilitySet = ["A"].into_iter().collect();

        assert_eq!(
            project(&entries, &visibility),
            Err(SchemaError::MissingLabel {
                title: "A".into(),
                second: 7
            })
        );
    }

    #[test]
    fn test_empty_visibility_yields_no_series() {
        let entries = vec![entry(0, vec![label("A", 1.0, None)])];
        assert_eq!(project(&entries, &VisibilitySet::new()), Ok(Vec::new()));
        assert_eq!(project(&[], &["A"].into_iter().collect()), Ok(vec![ChartSeries {
            label: "A".into(),
            chart_type: None,
            points: Vec::new(),
        }]));
    }
}
