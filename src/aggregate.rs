use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Dimension, GroupField, GroupKey, Measure};
use crate::view::FilteredView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairCount {
    pub a: String,
    pub b: String,
    pub count: usize,
}

/// One scatter point per row. Null coordinates are kept so rows stay auditable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub call_id: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub color: Option<String>,
}

pub fn count(view: &FilteredView<'_>) -> usize {
    view.len()
}

/// Mean over the non-null values; `None` when there are none.
pub fn mean(view: &FilteredView<'_>, measure: Measure) -> Option<f64> {
    let (sum, n) = view
        .iter()
        .filter_map(|record| record.measure(measure))
        .fold((0.0, 0usize), |(sum, n), value| (sum + value, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn group_count(view: &FilteredView<'_>, field: GroupField) -> BTreeMap<GroupKey, usize> {
    let mut groups = BTreeMap::new();
    for key in view.iter().filter_map(|record| record.group_key(field)) {
        *groups.entry(key).or_insert(0) += 1;
    }
    groups
}

pub fn group_count_2d(view: &FilteredView<'_>, a: Dimension, b: Dimension) -> Vec<PairCount> {
    let mut groups: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for record in view.iter() {
        if let (Some(key_a), Some(key_b)) = (record.category(a), record.category(b)) {
            *groups.entry((key_a, key_b)).or_insert(0) += 1;
        }
    }

    groups
        .into_iter()
        .map(|((a, b), count)| PairCount {
            a: a.to_string(),
            b: b.to_string(),
            count,
        })
        .collect()
}

/// Per-group mean of `measure`. A group whose values are all null maps to `None`.
pub fn group_mean(
    view: &FilteredView<'_>,
    field: GroupField,
    measure: Measure,
) -> BTreeMap<GroupKey, Option<f64>> {
    let mut groups: BTreeMap<GroupKey, (f64, usize)> = BTreeMap::new();
    for record in view.iter() {
        let Some(key) = record.group_key(field) else {
            continue;
        };
        let entry = groups.entry(key).or_insert((0.0, 0));
        if let Some(value) = record.measure(measure) {
            entry.0 += value;
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, (sum, n))| (key, (n > 0).then(|| sum / n as f64)))
        .collect()
}

pub fn pairs(view: &FilteredView<'_>, x: Measure, y: Measure, color: Dimension) -> Vec<ScatterPoint> {
    view.iter()
        .map(|record| ScatterPoint {
            call_id: record.call_id.clone(),
            x: record.measure(x),
            y: record.measure(y),
            color: record.category(color).map(str::to_string),
        })
        .collect()
}
