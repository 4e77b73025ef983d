use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Bounds, Dimension};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    pub agent: BTreeSet<String>,
    pub department: BTreeSet<String>,
    pub answered: BTreeSet<String>,
    pub resolved: BTreeSet<String>,
    /// `None` when the store has no ratings to bound; applies no constraint.
    pub rating: Option<Bounds<f64>>,
    pub date: Option<Bounds<NaiveDate>>,
}

impl FilterState {
    pub fn reset(store: &RecordStore) -> Self {
        let all = |dimension: Dimension| -> BTreeSet<String> {
            store.distinct_values(dimension).iter().cloned().collect()
        };
        Self {
            agent: all(Dimension::Agent),
            department: all(Dimension::Department),
            answered: all(Dimension::Answered),
            resolved: all(Dimension::Resolved),
            rating: store.rating_range(),
            date: store.date_range(),
        }
    }

    pub fn selected(&self, dimension: Dimension) -> &BTreeSet<String> {
        match dimension {
            Dimension::Agent => &self.agent,
            Dimension::Department => &self.department,
            Dimension::Answered => &self.answered,
            Dimension::Resolved => &self.resolved,
        }
    }

    fn selected_mut(&mut self, dimension: Dimension) -> &mut BTreeSet<String> {
        match dimension {
            Dimension::Agent => &mut self.agent,
            Dimension::Department => &mut self.department,
            Dimension::Answered => &mut self.answered,
            Dimension::Resolved => &mut self.resolved,
        }
    }

    pub fn select<I, S>(&mut self, dimension: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.selected_mut(dimension) = values.into_iter().map(Into::into).collect();
    }

    pub fn set_rating_range(&mut self, a: f64, b: f64) {
        self.rating = Some(Bounds::new(a, b));
    }

    pub fn set_date_range(&mut self, a: NaiveDate, b: NaiveDate) {
        self.date = Some(Bounds::new(a, b));
    }
}

/// A partial filter, read from a JSON file or assembled from CLI flags.
///
/// Absent fields keep whatever the target state already holds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "snake_case")]
pub struct FilterOverrides {
    pub agent: Option<Vec<String>>,
    pub department: Option<Vec<String>>,
    pub answered: Option<Vec<String>>,
    pub resolved: Option<Vec<String>>,
    pub rating_min: Option<f64>,
    pub rating_max: Option<f64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FilterOverrides {
    /// Fields set in `other` win.
    pub fn merge(self, other: FilterOverrides) -> FilterOverrides {
        FilterOverrides {
            agent: other.agent.or(self.agent),
            department: other.department.or(self.department),
            answered: other.answered.or(self.answered),
            resolved: other.resolved.or(self.resolved),
            rating_min: other.rating_min.or(self.rating_min),
            rating_max: other.rating_max.or(self.rating_max),
            date_from: other.date_from.or(self.date_from),
            date_to: other.date_to.or(self.date_to),
        }
    }

    pub fn apply(&self, state: &mut FilterState) {
        let selections = [
            (Dimension::Agent, &self.agent),
            (Dimension::Department, &self.department),
            (Dimension::Answered, &self.answered),
            (Dimension::Resolved, &self.resolved),
        ];
        for (dimension, values) in selections {
            if let Some(values) = values {
                state.select(dimension, values.iter().cloned());
            }
        }

        if self.rating_min.is_some() || self.rating_max.is_some() {
            let current = state.rating;
            let low = self.rating_min.or(current.map(|b| b.low));
            let high = self.rating_max.or(current.map(|b| b.high));
            if let (Some(low), Some(high)) = (low, high) {
                state.set_rating_range(low, high);
            }
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let current = state.date;
            let low = self.date_from.or(current.map(|b| b.low));
            let high = self.date_to.or(current.map(|b| b.high));
            if let (Some(low), Some(high)) = (low, high) {
                state.set_date_range(low, high);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::scenario_store;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn reset_selects_everything_observed() {
        let store = scenario_store();
        let state = FilterState::reset(&store);
        assert_eq!(state.agent, BTreeSet::from(["A".to_string(), "B".to_string()]));
        assert_eq!(state.selected(Dimension::Resolved).len(), 1);
        assert_eq!(state.rating, Some(Bounds::new(3.0, 5.0)));
        assert_eq!(state.date, Some(Bounds::new(day(1), day(2))));
    }

    #[test]
    fn inverted_ranges_are_swapped() {
        let store = scenario_store();
        let mut state = FilterState::reset(&store);
        state.set_rating_range(5.0, 4.0);
        assert_eq!(state.rating, Some(Bounds { low: 4.0, high: 5.0 }));
        state.set_date_range(day(9), day(3));
        assert_eq!(state.date, Some(Bounds { low: day(3), high: day(9) }));
    }

    #[test]
    fn overrides_touch_only_named_fields() {
        let store = scenario_store();
        let mut state = FilterState::reset(&store);
        let overrides: FilterOverrides =
            serde_json::from_str(r#"{"agent": ["A"], "rating_min": 4}"#).unwrap();
        overrides.apply(&mut state);

        assert_eq!(state.agent, BTreeSet::from(["A".to_string()]));
        assert_eq!(state.department.len(), 2);
        assert_eq!(state.rating, Some(Bounds::new(4.0, 5.0)));
        assert_eq!(state.date, Some(Bounds::new(day(1), day(2))));
    }

    #[test]
    fn overrides_reject_unknown_fields() {
        let parsed = serde_json::from_str::<FilterOverrides>(r#"{"agents": ["A"]}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn later_overrides_win_on_merge() {
        let file = FilterOverrides {
            agent: Some(vec!["A".into()]),
            rating_min: Some(2.0),
            ..Default::default()
        };
        let flags = FilterOverrides {
            agent: Some(vec!["B".into()]),
            ..Default::default()
        };
        let merged = file.merge(flags);
        assert_eq!(merged.agent, Some(vec!["B".to_string()]));
        assert_eq!(merged.rating_min, Some(2.0));
    }
}
