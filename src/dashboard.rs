use serde::Serialize;
use tracing::debug;

use crate::aggregate::{self, PairCount, ScatterPoint};
use crate::filter::FilterState;
use crate::models::{Dimension, GroupField, GroupKey, Measure};
use crate::predicate::compile;
use crate::store::RecordStore;
use crate::view;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyedCount {
    pub key: GroupKey,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyedMean {
    pub key: GroupKey,
    pub mean: Option<f64>,
}

/// Means are full precision and `None` when no non-null value was in view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub total_calls: usize,
    pub mean_satisfaction_rating: Option<f64>,
    pub mean_speed_of_answer: Option<f64>,
    pub mean_talk_duration: Option<f64>,
    pub calls_by_date: Vec<KeyedCount>,
    pub calls_by_hour: Vec<KeyedCount>,
    pub calls_by_agent_department: Vec<PairCount>,
    pub rating_by_agent: Vec<KeyedMean>,
    pub speed_vs_talk_duration: Vec<ScatterPoint>,
}

pub fn compute(store: &RecordStore, filter: &FilterState) -> AggregateResult {
    let predicate = compile(filter);
    let view = view::apply(store, &predicate);
    if view.is_empty() {
        debug!(total = store.len(), "no records match the current filter");
    } else {
        debug!(matched = view.len(), total = store.len(), "filtered view recomputed");
    }

    let keyed = |field| {
        aggregate::group_count(&view, field)
            .into_iter()
            .map(|(key, count)| KeyedCount { key, count })
            .collect::<Vec<_>>()
    };

    AggregateResult {
        total_calls: aggregate::count(&view),
        mean_satisfaction_rating: aggregate::mean(&view, Measure::SatisfactionRating),
        mean_speed_of_answer: aggregate::mean(&view, Measure::SpeedOfAnswer),
        mean_talk_duration: aggregate::mean(&view, Measure::AvgTalkDuration),
        calls_by_date: keyed(GroupField::Date),
        calls_by_hour: keyed(GroupField::Hour),
        calls_by_agent_department: aggregate::group_count_2d(
            &view,
            Dimension::Agent,
            Dimension::Department,
        ),
        rating_by_agent: aggregate::group_mean(
            &view,
            GroupField::Category(Dimension::Agent),
            Measure::SatisfactionRating,
        )
        .into_iter()
        .map(|(key, mean)| KeyedMean { key, mean })
        .collect(),
        speed_vs_talk_duration: aggregate::pairs(
            &view,
            Measure::SpeedOfAnswer,
            Measure::AvgTalkDuration,
            Dimension::Resolved,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::scenario_store;

    #[test]
    fn full_filter_covers_the_store() {
        let store = scenario_store();
        let result = compute(&store, &FilterState::reset(&store));

        assert_eq!(result.total_calls, 2);
        assert_eq!(result.mean_satisfaction_rating, Some(4.0));
        assert_eq!(result.mean_speed_of_answer, Some(15.0));
        assert_eq!(result.mean_talk_duration, Some(45.0));
        assert_eq!(result.calls_by_hour.len(), 2);
        assert_eq!(result.calls_by_agent_department.len(), 2);
        assert_eq!(
            result.rating_by_agent,
            vec![
                KeyedMean { key: GroupKey::Text("A".into()), mean: Some(5.0) },
                KeyedMean { key: GroupKey::Text("B".into()), mean: Some(3.0) },
            ]
        );
        assert_eq!(result.speed_vs_talk_duration.len(), 2);
    }

    #[test]
    fn over_restrictive_filter_is_a_valid_empty_result() {
        let store = scenario_store();
        let mut filter = FilterState::reset(&store);
        filter.set_rating_range(4.5, 4.9);
        let result = compute(&store, &filter);

        assert_eq!(result.total_calls, 0);
        assert_eq!(result.mean_satisfaction_rating, None);
        assert_eq!(result.mean_talk_duration, None);
        assert!(result.calls_by_date.is_empty());
        assert!(result.speed_vs_talk_duration.is_empty());
    }

    #[test]
    fn recompute_is_deterministic() {
        let store = scenario_store();
        let filter = FilterState::reset(&store);
        assert_eq!(compute(&store, &filter), compute(&store, &filter));
    }

    #[test]
    fn serializes_for_charting() {
        let store = scenario_store();
        let mut filter = FilterState::reset(&store);
        filter.select(Dimension::Agent, ["A"]);
        let json = serde_json::to_value(compute(&store, &filter)).unwrap();

        assert_eq!(json["total_calls"], 1);
        assert_eq!(json["calls_by_date"][0]["key"], "2024-01-01");
        assert_eq!(json["calls_by_hour"][0]["key"], 9);
        assert_eq!(json["calls_by_agent_department"][0]["a"], "A");
        assert!(json["speed_vs_talk_duration"][0]["y"].is_number());
    }
}
