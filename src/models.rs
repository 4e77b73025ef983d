use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub call_id: String,
    pub agent: Option<String>,
    pub department: Option<String>,
    pub answered: Option<String>,
    pub resolved: Option<String>,
    pub satisfaction_rating: Option<f64>,
    pub speed_of_answer: Option<f64>,
    pub avg_talk_duration: Option<f64>,
    pub date: NaiveDate,
    pub hour: u8,
}

impl Record {
    pub fn category(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Agent => self.agent.as_deref(),
            Dimension::Department => self.department.as_deref(),
            Dimension::Answered => self.answered.as_deref(),
            Dimension::Resolved => self.resolved.as_deref(),
        }
    }

    pub fn measure(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::SatisfactionRating => self.satisfaction_rating,
            Measure::SpeedOfAnswer => self.speed_of_answer,
            Measure::AvgTalkDuration => self.avg_talk_duration,
        }
    }

    pub fn group_key(&self, field: GroupField) -> Option<GroupKey> {
        match field {
            GroupField::Category(dimension) => self
                .category(dimension)
                .map(|value| GroupKey::Text(value.to_string())),
            GroupField::Date => Some(GroupKey::Date(self.date)),
            GroupField::Hour => Some(GroupKey::Hour(self.hour)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    Agent,
    Department,
    Answered,
    Resolved,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Agent,
        Dimension::Department,
        Dimension::Answered,
        Dimension::Resolved,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Dimension::Agent => "Agent",
            Dimension::Department => "Department",
            Dimension::Answered => "Answered",
            Dimension::Resolved => "Resolved",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|dimension| dimension.column().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Measure {
    SatisfactionRating,
    SpeedOfAnswer,
    AvgTalkDuration,
}

impl Measure {
    pub fn column(self) -> &'static str {
        match self {
            Measure::SatisfactionRating => "SatisfactionRating",
            Measure::SpeedOfAnswer => "SpeedOfAnswer",
            Measure::AvgTalkDuration => "AvgTalkDuration(Seconds)",
        }
    }

    pub fn is_duration(self) -> bool {
        matches!(self, Measure::SpeedOfAnswer | Measure::AvgTalkDuration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupField {
    Category(Dimension),
    Date,
    Hour,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Text(String),
    Date(NaiveDate),
    Hour(u8),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Text(value) => f.write_str(value),
            GroupKey::Date(date) => write!(f, "{date}"),
            GroupKey::Hour(hour) => write!(f, "{hour:02}:00"),
        }
    }
}

/// Inclusive `[low, high]` range. Construction swaps inverted bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub low: T,
    pub high: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(a: T, b: T) -> Self {
        if a > b {
            Self { low: b, high: a }
        } else {
            Self { low: a, high: b }
        }
    }

    pub fn contains(&self, value: T) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn extend(self, value: T) -> Self {
        Self {
            low: if value < self.low { value } else { self.low },
            high: if value > self.high { value } else { self.high },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_swap_inverted_input() {
        let bounds = Bounds::new(5.0, 2.0);
        assert_eq!(bounds.low, 2.0);
        assert_eq!(bounds.high, 5.0);
    }

    #[test]
    fn bounds_are_inclusive() {
        let bounds = Bounds::new(3, 5);
        assert!(bounds.contains(3));
        assert!(bounds.contains(5));
        assert!(!bounds.contains(6));
        assert!(!bounds.contains(2));
    }

    #[test]
    fn dimension_parse_ignores_case() {
        assert_eq!(Dimension::parse("agent"), Some(Dimension::Agent));
        assert_eq!(Dimension::parse("RESOLVED"), Some(Dimension::Resolved));
        assert_eq!(Dimension::parse("hour"), None);
    }

    #[test]
    fn group_keys_order_within_variant() {
        let early = GroupKey::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let late = GroupKey::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!(early < late);
        assert!(GroupKey::Hour(9) < GroupKey::Hour(10));
        assert_eq!(GroupKey::Hour(9).to_string(), "09:00");
    }
}
