use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::error::LoadError;
use crate::models::{Bounds, Dimension, Measure, Record};

const CALL_ID: &str = "CallId";
const DATE: &str = "Date";
const HOUR: &str = "Hour";

#[derive(Debug)]
pub struct RecordStore {
    records: Vec<Record>,
    options: [Vec<String>; 4],
    rating_range: Option<Bounds<f64>>,
    rating_steps: Vec<f64>,
    date_range: Option<Bounds<NaiveDate>>,
}

impl RecordStore {
    pub fn from_csv_path(path: &Path) -> Result<Self, LoadError> {
        let file = std::fs::File::open(path)?;
        let store = Self::from_csv_reader(file)?;
        info!(path = %path.display(), rows = store.len(), "loaded call-center dataset");
        Ok(store)
    }

    pub fn from_csv_reader<R: Read>(source: R) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
        let columns = ColumnIndex::resolve(reader.headers()?)?;

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            records.push(columns.parse_row(&row, index + 1)?);
        }

        Self::from_records(records)
    }

    pub fn from_records(records: Vec<Record>) -> Result<Self, LoadError> {
        validate(&records)?;

        let options = Dimension::ALL.map(|dimension| first_seen_values(&records, dimension));

        let mut rating_steps: Vec<f64> = records
            .iter()
            .filter_map(|record| record.satisfaction_rating)
            .collect();
        rating_steps.sort_by(f64::total_cmp);
        rating_steps.dedup();
        let rating_range = match (rating_steps.first(), rating_steps.last()) {
            (Some(&low), Some(&high)) => Some(Bounds::new(low, high)),
            _ => None,
        };

        let date_range = records.iter().fold(None, |range: Option<Bounds<NaiveDate>>, record| {
            Some(match range {
                Some(range) => range.extend(record.date),
                None => Bounds::new(record.date, record.date),
            })
        });

        debug!(
            rows = records.len(),
            agents = options[0].len(),
            departments = options[1].len(),
            "record store indexed"
        );

        Ok(Self {
            records,
            options,
            rating_range,
            rating_steps,
            date_range,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct non-null values of a categorical field, in first-appearance order.
    pub fn distinct_values(&self, dimension: Dimension) -> &[String] {
        &self.options[dimension_slot(dimension)]
    }

    pub fn rating_range(&self) -> Option<Bounds<f64>> {
        self.rating_range
    }

    pub fn rating_steps(&self) -> &[f64] {
        &self.rating_steps
    }

    pub fn date_range(&self) -> Option<Bounds<NaiveDate>> {
        self.date_range
    }
}

fn validate(records: &[Record]) -> Result<(), LoadError> {
    let mut seen = HashSet::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let row = index + 1;
        if record.call_id.is_empty() {
            return Err(LoadError::MissingCallId { row });
        }
        if !seen.insert(record.call_id.as_str()) {
            return Err(LoadError::DuplicateCallId {
                row,
                call_id: record.call_id.clone(),
            });
        }
        if record.hour > 23 {
            return Err(LoadError::InvalidHour {
                row,
                value: record.hour.to_string(),
            });
        }
        for measure in [
            Measure::SatisfactionRating,
            Measure::SpeedOfAnswer,
            Measure::AvgTalkDuration,
        ] {
            if let Some(value) = record.measure(measure) {
                if !value.is_finite() || (measure.is_duration() && value < 0.0) {
                    return Err(LoadError::InvalidNumber {
                        row,
                        column: measure.column(),
                        value: value.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn dimension_slot(dimension: Dimension) -> usize {
    match dimension {
        Dimension::Agent => 0,
        Dimension::Department => 1,
        Dimension::Answered => 2,
        Dimension::Resolved => 3,
    }
}

fn first_seen_values(records: &[Record], dimension: Dimension) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|record| record.category(dimension))
        .filter(|value| seen.insert(*value))
        .map(str::to_string)
        .collect()
}

struct ColumnIndex {
    call_id: usize,
    categories: [usize; 4],
    rating: usize,
    speed: usize,
    talk: usize,
    date: usize,
    hour: usize,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            call_id: find(CALL_ID)?,
            categories: [
                find(Dimension::Agent.column())?,
                find(Dimension::Department.column())?,
                find(Dimension::Answered.column())?,
                find(Dimension::Resolved.column())?,
            ],
            rating: find(Measure::SatisfactionRating.column())?,
            speed: find(Measure::SpeedOfAnswer.column())?,
            talk: find(Measure::AvgTalkDuration.column())?,
            date: find(DATE)?,
            hour: find(HOUR)?,
        })
    }

    fn parse_row(&self, row: &csv::StringRecord, index: usize) -> Result<Record, LoadError> {
        let cell = |position: usize| row.get(position).map(str::trim).unwrap_or("");
        let category = |dimension: Dimension| {
            let value = cell(self.categories[dimension_slot(dimension)]);
            (!value.is_empty()).then(|| value.to_string())
        };
        let number = |position: usize, measure: Measure| parse_number(cell(position), measure, index);

        Ok(Record {
            call_id: cell(self.call_id).to_string(),
            agent: category(Dimension::Agent),
            department: category(Dimension::Department),
            answered: category(Dimension::Answered),
            resolved: category(Dimension::Resolved),
            satisfaction_rating: number(self.rating, Measure::SatisfactionRating)?,
            speed_of_answer: number(self.speed, Measure::SpeedOfAnswer)?,
            avg_talk_duration: number(self.talk, Measure::AvgTalkDuration)?,
            date: parse_date(cell(self.date)).ok_or_else(|| LoadError::InvalidDate {
                row: index,
                value: cell(self.date).to_string(),
            })?,
            hour: parse_hour(cell(self.hour)).ok_or_else(|| LoadError::InvalidHour {
                row: index,
                value: cell(self.hour).to_string(),
            })?,
        })
    }
}

fn is_null(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("null")
}

fn parse_number(value: &str, measure: Measure, row: usize) -> Result<Option<f64>, LoadError> {
    if is_null(value) {
        return Ok(None);
    }
    let invalid = || LoadError::InvalidNumber {
        row,
        column: measure.column(),
        value: value.to_string(),
    };
    let parsed = match value.parse::<f64>() {
        Ok(parsed) => parsed,
        Err(_) if measure.is_duration() => parse_clock_seconds(value).ok_or_else(invalid)?,
        Err(_) => return Err(invalid()),
    };
    if !parsed.is_finite() || (measure.is_duration() && parsed < 0.0) {
        return Err(invalid());
    }
    Ok(Some(parsed))
}

/// Spreadsheet exports sometimes carry durations as `H:MM:SS`.
fn parse_clock_seconds(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let seconds: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes > 59 || seconds > 59 {
        return None;
    }
    let total = hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)?;
    Some(f64::from(total))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(value, "%m/%d/%Y"))
        .ok()
}

fn parse_hour(value: &str) -> Option<u8> {
    let hour: f64 = value.parse().ok()?;
    if hour.fract() != 0.0 || !(0.0..=23.0).contains(&hour) {
        return None;
    }
    Some(hour as u8)
}
