use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::filter::FilterState;
use crate::models::{Bounds, Dimension, Record};

#[derive(Debug, Clone)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone)]
enum Clause {
    /// Empty `allowed` matches nothing. An absent value matches nothing.
    Member {
        dimension: Dimension,
        allowed: BTreeSet<String>,
    },
    /// A null rating fails the bound comparison.
    Rating(Bounds<f64>),
    Date(Bounds<NaiveDate>),
}

impl Clause {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Clause::Member { dimension, allowed } => record
                .category(*dimension)
                .is_some_and(|value| allowed.contains(value)),
            Clause::Rating(bounds) => record
                .satisfaction_rating
                .is_some_and(|rating| bounds.contains(rating)),
            Clause::Date(bounds) => bounds.contains(record.date),
        }
    }
}

pub fn compile(filter: &FilterState) -> Predicate {
    let mut clauses: Vec<Clause> = Dimension::ALL
        .into_iter()
        .map(|dimension| Clause::Member {
            dimension,
            allowed: filter.selected(dimension).clone(),
        })
        .collect();

    if let Some(bounds) = filter.rating {
        clauses.push(Clause::Rating(bounds));
    }
    if let Some(bounds) = filter.date {
        clauses.push(Clause::Date(bounds));
    }

    Predicate { clauses }
}

impl Predicate {
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|clause| clause.matches(record))
    }
}
