use crate::models::Record;
use crate::predicate::Predicate;
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView<'a> {
    rows: Vec<&'a Record>,
}

pub fn apply<'a>(store: &'a RecordStore, predicate: &Predicate) -> FilteredView<'a> {
    FilteredView {
        rows: store
            .records()
            .iter()
            .filter(|record| predicate.matches(record))
            .collect(),
    }
}

impl<'a> FilteredView<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.rows.iter().copied()
    }
}
