use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::dashboard::{self, AggregateResult};
use crate::filter::{FilterOverrides, FilterState};
use crate::models::Dimension;
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    store: Arc<RecordStore>,
    filter: FilterState,
}

impl Session {
    pub fn new(store: Arc<RecordStore>) -> Self {
        let filter = FilterState::reset(&store);
        let id = Uuid::new_v4();
        debug!(session = %id, "session opened");
        Self { id, store, filter }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Points the session at a reloaded store. The option universe may have
    /// changed, so the filter starts over.
    pub fn rebind(&mut self, store: Arc<RecordStore>) {
        self.store = store;
        self.filter = FilterState::reset(&self.store);
        debug!(session = %self.id, rows = self.store.len(), "session rebound");
    }

    pub fn reset(&mut self) {
        self.filter = FilterState::reset(&self.store);
    }

    pub fn select<I, S>(&mut self, dimension: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.select(dimension, values);
    }

    pub fn select_all(&mut self, dimension: Dimension) {
        let values = self.store.distinct_values(dimension).to_vec();
        self.filter.select(dimension, values);
    }

    pub fn set_rating_range(&mut self, a: f64, b: f64) {
        self.filter.set_rating_range(a, b);
    }

    pub fn set_date_range(&mut self, a: NaiveDate, b: NaiveDate) {
        self.filter.set_date_range(a, b);
    }

    pub fn apply(&mut self, overrides: &FilterOverrides) {
        overrides.apply(&mut self.filter);
    }

    pub fn snapshot(&self) -> AggregateResult {
        dashboard::compute(&self.store, &self.filter)
    }
}

/// Process-wide dataset shared read-only by every session.
///
/// Populated once on first access and replaced only by an explicit reload.
pub mod cache {
    use std::sync::{Arc, PoisonError, RwLock};

    use tracing::info;

    use crate::config::DataSource;
    use crate::store::RecordStore;

    static DATASET: RwLock<Option<Arc<RecordStore>>> = RwLock::new(None);

    pub fn current() -> Option<Arc<RecordStore>> {
        DATASET
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Installs `store` unless another caller got there first; returns the winner.
    pub fn install(store: RecordStore) -> Arc<RecordStore> {
        let mut slot = DATASET.write().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| Arc::new(store)).clone()
    }

    pub async fn get_or_load(source: &DataSource) -> anyhow::Result<Arc<RecordStore>> {
        if let Some(store) = current() {
            return Ok(store);
        }
        let store = source.load().await?;
        info!(rows = store.len(), "dataset cached");
        Ok(install(store))
    }

    /// Loads `source` again and swaps it in. Sessions keep the store they hold.
    pub async fn reload(source: &DataSource) -> anyhow::Result<Arc<RecordStore>> {
        let store = Arc::new(source.load().await?);
        *DATASET.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&store));
        info!(rows = store.len(), "dataset reloaded");
        Ok(store)
    }

    /// Drops the cached dataset; the next `get_or_load` reads the source again.
    pub fn clear() {
        *DATASET.write().unwrap_or_else(PoisonError::into_inner) = None;
        info!("dataset cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSource;
    use crate::store::tests::{scenario_store, HEADER};
    use std::io::Write as _;

    #[test]
    fn sessions_are_independent() {
        let store = Arc::new(scenario_store());
        let mut first = Session::new(Arc::clone(&store));
        let second = Session::new(Arc::clone(&store));
        assert_ne!(first.id(), second.id());

        first.select(Dimension::Agent, ["A"]);
        assert_eq!(first.snapshot().total_calls, 1);
        assert_eq!(second.snapshot().total_calls, 2);
    }

    #[test]
    fn reset_restores_full_selection() {
        let mut session = Session::new(Arc::new(scenario_store()));
        session.select(Dimension::Department, Vec::<String>::new());
        assert_eq!(session.snapshot().total_calls, 0);
        session.select_all(Dimension::Department);
        assert_eq!(session.snapshot().total_calls, 2);

        session.set_rating_range(5.0, 4.0);
        assert_eq!(session.snapshot().total_calls, 1);
        session.reset();
        assert_eq!(session.filter(), &FilterState::reset(session.store()));
    }

    // The cache is process-global, so its whole lifecycle lives in one test.
    #[tokio::test]
    async fn cache_loads_once_until_reload_or_clear() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(file, "1,A,X,Y,Y,4,10,60,2024-01-01,9").unwrap();
        file.flush().unwrap();
        let source = DataSource::Csv(file.path().to_path_buf());

        assert!(cache::current().is_none());

        let first = cache::get_or_load(&source).await.unwrap();
        let again = cache::get_or_load(&source).await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        let mut session = Session::new(Arc::clone(&first));

        writeln!(file, "2,B,X,Y,Y,5,10,60,2024-01-02,10").unwrap();
        file.flush().unwrap();
        let reloaded = cache::reload(&source).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &reloaded));
        assert_eq!(reloaded.len(), 2);
        assert_eq!(session.store().len(), 1);

        let missing = DataSource::Csv("/nonexistent/calls.csv".into());
        assert!(cache::reload(&missing).await.is_err());
        assert_eq!(cache::current().map(|store| store.len()), Some(2));

        session.select(Dimension::Agent, ["A"]);
        session.rebind(Arc::clone(&reloaded));
        assert_eq!(session.snapshot().total_calls, 2);

        cache::clear();
        assert!(cache::current().is_none());
        assert_eq!(session.store().len(), 2);
        let fresh = cache::get_or_load(&source).await.unwrap();
        assert!(!Arc::ptr_eq(&reloaded, &fresh));
        assert_eq!(fresh.len(), 2);
        assert!(cache::current().is_some_and(|store| Arc::ptr_eq(&store, &fresh)));
    }
}
