use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgGroup, Args};

use crate::db;
use crate::filter::FilterOverrides;
use crate::store::RecordStore;

/// Where the dataset comes from.
#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("source")
        .args(["csv", "table"])
        .required(true)
        .multiple(false)
))]
pub struct SourceArgs {
    /// CSV export of the call-center spreadsheet
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// Postgres table holding the call records (reads DATABASE_URL)
    #[arg(long)]
    pub table: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Csv(PathBuf),
    Postgres { database_url: String, table: String },
}

impl DataSource {
    pub fn from_args(args: &SourceArgs) -> anyhow::Result<Self> {
        match (&args.csv, &args.table) {
            (Some(path), _) => Ok(DataSource::Csv(path.clone())),
            (None, Some(table)) => {
                let database_url = std::env::var("DATABASE_URL")
                    .context("DATABASE_URL must be set to read call records from Postgres")?;
                Ok(DataSource::Postgres {
                    database_url,
                    table: table.clone(),
                })
            }
            (None, None) => anyhow::bail!("either --csv or --table is required"),
        }
    }

    pub async fn load(&self) -> anyhow::Result<RecordStore> {
        match self {
            DataSource::Csv(path) => RecordStore::from_csv_path(path)
                .with_context(|| format!("failed to load {}", path.display())),
            DataSource::Postgres {
                database_url,
                table,
            } => {
                let pool = db::connect(database_url).await?;
                let records = db::fetch_records(&pool, table)
                    .await
                    .with_context(|| format!("failed to load table {table}"))?;
                RecordStore::from_records(records)
                    .with_context(|| format!("invalid call records in table {table}"))
            }
        }
    }
}

/// Filter selection from a JSON file and/or flags. Flags win over the file.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// JSON file with any of: agent, department, answered, resolved,
    /// rating_min, rating_max, date_from, date_to
    #[arg(long)]
    pub filters: Option<PathBuf>,
    #[arg(long, value_delimiter = ',')]
    pub agent: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub department: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub answered: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub resolved: Vec<String>,
    #[arg(long)]
    pub rating_min: Option<f64>,
    #[arg(long)]
    pub rating_max: Option<f64>,
    #[arg(long)]
    pub date_from: Option<NaiveDate>,
    #[arg(long)]
    pub date_to: Option<NaiveDate>,
}

impl FilterArgs {
    pub fn overrides(&self) -> anyhow::Result<FilterOverrides> {
        let from_file = match &self.filters {
            Some(path) => read_filter_file(path)?,
            None => FilterOverrides::default(),
        };
        let non_empty = |values: &Vec<String>| (!values.is_empty()).then(|| values.clone());

        Ok(from_file.merge(FilterOverrides {
            agent: non_empty(&self.agent),
            department: non_empty(&self.department),
            answered: non_empty(&self.answered),
            resolved: non_empty(&self.resolved),
            rating_min: self.rating_min,
            rating_max: self.rating_max,
            date_from: self.date_from,
            date_to: self.date_to,
        }))
    }
}

pub fn read_filter_file(path: &Path) -> anyhow::Result<FilterOverrides> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read filter file {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("invalid filter file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn flags_override_filter_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"agent": ["Joe"], "department": [], "rating_min": 2}}"#).unwrap();

        let args = FilterArgs {
            filters: Some(file.path().to_path_buf()),
            agent: vec!["Ann".into(), "Dan".into()],
            rating_max: Some(4.0),
            ..Default::default()
        };
        let overrides = args.overrides().unwrap();

        assert_eq!(overrides.agent, Some(vec!["Ann".to_string(), "Dan".to_string()]));
        assert_eq!(overrides.department, Some(Vec::new()));
        assert_eq!(overrides.rating_min, Some(2.0));
        assert_eq!(overrides.rating_max, Some(4.0));
    }

    #[test]
    fn malformed_filter_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = read_filter_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid filter file"));
    }

    #[test]
    fn csv_source_needs_no_environment() {
        let args = SourceArgs {
            csv: Some(PathBuf::from("calls.csv")),
            table: None,
        };
        assert_eq!(
            DataSource::from_args(&args).unwrap(),
            DataSource::Csv(PathBuf::from("calls.csv"))
        );
    }
}
