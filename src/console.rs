use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, warn};

use crate::models::Dimension;
use crate::report;
use crate::session::Session;
use crate::store::{parse_date, RecordStore};

const HELP: &str = "\
commands:
  agent|department|answered|resolved <v1,v2,...|all>   select values (empty clears)
  rating <low> <high>                                   inclusive rating range
  date <YYYY-MM-DD> <YYYY-MM-DD>                        inclusive date range
  reset                                                 select everything again
  show                                                  current filters and metrics
  json                                                  dashboard payload as JSON
  options                                               selectable values
  reload                                                reread the data source
  quit";

#[derive(Debug, PartialEq)]
enum Command {
    Select(Dimension, Option<Vec<String>>),
    Rating(f64, f64),
    Date(chrono::NaiveDate, chrono::NaiveDate),
    Reset,
    Show,
    Json,
    Options,
    Reload,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::Show);
    };
    let rest: Vec<&str> = words.collect();

    if let Some(dimension) = Dimension::parse(head) {
        let joined = rest.join(" ");
        if joined.eq_ignore_ascii_case("all") {
            return Ok(Command::Select(dimension, None));
        }
        let values = joined
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect();
        return Ok(Command::Select(dimension, Some(values)));
    }

    match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("rating", [low, high]) => {
            let low = low.parse().map_err(|_| format!("invalid rating `{low}`"))?;
            let high = high.parse().map_err(|_| format!("invalid rating `{high}`"))?;
            Ok(Command::Rating(low, high))
        }
        ("date", [low, high]) => {
            let low = parse_date(low).ok_or_else(|| format!("invalid date `{low}`"))?;
            let high = parse_date(high).ok_or_else(|| format!("invalid date `{high}`"))?;
            Ok(Command::Date(low, high))
        }
        ("rating" | "date", _) => Err(format!("usage: {head} <low> <high>")),
        ("reset", []) => Ok(Command::Reset),
        ("show", []) => Ok(Command::Show),
        ("json", []) => Ok(Command::Json),
        ("options", []) => Ok(Command::Options),
        ("reload", []) => Ok(Command::Reload),
        ("help", []) => Ok(Command::Help),
        ("quit" | "exit", []) => Ok(Command::Quit),
        _ => Err(format!("unknown command `{}`", line.trim())),
    }
}

fn write_filters<W: Write>(session: &Session, output: &mut W) -> anyhow::Result<()> {
    let filter = session.filter();
    for dimension in Dimension::ALL {
        let selected: Vec<&str> = filter.selected(dimension).iter().map(String::as_str).collect();
        writeln!(output, "{dimension}: [{}]", selected.join(", "))?;
    }
    if let Some(bounds) = filter.rating {
        writeln!(output, "Rating: {} - {}", bounds.low, bounds.high)?;
    }
    if let Some(bounds) = filter.date {
        writeln!(output, "Date: {} - {}", bounds.low, bounds.high)?;
    }
    Ok(())
}

fn write_options<W: Write>(session: &Session, output: &mut W) -> anyhow::Result<()> {
    let store = session.store();
    for dimension in Dimension::ALL {
        writeln!(output, "{dimension}: {}", store.distinct_values(dimension).join(", "))?;
    }
    let steps: Vec<String> = store.rating_steps().iter().map(f64::to_string).collect();
    writeln!(output, "Rating: {}", steps.join(", "))?;
    if let Some(bounds) = store.date_range() {
        writeln!(output, "Date: {} - {}", bounds.low, bounds.high)?;
    }
    Ok(())
}

/// Drives `session` from line commands until `quit` or end of input.
///
/// Every filter change is followed by a full recomputation. `reload` is
/// called for the `reload` command; a failed reload keeps the current store.
pub fn run<R, W, F>(session: &mut Session, input: R, mut output: W, mut reload: F) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
    F: FnMut() -> anyhow::Result<Arc<RecordStore>>,
{
    write!(output, "{}", report::headline(&session.snapshot()))?;

    for line in input.lines() {
        let line = line.context("failed to read console input")?;
        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                warn!(session = %session.id(), %message, "rejected console command");
                writeln!(output, "error: {message}")?;
                continue;
            }
        };
        debug!(session = %session.id(), ?command, "console command");

        match command {
            Command::Select(dimension, Some(values)) => session.select(dimension, values),
            Command::Select(dimension, None) => session.select_all(dimension),
            Command::Rating(low, high) => session.set_rating_range(low, high),
            Command::Date(low, high) => session.set_date_range(low, high),
            Command::Reset => session.reset(),
            Command::Reload => match reload() {
                Ok(store) => session.rebind(store),
                Err(err) => {
                    warn!(session = %session.id(), error = %err, "reload failed");
                    writeln!(output, "error: {err:#}")?;
                    continue;
                }
            },
            Command::Show => {
                write_filters(session, &mut output)?;
                write!(output, "{}", report::headline(&session.snapshot()))?;
                continue;
            }
            Command::Json => {
                serde_json::to_writer_pretty(&mut output, &session.snapshot())?;
                writeln!(output)?;
                continue;
            }
            Command::Options => {
                write_options(session, &mut output)?;
                continue;
            }
            Command::Help => {
                writeln!(output, "{HELP}")?;
                continue;
            }
            Command::Quit => break,
        }

        write!(output, "{}", report::headline(&session.snapshot()))?;
    }

    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{record, scenario_store};

    fn drive(script: &str) -> String {
        let mut session = Session::new(Arc::new(scenario_store()));
        let mut output = Vec::new();
        let grown = || -> anyhow::Result<Arc<RecordStore>> {
            let mut records = scenario_store().records().to_vec();
            records.push(record("3", "C", "Z", Some(4.0), (2024, 1, 3), 11));
            Ok(Arc::new(RecordStore::from_records(records)?))
        };
        run(&mut session, script.as_bytes(), &mut output, grown).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn parses_selection_commands() {
        assert_eq!(
            parse_command("agent A, B"),
            Ok(Command::Select(Dimension::Agent, Some(vec!["A".into(), "B".into()])))
        );
        assert_eq!(parse_command("Resolved"), Ok(Command::Select(Dimension::Resolved, Some(vec![]))));
        assert_eq!(parse_command("department all"), Ok(Command::Select(Dimension::Department, None)));
        assert_eq!(parse_command("rating 5 2"), Ok(Command::Rating(5.0, 2.0)));
        assert!(parse_command("rating 5").is_err());
        assert!(parse_command("explode").is_err());
    }

    #[test]
    fn each_change_recomputes() {
        let output = drive("agent A\nagent\nreset\n");
        let totals: Vec<&str> = output.lines().filter(|line| line.starts_with("Total Calls")).collect();
        assert_eq!(totals, ["Total Calls: 2", "Total Calls: 1", "Total Calls: 0", "Total Calls: 2"]);
        assert!(output.contains("Average Satisfaction Rating: no data"));
    }

    #[test]
    fn bad_commands_do_not_stop_the_session() {
        let output = drive("rating high low\ndate 2024-01-02 2024-01-02\nquit\nagent A\n");
        assert!(output.contains("error: invalid rating `high`"));
        assert!(output.contains("Total Calls: 1"));
        assert!(!output.lines().any(|line| line == "Total Calls: 0"));
    }

    #[test]
    fn reload_rebinds_and_resets_filters() {
        let output = drive("agent A\nreload\noptions\n");
        let totals: Vec<&str> = output.lines().filter(|line| line.starts_with("Total Calls")).collect();
        assert_eq!(totals, ["Total Calls: 2", "Total Calls: 1", "Total Calls: 3"]);
        assert!(output.contains("Agent: A, B, C"));
    }

    #[test]
    fn failed_reload_keeps_the_session() {
        let mut session = Session::new(Arc::new(scenario_store()));
        let mut output = Vec::new();
        let broken = || -> anyhow::Result<Arc<RecordStore>> { anyhow::bail!("source unavailable") };
        run(&mut session, "reload\nshow\n".as_bytes(), &mut output, broken).unwrap();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("error: source unavailable"));
        assert_eq!(session.store().len(), 2);
    }

    #[test]
    fn json_and_options_are_printed() {
        let output = drive("json\noptions\n");
        assert!(output.contains("\"total_calls\": 2"));
        assert!(output.contains("Agent: A, B"));
        assert!(output.contains("Rating: 3, 5"));
    }
}
