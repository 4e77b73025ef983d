use std::collections::BTreeMap;
use std::fmt::Write;

use crate::dashboard::AggregateResult;
use crate::filter::FilterState;
use crate::models::Dimension;

const NO_DATA: &str = "no data";

pub fn format_number(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::new();
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

/// One star per rating point, rounded half-to-even.
pub fn rating_stars(rating: f64) -> String {
    let stars = rating.round_ties_even().max(0.0) as usize;
    "⭐".repeat(stars)
}

pub fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(rating) => format!("{} {}", format_number(rating), rating_stars(rating))
            .trim_end()
            .to_string(),
        None => NO_DATA.to_string(),
    }
}

pub fn format_seconds(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{} seconds", format_number(value)),
        None => NO_DATA.to_string(),
    }
}

pub fn headline(result: &AggregateResult) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Total Calls: {}", result.total_calls);
    let _ = writeln!(
        output,
        "Average Satisfaction Rating: {}",
        format_rating(result.mean_satisfaction_rating)
    );
    let _ = writeln!(
        output,
        "Average Speed of Answer: {}",
        format_seconds(result.mean_speed_of_answer)
    );
    let _ = writeln!(
        output,
        "Average Talk Duration: {}",
        format_seconds(result.mean_talk_duration)
    );
    output
}

pub fn build_report(result: &AggregateResult, filter: &FilterState) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Call Center Dashboard");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    for line in headline(result).lines() {
        let _ = writeln!(output, "- {line}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Filters");
    for dimension in Dimension::ALL {
        let selected = filter.selected(dimension);
        let label = if selected.is_empty() {
            "(none)".to_string()
        } else {
            selected.iter().cloned().collect::<Vec<_>>().join(", ")
        };
        let _ = writeln!(output, "- {dimension}: {label}");
    }
    match filter.rating {
        Some(bounds) => {
            let _ = writeln!(output, "- Rating: {} to {}", bounds.low, bounds.high);
        }
        None => {
            let _ = writeln!(output, "- Rating: any");
        }
    }
    match filter.date {
        Some(bounds) => {
            let _ = writeln!(output, "- Date: {} to {}", bounds.low, bounds.high);
        }
        None => {
            let _ = writeln!(output, "- Date: any");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Total Calls by Date");
    if result.calls_by_date.is_empty() {
        let _ = writeln!(output, "No calls match the current filters.");
    } else {
        for entry in &result.calls_by_date {
            let _ = writeln!(output, "- {}: {}", entry.key, entry.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Total Calls by Hour");
    if result.calls_by_hour.is_empty() {
        let _ = writeln!(output, "No calls match the current filters.");
    } else {
        for entry in &result.calls_by_hour {
            let _ = writeln!(output, "- {}: {}", entry.key, entry.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Total Calls by Agent and Department");
    if result.calls_by_agent_department.is_empty() {
        let _ = writeln!(output, "No calls match the current filters.");
    } else {
        let _ = writeln!(output, "| Agent | Department | Calls |");
        let _ = writeln!(output, "|---|---|---|");
        for row in &result.calls_by_agent_department {
            let _ = writeln!(output, "| {} | {} | {} |", row.a, row.b, row.count);
        }
    }

    let plotted = result
        .speed_vs_talk_duration
        .iter()
        .filter(|point| point.x.is_some() && point.y.is_some())
        .count();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Speed of Answer and Talk Duration");
    let _ = writeln!(
        output,
        "{} calls, {} with both measurements.",
        result.speed_vs_talk_duration.len(),
        plotted
    );
    let mut by_resolved: BTreeMap<&str, usize> = BTreeMap::new();
    for point in &result.speed_vs_talk_duration {
        *by_resolved.entry(point.color.as_deref().unwrap_or("(blank)")).or_default() += 1;
    }
    for (resolved, count) in by_resolved {
        let _ = writeln!(output, "- {resolved}: {count}");
    }

    output
}
