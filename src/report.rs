use anyhow::{Context, Result};
use colored::*;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::aggregate::Aggregate;
use crate::matcher::WalkError;
use crate::models::{AggregateStatus, MatchResult};

pub fn print_error_entry(e: &WalkError) {
    eprintln!(
        "[{}] {} ({})",
        "ERROR".red().on_white(),
        e.path.display(),
        e.error
    );
}

pub struct SummaryData {
    pub pairs: usize,
    pub identical: usize,
    pub different: usize,
    pub errors: usize,
    pub only_in_a: usize,
    pub only_in_b: usize,
    pub mismatched: usize,
    pub walk_errors: usize,
    pub workers: usize,
    pub status: AggregateStatus,
    pub elapsed: Duration,
}

impl SummaryData {
    pub fn new(
        notices: &[MatchResult],
        walk_errors: usize,
        agg: &Aggregate,
        pairs: usize,
        workers: usize,
        status: AggregateStatus,
        elapsed: Duration,
    ) -> Self {
        let counts = agg.counts();
        let count = |f: fn(&MatchResult) -> bool| notices.iter().filter(|n| f(n)).count();
        SummaryData {
            pairs,
            identical: counts.identical,
            different: counts.different,
            errors: counts.errors,
            only_in_a: count(|n| matches!(n, MatchResult::OnlyInA { .. })),
            only_in_b: count(|n| matches!(n, MatchResult::OnlyInB { .. })),
            mismatched: count(|n| matches!(n, MatchResult::TypeMismatch { .. })),
            walk_errors,
            workers,
            status,
            elapsed,
        }
    }
}

/// Notices in walk order, then every pair's block in pair order.
pub fn generate_text_report(notices: &[MatchResult], agg: &Aggregate) -> String {
    let mut output = String::new();
    for notice in notices {
        output.push_str(&notice.to_string());
        output.push('\n');
    }
    output.push_str(&agg.diff_text());
    output
}

#[derive(Serialize)]
struct JsonPair<'a> {
    file: &'a Path,
    path_a: &'a Path,
    path_b: &'a Path,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonNotice<'a> {
    message: String,
    detail: &'a MatchResult,
}

pub fn generate_json_report(
    notices: &[MatchResult],
    walk_errors: &[WalkError],
    agg: &Aggregate,
    summary: &SummaryData,
) -> Result<String> {
    let results: Vec<JsonPair> = agg
        .reports
        .iter()
        .map(|r| JsonPair {
            file: &r.pair.rel_path,
            path_a: &r.pair.path_a,
            path_b: &r.pair.path_b,
            status: r.outcome.label(),
            output: r.outcome.report_text(),
        })
        .collect();

    let notices: Vec<JsonNotice> = notices
        .iter()
        .map(|n| JsonNotice {
            message: n.to_string(),
            detail: n,
        })
        .collect();

    let json_summary = serde_json::json!({
        "pairs": summary.pairs,
        "identical": summary.identical,
        "different": summary.different,
        "errors": summary.errors,
        "only_in_first": summary.only_in_a,
        "only_in_second": summary.only_in_b,
        "type_mismatches": summary.mismatched,
        "walk_errors": summary.walk_errors,
        "status": summary.status,
        "exit_code": summary.status.code(),
    });

    let output = serde_json::json!({
        "summary": json_summary,
        "notices": notices,
        "walk_errors": walk_errors,
        "results": results,
    });

    let mut text = serde_json::to_string_pretty(&output)?;
    text.push('\n');
    Ok(text)
}

pub fn generate_summary_text(data: &SummaryData) -> Vec<String> {
    let status_str = format!("{:?} ({})", data.status, data.status.code());
    let elapsed_str = format!("{:.2?}", data.elapsed);

    let content_width = 47;
    let mut output = Vec::new();

    output.push(format!("{}{}{}", "╔".bright_blue(), "═".repeat(content_width).bright_blue(), "╗".bright_blue()));

    let title = "Summary";
    let padding_total = content_width.saturating_sub(title.len());
    let padding_start = padding_total / 2;
    let padding_end = padding_total - padding_start;
    output.push(format!("{}{}{}{}{}",
        "║".bright_blue(),
        " ".repeat(padding_start),
        title.bold().bright_yellow(),
        " ".repeat(padding_end),
        "║".bright_blue()
    ));

    output.push(format!("{}{}{}", "╠".bright_blue(), "═".repeat(content_width).bright_blue(), "╣".bright_blue()));

    let add_line = |vec: &mut Vec<String>, label: &str, value: &str, value_color: Color| {
        let colored_line = format!("  {} : {}",
            format!("{:<22}", label).bold().color(Color::Cyan),
            value.bold().color(value_color)
        );
        let uncolored_len = 2 + 22 + 3 + value.chars().count();
        let padding = " ".repeat(content_width.saturating_sub(uncolored_len));
        vec.push(format!("{}{}{}{}", "║".bright_blue(), colored_line, padding, "║".bright_blue()));
    };

    add_line(&mut output, "Workers", &data.workers.to_string(), Color::Magenta);
    add_line(&mut output, "Pairs compared", &data.pairs.to_string(), Color::Blue);
    add_line(&mut output, "Identical", &data.identical.to_string(), Color::Green);
    add_line(&mut output, "Different", &data.different.to_string(), Color::Red);
    add_line(&mut output, "Only in first", &data.only_in_a.to_string(), Color::Blue);
    add_line(&mut output, "Only in second", &data.only_in_b.to_string(), Color::Blue);
    if data.mismatched > 0 {
        add_line(&mut output, "Type mismatches", &data.mismatched.to_string(), Color::Yellow);
    }
    if data.errors > 0 || data.walk_errors > 0 {
        add_line(&mut output, "Errors", &(data.errors + data.walk_errors).to_string(), Color::Red);
    }
    add_line(&mut output, "Status", &status_str, Color::Magenta);
    add_line(&mut output, "Time taken", &elapsed_str, Color::Yellow);

    output.push(format!("{}{}{}", "╚".bright_blue(), "═".repeat(content_width).bright_blue(), "╝".bright_blue()));

    output
}

/// Where the report goes. Opened before any comparison runs so that a bad
/// destination fails early.
pub enum ReportSink {
    Stdout,
    File { path: PathBuf, file: File },
}

impl ReportSink {
    pub fn open(destination: Option<&PathBuf>) -> Result<Self> {
        match destination {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("cannot create output file {}", path.display()))?;
                Ok(ReportSink::File {
                    path: path.clone(),
                    file,
                })
            }
            None => Ok(ReportSink::Stdout),
        }
    }

    /// Writes the whole report in one go.
    pub fn write_report(self, output: &str) -> Result<()> {
        match self {
            ReportSink::File { path, mut file } => {
                file.write_all(output.as_bytes())
                    .and_then(|_| file.flush())
                    .with_context(|| format!("cannot write output file {}", path.display()))?;
            }
            ReportSink::Stdout => write_to_pipe(&mut io::stdout().lock(), output)?,
        }
        Ok(())
    }
}

/// A reader that went away early (`pardiff ... | head`) is not an error.
pub fn write_to_pipe<W: Write>(out: &mut W, output: &str) -> io::Result<()> {
    match out.write_all(output.as_bytes()).and_then(|_| out.flush()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("stdout closed before the report was fully written");
            Ok(())
        }
        other => other,
    }
}
