use std::{borrow::Cow, fmt::Write as _};

use crate::{
    data::{Cell, cell_from_json, display_cell},
    pair::{PairVerdict, Sample},
};

/// Renders `rows` under `headers` as left-aligned columns separated by two
/// spaces, with a dashed rule under the header. Cells past the header count
/// are dropped.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| display_width(cell))
                .fold(display_width(header), usize::max)
                .max(1)
        })
        .collect::<Vec<_>>();
    let rule_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<_>>();
    let rule = rule_widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(headers, &widths));
    let _ = writeln!(output, "{}", format_line(&rule, &rule_widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_line(row, &widths));
    }
    output
}

/// Renders raw sample rows, labelling columns from the sample's schema when
/// it has one and by position otherwise.
pub fn render_sample(sample: &Sample, limit: usize) -> String {
    let rows = sample
        .head(limit)
        .iter()
        .map(|row| row.iter().map(cell_from_json).collect::<Vec<Cell>>())
        .collect::<Vec<_>>();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let headers: Vec<String> = match &sample.schema {
        Some(schema) if !schema.columns.is_empty() => schema
            .columns
            .iter()
            .map(|column| column.name.clone())
            .collect(),
        _ => (0..width).map(|idx| idx.to_string()).collect(),
    };
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(display_cell).collect())
        .collect();
    render_table(&headers, &rendered)
}

/// Summarises a verdict and, for a pair that did not match, prints the
/// leading rows of both raw records.
pub fn render_verdict(
    verdict: &PairVerdict,
    gold: &serde_json::Value,
    candidate: &serde_json::Value,
    limit: usize,
) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "category: {}", verdict.category);
    if let Some(status) = verdict.shape_status {
        let _ = writeln!(output, "shape: {status}");
    }
    if let Some(details) = verdict.details {
        let _ = writeln!(output, "details: {details}");
    }
    if let Some(reason) = &verdict.reason {
        let _ = writeln!(output, "reason: {reason}");
    }
    if verdict.matches || limit == 0 {
        return output;
    }
    for (label, record) in [("gold", gold), ("candidate", candidate)] {
        let _ = writeln!(output, "\n{label}:");
        match Sample::decode(record) {
            Ok(sample) if sample.head(limit).is_empty() => {
                let _ = writeln!(output, "(no rows)");
            }
            Ok(sample) => output.push_str(&render_sample(&sample, limit)),
            Err(_) => {
                let _ = writeln!(output, "(not a valid sample)");
            }
        }
    }
    output
}

fn format_line(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let text = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&text));
            format!("{text}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.truncate(line.trim_end_matches(' ').len());
    line
}

/// Character count, skipping ANSI colour sequences.
fn display_width(value: &str) -> usize {
    let mut width = 0;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            let _ = chars.by_ref().find(|next| *next == 'm');
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
