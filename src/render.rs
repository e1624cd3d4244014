//! Terminal rendering for calprompt-core types.
//!
//! Extension traits that add colored output using owo_colors. Times are
//! shown in the civil zone; the store only ever sees UTC.

use calprompt_core::diff::{Applied, DiffKind, DiffOperation, Rejection};
use calprompt_core::session::{BatchReport, Preview};
use calprompt_core::timezone::TimeZoneNormalizer;
use calprompt_core::CalendarEvent;
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for DiffKind {
    fn render(&self) -> String {
        let symbol = self.symbol();
        match self {
            DiffKind::Add => symbol.green().to_string(),
            DiffKind::Update => symbol.yellow().to_string(),
            DiffKind::Delete => symbol.red().to_string(),
        }
    }
}

impl Render for Rejection {
    fn render(&self) -> String {
        let action = self.kind.map(|k| k.action()).unwrap_or("?");
        format!(
            "{} #{} {}: {} {}",
            "✗".red(),
            self.index,
            action,
            self.reason,
            format!("({})", self.reason.rule()).dimmed()
        )
    }
}

fn colorize_diff(kind: DiffKind, text: &str) -> String {
    match kind {
        DiffKind::Add => text.green().to_string(),
        DiffKind::Update => text.yellow().to_string(),
        DiffKind::Delete => text.red().to_string(),
    }
}

/// "Sat Jul 5 13:00-14:00", in the civil zone.
pub fn render_span(event: &CalendarEvent, tz: &TimeZoneNormalizer) -> String {
    let start = tz.to_civil_zone(event.fields.start);
    let end = tz.to_civil_zone(event.fields.end);

    if start.date_naive() == end.date_naive() {
        format!("{}{}", start.format("%a %b %-d %H:%M"), end.format("-%H:%M"))
    } else {
        format!(
            "{} -> {}",
            start.format("%a %b %-d %H:%M"),
            end.format("%a %b %-d %H:%M")
        )
    }
}

pub fn render_event(event: &CalendarEvent, tz: &TimeZoneNormalizer) -> String {
    let fields = &event.fields;
    let tag = format!("[{}, {}]", fields.event_type, fields.priority);
    let mut line = format!(
        "{} {} {}",
        render_span(event, tz),
        fields.title.bold(),
        tag.dimmed()
    );
    if let Some(location) = &fields.location {
        line.push_str(&format!(" @ {location}"));
    }
    line.push_str(&format!(" {}", event.id.as_str().dimmed()));
    line
}

fn render_applied(applied: &Applied, tz: &TimeZoneNormalizer) -> String {
    match &applied.event {
        Some(event) => format!(
            "{} {} {}",
            applied.kind.render(),
            colorize_diff(applied.kind, &event.fields.title),
            render_span(event, tz).dimmed()
        ),
        None => format!(
            "{} {}",
            applied.kind.render(),
            "(already gone)".dimmed()
        ),
    }
}

fn render_operation(operation: &DiffOperation, tz: &TimeZoneNormalizer) -> String {
    let kind = operation.kind();
    match operation {
        DiffOperation::Add(fields) | DiffOperation::Update { fields, .. } => {
            let event = CalendarEvent::new(
                operation.id().cloned().unwrap_or_else(|| "new".into()),
                fields.clone(),
            );
            format!(
                "{} {} {}",
                kind.render(),
                colorize_diff(kind, &fields.title),
                render_span(&event, tz).dimmed()
            )
        }
        DiffOperation::Delete { id } => {
            format!("{} {}", kind.render(), colorize_diff(kind, id.as_str()))
        }
    }
}

pub fn render_report(report: &BatchReport, tz: &TimeZoneNormalizer) -> Vec<String> {
    let mut lines = Vec::new();

    for applied in &report.applied {
        lines.push(format!("   {}", render_applied(applied, tz)));
    }
    for rejection in report.rejections() {
        lines.push(format!("   {}", rejection.render()));
    }

    lines.push(report.summary().bold().to_string());
    lines
}

pub fn render_preview(preview: &Preview, tz: &TimeZoneNormalizer) -> Vec<String> {
    let mut lines = Vec::new();

    for item in &preview.accepted {
        lines.push(format!("   {}", render_operation(&item.operation, tz)));
    }
    for rejection in &preview.rejected {
        lines.push(format!("   {}", rejection.render()));
    }

    let summary = format!(
        "{} would apply, {} rejected (dry run)",
        preview.accepted.len(),
        preview.rejected.len()
    );
    lines.push(summary.bold().to_string());
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use calprompt_core::{EventFields, EventId};
    use chrono::{TimeZone, Utc};

    fn event(start_hour: u32, end_day: u32, end_hour: u32) -> CalendarEvent {
        CalendarEvent::new(
            EventId::from("1"),
            EventFields::new(
                "Swim",
                Utc.with_ymd_and_hms(2025, 7, 5, start_hour, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 7, end_day, end_hour, 0, 0).unwrap(),
            ),
        )
    }

    #[test]
    fn span_is_shown_in_civil_time() {
        let tz = TimeZoneNormalizer::default();
        assert_eq!(render_span(&event(17, 5, 18), &tz), "Sat Jul 5 13:00-14:00");
    }

    #[test]
    fn span_across_midnight_shows_both_days() {
        let tz = TimeZoneNormalizer::default();
        assert_eq!(
            render_span(&event(23, 6, 5), &tz),
            "Sat Jul 5 19:00 -> Sun Jul 6 01:00"
        );
    }
}
