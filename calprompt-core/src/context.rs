//! Builds the prompt handed to the generator.
//!
//! Output is a pure function of its inputs: events are rendered in a fixed
//! order and every timestamp uses a fixed format, so a stub generator keyed
//! on the prompt behaves the same on every run.

use std::fmt::Write as _;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use crate::error::CalPromptResult;
use crate::event::{CalendarEvent, Snapshot};
use crate::intent::{NormalizedIntent, weekday_name};
use crate::timezone::{TimeZoneNormalizer, format_civil, format_storage};
use crate::validate::{ClockRange, ScheduleRules, TimeWindow};

/// System instruction plus user context, ready for a chat-style model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
}

pub struct ContextAssembler<'a> {
    tz: TimeZoneNormalizer,
    rules: &'a ScheduleRules,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(tz: TimeZoneNormalizer, rules: &'a ScheduleRules) -> Self {
        ContextAssembler { tz, rules }
    }

    pub fn assemble(
        &self,
        text: &str,
        intent: &NormalizedIntent,
        snapshot: &Snapshot,
        now: DateTime<Utc>,
    ) -> CalPromptResult<GenerationRequest> {
        Ok(GenerationRequest {
            system: self.system_instruction(),
            user: self.user_context(text, intent, snapshot, now)?,
        })
    }

    fn system_instruction(&self) -> String {
        let zone = self.tz.civil_zone().name();
        let rules = self.rules;
        let days: Vec<_> = rules.business_days.iter().map(|d| weekday_name(*d)).collect();

        let mut out = String::new();
        out.push_str("You are a scheduling assistant that edits a calendar by emitting change operations.\n\n");
        out.push_str("Rules:\n");
        let _ = writeln!(
            out,
            "- Every timestamp is UTC in ISO 8601 form YYYY-MM-DDTHH:MM:SSZ. The user lives in {zone}; \
             words like \"morning\" or \"tomorrow\" refer to {zone}."
        );
        out.push_str("- Respond ONLY with a JSON array. No prose, no markdown, no code fences.\n");
        out.push_str("- Return [] when nothing should change.\n");
        out.push_str("- Never create overlapping events. An event may start exactly when another ends.\n");
        out.push_str("- Every start must be before its end.\n");
        out.push_str("- Spread repeated events over multiple days.\n");
        let _ = writeln!(
            out,
            "- Time-of-day windows ({zone}): morning {}, afternoon {}, evening {}.",
            window(&rules.morning),
            window(&rules.afternoon),
            window(&rules.evening)
        );
        let _ = writeln!(
            out,
            "- Personal events do not start during business hours ({}, {}, {zone}) unless the user asks for it.",
            range(&rules.business_hours),
            days.join(", ")
        );
        let _ = writeln!(
            out,
            "- Nothing starts between {} ({zone}) unless the user asks for it.",
            range(&rules.quiet_hours)
        );
        out.push_str("- If type or priority is unclear, use \"Personal\" and \"Normal\".\n\n");
        out.push_str("Operations:\n");
        out.push_str(
            "{\"action\":\"add\",\"title\":string,\"start\":timestamp,\"end\":timestamp,\
             \"type\":\"Work\"|\"Personal\"|\"Reminder\",\"priority\":\"Urgent\"|\"Normal\"}\n",
        );
        out.push_str(
            "{\"action\":\"update\",\"id\":string,\"title\":string,\"start\":timestamp,\"end\":timestamp,\
             \"type\":...,\"priority\":...} (all fields required)\n",
        );
        out.push_str("{\"action\":\"delete\",\"id\":string}\n");
        out
    }

    fn user_context(
        &self,
        text: &str,
        intent: &NormalizedIntent,
        snapshot: &Snapshot,
        now: DateTime<Utc>,
    ) -> CalPromptResult<String> {
        let civil_now = self.tz.to_civil_zone(now);
        let today = civil_now.date_naive();

        let mut out = String::new();
        let _ = writeln!(
            out,
            "Current time: {} ({} {})",
            format_storage(now),
            format_civil(civil_now),
            self.tz.civil_zone().name()
        );
        let _ = writeln!(
            out,
            "Today: {} ({})",
            today.format("%Y-%m-%d"),
            weekday_name(today.weekday())
        );

        out.push_str("\nCurrent events:\n");
        let events = snapshot.sorted();
        if events.is_empty() {
            out.push_str("(none)\n");
        }
        for event in events {
            let _ = writeln!(out, "{}", render_event(event));
        }

        let _ = writeln!(out, "\nRequest: {}", serde_json::to_string(text)?);
        let _ = writeln!(
            out,
            "\nNormalized request:\n{}",
            serde_json::to_string_pretty(intent)?
        );

        Ok(out)
    }
}

fn render_event(event: &CalendarEvent) -> String {
    let fields = &event.fields;
    format!(
        "- [{}] {} | {} -> {} | {}, {}",
        event.id,
        fields.title,
        format_storage(fields.start),
        format_storage(fields.end),
        fields.event_type,
        fields.priority
    )
}

fn window(w: &TimeWindow) -> String {
    format!("{}-{}", w.from.format("%H:%M"), w.until.format("%H:%M"))
}

fn range(r: &ClockRange) -> String {
    format!("{}-{}", r.from.format("%H:%M"), r.until.format("%H:%M"))
}
