//! Scheduling rules every proposed change must satisfy before it is applied.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::diff::{DiffKind, DiffOperation, IndexedOperation, Rejection};
use crate::error::{RejectReason, Violation};
use crate::event::{CalendarEvent, EventFields, EventId, EventType, Snapshot};
use crate::intent::{NormalizedIntent, TimeOfDay};
use crate::timezone::TimeZoneNormalizer;

/// Inclusive civil-time window, e.g. morning 06:00–08:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: NaiveTime,
    pub until: NaiveTime,
}

impl TimeWindow {
    pub fn new(from: NaiveTime, until: NaiveTime) -> Self {
        TimeWindow { from, until }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.from <= time && time <= self.until
    }
}

/// Half-open civil-time range that may wrap past midnight (22:00–07:00).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockRange {
    pub from: NaiveTime,
    pub until: NaiveTime,
}

impl ClockRange {
    pub fn new(from: NaiveTime, until: NaiveTime) -> Self {
        ClockRange { from, until }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.from <= self.until {
            self.from <= time && time < self.until
        } else {
            time >= self.from || time < self.until
        }
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleRules {
    pub morning: TimeWindow,
    pub afternoon: TimeWindow,
    pub evening: TimeWindow,
    pub business_hours: ClockRange,
    pub business_days: Vec<Weekday>,
    pub quiet_hours: ClockRange,
}

impl Default for ScheduleRules {
    fn default() -> Self {
        ScheduleRules {
            morning: TimeWindow::new(hm(6, 0), hm(8, 59)),
            afternoon: TimeWindow::new(hm(12, 0), hm(16, 0)),
            evening: TimeWindow::new(hm(17, 0), hm(21, 0)),
            business_hours: ClockRange::new(hm(9, 0), hm(17, 0)),
            business_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            quiet_hours: ClockRange::new(hm(22, 0), hm(7, 0)),
        }
    }
}

impl ScheduleRules {
    pub fn window(&self, time_of_day: TimeOfDay) -> TimeWindow {
        match time_of_day {
            TimeOfDay::Morning => self.morning,
            TimeOfDay::Afternoon => self.afternoon,
            TimeOfDay::Evening => self.evening,
        }
    }
}

pub struct ConstraintValidator<'a> {
    tz: TimeZoneNormalizer,
    rules: &'a ScheduleRules,
}

impl<'a> ConstraintValidator<'a> {
    pub fn new(tz: TimeZoneNormalizer, rules: &'a ScheduleRules) -> Self {
        ConstraintValidator { tz, rules }
    }

    /// Check one operation against `view`, which must already contain every
    /// change accepted earlier in the batch. Rules run in priority order and
    /// the first failure is returned.
    pub fn check(
        &self,
        operation: &DiffOperation,
        intent: &NormalizedIntent,
        view: &Snapshot,
    ) -> Result<(), Violation> {
        match operation {
            DiffOperation::Add(fields) => self.check_fields(fields, None, intent, view),
            DiffOperation::Update { id, fields } => {
                self.check_fields(fields, Some(id), intent, view)
            }
            DiffOperation::Delete { .. } => Ok(()),
        }
    }

    fn check_fields(
        &self,
        fields: &EventFields,
        replacing: Option<&EventId>,
        intent: &NormalizedIntent,
        view: &Snapshot,
    ) -> Result<(), Violation> {
        if fields.start >= fields.end {
            return Err(Violation::InvalidOrdering);
        }

        if let Some(existing) = view.find_overlap(fields.start, fields.end, replacing) {
            return Err(Violation::Overlap {
                with: existing.fields.title.clone(),
            });
        }

        let start = self.tz.civil_time(fields.start);
        let window = intent.time_of_day.map(|tod| (tod, self.rules.window(tod)));

        if let Some((tod, window)) = window {
            if !window.contains(start) {
                return Err(Violation::Window {
                    window: tod.name().to_string(),
                });
            }
        }

        // A requested window the start sits in counts as asking for those hours.
        let inside_requested_window = window.is_some_and(|(_, w)| w.contains(start));
        let overrides = &intent.overrides;

        if fields.event_type == EventType::Personal
            && self.in_business_hours(fields.start)
            && !(overrides.business_hours
                || overrides.names_time(start)
                || inside_requested_window)
        {
            return Err(Violation::BusinessHours);
        }

        if self.rules.quiet_hours.contains(start)
            && !(overrides.quiet_hours || overrides.names_time(start) || inside_requested_window)
        {
            return Err(Violation::QuietHours);
        }

        Ok(())
    }

    fn in_business_hours(&self, instant: DateTime<Utc>) -> bool {
        self.rules
            .business_days
            .contains(&self.tz.civil_weekday(instant))
            && self.rules.business_hours.contains(self.tz.civil_time(instant))
    }

    /// Dry run of a whole batch against a scratch copy of `snapshot`.
    ///
    /// Mirrors what a session would do, including unknown-reference checks,
    /// but never touches a store. Added events get placeholder ids.
    pub fn validate_batch(
        &self,
        operations: Vec<IndexedOperation>,
        intent: &NormalizedIntent,
        snapshot: &Snapshot,
    ) -> (Vec<IndexedOperation>, Vec<Rejection>) {
        let mut scratch = snapshot.clone();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for item in operations {
            let kind = item.operation.kind();

            if let Err(violation) = self.check(&item.operation, intent, &scratch) {
                rejected.push(Rejection::new(item.index, Some(kind), violation.into()));
                continue;
            }

            match &item.operation {
                DiffOperation::Add(fields) => {
                    let id = EventId::new(format!("pending-{}", item.index));
                    scratch.insert(CalendarEvent::new(id, fields.clone()));
                }
                DiffOperation::Update { id, fields } => {
                    if !scratch.contains(id) {
                        rejected.push(Rejection::new(
                            item.index,
                            Some(DiffKind::Update),
                            RejectReason::UnknownReference(id.clone()),
                        ));
                        continue;
                    }
                    scratch.insert(CalendarEvent::new(id.clone(), fields.clone()));
                }
                DiffOperation::Delete { id } => {
                    scratch.remove(id);
                }
            }

            accepted.push(item);
        }

        (accepted, rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPriority;
    use crate::intent::ScheduleOverrides;
    use chrono::TimeZone;

    // 2025-07-01 is a Tuesday; New York is UTC-4 in July.
    fn civil(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        chrono_tz::America::New_York
            .with_ymd_and_hms(2025, 7, day, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn add(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> DiffOperation {
        DiffOperation::Add(EventFields::new(title, start, end))
    }

    fn work(title: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> DiffOperation {
        DiffOperation::Add(EventFields::new(title, start, end).with_type(EventType::Work))
    }

    fn snapshot(events: &[(&str, DateTime<Utc>, DateTime<Utc>)]) -> Snapshot {
        events
            .iter()
            .map(|(id, s, e)| CalendarEvent::new(EventId::from(*id), EventFields::new(*id, *s, *e)))
            .collect()
    }

    fn check(op: &DiffOperation, intent: &NormalizedIntent, view: &Snapshot) -> Result<(), Violation> {
        let rules = ScheduleRules::default();
        ConstraintValidator::new(TimeZoneNormalizer::default(), &rules).check(op, intent, view)
    }

    fn with_window(tod: TimeOfDay) -> NormalizedIntent {
        NormalizedIntent {
            time_of_day: Some(tod),
            ..Default::default()
        }
    }

    #[test]
    fn start_not_before_end_is_invalid_ordering() {
        let intent = NormalizedIntent::default();
        let empty = Snapshot::new();

        let zero = add("Zero", civil(5, 18, 0), civil(5, 18, 0));
        let backwards = add("Back", civil(5, 19, 0), civil(5, 18, 0));
        assert_eq!(check(&zero, &intent, &empty), Err(Violation::InvalidOrdering));
        assert_eq!(check(&backwards, &intent, &empty), Err(Violation::InvalidOrdering));

        // Ordering comes first even when every other rule would also fail.
        let quiet_backwards = add("Late", civil(1, 23, 30), civil(1, 23, 0));
        assert_eq!(
            check(&quiet_backwards, &with_window(TimeOfDay::Morning), &empty),
            Err(Violation::InvalidOrdering)
        );
    }

    #[test]
    fn overlap_uses_half_open_intervals() {
        let intent = NormalizedIntent::default();
        let view = snapshot(&[("gym", civil(5, 18, 0), civil(5, 19, 0))]);

        let overlapping = add("X", civil(5, 18, 30), civil(5, 19, 15));
        assert_eq!(
            check(&overlapping, &intent, &view),
            Err(Violation::Overlap { with: "gym".into() })
        );

        let touching = add("Y", civil(5, 19, 0), civil(5, 20, 0));
        assert_eq!(check(&touching, &intent, &view), Ok(()));
    }

    #[test]
    fn update_does_not_conflict_with_itself() {
        let intent = NormalizedIntent::default();
        let view = snapshot(&[("gym", civil(5, 18, 0), civil(5, 19, 0))]);

        let shifted = DiffOperation::Update {
            id: EventId::from("gym"),
            fields: EventFields::new("gym", civil(5, 18, 30), civil(5, 19, 30))
                .with_priority(EventPriority::Urgent),
        };
        assert_eq!(check(&shifted, &intent, &view), Ok(()));
    }

    #[test]
    fn requested_window_bounds_the_start() {
        let empty = Snapshot::new();
        let evening = with_window(TimeOfDay::Evening);

        assert_eq!(check(&add("Run", civil(1, 17, 0), civil(1, 18, 0)), &evening, &empty), Ok(()));
        assert_eq!(check(&add("Run", civil(1, 21, 0), civil(1, 21, 45)), &evening, &empty), Ok(()));
        assert_eq!(
            check(&add("Run", civil(1, 21, 1), civil(1, 21, 45)), &evening, &empty),
            Err(Violation::Window { window: "evening".into() })
        );

        let morning = with_window(TimeOfDay::Morning);
        assert_eq!(
            check(&add("Run", civil(5, 9, 0), civil(5, 9, 30)), &morning, &empty),
            Err(Violation::Window { window: "morning".into() })
        );
    }

    #[test]
    fn no_window_means_no_window_rule() {
        let intent = NormalizedIntent::default();
        // Saturday 10:00 is neither business nor quiet time.
        let op = add("Brunch", civil(5, 10, 0), civil(5, 11, 0));
        assert_eq!(check(&op, &intent, &Snapshot::new()), Ok(()));
    }

    #[test]
    fn personal_events_stay_out_of_business_hours() {
        let intent = NormalizedIntent::default();
        let empty = Snapshot::new();

        let personal = add("Dentist", civil(1, 10, 0), civil(1, 11, 0));
        assert_eq!(check(&personal, &intent, &empty), Err(Violation::BusinessHours));

        // Work events and weekends are unaffected; 17:00 is already after hours.
        assert_eq!(check(&work("Sync", civil(1, 10, 0), civil(1, 11, 0)), &intent, &empty), Ok(()));
        assert_eq!(check(&add("Hike", civil(5, 10, 0), civil(5, 11, 0)), &intent, &empty), Ok(()));
        assert_eq!(check(&add("Gym", civil(1, 17, 0), civil(1, 18, 0)), &intent, &empty), Ok(()));
    }

    #[test]
    fn explicit_requests_lift_business_hours() {
        let empty = Snapshot::new();
        let op = add("Dentist", civil(1, 10, 0), civil(1, 11, 0));

        let keyword = NormalizedIntent {
            overrides: ScheduleOverrides {
                business_hours: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(check(&op, &keyword, &empty), Ok(()));

        let named_time = NormalizedIntent {
            overrides: ScheduleOverrides {
                explicit_times: vec![hm(10, 0)],
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(check(&op, &named_time, &empty), Ok(()));

        let afternoon = add("Walk", civil(1, 13, 0), civil(1, 13, 30));
        assert_eq!(check(&afternoon, &with_window(TimeOfDay::Afternoon), &empty), Ok(()));
    }

    #[test]
    fn quiet_hours_apply_to_every_type() {
        let intent = NormalizedIntent::default();
        let empty = Snapshot::new();

        assert_eq!(
            check(&work("Deploy", civil(1, 22, 0), civil(1, 23, 0)), &intent, &empty),
            Err(Violation::QuietHours)
        );
        assert_eq!(
            check(&work("Deploy", civil(2, 6, 59), civil(2, 7, 30)), &intent, &empty),
            Err(Violation::QuietHours)
        );
        assert_eq!(check(&work("Deploy", civil(2, 7, 0), civil(2, 7, 30)), &intent, &empty), Ok(()));

        let late = NormalizedIntent {
            overrides: ScheduleOverrides {
                quiet_hours: true,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(check(&work("Deploy", civil(1, 22, 0), civil(1, 23, 0)), &late, &empty), Ok(()));

        // A morning request covers 06:00 even though it is before 07:00.
        let morning = with_window(TimeOfDay::Morning);
        assert_eq!(check(&add("Run", civil(2, 6, 0), civil(2, 6, 45)), &morning, &empty), Ok(()));
    }

    #[test]
    fn deletes_skip_time_rules() {
        let op = DiffOperation::Delete {
            id: EventId::from("anything"),
        };
        assert_eq!(check(&op, &with_window(TimeOfDay::Morning), &Snapshot::new()), Ok(()));
    }

    #[test]
    fn validate_batch_sees_earlier_accepted_operations() {
        let rules = ScheduleRules::default();
        let validator = ConstraintValidator::new(TimeZoneNormalizer::default(), &rules);
        let intent = NormalizedIntent::default();

        let ops = vec![
            IndexedOperation::new(0, add("A", civil(5, 18, 0), civil(5, 19, 0))),
            IndexedOperation::new(1, add("B", civil(5, 18, 30), civil(5, 19, 30))),
            IndexedOperation::new(
                2,
                DiffOperation::Update {
                    id: EventId::from("missing"),
                    fields: EventFields::new("C", civil(6, 18, 0), civil(6, 19, 0)),
                },
            ),
            IndexedOperation::new(3, add("D", civil(5, 19, 0), civil(5, 20, 0))),
        ];

        let (accepted, rejected) = validator.validate_batch(ops, &intent, &Snapshot::new());

        let accepted: Vec<_> = accepted.iter().map(|o| o.index).collect();
        assert_eq!(accepted, vec![0, 3]);
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].index, 1);
        assert_eq!(rejected[0].reason.rule(), "OverlapViolation");
        assert_eq!(rejected[1].index, 2);
        assert_eq!(rejected[1].reason.rule(), "UnknownReference");
    }

    #[test]
    fn clock_range_wraps_midnight() {
        let quiet = ClockRange::new(hm(22, 0), hm(7, 0));
        assert!(quiet.contains(hm(22, 0)));
        assert!(quiet.contains(hm(0, 0)));
        assert!(quiet.contains(hm(6, 59)));
        assert!(!quiet.contains(hm(7, 0)));
        assert!(!quiet.contains(hm(21, 59)));

        let business = ClockRange::new(hm(9, 0), hm(17, 0));
        assert!(business.contains(hm(9, 0)));
        assert!(!business.contains(hm(17, 0)));
    }
}
