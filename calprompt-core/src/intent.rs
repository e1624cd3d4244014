//! Rule-based normalization of free-text requests.
//!
//! Every field of `NormalizedIntent` comes from a fixed table below, evaluated
//! top to bottom. The first rule that matches wins, so table order is the
//! tie-break policy: a request mentioning both "delete" and "update" is a
//! delete.

use chrono::{DateTime, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Add,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    pub fn name(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }
}

/// Restricted hours the request text explicitly opted into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOverrides {
    pub business_hours: bool,
    pub quiet_hours: bool,
    /// Clock times named in the text ("7pm", "06:30", "noon").
    pub explicit_times: Vec<NaiveTime>,
}

impl ScheduleOverrides {
    pub fn names_time(&self, time: NaiveTime) -> bool {
        self.explicit_times.contains(&time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedIntent {
    pub action: Action,
    pub approximate_count: u32,
    pub subject: String,
    pub time_of_day: Option<TimeOfDay>,
    #[serde(serialize_with = "serialize_weekdays")]
    pub target_days: Vec<Weekday>,
    pub relative_date: Option<NaiveDate>,
    pub overrides: ScheduleOverrides,
}

impl Default for NormalizedIntent {
    fn default() -> Self {
        NormalizedIntent {
            action: Action::Add,
            approximate_count: 1,
            subject: DEFAULT_SUBJECT.to_string(),
            time_of_day: None,
            target_days: Vec::new(),
            relative_date: None,
            overrides: ScheduleOverrides::default(),
        }
    }
}

fn serialize_weekdays<S: Serializer>(days: &[Weekday], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(days.iter().map(|d| weekday_name(*d)))
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// A value selected when any of its phrases appears in the token stream.
pub struct Rule<T: 'static> {
    pub value: T,
    pub phrases: &'static [&'static [&'static str]],
}

const DEFAULT_SUBJECT: &str = "Task";

/// Destructive actions need an explicit keyword; anything else is an add.
pub const ACTION_RULES: &[Rule<Action>] = &[
    Rule {
        value: Action::Delete,
        phrases: &[
            &["delete"],
            &["remove"],
            &["cancel"],
            &["cancelled"],
            &["cancelling"],
        ],
    },
    Rule {
        value: Action::Update,
        phrases: &[
            &["update"],
            &["move"],
            &["moving"],
            &["reschedule"],
            &["postpone"],
        ],
    },
];

pub const TIME_OF_DAY_RULES: &[Rule<TimeOfDay>] = &[
    Rule {
        value: TimeOfDay::Morning,
        phrases: &[&["morning"]],
    },
    Rule {
        value: TimeOfDay::Afternoon,
        phrases: &[&["afternoon"]],
    },
    Rule {
        value: TimeOfDay::Evening,
        phrases: &[&["evening"], &["after", "work"]],
    },
];

const WORK_WEEK_PHRASES: &[&[&str]] = &[&["weekday"], &["work", "week"], &["workweek"]];

const TOMORROW_PHRASES: &[&[&str]] = &[&["tomorrow"]];

const BUSINESS_HOUR_PHRASES: &[&[&str]] = &[
    &["during", "work"],
    &["work", "hours"],
    &["working", "hours"],
    &["business", "hours"],
    &["office", "hours"],
    &["during", "the", "day"],
];

const QUIET_HOUR_PHRASES: &[&[&str]] = &[
    &["late", "night"],
    &["overnight"],
    &["midnight"],
    &["early", "morning"],
    &["night"],
];

/// Nouns that name the kind of event. Matched in singular or plural.
const SUBJECT_NOUNS: &[&str] = &[
    "workout",
    "meeting",
    "lunch",
    "dinner",
    "call",
    "task",
    "appointment",
    "session",
];

/// Nouns a quantity may count: every subject noun plus the generic "event".
const COUNT_NOUNS: &[&str] = &["event"];

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

const WORK_WEEK: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

pub struct RequestNormalizer;

impl RequestNormalizer {
    /// Normalize `text` relative to `reference`, an instant in the civil zone.
    pub fn normalize(text: &str, reference: DateTime<Tz>) -> NormalizedIntent {
        let tokens = tokenize(text);

        let action = first_match(ACTION_RULES, &tokens).unwrap_or(Action::Add);
        let approximate_count = approximate_count(&tokens).unwrap_or(1);
        let subject = subject(&tokens).unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        let time_of_day = first_match(TIME_OF_DAY_RULES, &tokens);

        let target_days = if any_phrase(WORK_WEEK_PHRASES, &tokens) {
            WORK_WEEK.to_vec()
        } else {
            Vec::new()
        };

        let relative_date = if any_phrase(TOMORROW_PHRASES, &tokens) {
            reference.date_naive().succ_opt()
        } else {
            None
        };

        let overrides = ScheduleOverrides {
            business_hours: any_phrase(BUSINESS_HOUR_PHRASES, &tokens),
            quiet_hours: any_phrase(QUIET_HOUR_PHRASES, &tokens),
            explicit_times: explicit_times(&tokens, action),
        };

        NormalizedIntent {
            action,
            approximate_count,
            subject,
            time_of_day,
            target_days,
            relative_date,
            overrides,
        }
    }
}

/// Lowercased words. `:` stays inside a token so "10:30am" survives.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == ':'))
        .map(|t| t.trim_matches(':'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-word match, allowing a plain `s`, `es`, `d` or `ed` suffix on the
/// keyword. Doubled-consonant forms ("cancelled") are listed in the tables.
fn word_matches(token: &str, keyword: &str) -> bool {
    match token.strip_prefix(keyword) {
        Some(rest) => matches!(rest, "" | "s" | "es" | "d" | "ed"),
        None => false,
    }
}

fn phrase_at(tokens: &[String], start: usize, phrase: &[&str]) -> bool {
    tokens.len() >= start + phrase.len()
        && phrase
            .iter()
            .enumerate()
            .all(|(i, word)| word_matches(&tokens[start + i], word))
}

fn contains_phrase(tokens: &[String], phrase: &[&str]) -> bool {
    (0..tokens.len()).any(|i| phrase_at(tokens, i, phrase))
}

fn any_phrase(phrases: &[&[&str]], tokens: &[String]) -> bool {
    phrases.iter().any(|p| contains_phrase(tokens, p))
}

/// Value of the first rule (in table order) with a phrase present in `tokens`.
pub fn first_match<T: Copy>(rules: &[Rule<T>], tokens: &[String]) -> Option<T> {
    rules
        .iter()
        .find(|rule| any_phrase(rule.phrases, tokens))
        .map(|rule| rule.value)
}

fn noun_in(token: &str, nouns: &'static [&'static str]) -> Option<&'static str> {
    nouns.iter().copied().find(|noun| word_matches(token, noun))
}

fn subject(tokens: &[String]) -> Option<String> {
    tokens
        .iter()
        .find_map(|t| noun_in(t, SUBJECT_NOUNS))
        .map(capitalize)
}

fn is_count_noun(token: &str) -> bool {
    noun_in(token, SUBJECT_NOUNS).is_some() || noun_in(token, COUNT_NOUNS).is_some()
}

fn quantity(token: &str) -> Option<u32> {
    if token.chars().all(|c| c.is_ascii_digit()) {
        return token.parse().ok().filter(|n| *n > 0);
    }
    NUMBER_WORDS
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, n)| *n)
}

fn approximate_count(tokens: &[String]) -> Option<u32> {
    tokens
        .windows(2)
        .find_map(|pair| quantity(&pair[0]).filter(|_| is_count_noun(&pair[1])))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Words that introduce the new slot of an update ("move lunch to 1pm").
const DESTINATION_WORDS: &[&str] = &["to", "for"];

/// Clock times named in the request, in order of appearance.
///
/// For an update only destination times count. "move my 10am call to 3pm"
/// names 10:00 as the slot being vacated, not one to schedule into.
fn explicit_times(tokens: &[String], action: Action) -> Vec<NaiveTime> {
    let mut times = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        if action == Action::Update {
            let previous = i.checked_sub(1).map(|p| tokens[p].as_str());
            if !previous.is_some_and(|p| DESTINATION_WORDS.contains(&p)) {
                continue;
            }
        }

        let next = tokens.get(i + 1).map(String::as_str);
        let time = match token.as_str() {
            "noon" => NaiveTime::from_hms_opt(12, 0, 0),
            "midnight" => NaiveTime::from_hms_opt(0, 0, 0),
            _ => parse_clock(token, next),
        };
        if let Some(time) = time {
            if !times.contains(&time) {
                times.push(time);
            }
        }
    }

    times
}

/// "7pm", "7:30pm", "7 pm" (meridiem in `next`), or 24-hour "19:00".
fn parse_clock(token: &str, next: Option<&str>) -> Option<NaiveTime> {
    let (digits, meridiem) = if let Some(d) = token.strip_suffix("am") {
        (d, Some(false))
    } else if let Some(d) = token.strip_suffix("pm") {
        (d, Some(true))
    } else {
        match next {
            Some("am") => (token, Some(false)),
            Some("pm") => (token, Some(true)),
            _ => (token, None),
        }
    };

    let (hour_str, minute_str) = match digits.split_once(':') {
        Some((h, m)) => (h, Some(m)),
        None => (digits, None),
    };

    if hour_str.is_empty()
        || hour_str.len() > 2
        || !hour_str.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let hour: u32 = hour_str.parse().ok()?;

    let minute: u32 = match minute_str {
        Some(m) if m.len() == 2 && m.chars().all(|c| c.is_ascii_digit()) => m.parse().ok()?,
        Some(_) => return None,
        None => 0,
    };

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (pm, hour) {
                (false, 12) => 0,
                (true, 12) => 12,
                (true, h) => h + 12,
                (false, h) => h,
            }
        }
        // A bare number is a count or a date, not a time.
        None if minute_str.is_none() => return None,
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}
