//! Quick capture: one line of free text into a task draft.
//!
//! `Buy milk @errands #tomorrow !flag` becomes a task titled "Buy milk",
//! tagged `errands`, deferred to tomorrow and flagged. Parsing never touches
//! the store; resolving context names is a separate step
//! ([`crate::engine::TaskEngine::resolve_contexts`]).

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::ValidationError;
use crate::task::NewTask;

/// Relative date words understood by capture and by `--defer`/`--due` inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKeyword {
    Today,
    Tomorrow,
    /// The next Saturday strictly after today.
    Weekend,
}

impl DateKeyword {
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "today" => Some(DateKeyword::Today),
            "tomorrow" => Some(DateKeyword::Tomorrow),
            "weekend" => Some(DateKeyword::Weekend),
            _ => None,
        }
    }

    pub fn date_from(&self, today: NaiveDate) -> NaiveDate {
        match self {
            DateKeyword::Today => today,
            DateKeyword::Tomorrow => today + Duration::days(1),
            DateKeyword::Weekend => {
                let weekday = i64::from(today.weekday().num_days_from_monday());
                let ahead = match (5 - weekday).rem_euclid(7) {
                    0 => 7,
                    n => n,
                };
                today + Duration::days(ahead)
            }
        }
    }

    /// Local midnight of the keyword's date as seen from `now`.
    pub fn resolve<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Utc> {
        local_midnight(&now.timezone(), self.date_from(now.date_naive()))
    }
}

/// Midnight of `date` in `tz`. When midnight falls in a DST gap the first
/// valid instant after it is used.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    let mut naive = date.and_time(NaiveTime::MIN);
    for _ in 0..4 {
        if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
            return dt.with_timezone(&Utc);
        }
        naive += Duration::minutes(30);
    }
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Structured result of a capture line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureDraft {
    pub title: String,
    /// Context names without the `@`, in first-seen order.
    pub context_names: Vec<String>,
    pub flagged: bool,
    pub defer_at: Option<DateTime<Utc>>,
}

impl CaptureDraft {
    pub fn to_new_task(&self) -> NewTask {
        NewTask {
            title: self.title.clone(),
            flagged: self.flagged,
            defer_at: self.defer_at,
            ..NewTask::default()
        }
    }
}

/// Parse against the local clock.
pub fn parse(input: &str) -> CaptureDraft {
    parse_at(input, Local::now())
}

/// Parse with an explicit "now"; date keywords resolve in `now`'s time zone.
pub fn parse_at<Tz: TimeZone>(input: &str, now: DateTime<Tz>) -> CaptureDraft {
    let mut draft = CaptureDraft::default();
    let mut title_words: Vec<&str> = Vec::new();
    let mut date: Option<DateKeyword> = None;

    for token in input.split_whitespace() {
        if token == "!" || token == "!flag" {
            draft.flagged = true;
        } else if let Some(name) = token.strip_prefix('@').filter(|n| !n.is_empty()) {
            let seen = draft
                .context_names
                .iter()
                .any(|existing| existing.eq_ignore_ascii_case(name));
            if !seen {
                draft.context_names.push(name.to_string());
            }
        } else if let Some(keyword) = token.strip_prefix('#').and_then(DateKeyword::parse) {
            date = Some(keyword);
        } else {
            title_words.push(token);
        }
    }

    draft.title = if title_words.is_empty() {
        input.trim().to_string()
    } else {
        title_words.join(" ")
    };
    draft.defer_at = date.map(|keyword| keyword.resolve(&now));
    draft
}

/// Parse a date argument: `today`, `tomorrow`, `weekend`, `YYYY-MM-DD` (local
/// midnight) or an RFC 3339 instant.
pub fn parse_date_input<Tz: TimeZone>(
    input: &str,
    now: &DateTime<Tz>,
) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = input.trim();
    if let Some(keyword) = DateKeyword::parse(trimmed) {
        return Ok(keyword.resolve(now));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(local_midnight(&now.timezone(), date));
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ValidationError::InvalidDate(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    // Wednesday 2025-06-11 15:00 at UTC+2.
    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 11, 15, 0, 0)
            .unwrap()
    }

    fn local_midnight_utc(day: u32) -> DateTime<Utc> {
        // Midnight at UTC+2 is 22:00 UTC the previous day.
        Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap() - Duration::hours(2)
    }

    #[test]
    fn parses_full_capture_line() {
        let draft = parse_at("Buy milk @errands #tomorrow !flag", now());
        assert_eq!(draft.title, "Buy milk");
        assert_eq!(draft.context_names, vec!["errands".to_string()]);
        assert!(draft.flagged);
        assert_eq!(draft.defer_at, Some(local_midnight_utc(12)));
    }

    #[test]
    fn tokens_are_order_independent() {
        let draft = parse_at("! @home call #today mom", now());
        assert_eq!(draft.title, "call mom");
        assert_eq!(draft.context_names, vec!["home".to_string()]);
        assert!(draft.flagged);
        assert_eq!(draft.defer_at, Some(local_midnight_utc(11)));
    }

    #[test]
    fn weekend_is_next_saturday() {
        let draft = parse_at("Clean garage #weekend", now());
        assert_eq!(draft.defer_at, Some(local_midnight_utc(14)));

        let saturday = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        assert_eq!(
            DateKeyword::Weekend.date_from(saturday),
            NaiveDate::from_ymd_opt(2025, 6, 21).unwrap()
        );
        let friday = NaiveDate::from_ymd_opt(2025, 6, 13).unwrap();
        assert_eq!(DateKeyword::Weekend.date_from(friday), saturday);
    }

    #[test]
    fn unknown_hash_words_stay_in_title() {
        let draft = parse_at("Fix bug #42 #urgent", now());
        assert_eq!(draft.title, "Fix bug #42 #urgent");
        assert_eq!(draft.defer_at, None);
    }

    #[test]
    fn last_date_keyword_wins() {
        let draft = parse_at("Plan #today #TOMORROW", now());
        assert_eq!(draft.defer_at, Some(local_midnight_utc(12)));
    }

    #[test]
    fn contexts_dedupe_case_insensitively() {
        let draft = parse_at("Pay bills @Home @home @office", now());
        assert_eq!(draft.context_names, vec!["Home".to_string(), "office".to_string()]);
    }

    #[test]
    fn bare_at_sign_is_a_title_word() {
        let draft = parse_at("Meet @ noon", now());
        assert_eq!(draft.title, "Meet @ noon");
        assert!(draft.context_names.is_empty());
    }

    #[test]
    fn keyword_only_input_keeps_raw_text_as_title() {
        let draft = parse_at("  @errands #today !  ", now());
        assert_eq!(draft.title, "@errands #today !");
        assert_eq!(draft.context_names, vec!["errands".to_string()]);
        assert!(draft.flagged);
    }

    #[test]
    fn date_input_accepts_keywords_dates_and_rfc3339() {
        assert_eq!(parse_date_input("tomorrow", &now()).unwrap(), local_midnight_utc(12));
        assert_eq!(parse_date_input("2025-06-20", &now()).unwrap(), local_midnight_utc(20));
        assert_eq!(
            parse_date_input("2025-06-20T08:00:00Z", &now()).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 20, 8, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_input("next tuesday", &now()),
            Err(ValidationError::InvalidDate("next tuesday".into()))
        );
    }
}
