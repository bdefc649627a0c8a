use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

use crate::utils::time::utc_start_of_day;

/// `[start, end)`, either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, moment: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| start <= moment) && self.end.map_or(true, |end| moment < end)
    }

    fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    fn narrow_start(&mut self, start: DateTime<Utc>) {
        self.start = Some(self.start.map_or(start, |v| v.max(start)));
    }

    fn narrow_end(&mut self, end: DateTime<Utc>) {
        self.end = Some(self.end.map_or(end, |v| v.min(end)));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorDirection {
    /// Events strictly after the most recent occurrence of the app.
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextAnchor {
    pub app: String,
    pub direction: AnchorDirection,
}

/// Structured form of a query string. Terms are lowercase and matched with OR semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedQuery {
    Everything,
    Terms(Vec<String>),
    Window(TimeWindow),
    Anchor(ContextAnchor),
    TermsWithin(Vec<String>, TimeWindow),
    AnchorWithin(ContextAnchor, TimeWindow),
}

impl ParsedQuery {
    pub fn terms(&self) -> &[String] {
        match self {
            ParsedQuery::Terms(terms) | ParsedQuery::TermsWithin(terms, _) => terms,
            _ => &[],
        }
    }

    pub fn window(&self) -> Option<&TimeWindow> {
        match self {
            ParsedQuery::Window(window)
            | ParsedQuery::TermsWithin(_, window)
            | ParsedQuery::AnchorWithin(_, window) => Some(window),
            _ => None,
        }
    }

    pub fn anchor(&self) -> Option<&ContextAnchor> {
        match self {
            ParsedQuery::Anchor(anchor) | ParsedQuery::AnchorWithin(anchor, _) => Some(anchor),
            _ => None,
        }
    }
}

enum Remainder {
    Nothing,
    Terms(Vec<String>),
    Anchor(ContextAnchor),
}

/// Parses a query typed by the user. Never fails: anything that isn't a recognized filter
/// ends up as a search term.
///
/// Recognized filters are `after:YYYY-MM-DD` and `before:YYYY-MM-DD` tokens (midnight in the
/// time zone of `now`), a whole query equal to one of the relative phrases (`today`,
/// `yesterday`, `last hour`, `last 24 hours`, `this week`, `last week`), and `after <app>`
/// which restricts results to events after the last time `<app>` was in focus.
pub fn parse<Tz: TimeZone>(raw: &str, now: &DateTime<Tz>) -> ParsedQuery {
    let tz = now.timezone();
    let mut window = TimeWindow::default();
    let mut has_after_date = false;
    let mut has_date = false;
    let mut rest: Vec<&str> = vec![];

    for token in raw.split_whitespace() {
        if let Some(value) = strip_prefix_ignore_case(token, "after:") {
            if let Some(start) = parse_date(value).and_then(|date| utc_start_of_day(&tz, date)) {
                window.narrow_start(start);
                has_after_date = true;
                has_date = true;
                continue;
            }
        } else if let Some(value) = strip_prefix_ignore_case(token, "before:") {
            if let Some(end) = parse_date(value).and_then(|date| utc_start_of_day(&tz, date)) {
                window.narrow_end(end);
                has_date = true;
                continue;
            }
        }
        rest.push(token);
    }

    if !has_date {
        if let Some(window) = relative_window(&rest.join(" ").to_lowercase(), now) {
            return ParsedQuery::Window(window);
        }
    }

    let remainder = match rest.split_first() {
        None => Remainder::Nothing,
        Some((first, app)) if !has_after_date && first.eq_ignore_ascii_case("after") && !app.is_empty() => {
            Remainder::Anchor(ContextAnchor {
                app: app.join(" "),
                direction: AnchorDirection::After,
            })
        }
        Some(_) => Remainder::Terms(rest.iter().map(|v| v.to_lowercase()).collect()),
    };

    match (remainder, window.is_open()) {
        (Remainder::Nothing, true) => ParsedQuery::Everything,
        (Remainder::Nothing, false) => ParsedQuery::Window(window),
        (Remainder::Terms(terms), true) => ParsedQuery::Terms(terms),
        (Remainder::Terms(terms), false) => ParsedQuery::TermsWithin(terms, window),
        (Remainder::Anchor(anchor), true) => ParsedQuery::Anchor(anchor),
        (Remainder::Anchor(anchor), false) => ParsedQuery::AnchorWithin(anchor, window),
    }
}

fn strip_prefix_ignore_case<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let head = token.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &token[prefix.len()..])
}

/// Accepts only `YYYY-MM-DD` with a real calendar date.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let shape_ok = value.len() == 10
        && value.char_indices().all(|(i, ch)| match i {
            4 | 7 => ch == '-',
            _ => ch.is_ascii_digit(),
        });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn relative_window<Tz: TimeZone>(phrase: &str, now: &DateTime<Tz>) -> Option<TimeWindow> {
    let tz = now.timezone();
    let today = now.date_naive();
    let now_utc = now.with_timezone(&Utc);
    let day_start = |date: NaiveDate| utc_start_of_day(&tz, date);

    let window = match phrase {
        "today" => TimeWindow::between(day_start(today)?, day_start(today.succ_opt()?)?),
        "yesterday" => TimeWindow::between(day_start(today.pred_opt()?)?, day_start(today)?),
        "last hour" => TimeWindow::between(now_utc - Duration::hours(1), now_utc),
        "last 24 hours" => TimeWindow::between(now_utc - Duration::hours(24), now_utc),
        "this week" => {
            let monday = week_start(today)?;
            TimeWindow::between(day_start(monday)?, day_start(monday + Duration::days(7))?)
        }
        "last week" => {
            let monday = week_start(today)?;
            TimeWindow::between(day_start(monday - Duration::days(7))?, day_start(monday)?)
        }
        _ => return None,
    };
    Some(window)
}

fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_sub_signed(Duration::days(date.weekday().num_days_from_monday() as i64))
}
