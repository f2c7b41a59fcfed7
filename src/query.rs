// ============================================================================
// Ledger Query / Filter Builder
// ============================================================================
//
// Turns the listing filters (free text, result, single day) plus a page index
// into a deterministic read. Any filter change sends the caller back to the
// first page.
//
// Ordering, newest day first:
//   local event date DESC, title ASC, market ASC, house ASC,
//   event_at DESC, seq ASC
//
// The last key is unique per bet, so two requests with the same filters
// always slice the same pages.
//
// ============================================================================

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{Bet, BetResult};
use crate::validation::ValidationErrors;

/// Page size of the bets listing.
pub const BETS_PAGE_SIZE: usize = 12;

/// Page size of the dashboard tables.
pub const DASHBOARD_PAGE_SIZE: usize = 10;

/// Which columns the free-text filter looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    Title,
    TitleAndMarket,
}

/// Raw query-string parameters, as sent by the listing page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub result: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetQuery {
    search: Option<String>,
    result: Option<BetResult>,
    date: Option<NaiveDate>,
    page_index: usize,
    page_size: usize,
    scope: SearchScope,
}

impl BetQuery {
    pub fn new(page_size: usize) -> Self {
        Self {
            search: None,
            result: None,
            date: None,
            page_index: 0,
            page_size: page_size.max(1),
            scope: SearchScope::Title,
        }
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Builds a query from listing parameters. Empty values mean "no filter".
    pub fn from_params(
        params: &ListParams,
        page_size: usize,
        scope: SearchScope,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut query = Self::new(page_size).with_scope(scope);

        query.set_search(params.title.as_deref());

        match params.result.as_deref().map(str::trim) {
            None | Some("") | Some("all") => {}
            Some(text) => match text.parse::<BetResult>() {
                Ok(result) => query.set_result(Some(result)),
                Err(e) => errors.push("result", e.to_string()),
            },
        }

        match params.date.as_deref().map(str::trim) {
            None | Some("") => {}
            Some(text) => match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                Ok(day) => query.set_date(Some(day)),
                Err(_) => errors.push("date", "date must be formatted as YYYY-MM-DD"),
            },
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        query.page_index = params.page.unwrap_or(0);
        Ok(query)
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn result(&self) -> Option<BetResult> {
        self.result
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_search(&mut self, text: Option<&str>) {
        self.search = text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string);
        self.page_index = 0;
    }

    pub fn set_result(&mut self, result: Option<BetResult>) {
        self.result = result;
        self.page_index = 0;
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.date = date;
        self.page_index = 0;
    }

    pub fn set_page(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    /// The `%text%` pattern the text filter matches with.
    pub fn wildcard_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|s| format!("%{}%", s))
    }

    /// `[start_of_day, start_of_day + 1 day)` of the date filter, with the
    /// day boundaries taken in the display time zone.
    pub fn date_window(&self, tz: &FixedOffset) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let day = self.date?;
        let start = tz
            .from_local_datetime(&day.and_hms_opt(0, 0, 0)?)
            .single()?
            .with_timezone(&Utc);
        Some((start, start + Duration::days(1)))
    }

    pub fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    pub fn matches(&self, bet: &Bet, tz: &FixedOffset) -> bool {
        if let Some(result) = self.result {
            if bet.result != result {
                return false;
            }
        }

        if let Some((start, end)) = self.date_window(tz) {
            if bet.event_at < start || bet.event_at >= end {
                return false;
            }
        }

        if let Some(pattern) = self.wildcard_pattern() {
            let hit = ilike(&bet.title, &pattern)
                || (self.scope == SearchScope::TitleAndMarket && ilike(&bet.market, &pattern));
            if !hit {
                return false;
            }
        }

        true
    }

    /// Filters, orders and slices `bets` into the requested page.
    pub fn apply(&self, bets: Vec<Bet>, tz: &FixedOffset) -> Page<Bet> {
        let mut matched: Vec<Bet> = bets.into_iter().filter(|b| self.matches(b, tz)).collect();
        sort_bets(&mut matched, tz);

        Page::slice(matched, self.page_index, self.page_size)
    }

    /// Query string for the current state, in the listing's parameter names.
    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        pairs.push(("page", self.page_index.to_string()));
        if let Some(result) = self.result {
            pairs.push(("result", result.as_str().to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("title", search.clone()));
        }
        if let Some(date) = self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Case-insensitive match of a `%text%` pattern.
fn ilike(haystack: &str, pattern: &str) -> bool {
    let needle = pattern.trim_start_matches('%').trim_end_matches('%').to_lowercase();
    haystack.to_lowercase().contains(&needle)
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn compare_bets(a: &Bet, b: &Bet, tz: &FixedOffset) -> Ordering {
    b.local_date(tz)
        .cmp(&a.local_date(tz))
        .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        .then_with(|| a.market.to_lowercase().cmp(&b.market.to_lowercase()))
        .then_with(|| a.house.cmp(&b.house))
        .then_with(|| b.event_at.cmp(&a.event_at))
        .then_with(|| a.seq.cmp(&b.seq))
}

pub fn sort_bets(bets: &mut [Bet], tz: &FixedOffset) {
    bets.sort_by(|a, b| compare_bets(a, b, tz));
}

// ===== PAGE =====

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page_index: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    /// Cuts page `page_index` out of already ordered `items`.
    pub fn slice(items: Vec<T>, page_index: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total = items.len();
        let items = items
            .into_iter()
            .skip(page_index.saturating_mul(page_size))
            .take(page_size)
            .collect();
        Page { items, total, page_index, page_size }
    }

    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }
}
