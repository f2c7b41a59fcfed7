// ============================================================================
// Aggregations
// ============================================================================
//
// Dashboard and report views computed from an owner's bets. Days are taken
// in the display time zone.
//
//   total_staked  sum of entry_amount over settled bets
//   net_profit    sum of profit_loss
//   roi_percent   net_profit / total_staked * 100
//   accuracy      green / (green + red) * 100
//   avg_stake     mean entry_amount over every bet of the period
//
// All percentages and currency values are rounded to 2 places.
//
// ============================================================================

use chrono::{Datelike, Duration, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Bet, BetResult};
use crate::stake::round_amount;

/// Window of the dashboard summary and balance curve.
pub const DEFAULT_WINDOW_DAYS: u32 = 100;

/// Longest window a report may ask for, about a century.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub bet_count: u64,
    pub total_staked: Decimal,
    pub net_profit: Decimal,
    pub roi_percent: Decimal,
    pub green_count: u64,
    pub red_count: u64,
    pub refund_count: u64,
    pub cashout_count: u64,
    pub pending_count: u64,
    pub accuracy: Decimal,
    pub avg_stake: Decimal,
}

#[derive(Debug, Default)]
struct Accumulator {
    totals: Totals,
    entry_sum: Decimal,
}

impl Accumulator {
    fn push(&mut self, bet: &Bet) {
        let t = &mut self.totals;
        t.bet_count += 1;
        self.entry_sum = self.entry_sum.saturating_add(bet.entry_amount);
        t.net_profit = t.net_profit.saturating_add(bet.profit_loss);
        if bet.result.is_settled() {
            t.total_staked = t.total_staked.saturating_add(bet.entry_amount);
        }
        match bet.result {
            BetResult::Pending => t.pending_count += 1,
            BetResult::Green => t.green_count += 1,
            BetResult::Red => t.red_count += 1,
            BetResult::Refund => t.refund_count += 1,
            BetResult::Cashout => t.cashout_count += 1,
        }
    }

    fn finish(self) -> Totals {
        let mut t = self.totals;
        t.total_staked = round_amount(t.total_staked);
        t.net_profit = round_amount(t.net_profit);
        t.roi_percent = percent(t.net_profit, t.total_staked);
        t.accuracy = percent(
            Decimal::from(t.green_count),
            Decimal::from(t.green_count + t.red_count),
        );
        t.avg_stake = if t.bet_count == 0 {
            Decimal::ZERO
        } else {
            self.entry_sum
                .checked_div(Decimal::from(t.bet_count))
                .map(round_amount)
                .unwrap_or(Decimal::ZERO)
        };
        t
    }
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .map(round_amount)
        .unwrap_or(Decimal::ZERO)
}

fn totals<'a>(bets: impl IntoIterator<Item = &'a Bet>) -> Totals {
    let mut acc = Accumulator::default();
    for bet in bets {
        acc.push(bet);
    }
    acc.finish()
}

// ===== DAILY / MONTHLY =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub day: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
    pub cumulative_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// `YYYY-MM`
    pub month: String,
    #[serde(flatten)]
    pub totals: Totals,
    pub cumulative_balance: Decimal,
}

fn group_by<'a, K: Ord>(bets: &'a [Bet], key: impl Fn(&Bet) -> K) -> BTreeMap<K, Vec<&'a Bet>> {
    let mut groups: BTreeMap<K, Vec<&Bet>> = BTreeMap::new();
    for bet in bets {
        groups.entry(key(bet)).or_default().push(bet);
    }
    groups
}

/// One row per day with bets, oldest first.
pub fn daily_summary(bets: &[Bet], tz: &FixedOffset) -> Vec<DailySummary> {
    let mut balance = Decimal::ZERO;
    group_by(bets, |b| b.local_date(tz))
        .into_iter()
        .map(|(day, group)| {
            let totals = totals(group);
            balance = balance.saturating_add(totals.net_profit);
            DailySummary { day, totals, cumulative_balance: balance }
        })
        .collect()
}

/// One row per month with bets, oldest first.
pub fn monthly_summary(bets: &[Bet], tz: &FixedOffset) -> Vec<MonthlySummary> {
    let mut balance = Decimal::ZERO;
    group_by(bets, |b| {
        let day = b.local_date(tz);
        (day.year(), day.month())
    })
    .into_iter()
    .map(|((year, month), group)| {
        let totals = totals(group);
        balance = balance.saturating_add(totals.net_profit);
        MonthlySummary {
            month: format!("{:04}-{:02}", year, month),
            totals,
            cumulative_balance: balance,
        }
    })
    .collect()
}

// ===== WINDOWED VIEWS =====

/// First day of a `days`-long window ending on `today`. `days` is clamped
/// to `1..=MAX_WINDOW_DAYS`.
fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    let days = days.clamp(1, MAX_WINDOW_DAYS);
    today
        .checked_sub_signed(Duration::days(i64::from(days) - 1))
        .unwrap_or(NaiveDate::MIN)
}

fn in_window(bet: &Bet, tz: &FixedOffset, start: NaiveDate, today: NaiveDate) -> bool {
    let day = bet.local_date(tz);
    day >= start && day <= today
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: u32,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Totals over the last `days` days, today included.
pub fn window_summary(bets: &[Bet], tz: &FixedOffset, today: NaiveDate, days: u32) -> WindowSummary {
    let start = window_start(today, days);
    WindowSummary {
        from: start,
        to: today,
        days: days.clamp(1, MAX_WINDOW_DAYS),
        totals: totals(bets.iter().filter(|b| in_window(b, tz, start, today))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePoint {
    pub day: NaiveDate,
    pub daily_profit: Decimal,
    pub cumulative_balance: Decimal,
}

/// Balance curve over the last `days` days, starting from zero at the
/// window start.
pub fn balance_curve(bets: &[Bet], tz: &FixedOffset, today: NaiveDate, days: u32) -> Vec<BalancePoint> {
    let start = window_start(today, days);
    let windowed: Vec<Bet> = bets
        .iter()
        .filter(|b| in_window(b, tz, start, today))
        .cloned()
        .collect();

    daily_summary(&windowed, tz)
        .into_iter()
        .map(|d| BalancePoint {
            day: d.day,
            daily_profit: d.totals.net_profit,
            cumulative_balance: d.cumulative_balance,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentBets {
    pub today: Vec<Bet>,
    pub current_month: Vec<Bet>,
    pub last_30_days: Vec<Bet>,
}

/// Dashboard tables, newest event first.
pub fn recent_bets(bets: &[Bet], tz: &FixedOffset, today: NaiveDate) -> RecentBets {
    let mut sorted = bets.to_vec();
    sorted.sort_by(|a, b| b.event_at.cmp(&a.event_at).then_with(|| a.seq.cmp(&b.seq)));

    let thirty_start = window_start(today, 30);
    let pick = |keep: &dyn Fn(NaiveDate) -> bool| -> Vec<Bet> {
        sorted.iter().filter(|b| keep(b.local_date(tz))).cloned().collect()
    };

    RecentBets {
        today: pick(&|d: NaiveDate| d == today),
        current_month: pick(&|d: NaiveDate| d.year() == today.year() && d.month() == today.month() && d <= today),
        last_30_days: pick(&|d: NaiveDate| d >= thirty_start && d <= today),
    }
}

// ===== HOUSES =====

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseSummary {
    pub house: String,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Per-house totals, best net profit first.
pub fn house_breakdown(bets: &[Bet]) -> Vec<HouseSummary> {
    let mut rows: Vec<HouseSummary> = group_by(bets, |b| b.house.clone())
        .into_iter()
        .map(|(house, group)| HouseSummary { house, totals: totals(group) })
        .collect();
    rows.sort_by(|a, b| {
        b.totals
            .net_profit
            .cmp(&a.totals.net_profit)
            .then_with(|| a.house.cmp(&b.house))
    });
    rows
}
