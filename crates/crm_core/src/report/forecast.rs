//! Week-bucketed revenue forecast over open deals.
//!
//! # Invariants
//! - Bucket number is `floor(days_until_close / 7) + 1`; bucket 1 is the
//!   current 7-day window and overdue deals land in bucket 0 or below.
//! - Only non-empty buckets are reported, in ascending bucket order.

use crate::model::deal::Deal;
use crate::repo::mapping::{deal_from_record, format_date, FieldRecord};
use crate::repo::RepoResult;
use crate::report::{round_money, CLOSED_STAGES_SQL};
use chrono::{NaiveDate, TimeDelta};
use log::debug;
use rusqlite::Connection;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Instant;

/// Per-deal line of the forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDeal {
    pub title: String,
    pub value: f64,
    pub probability: f64,
    pub weighted: f64,
    /// `YYYY-MM-DD`.
    pub expected_close: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekBucket {
    pub week: i64,
    pub expected: f64,
}

impl WeekBucket {
    pub fn label(&self) -> String {
        format!("week_{}", self.week)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueForecast {
    pub forecast_days: i64,
    pub total_expected: f64,
    pub deal_count: usize,
    /// Serialized as a `week_<n>` -> total map in bucket order.
    #[serde(serialize_with = "serialize_weekly")]
    pub weekly_breakdown: Vec<WeekBucket>,
    /// Sorted by expected close date, earliest first.
    pub deals: Vec<ForecastDeal>,
}

impl RevenueForecast {
    /// Looks up a bucket total by its `week_<n>` label.
    pub fn weekly_total(&self, label: &str) -> Option<f64> {
        self.weekly_breakdown
            .iter()
            .find(|bucket| bucket.label() == label)
            .map(|bucket| bucket.expected)
    }
}

fn serialize_weekly<S: Serializer>(buckets: &[WeekBucket], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(buckets.iter().map(|bucket| (bucket.label(), bucket.expected)))
}

/// Week bucket a deal closing on `expected_close` falls in, seen from `today`.
pub fn week_bucket(today: NaiveDate, expected_close: NaiveDate) -> i64 {
    (expected_close - today).num_days().div_euclid(7) + 1
}

/// Forecasts weighted revenue for open deals closing within `days` of `today`.
pub fn forecast_revenue(conn: &Connection, today: NaiveDate, days: i64) -> RepoResult<RevenueForecast> {
    let started_at = Instant::now();
    let horizon = forecast_horizon(today, days);

    let sql = format!(
        "SELECT
            id,
            contact_id,
            title,
            value,
            stage,
            probability,
            expected_close,
            notes,
            created_at
         FROM deals
         WHERE stage NOT IN ({})
           AND expected_close IS NOT NULL
           AND expected_close <= ?1
         ORDER BY expected_close ASC, id ASC;",
        CLOSED_STAGES_SQL.as_str()
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([format_date(horizon)])?;

    let mut weekly: BTreeMap<i64, f64> = BTreeMap::new();
    let mut total_expected = 0.0;
    let mut deals = Vec::new();
    while let Some(row) = rows.next()? {
        let deal = deal_from_record(&FieldRecord::from_row(row)?)?;
        let Some(expected_close) = deal.expected_close else {
            continue;
        };
        let weighted = deal.weighted_value();
        total_expected += weighted;
        *weekly.entry(week_bucket(today, expected_close)).or_default() += weighted;
        deals.push(snapshot(&deal, weighted, expected_close));
    }
    deals.sort_by(|left, right| left.expected_close.cmp(&right.expected_close));

    debug!(
        "event=report_forecast module=report status=ok days={days} deal_count={} duration_ms={}",
        deals.len(),
        started_at.elapsed().as_millis()
    );
    Ok(RevenueForecast {
        forecast_days: days,
        total_expected: round_money(total_expected),
        deal_count: deals.len(),
        weekly_breakdown: weekly
            .into_iter()
            .map(|(week, expected)| WeekBucket {
                week,
                expected: round_money(expected),
            })
            .collect(),
        deals,
    })
}

fn snapshot(deal: &Deal, weighted: f64, expected_close: NaiveDate) -> ForecastDeal {
    ForecastDeal {
        title: deal.title.clone(),
        value: deal.value,
        probability: deal.probability,
        weighted: round_money(weighted),
        expected_close: format_date(expected_close),
    }
}

/// `today + days`, clamped to four-digit years so the stored date text
/// still compares lexically.
fn forecast_horizon(today: NaiveDate, days: i64) -> NaiveDate {
    let earliest = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN);
    let latest = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX);
    TimeDelta::try_days(days)
        .and_then(|delta| today.checked_add_signed(delta))
        .unwrap_or(if days < 0 { earliest } else { latest })
        .clamp(earliest, latest)
}

#[cfg(test)]
mod tests {
    use super::{forecast_horizon, week_bucket, RevenueForecast, WeekBucket};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_bucket_uses_floor_division() {
        let today = date(2026, 10, 18);
        assert_eq!(week_bucket(today, today), 1);
        assert_eq!(week_bucket(today, date(2026, 10, 24)), 1);
        assert_eq!(week_bucket(today, date(2026, 10, 25)), 2);
        assert_eq!(week_bucket(today, date(2026, 11, 2)), 3);
        // Overdue deals fall below bucket 1.
        assert_eq!(week_bucket(today, date(2026, 10, 17)), 0);
        assert_eq!(week_bucket(today, date(2026, 10, 11)), 0);
        assert_eq!(week_bucket(today, date(2026, 10, 10)), -1);
    }

    #[test]
    fn horizon_clamps_extreme_day_counts() {
        let today = date(2026, 10, 18);
        assert_eq!(forecast_horizon(today, 30), date(2026, 11, 17));
        assert_eq!(forecast_horizon(today, i64::MAX), date(9999, 12, 31));
        assert_eq!(forecast_horizon(today, i64::MIN), date(1, 1, 1));
    }

    #[test]
    fn weekly_breakdown_serializes_as_ordered_label_map() {
        let forecast = RevenueForecast {
            forecast_days: 30,
            total_expected: 30.0,
            deal_count: 2,
            weekly_breakdown: vec![
                WeekBucket {
                    week: -1,
                    expected: 10.0,
                },
                WeekBucket {
                    week: 2,
                    expected: 20.0,
                },
            ],
            deals: Vec::new(),
        };
        let json = serde_json::to_string(&forecast).unwrap();
        assert!(json.contains(r#""weekly_breakdown":{"week_-1":10.0,"week_2":20.0}"#));
        assert_eq!(forecast.weekly_total("week_2"), Some(20.0));
        assert_eq!(forecast.weekly_total("week_1"), None);
    }
}
