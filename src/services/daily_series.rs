//! Calendar-day bucketing of usage records.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate};

use crate::models::{DailyBucket, UsageRecord};

const DAY_LABEL_FORMAT: &str = "%d/%m";

/// Sum usage per calendar day in `offset`, oldest day first, keeping only
/// the most recent `series_days` days.
///
/// Buckets are ordered by calendar date, not by their `DD/MM` label, so a
/// series crossing a month or year boundary is not lexically sorted.
///
/// Records without a timestamp are left out. When no day remains the series
/// is a single zero bucket labelled `empty_label`.
pub fn build_daily_series(
    records: &[UsageRecord],
    offset: FixedOffset,
    series_days: usize,
    empty_label: &str,
) -> Vec<DailyBucket> {
    let mut days: BTreeMap<NaiveDate, (i64, f64)> = BTreeMap::new();
    for record in records {
        let Some(created_at) = record.created_at else {
            continue;
        };
        let day = created_at.with_timezone(&offset).date_naive();
        let entry = days.entry(day).or_insert((0, 0.0));
        entry.0 = entry.0.saturating_add(record.tokens);
        entry.1 += record.cost;
    }

    let skip = days.len().saturating_sub(series_days);
    let series: Vec<DailyBucket> = days
        .into_iter()
        .skip(skip)
        .map(|(day, (tokens, cost))| DailyBucket {
            date: day.format(DAY_LABEL_FORMAT).to_string(),
            tokens,
            cost,
        })
        .collect();

    if series.is_empty() {
        return vec![DailyBucket {
            date: empty_label.to_string(),
            tokens: 0,
            cost: 0.0,
        }];
    }
    series
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(rfc3339: &str) -> Option<DateTime<Utc>> {
        Some(
            DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc),
        )
    }

    fn record(tokens: i64, cost: f64, created_at: Option<DateTime<Utc>>) -> UsageRecord {
        UsageRecord {
            tokens,
            cost,
            created_at,
        }
    }

    #[test]
    fn test_same_day_rows_share_a_bucket() {
        let records = vec![
            record(100, 0.01, at("2024-01-05T08:00:00Z")),
            record(50, 0.005, at("2024-01-05T21:00:00Z")),
            record(10, 0.001, at("2024-01-06T09:00:00Z")),
        ];

        let series = build_daily_series(&records, utc(), 7, "Today");

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, "05/01");
        assert_eq!(series[0].tokens, 150);
        assert!((series[0].cost - 0.015).abs() < 1e-12);
        assert_eq!(series[1].date, "06/01");
        assert_eq!(series[1].tokens, 10);
    }

    #[test]
    fn test_keeps_most_recent_days_ascending() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        // Ten days, fed newest first
        let records: Vec<_> = (0..10)
            .rev()
            .map(|i| record(i + 1, 0.0, Some(start + Duration::days(i))))
            .collect();

        let series = build_daily_series(&records, utc(), 7, "Today");

        let labels: Vec<_> = series.iter().map(|b| b.date.as_str()).collect();
        assert_eq!(
            labels,
            vec!["04/01", "05/01", "06/01", "07/01", "08/01", "09/01", "10/01"]
        );
        assert_eq!(series.first().unwrap().tokens, 4);
        assert_eq!(series.last().unwrap().tokens, 10);
    }

    #[test]
    fn test_orders_across_month_boundary() {
        let records = vec![
            record(1, 0.0, at("2024-02-01T10:00:00Z")),
            record(2, 0.0, at("2024-01-31T10:00:00Z")),
        ];
        let series = build_daily_series(&records, utc(), 7, "Today");
        let labels: Vec<_> = series.iter().map(|b| b.date.as_str()).collect();
        assert_eq!(labels, vec!["31/01", "01/02"]);
    }

    #[test]
    fn test_days_follow_tenant_offset() {
        // 01:30 UTC on the 6th is still the 5th at UTC-03:00
        let records = vec![
            record(5, 0.0, at("2024-01-05T20:00:00Z")),
            record(7, 0.0, at("2024-01-06T01:30:00Z")),
        ];
        let brasilia = FixedOffset::west_opt(3 * 3600).unwrap();

        let series = build_daily_series(&records, brasilia, 7, "Today");
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, "05/01");
        assert_eq!(series[0].tokens, 12);

        let series = build_daily_series(&records, utc(), 7, "Today");
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_empty_series_is_single_zero_bucket() {
        let series = build_daily_series(&[], utc(), 7, "Hoje");
        assert_eq!(
            series,
            vec![DailyBucket {
                date: "Hoje".into(),
                tokens: 0,
                cost: 0.0,
            }]
        );
    }

    #[test]
    fn test_records_without_timestamp_are_skipped() {
        let records = vec![record(99, 1.0, None)];
        let series = build_daily_series(&records, utc(), 7, "Today");
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, "Today");
        assert_eq!(series[0].tokens, 0);
    }
}
