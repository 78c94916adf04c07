use chrono::Datelike;

use super::dto::{MaxTemperatureRecord, MonthYear, SummaryResponse};
use crate::db::models::SensorRecord;

/// Full scan over every stored record: temperature extremes and mean, the
/// records tied at the maximum, and the distinct months those fall in.
pub fn summarize(records: &[SensorRecord]) -> SummaryResponse {
    let Some(max) = records.iter().map(|r| r.temperature).reduce(f64::max) else {
        return SummaryResponse::default();
    };
    let min = records
        .iter()
        .map(|r| r.temperature)
        .fold(f64::INFINITY, f64::min);
    let mean = records.iter().map(|r| r.temperature).sum::<f64>() / records.len() as f64;

    let max_temperature_records: Vec<MaxTemperatureRecord> = records
        .iter()
        .filter(|r| r.temperature == max)
        .map(|r| MaxTemperatureRecord {
            id: r.id,
            temperature: r.temperature,
            humidity: r.humidity,
            light: r.light,
            captured_at: r.captured_at,
        })
        .collect();

    let mut max_temperature_months: Vec<MonthYear> = Vec::new();
    for r in &max_temperature_records {
        let month_year = format!("{}-{}", r.captured_at.month(), r.captured_at.year());
        if !max_temperature_months.iter().any(|m| m.month_year == month_year) {
            max_temperature_months.push(MonthYear { month_year });
        }
    }

    SummaryResponse {
        max_temperature: Some(max),
        min_temperature: Some(min),
        mean_temperature: Some((mean * 100.0).round() / 100.0),
        max_temperature_records,
        max_temperature_months,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn rec(id: i64, temperature: f64, captured_at: &str) -> SensorRecord {
        SensorRecord {
            id,
            temperature,
            humidity: Some(50.0),
            light: 100,
            captured_at: captured_at.parse::<DateTime<Utc>>().unwrap(),
        }
    }

    #[test]
    fn empty_dataset_yields_null_aggregates() {
        let s = summarize(&[]);
        assert_eq!(s.max_temperature, None);
        assert_eq!(s.min_temperature, None);
        assert_eq!(s.mean_temperature, None);
        assert!(s.max_temperature_records.is_empty());
        assert!(s.max_temperature_months.is_empty());
    }

    #[test]
    fn aggregates_and_rounds_mean() {
        let records = [
            rec(1, 20.0, "2025-01-10T00:00:00Z"),
            rec(2, 21.0, "2025-01-11T00:00:00Z"),
            rec(3, 21.0, "2025-01-12T00:00:00Z"),
        ];
        let s = summarize(&records);
        assert_eq!(s.max_temperature, Some(21.0));
        assert_eq!(s.min_temperature, Some(20.0));
        assert_eq!(s.mean_temperature, Some(20.67));
    }

    #[test]
    fn ties_at_maximum_are_all_reported() {
        let records = [
            rec(1, 31.5, "2025-02-01T00:00:00Z"),
            rec(2, 25.0, "2025-02-02T00:00:00Z"),
            rec(3, 31.5, "2025-03-05T00:00:00Z"),
        ];
        let s = summarize(&records);
        let ids: Vec<i64> = s.max_temperature_records.iter().map(|r| r.id).collect();
        assert_eq!(ids, [1, 3]);
        assert_eq!(s.max_temperature_records[0].humidity, Some(50.0));
    }

    #[test]
    fn months_are_distinct_in_first_seen_order() {
        let records = [
            rec(1, 30.0, "2025-03-01T00:00:00Z"),
            rec(2, 30.0, "2024-12-31T23:00:00Z"),
            rec(3, 30.0, "2025-03-20T00:00:00Z"),
            rec(4, 10.0, "2025-07-01T00:00:00Z"),
        ];
        let s = summarize(&records);
        let months: Vec<&str> = s
            .max_temperature_months
            .iter()
            .map(|m| m.month_year.as_str())
            .collect();
        assert_eq!(months, ["3-2025", "12-2024"]);
    }

    #[test]
    fn single_record() {
        let s = summarize(&[rec(9, -4.25, "2025-11-30T12:00:00Z")]);
        assert_eq!(s.max_temperature, Some(-4.25));
        assert_eq!(s.min_temperature, Some(-4.25));
        assert_eq!(s.mean_temperature, Some(-4.25));
        assert_eq!(s.max_temperature_months[0].month_year, "11-2025");
    }
}
