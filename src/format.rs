use std::str::FromStr;

use chrono::{DateTime, Locale, NaiveDate, SecondsFormat, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::columns::{ColumnSpec, ColumnType, DateParts, DayStyle, MonthStyle, TypeAttributes, YearStyle};
use crate::record::RecordRow;

/// All display formatting is done for a fixed locale.
pub const DISPLAY_LOCALE: Locale = Locale::fr_FR;

// fr-FR separators
const GROUP_SEPARATOR: char = '\u{202f}';
const DECIMAL_SEPARATOR: char = ',';
const SYMBOL_SEPARATOR: char = '\u{a0}';

/// Parse a raw date field. Accepts epoch milliseconds, RFC 3339, the
/// platform's `2024-03-05T10:00:00.000+0000` form and plain `2024-03-05`
/// dates (taken as midnight UTC).
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        }
        _ => None,
    }
}

/// Canonical string for a parsed date, sortable as plain text.
pub fn iso_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn date_pattern(parts: &DateParts) -> String {
    let day = match parts.day {
        DayStyle::Numeric => "%-d",
        DayStyle::TwoDigit => "%d",
    };
    let year = match parts.year {
        YearStyle::Numeric => "%Y",
        YearStyle::TwoDigit => "%y",
    };
    match parts.month {
        MonthStyle::Long => format!("{day} %B {year}"),
        MonthStyle::Short => format!("{day} %b {year}"),
        MonthStyle::Numeric => format!("{day}/%m/{year}"),
    }
}

pub fn format_date(dt: &DateTime<Utc>, parts: &DateParts) -> String {
    dt.format_localized(&date_pattern(parts), DISPLAY_LOCALE)
        .to_string()
}

fn currency_symbol(code: &str) -> &str {
    match code {
        "EUR" => "€",
        "GBP" => "£",
        "USD" => "$US",
        other => other,
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}

fn group_digits(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * 3);
    for (idx, chr) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(chr);
    }
    grouped
}

/// Format an amount the way the fr-FR locale shows currencies,
/// e.g. `1 234,50 €`.
pub fn format_currency(value: &Value, currency_code: &str, fraction_digits: u32) -> Option<String> {
    let mut amount = to_decimal(value)?
        .round_dp_with_strategy(fraction_digits, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(fraction_digits);

    let text = amount.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::new();
    if amount.is_sign_negative() && !amount.is_zero() {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));
    if let Some(frac) = frac_part {
        out.push(DECIMAL_SEPARATOR);
        out.push_str(frac);
    }
    out.push(SYMBOL_SEPARATOR);
    out.push_str(currency_symbol(currency_code));
    Some(out)
}

/// Text shown in a table cell for the given column.
pub fn display_cell(row: &RecordRow, column: &ColumnSpec) -> String {
    let Some(value) = row.get(column.field_name) else {
        return String::new();
    };
    match (column.column_type, column.type_attributes) {
        (ColumnType::Date, TypeAttributes::Date(parts)) => parse_timestamp(value)
            .map(|dt| format_date(&dt, &parts))
            .unwrap_or_else(|| row.text(column.field_name)),
        (
            ColumnType::Currency,
            TypeAttributes::Currency {
                currency_code,
                fraction_digits,
            },
        ) => format_currency(value, currency_code, fraction_digits)
            .unwrap_or_else(|| row.text(column.field_name)),
        _ => row.text(column.field_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{CASE_COLUMNS, CASE_DATE_PARTS, CLOSE_DATE_PARTS, OPPORTUNITY_COLUMNS};
    use serde_json::json;

    #[test]
    fn parses_the_supported_date_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(parse_timestamp(&json!("2024-03-05")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-03-05T00:00:00Z")), Some(expected));
        assert_eq!(
            parse_timestamp(&json!("2024-03-05T00:00:00.000+0000")),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(parse_timestamp(&json!("mars")), None);
        assert_eq!(parse_timestamp(&json!(true)), None);
    }

    #[test]
    fn close_dates_use_french_long_form() {
        let dt = parse_timestamp(&json!("2024-03-05")).unwrap();
        assert_eq!(format_date(&dt, &CLOSE_DATE_PARTS), "5 mars 2024");
        assert_eq!(format_date(&dt, &CASE_DATE_PARTS), "05 mars 2024");
    }

    #[test]
    fn currency_uses_french_grouping() {
        assert_eq!(
            format_currency(&json!(1234.5), "EUR", 2).unwrap(),
            "1\u{202f}234,50\u{a0}€"
        );
        assert_eq!(format_currency(&json!(50), "EUR", 2).unwrap(), "50,00\u{a0}€");
        assert_eq!(
            format_currency(&json!(-1234567.555), "EUR", 2).unwrap(),
            "-1\u{202f}234\u{202f}567,56\u{a0}€"
        );
        assert_eq!(format_currency(&json!("abc"), "EUR", 2), None);
    }

    #[test]
    fn cells_render_by_column_type() {
        let row = RecordRow::new()
            .with("Subject", "Printer on fire")
            .with("CreatedDate", "2024-03-05T09:30:00.000Z")
            .with("Amount", 100)
            .with("CloseDate", "5 mars 2024");
        assert_eq!(display_cell(&row, &CASE_COLUMNS[0]), "Printer on fire");
        assert_eq!(display_cell(&row, &CASE_COLUMNS[3]), "05 mars 2024");
        assert_eq!(display_cell(&row, &OPPORTUNITY_COLUMNS[1]), "100,00\u{a0}€");
        // already formatted values are shown as is
        assert_eq!(display_cell(&row, &OPPORTUNITY_COLUMNS[2]), "5 mars 2024");
        assert_eq!(display_cell(&row, &OPPORTUNITY_COLUMNS[3]), "");
    }
}
