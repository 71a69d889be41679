//! Field-level conversions from loosely formatted source cells.
//!
//! Nothing here fails loudly: anything that cannot be read as the wanted type
//! comes back as `None` and the caller stores NULL.

use chrono::{Days, NaiveDate, NaiveDateTime};

use super::source::Cell;

/// Money value of a cell. Numeric cells pass through; text goes through
/// [`parse_money`].
pub fn normalize(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_money(s),
        _ => None,
    }
}

/// Parses `$1,234.56`, `1234.56`, `($50.00)` and friends. Blank and `-` are
/// absent; parenthesized amounts are negative.
pub fn parse_money(raw: &str) -> Option<f64> {
    let value = raw.trim();
    if value.is_empty() || value == "-" {
        return None;
    }

    if let Some(inner) = value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_plain_amount(inner).map(|n| -n);
    }

    parse_plain_amount(value)
}

fn parse_plain_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Renders an amount the way the source sheets do: `$1,234.56`, negatives in
/// parentheses.
pub fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let body = format!("${}.{:02}", group_thousands(cents / 100), cents % 100);
    if value < 0.0 && cents > 0 {
        format!("({body})")
    } else {
        body
    }
}

fn group_thousands(mut n: u64) -> String {
    let mut groups = Vec::new();
    loop {
        if n < 1000 {
            groups.push(n.to_string());
            break;
        }
        groups.push(format!("{:03}", n % 1000));
        n /= 1000;
    }
    groups.reverse();
    groups.join(",")
}

/// `"45%"`, `"45"` or a numeric cell. Blank and garbage are absent.
pub fn parse_percent(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => {
            let trimmed = s.trim();
            let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed);
            let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
            cleaned.trim().parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

const YEAR_FIRST_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const FOUR_DIGIT_YEAR_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%B %d, %Y", "%b %d, %Y", "%d-%b-%Y"];
const TWO_DIGIT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y", "%d-%b-%y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Date a spreadsheet serial day number stands for (1900 date system).
pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.trunc() as u64))
}

pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => date_from_serial(*n),
        Cell::Text(s) => parse_date_text(s),
        _ => None,
    }
}

pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    // `%Y` happily reads "25" as year 25, so four-digit formats only count when
    // they land after 1900; two-digit formats get a go after that.
    let plausible = |d: &NaiveDate| *d > min_date();

    YEAR_FIRST_FORMATS
        .iter()
        .chain(FOUR_DIGIT_YEAR_FORMATS)
        .filter_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .find(plausible)
        .or_else(|| {
            TWO_DIGIT_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Whole days from `"12"`, `"12.0"` or a number. Zero reads as not recorded.
pub fn parse_days(cell: &Cell) -> Option<i32> {
    parse_whole(cell).filter(|days| *days != 0)
}

/// Whole number from text or a numeric cell, truncating any fraction.
pub fn parse_whole(cell: &Cell) -> Option<i32> {
    let value = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    if !value.is_finite() || value.abs() > i32::MAX as f64 {
        return None;
    }
    Some(value.trunc() as i32)
}

pub fn parse_flag(cell: &Cell) -> Option<bool> {
    match cell {
        Cell::Bool(b) => Some(*b),
        Cell::Number(n) => Some(*n != 0.0),
        Cell::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "1" | "x" | "listed" => Some(true),
            "no" | "n" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn blank_and_dash_are_absent() {
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("   "), None);
        assert_eq!(parse_money("-"), None);
        assert_eq!(parse_money(" - "), None);
        assert_eq!(normalize(&Cell::Empty), None);
    }

    #[test]
    fn parses_currency_strings() {
        assert_eq!(parse_money("$1,200"), Some(1200.0));
        assert_eq!(parse_money(" $1,234.56 "), Some(1234.56));
        assert_eq!(parse_money("($50.00)"), Some(-50.0));
        assert_eq!(parse_money("(1,000)"), Some(-1000.0));
        assert_eq!(parse_money("-$12.50"), Some(-12.5));
        assert_eq!(parse_money("42"), Some(42.0));
    }

    #[test]
    fn garbage_is_absent_not_an_error() {
        assert_eq!(parse_money("N/A"), None);
        assert_eq!(parse_money("($)"), None);
        assert_eq!(parse_money("()"), None);
        assert_eq!(parse_money("inf"), None);
        assert_eq!(normalize(&text("TBD")), None);
        assert_eq!(normalize(&Cell::Bool(true)), None);
    }

    #[test]
    fn numeric_cells_pass_through() {
        assert_eq!(normalize(&Cell::Number(19.99)), Some(19.99));
        assert_eq!(normalize(&Cell::Number(f64::NAN)), None);
    }

    #[test]
    fn formatted_amounts_parse_back() {
        for value in [0.0, 5.0, 1234.56, -1234.56, 1_000_000.01, -0.99] {
            assert_eq!(parse_money(&format_money(value)), Some(value), "{value}");
        }
        assert_eq!(format_money(1234.56), "$1,234.56");
        assert_eq!(format_money(-50.0), "($50.00)");
    }

    #[test]
    fn percent_strips_trailing_sign() {
        assert_eq!(parse_percent(&text("45%")), Some(45.0));
        assert_eq!(parse_percent(&text(" -12.5 % ")), Some(-12.5));
        assert_eq!(parse_percent(&Cell::Number(0.35)), Some(0.35));
        assert_eq!(parse_percent(&text("n/a")), None);
        assert_eq!(parse_percent(&Cell::Empty), None);
    }

    #[test]
    fn dates_in_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 7);
        assert_eq!(parse_date(&text("3/7/2025")), expected);
        assert_eq!(parse_date(&text("03/07/25")), expected);
        assert_eq!(parse_date(&text("2025-03-07")), expected);
        assert_eq!(parse_date(&text("March 7, 2025")), expected);
        assert_eq!(parse_date(&text("2025-03-07 14:30:00")), expected);
        assert_eq!(parse_date(&Cell::Number(45723.0)), expected);
        assert_eq!(parse_date(&text("sometime in March")), None);
    }

    #[test]
    fn days_and_flags() {
        assert_eq!(parse_days(&text("12")), Some(12));
        assert_eq!(parse_days(&text("12.0")), Some(12));
        assert_eq!(parse_days(&text("0")), None);
        assert_eq!(parse_days(&Cell::Number(30.0)), Some(30));
        assert_eq!(parse_flag(&text("Yes")), Some(true));
        assert_eq!(parse_flag(&text("no")), Some(false));
        assert_eq!(parse_flag(&Cell::Bool(true)), Some(true));
        assert_eq!(parse_flag(&text("maybe")), None);
    }
}
