//! Field normalization for heterogeneous textual input.
//!
//! The source feeds arrive with mixed date formats, numeric strings that may
//! be blank or garbage, camelCase column names, and multi-value image cells
//! joined by a full-width comma. Everything here is a pure function that maps
//! messy text to a typed value or `None` — absence is a value, not an error.

use chrono::NaiveDate;

/// Converts an external camelCase key to its canonical snake_case attribute
/// name. A separator is inserted before each run that starts a new capitalized
/// word, then the whole string is lowercased. Idempotent on names that are
/// already canonical.
///
/// Uppercase runs collapse into a single word: `identificationID` becomes
/// `identification_id`, not `identification_i_d`.
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_word_char =
                i > 0 && (chars[i - 1].is_ascii_lowercase() || chars[i - 1].is_ascii_digit());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            let next_lower = i + 1 < chars.len() && chars[i + 1].is_ascii_lowercase();

            if prev_word_char || (prev_upper && next_lower) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Date formats tried in priority order. Month-precision formats resolve to
/// the first day of the month, year-precision to January 1st.
const DATE_FORMATS: &[(&str, DatePrecision)] = &[
    ("%Y-%m-%d", DatePrecision::Day),
    ("%Y/%m/%d", DatePrecision::Day),
    ("%Y.%m.%d", DatePrecision::Day),
    ("%Y-%m", DatePrecision::Month),
    ("%Y/%m", DatePrecision::Month),
    ("%Y.%m", DatePrecision::Month),
    ("%Y年%m月%d日", DatePrecision::Day),
    ("%Y年%m月", DatePrecision::Month),
    ("%Y年", DatePrecision::Year),
    ("%d/%m/%Y", DatePrecision::Day),
    ("%d-%m-%Y", DatePrecision::Day),
    ("%d.%m.%Y", DatePrecision::Day),
];

#[derive(Clone, Copy)]
enum DatePrecision {
    Day,
    Month,
    Year,
}

/// Parses a free-text date string against the known format list; the first
/// format that parses wins. When no format matches, the first run of four
/// ASCII digits is taken as a year and January 1st of that year is returned.
/// Empty input, or input with no usable year, yields `None`. Never errors.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }

    for (format, precision) in DATE_FORMATS {
        // chrono needs day (and month) fields present to produce a date, so
        // lower-precision formats get the missing fields appended with a glue
        // character that cannot occur in the input format itself.
        let parsed = match precision {
            DatePrecision::Day => NaiveDate::parse_from_str(v, format),
            DatePrecision::Month => {
                NaiveDate::parse_from_str(&format!("{v}\u{1}1"), &format!("{format}\u{1}%d"))
            }
            DatePrecision::Year => {
                NaiveDate::parse_from_str(&format!("{v}\u{1}1\u{1}1"), &format!("{format}\u{1}%m\u{1}%d"))
            }
        };
        if let Ok(date) = parsed {
            return Some(date);
        }
    }

    extract_year(v).and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
}

/// Finds the first run of four consecutive ASCII digits and reads it as a year.
fn extract_year(value: &str) -> Option<i32> {
    let chars: Vec<char> = value.chars().collect();
    for window in chars.windows(4) {
        if window.iter().all(|c| c.is_ascii_digit()) {
            let year: String = window.iter().collect();
            return year.parse().ok();
        }
    }
    None
}

/// Parses a floating-point field. Blank or malformed input yields `None`;
/// non-finite values are discarded so that stored coordinates and elevations
/// are always finite numbers or absent.
pub fn parse_float(value: &str) -> Option<f64> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    v.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Trims a text field, mapping the empty string to `None`.
pub fn clean_text(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Normalizes a multi-value image cell. The source feed joins several image
/// file names with a full-width comma (`、`), with stray whitespace around the
/// delimiter. Each non-empty trimmed segment is prefixed with the `images/`
/// path segment and the result is re-joined with a single ASCII pipe.
pub fn normalize_image_refs(value: &str) -> Option<String> {
    let parts: Vec<String> = value
        .split('、')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("images/{s}"))
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("|"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_to_snake_basic() {
        assert_eq!(camel_to_snake("scientificName"), "scientific_name");
        assert_eq!(camel_to_snake("chineseKingdomName"), "chinese_kingdom_name");
        assert_eq!(camel_to_snake("decimalLatitude"), "decimal_latitude");
        assert_eq!(
            camel_to_snake("minimumElevationInMeters"),
            "minimum_elevation_in_meters"
        );
    }

    #[test]
    fn camel_to_snake_uppercase_runs() {
        assert_eq!(camel_to_snake("identificationID"), "identification_id");
        assert_eq!(camel_to_snake("ABCDef"), "abc_def");
    }

    #[test]
    fn camel_to_snake_idempotent() {
        for name in ["scientific_name", "class", "order", "citation1", "habitat"] {
            assert_eq!(camel_to_snake(name), name);
            assert_eq!(camel_to_snake(&camel_to_snake(name)), name);
        }
        let once = camel_to_snake("identificationID");
        assert_eq!(camel_to_snake(&once), once);
    }

    #[test]
    fn camel_to_snake_digits() {
        assert_eq!(camel_to_snake("citation1"), "citation1");
        assert_eq!(camel_to_snake("cite2Name"), "cite2_name");
    }

    #[test]
    fn parse_date_full_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 10).unwrap();
        assert_eq!(parse_date("2023-05-10"), Some(expected));
        assert_eq!(parse_date("2023/05/10"), Some(expected));
        assert_eq!(parse_date("2023.05.10"), Some(expected));
        assert_eq!(parse_date("2023年5月10日"), Some(expected));
        assert_eq!(parse_date("10/05/2023"), Some(expected));
        assert_eq!(parse_date("10-05-2023"), Some(expected));
        assert_eq!(parse_date("10.05.2023"), Some(expected));
    }

    #[test]
    fn parse_date_month_precision() {
        let expected = NaiveDate::from_ymd_opt(2023, 5, 1).unwrap();
        assert_eq!(parse_date("2023-05"), Some(expected));
        assert_eq!(parse_date("2023/5"), Some(expected));
        assert_eq!(parse_date("2023年5月"), Some(expected));
    }

    #[test]
    fn parse_date_year_precision() {
        assert_eq!(parse_date("2019年"), NaiveDate::from_ymd_opt(2019, 1, 1));
    }

    #[test]
    fn parse_date_year_extraction_fallback() {
        assert_eq!(
            parse_date("circa 1998 survey"),
            NaiveDate::from_ymd_opt(1998, 1, 1)
        );
        assert_eq!(parse_date("collected 2005"), NaiveDate::from_ymd_opt(2005, 1, 1));
    }

    #[test]
    fn parse_date_unparseable() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("day 12"), None);
    }

    #[test]
    fn parse_float_values() {
        assert_eq!(parse_float("102.74"), Some(102.74));
        assert_eq!(parse_float("  -12.5 "), Some(-12.5));
        assert_eq!(parse_float(""), None);
        assert_eq!(parse_float("   "), None);
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn parse_float_rejects_non_finite() {
        assert_eq!(parse_float("inf"), None);
        assert_eq!(parse_float("NaN"), None);
        assert_eq!(parse_float("1e999"), None);
    }

    #[test]
    fn clean_text_trims_and_nulls() {
        assert_eq!(clean_text("  Rosa  "), Some("Rosa".to_string()));
        assert_eq!(clean_text(""), None);
        assert_eq!(clean_text("   "), None);
    }

    #[test]
    fn image_refs_split_and_prefix() {
        assert_eq!(
            normalize_image_refs("a.jpg、 b.jpg 、c.jpg"),
            Some("images/a.jpg|images/b.jpg|images/c.jpg".to_string())
        );
        assert_eq!(
            normalize_image_refs("one.png"),
            Some("images/one.png".to_string())
        );
    }

    #[test]
    fn image_refs_drop_empty_segments() {
        assert_eq!(
            normalize_image_refs("a.jpg、、 、b.jpg"),
            Some("images/a.jpg|images/b.jpg".to_string())
        );
        assert_eq!(normalize_image_refs("、 、"), None);
        assert_eq!(normalize_image_refs(""), None);
    }
}
