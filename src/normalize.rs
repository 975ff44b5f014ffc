use std::sync::LazyLock;

use regex::Regex;

static DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static CATEGORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"books/[^_]+_(\d+)/").unwrap());

/// Parse a display price such as `£51.77`. Anything that is not a digit or a
/// dot is dropped first; unparseable or absent input gives `0.0`.
pub fn clean_price(value: Option<&str>) -> f64 {
    let Some(value) = value else {
        return 0.0;
    };
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

/// First run of digits in a stock message, e.g. `In stock (22 available)` → 22.
pub fn clean_availability(value: Option<&str>) -> i64 {
    value
        .and_then(|v| DIGITS_RE.find(v))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Category id from a breadcrumb href like `../category/books/poetry_23/index.html`.
///
/// The stored id is the site's number plus one.
pub fn category_id_from_href(href: &str) -> Option<i64> {
    let caps = CATEGORY_RE.captures(href)?;
    let id: i64 = caps[1].parse().ok()?;
    id.checked_add(1)
}
