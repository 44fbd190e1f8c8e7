//! HTTP-date parsing: RFC 1123, RFC 850, and asctime formats (RFC 7231 §7.1.1.1).
//!
//! Naive (timezone-less) times are treated as UTC. Returns epoch seconds.

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parses an HTTP-date header value, trying RFC 1123, RFC 850, then asctime.
pub fn parse_http_date(value: &str) -> Option<f64> {
    let value = value.trim();
    parse_rfc1123(value)
        .or_else(|| parse_rfc850(value))
        .or_else(|| parse_asctime(value))
}

/// `Sun, 06 Nov 1994 08:49:37 GMT`
fn parse_rfc1123(value: &str) -> Option<f64> {
    let rest = value.split_once(", ")?.1;
    let mut parts = rest.split_whitespace();
    let day: u32 = parts.next()?.parse().ok()?;
    let month = month_index(parts.next()?)?;
    let year: i64 = parts.next()?.parse().ok()?;
    let (h, m, s) = parse_hms(parts.next()?)?;
    epoch_seconds(year, month, day, h, m, s)
}

/// `Sunday, 06-Nov-94 08:49:37 GMT`
fn parse_rfc850(value: &str) -> Option<f64> {
    let rest = value.split_once(", ")?.1;
    let mut parts = rest.split_whitespace();
    let date = parts.next()?;
    let (day_s, month_s, year_s) = {
        let mut it = date.split('-');
        (it.next()?, it.next()?, it.next()?)
    };
    let day: u32 = day_s.parse().ok()?;
    let month = month_index(month_s)?;
    let year_2d: i64 = year_s.parse().ok()?;
    let year = if year_2d < 70 { 2000 + year_2d } else { 1900 + year_2d };
    let (h, m, s) = parse_hms(parts.next()?)?;
    epoch_seconds(year, month, day, h, m, s)
}

/// `Sun Nov  6 08:49:37 1994`
fn parse_asctime(value: &str) -> Option<f64> {
    let mut parts = value.split_whitespace();
    let _weekday = parts.next()?;
    let month = month_index(parts.next()?)?;
    let day: u32 = parts.next()?.parse().ok()?;
    let (h, m, s) = parse_hms(parts.next()?)?;
    let year: i64 = parts.next()?.parse().ok()?;
    epoch_seconds(year, month, day, h, m, s)
}

fn parse_hms(value: &str) -> Option<(u32, u32, u32)> {
    let mut parts = value.splitn(3, ':');
    let h: u32 = parts.next()?.parse().ok()?;
    let m: u32 = parts.next()?.parse().ok()?;
    let s: u32 = parts.next()?.parse().ok()?;
    Some((h, m, s))
}

fn month_index(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .map(|i| i as u32 + 1)
}

/// Days since the Unix epoch for `year-month-day` (proleptic Gregorian),
/// converted to seconds and combined with the time of day. No leap seconds.
fn epoch_seconds(year: i64, month: u32, day: u32, h: u32, m: u32, s: u32) -> Option<f64> {
    if !(1..=12).contains(&month) || day == 0 || day > 31 || h > 23 || m > 59 || s > 60 {
        return None;
    }
    let days = days_from_civil(year, month as i64, day as i64);
    let seconds = days * 86_400 + h as i64 * 3600 + m as i64 * 60 + s as i64;
    Some(seconds as f64)
}

/// Howard Hinnant's `days_from_civil` algorithm: days since 1970-01-01 for a
/// proleptic-Gregorian (year, month, day).
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc1123() {
        let t = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(t, 784_111_777.0);
    }

    #[test]
    fn rfc850() {
        let t = parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT").unwrap();
        assert_eq!(t, 784_111_777.0);
    }

    #[test]
    fn asctime() {
        let t = parse_http_date("Sun Nov  6 08:49:37 1994").unwrap();
        assert_eq!(t, 784_111_777.0);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_http_date("not a date"), None);
        assert_eq!(parse_http_date(""), None);
    }
}
