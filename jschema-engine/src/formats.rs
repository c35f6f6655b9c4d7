//! Built-in `format` predicates
//!
//! Formats are one-shot predicates over string instances. Names missing from
//! both the configuration map and this table annotate and pass. Everything
//! here is lexical validation only; no network or filesystem access.

use jschema_core::config::RegexDialect;
use crate::pattern;
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::Url;

/// Look up a built-in format predicate by name
#[must_use]
pub fn lookup(name: &str) -> Option<fn(&str) -> bool> {
    match name {
        "date-time" => Some(is_date_time),
        "date" => Some(is_date),
        "time" => Some(is_time),
        "duration" => Some(is_duration),
        "email" => Some(is_email),
        "hostname" => Some(is_hostname),
        "ipv4" => Some(is_ipv4),
        "ipv6" => Some(is_ipv6),
        "uri" => Some(is_uri),
        "uri-reference" => Some(is_uri_reference),
        "uuid" => Some(is_uuid),
        "json-pointer" => Some(is_json_pointer),
        "relative-json-pointer" => Some(is_relative_json_pointer),
        "regex" => Some(is_regex),
        _ => None,
    }
}

fn leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn valid_ymd(year: u32, month: u32, day: u32) -> bool {
    if !(1..=12).contains(&month) || day == 0 {
        return false;
    }
    let max_day = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap_year(year) => 29,
        _ => 28,
    };
    day <= max_day
}

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("static regex"));

fn is_date(value: &str) -> bool {
    let Some(captures) = DATE_RE.captures(value) else {
        return false;
    };
    let field = |i: usize| captures[i].parse::<u32>().ok();
    match (field(1), field(2), field(3)) {
        (Some(year), Some(month), Some(day)) => valid_ymd(year, month, day),
        _ => false,
    }
}

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(?:\.\d+)?(?:[zZ]|[+-]\d{2}:\d{2})$")
        .expect("static regex")
});

fn is_time(value: &str) -> bool {
    let Some(captures) = TIME_RE.captures(value) else {
        return false;
    };
    let field = |i: usize| captures[i].parse::<u32>().ok();
    match (field(1), field(2), field(3)) {
        // 60 seconds is allowed for leap seconds
        (Some(hour), Some(minute), Some(second)) => hour < 24 && minute < 60 && second <= 60,
        _ => false,
    }
}

fn is_date_time(value: &str) -> bool {
    let Some((date, time)) = value.split_once(['T', 't']) else {
        return false;
    };
    is_date(date) && is_time(time)
}

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:\d+W|(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?)$")
        .expect("static regex")
});

fn is_duration(value: &str) -> bool {
    // "P" and "P...T" with no components are not durations
    DURATION_RE.is_match(value) && value.len() > 1 && !value.ends_with('T')
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$"#)
        .expect("static regex")
});

fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("static regex")
});

fn is_hostname(value: &str) -> bool {
    value.len() <= 253 && HOSTNAME_RE.is_match(value)
}

fn is_ipv4(value: &str) -> bool {
    value.parse::<Ipv4Addr>().is_ok()
}

fn is_ipv6(value: &str) -> bool {
    value.parse::<Ipv6Addr>().is_ok()
}

fn is_uri(value: &str) -> bool {
    Url::parse(value).is_ok()
}

fn is_uri_reference(value: &str) -> bool {
    if Url::parse(value).is_ok() {
        return true;
    }
    // Relative references validate against a synthetic base
    let base = Url::parse("jschema://relative-base/").expect("static URI");
    base.join(value).is_ok()
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("static regex")
});

fn is_uuid(value: &str) -> bool {
    UUID_RE.is_match(value)
}

fn is_json_pointer(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    if !value.starts_with('/') {
        return false;
    }
    // "~" must be followed by "0" or "1"
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '~' && !matches!(chars.peek(), Some('0' | '1')) {
            return false;
        }
    }
    true
}

fn is_relative_json_pointer(value: &str) -> bool {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return false;
    }
    let rest = &value[digits.len()..];
    rest.is_empty() || rest == "#" || is_json_pointer(rest)
}

fn is_regex(value: &str) -> bool {
    pattern::compile(value, RegexDialect::Native).is_ok()
}
