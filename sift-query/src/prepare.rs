//! Per-rule normalization of the column wrapper and comparison values.
//!
//! Before a rule is templated, its column expression may need wrapping and
//! its values converting:
//!
//! - nullable `text`/`blob` columns are coalesced to `''` so NULL compares as
//!   empty rather than unknown;
//! - `date` columns are truncated to the finest precision any value needs
//!   (never coarser than a day), and the values are truncated to match;
//! - `contact` values of `"me"` become the acting contact's id;
//! - `LIKE`-family values have their wildcards escaped.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex_lite::Regex;

use crate::error::{CompileError, CompileResult};
use crate::rule::{Rule, RuleValue, ValueType};
use crate::value::FilterValue;

/// Sentinel contact value replaced by the acting contact's id.
pub const ME: &str = "me";

static RELATIVE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$now(?:\(((?:[yMdhms]:-?\d+)(?:,[yMdhms]:-?\d+)*)\))?$")
        .expect("relative date pattern is valid")
});

/// Granularity of a date value, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatePrecision {
    /// Whole seconds.
    Second,
    /// Whole minutes.
    Minute,
    /// Whole hours.
    Hour,
    /// Whole days.
    Day,
    /// Whole months.
    Month,
    /// Whole years.
    Year,
}

impl DatePrecision {
    /// Format that zeroes every component finer than this precision.
    ///
    /// Understood by both SQLite's `strftime` and chrono.
    pub fn format(&self) -> &'static str {
        match self {
            Self::Second => "%Y-%m-%d %H:%M:%S",
            Self::Minute => "%Y-%m-%d %H:%M:00",
            Self::Hour => "%Y-%m-%d %H:00:00",
            Self::Day => "%Y-%m-%d 00:00:00",
            Self::Month => "%Y-%m-01 00:00:00",
            Self::Year => "%Y-01-01 00:00:00",
        }
    }

    /// Render `instant` truncated to this precision.
    pub fn truncate(&self, instant: &NaiveDateTime) -> String {
        instant.format(self.format()).to_string()
    }

    fn from_unit(unit: &str) -> Option<Self> {
        match unit {
            "y" => Some(Self::Year),
            "M" => Some(Self::Month),
            "d" => Some(Self::Day),
            "h" => Some(Self::Hour),
            "m" => Some(Self::Minute),
            "s" => Some(Self::Second),
            _ => None,
        }
    }
}

/// How the column expression is wrapped before templating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnWrap {
    /// Column used as-is.
    Identity,
    /// `COALESCE(col, '')`.
    CoalesceEmpty,
    /// `strftime(<format>, col)`.
    Truncate(DatePrecision),
}

impl ColumnWrap {
    /// Wrap a column expression.
    pub fn apply(&self, column: &str) -> String {
        match self {
            Self::Identity => column.to_string(),
            Self::CoalesceEmpty => format!("COALESCE({column}, '')"),
            Self::Truncate(precision) => format!("strftime('{}', {column})", precision.format()),
        }
    }
}

/// Ambient inputs to preparation.
#[derive(Debug, Clone, Copy)]
pub struct PrepareContext<'a> {
    /// Id substituted for `"me"`.
    pub actor: Option<&'a str>,
    /// Whether the rule's column may hold NULL.
    pub nullable: bool,
    /// Instant relative dates are resolved against.
    pub now: DateTime<Utc>,
}

/// A rule ready for templating.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRule {
    /// Column wrapper.
    pub wrap: ColumnWrap,
    /// Values bound as `:a`, `:b`, ...
    pub values: Vec<FilterValue>,
}

/// Normalize a rule's column wrapper and values.
pub fn prepare(rule: &Rule, ctx: &PrepareContext<'_>) -> CompileResult<PreparedRule> {
    match rule.value_type {
        ValueType::Text | ValueType::Blob => prepare_text(rule, ctx),
        ValueType::Date => prepare_date(rule, ctx),
        ValueType::Contact => prepare_contact(rule, ctx),
        ValueType::Number => {
            let values = rule
                .values
                .iter()
                .map(|value| match value {
                    RuleValue::Int(_) | RuleValue::Float(_) => Ok(value.into()),
                    _ => Err(CompileError::invalid_rule("expected a number", rule)),
                })
                .collect::<CompileResult<_>>()?;
            Ok(identity(values))
        }
        ValueType::Boolean => {
            let values = rule
                .values
                .iter()
                .map(|value| match value {
                    RuleValue::Bool(b) => Ok(FilterValue::Bool(*b)),
                    _ => Err(CompileError::invalid_rule("expected a boolean", rule)),
                })
                .collect::<CompileResult<_>>()?;
            Ok(identity(values))
        }
        ValueType::Enum => Ok(identity(strings(rule)?)),
        ValueType::Array => Ok(identity(rule.values.iter().map(FilterValue::from).collect())),
    }
}

fn identity(values: Vec<FilterValue>) -> PreparedRule {
    PreparedRule {
        wrap: ColumnWrap::Identity,
        values,
    }
}

fn strings(rule: &Rule) -> CompileResult<Vec<FilterValue>> {
    rule.values
        .iter()
        .map(|value| {
            value
                .as_str()
                .map(FilterValue::from)
                .ok_or_else(|| CompileError::invalid_rule("expected a string", rule))
        })
        .collect()
}

fn prepare_text(rule: &Rule, ctx: &PrepareContext<'_>) -> CompileResult<PreparedRule> {
    let mut values = strings(rule)?;
    if rule.operator.is_pattern() {
        for value in &mut values {
            if let FilterValue::String(s) = value {
                *s = escape_like(s);
            }
        }
    }

    // Text keeps IS NULL meaningful for is_empty; blob's is_empty compares with ''.
    let coalesce = ctx.nullable
        && (rule.operator.arity() > 0 || rule.value_type == ValueType::Blob);
    let wrap = if coalesce {
        ColumnWrap::CoalesceEmpty
    } else {
        ColumnWrap::Identity
    };
    Ok(PreparedRule { wrap, values })
}

fn prepare_date(rule: &Rule, ctx: &PrepareContext<'_>) -> CompileResult<PreparedRule> {
    let mut parsed = Vec::with_capacity(rule.values.len());
    for value in &rule.values {
        let text = value
            .as_str()
            .ok_or_else(|| CompileError::invalid_rule("expected a date string", rule))?;
        let date = parse_date(text, ctx.now).ok_or_else(|| {
            CompileError::invalid_rule(format!("'{}' is not a recognised date", text), rule)
        })?;
        parsed.push(date);
    }

    let precision = parsed
        .iter()
        .map(|(_, precision)| *precision)
        .fold(DatePrecision::Day, Ord::min);

    Ok(PreparedRule {
        wrap: ColumnWrap::Truncate(precision),
        values: parsed
            .iter()
            .map(|(instant, _)| FilterValue::String(precision.truncate(instant)))
            .collect(),
    })
}

fn prepare_contact(rule: &Rule, ctx: &PrepareContext<'_>) -> CompileResult<PreparedRule> {
    let values = strings(rule)?
        .into_iter()
        .map(|value| {
            if value.as_str() != Some(ME) {
                return Ok(value);
            }
            ctx.actor
                .map(FilterValue::from)
                .ok_or_else(|| CompileError::invalid_rule("'me' requires an acting contact", rule))
        })
        .collect::<CompileResult<_>>()?;
    Ok(identity(values))
}

/// Escape `LIKE` wildcards so the value matches literally under `ESCAPE '\'`.
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Parse an absolute or relative date into an instant and its precision.
///
/// Accepted forms: `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, `YYYY-MM-DDTHH`,
/// `YYYY-MM-DDTHH:MM`, `YYYY-MM-DDTHH:MM:SS[.fff]` (a space may replace `T`),
/// RFC 3339 with an offset, and `$now` / `$now(d:-7,h:2)`.
pub fn parse_date(value: &str, now: DateTime<Utc>) -> Option<(NaiveDateTime, DatePrecision)> {
    let value = value.trim();
    if value.starts_with("$now") {
        return parse_relative(value, now);
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some((instant.with_timezone(&Utc).naive_utc(), DatePrecision::Second));
    }

    let (date_part, time_part) = match value.split_once(['T', ' ']) {
        Some((date, time)) => (date, Some(time)),
        None => (value, None),
    };

    let mut date_fields = date_part.split('-');
    let year: i32 = parse_field(date_fields.next()?, 4)?;
    let month = date_fields.next().map(|m| parse_field::<u32>(m, 2));
    let day = date_fields.next().map(|d| parse_field::<u32>(d, 2));
    if date_fields.next().is_some() {
        return None;
    }

    let (date, date_precision) = match (month, day) {
        (None, None) => (NaiveDate::from_ymd_opt(year, 1, 1)?, DatePrecision::Year),
        (Some(month), None) => (NaiveDate::from_ymd_opt(year, month?, 1)?, DatePrecision::Month),
        (Some(month), Some(day)) => {
            (NaiveDate::from_ymd_opt(year, month?, day?)?, DatePrecision::Day)
        }
        (None, Some(_)) => return None,
    };

    let Some(time_part) = time_part else {
        return Some((date.and_time(NaiveTime::MIN), date_precision));
    };
    if date_precision != DatePrecision::Day {
        return None;
    }

    let mut time_fields = time_part.split(':');
    let hour: u32 = parse_field(time_fields.next()?, 2)?;
    let minute = time_fields.next().map(|m| parse_field::<u32>(m, 2));
    let second = time_fields
        .next()
        .map(|s| parse_field::<u32>(s.split('.').next().unwrap_or(s), 2));
    if time_fields.next().is_some() {
        return None;
    }

    let (time, precision) = match (minute, second) {
        (None, None) => (NaiveTime::from_hms_opt(hour, 0, 0)?, DatePrecision::Hour),
        (Some(minute), None) => (NaiveTime::from_hms_opt(hour, minute?, 0)?, DatePrecision::Minute),
        (Some(minute), Some(second)) => (
            NaiveTime::from_hms_opt(hour, minute?, second?)?,
            DatePrecision::Second,
        ),
        (None, Some(_)) => return None,
    };
    Some((date.and_time(time), precision))
}

fn parse_field<T: std::str::FromStr>(field: &str, width: usize) -> Option<T> {
    if field.len() != width || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn parse_relative(value: &str, now: DateTime<Utc>) -> Option<(NaiveDateTime, DatePrecision)> {
    let captures = RELATIVE_DATE.captures(value)?;
    let mut instant = now.naive_utc();
    let Some(modifiers) = captures.get(1) else {
        return Some((instant, DatePrecision::Second));
    };

    let mut precision = DatePrecision::Year;
    for modifier in modifiers.as_str().split(',') {
        let (unit, delta) = modifier.split_once(':')?;
        let delta: i64 = delta.parse().ok()?;
        let unit_precision = DatePrecision::from_unit(unit)?;
        instant = shift(instant, unit_precision, delta)?;
        precision = precision.min(unit_precision);
    }
    Some((instant, precision))
}

fn shift(instant: NaiveDateTime, unit: DatePrecision, delta: i64) -> Option<NaiveDateTime> {
    let months = |n: i64| -> Option<NaiveDateTime> {
        let magnitude = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
        if n < 0 {
            instant.checked_sub_months(magnitude)
        } else {
            instant.checked_add_months(magnitude)
        }
    };
    match unit {
        DatePrecision::Year => months(delta.checked_mul(12)?),
        DatePrecision::Month => months(delta),
        DatePrecision::Day => instant.checked_add_signed(Duration::try_days(delta)?),
        DatePrecision::Hour => instant.checked_add_signed(Duration::try_hours(delta)?),
        DatePrecision::Minute => instant.checked_add_signed(Duration::try_minutes(delta)?),
        DatePrecision::Second => instant.checked_add_signed(Duration::try_seconds(delta)?),
    }
}
