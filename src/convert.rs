use crate::record::Endpoint;
use chrono::{DateTime, Duration, Utc};
use nom::{
    character::complete::{char, digit1},
    combinator::{all_consuming, opt},
    sequence::{preceded, tuple},
    IResult,
};
use std::net::AddrParseError;
use std::num::ParseIntError;
use std::result;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const FRACTION_DIGITS: usize = 9;

pub type ConvertResult<T> = result::Result<T, ConvertError>;

#[derive(Fail, PartialEq, Eq, Clone, Debug)]
pub enum ConvertError {
    #[fail(display = "{}", _0)]
    Timestamp(#[cause] chrono::ParseError),
    #[fail(display = "{}", _0)]
    Integer(#[cause] ParseIntError),
    #[fail(display = "Malformed Decimal Seconds")]
    Seconds,
    #[fail(display = "{}", _0)]
    Address(#[cause] AddrParseError),
    #[fail(display = "Expected host or host:port but found {} segments", _0)]
    Segments(usize),
    #[fail(display = "Invalid UTF-8")]
    Utf8,
}

impl From<chrono::ParseError> for ConvertError {
    fn from(err: chrono::ParseError) -> ConvertError {
        ConvertError::Timestamp(err)
    }
}

impl From<ParseIntError> for ConvertError {
    fn from(err: ParseIntError) -> ConvertError {
        ConvertError::Integer(err)
    }
}

impl From<AddrParseError> for ConvertError {
    fn from(err: AddrParseError) -> ConvertError {
        ConvertError::Address(err)
    }
}

pub(crate) fn text(token: &str) -> String {
    token.to_string()
}

pub(crate) fn timestamp(token: &str) -> ConvertResult<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(token)?;
    Ok(dt.with_timezone(&Utc))
}

pub(crate) fn status_code(token: &str) -> ConvertResult<u16> {
    Ok(token.parse::<u16>()?)
}

pub(crate) fn byte_count(token: &str) -> ConvertResult<i64> {
    Ok(token.parse::<i64>()?)
}

/// Splits `ip` or `ip:port`. The `-` sentinel yields an endpoint with
/// neither part set.
pub(crate) fn endpoint(token: &str) -> ConvertResult<Endpoint> {
    if token == "-" {
        return Ok(Endpoint::default());
    }

    let parts: Vec<&str> = token.split(':').collect();
    match parts.as_slice() {
        [ip] => Ok(Endpoint {
            ip: Some(ip.parse()?),
            port: None,
        }),
        [ip, port] => Ok(Endpoint {
            ip: Some(ip.parse()?),
            port: Some(port.parse::<u16>()?),
        }),
        _ => Err(ConvertError::Segments(parts.len())),
    }
}

fn decimal_seconds(i: &str) -> IResult<&str, (Option<char>, &str, Option<&str>)> {
    all_consuming(tuple((opt(char('-')), digit1, opt(preceded(char('.'), digit1)))))(i)
}

/// Converts a decimal seconds token such as `0.000073` or `-1` with integer
/// arithmetic only. Digits past nanosecond resolution are truncated.
pub(crate) fn seconds(token: &str) -> ConvertResult<Duration> {
    let (_, (sign, whole, fraction)) = decimal_seconds(token).map_err(|_| ConvertError::Seconds)?;

    let whole = whole.parse::<i64>().map_err(|_| ConvertError::Seconds)?;
    let mut nanos: i64 = 0;
    if let Some(fraction) = fraction {
        for (i, d) in fraction.bytes().take(FRACTION_DIGITS).enumerate() {
            nanos += i64::from(d - b'0') * 10_i64.pow((FRACTION_DIGITS - 1 - i) as u32);
        }
    }

    let total = whole
        .checked_mul(NANOS_PER_SECOND)
        .and_then(|n| n.checked_add(nanos))
        .ok_or(ConvertError::Seconds)?;

    match sign {
        Some(_) => Ok(Duration::nanoseconds(-total)),
        None => Ok(Duration::nanoseconds(total)),
    }
}

/// Renders a duration back as decimal seconds, the way the log writes it.
pub fn format_seconds(d: Duration) -> String {
    let nanos = match d.num_nanoseconds() {
        Some(n) => n,
        None => return format!("{}", d.num_seconds()),
    };

    let sign = if nanos < 0 { "-" } else { "" };
    let abs = nanos.unsigned_abs();
    let whole = abs / NANOS_PER_SECOND as u64;
    let fraction = abs % NANOS_PER_SECOND as u64;
    if fraction == 0 {
        return format!("{}{}", sign, whole);
    }

    let digits = format!("{:09}", fraction);
    format!("{}{}.{}", sign, whole, digits.trim_end_matches('0'))
}
