use crate::convert::{self, ConvertError, ConvertResult};
use crate::field::{Field, Generation};
use crate::record::{Endpoint, Record};
use crate::scanner::Tokens;
use chrono::{DateTime, Duration, Utc};
use std::result;
use std::str;

pub type ParseResult<T> = result::Result<T, ParseError>;

#[derive(Fail, PartialEq, Eq, Clone, Debug)]
pub enum ParseError {
    #[fail(display = "invalid field {} {:?} at index {}: {}", field, token, index, reason)]
    InvalidField {
        index: usize,
        field: Field,
        token: String,
        #[cause]
        reason: ConvertError,
    },
    #[fail(display = "missing field {} at index {}", field, index)]
    MissingField { index: usize, field: Field },
}

/// How the parser chooses a schema generation for a line.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Schema {
    /// Use the newest generation whose fields the line fully supplies.
    Auto,
    Fixed(Generation),
}

impl Default for Schema {
    fn default() -> Self {
        Schema::Auto
    }
}

impl Schema {
    fn max_tokens(self) -> usize {
        match self {
            Schema::Auto => Generation::Extended.typed_len(),
            Schema::Fixed(g) => g.typed_len(),
        }
    }
}

/// Fields gathered so far for one line.
#[derive(Default)]
struct Draft {
    kind: Option<String>,
    time: Option<DateTime<Utc>>,
    elb: Option<String>,
    client: Option<Endpoint>,
    target: Option<Endpoint>,
    request_processing_time: Option<Duration>,
    target_processing_time: Option<Duration>,
    response_processing_time: Option<Duration>,
    elb_status_code: Option<u16>,
    target_status_code: Option<String>,
    received_bytes: Option<i64>,
    sent_bytes: Option<i64>,
    request: Option<String>,
    user_agent: Option<String>,
    ssl_cipher: Option<String>,
    ssl_protocol: Option<String>,
    target_group_arn: Option<String>,
    trace_id: Option<String>,
    domain_name: Option<String>,
    chosen_cert_arn: Option<String>,
    matched_rule_priority: Option<String>,
    request_creation_time: Option<String>,
    actions_executed: Option<String>,
    redirect_url: Option<String>,
    error_reason: Option<String>,
    target_port_list: Option<String>,
    target_status_code_list: Option<String>,
    classification: Option<String>,
    classification_reason: Option<String>,
}

type Convert = fn(&mut Draft, &str) -> ConvertResult<()>;

/// The typed positions of the newest generation, in wire order. Every
/// generation parses a prefix of this table.
static LAYOUT: [(Field, Convert); 29] = [
    (Field::Type, |d, t| {
        d.kind = Some(convert::text(t));
        Ok(())
    }),
    (Field::Time, |d, t| {
        d.time = Some(convert::timestamp(t)?);
        Ok(())
    }),
    (Field::Elb, |d, t| {
        d.elb = Some(convert::text(t));
        Ok(())
    }),
    (Field::ClientAndPort, |d, t| {
        d.client = Some(convert::endpoint(t)?);
        Ok(())
    }),
    (Field::TargetAndPort, |d, t| {
        d.target = Some(convert::endpoint(t)?);
        Ok(())
    }),
    (Field::RequestProcessingTime, |d, t| {
        d.request_processing_time = Some(convert::seconds(t)?);
        Ok(())
    }),
    (Field::TargetProcessingTime, |d, t| {
        d.target_processing_time = Some(convert::seconds(t)?);
        Ok(())
    }),
    (Field::ResponseProcessingTime, |d, t| {
        d.response_processing_time = Some(convert::seconds(t)?);
        Ok(())
    }),
    (Field::ElbStatusCode, |d, t| {
        d.elb_status_code = Some(convert::status_code(t)?);
        Ok(())
    }),
    (Field::TargetStatusCode, |d, t| {
        d.target_status_code = Some(convert::text(t));
        Ok(())
    }),
    (Field::ReceivedBytes, |d, t| {
        d.received_bytes = Some(convert::byte_count(t)?);
        Ok(())
    }),
    (Field::SentBytes, |d, t| {
        d.sent_bytes = Some(convert::byte_count(t)?);
        Ok(())
    }),
    (Field::Request, |d, t| {
        d.request = Some(convert::text(t));
        Ok(())
    }),
    (Field::UserAgent, |d, t| {
        d.user_agent = Some(convert::text(t));
        Ok(())
    }),
    (Field::SslCipher, |d, t| {
        d.ssl_cipher = Some(convert::text(t));
        Ok(())
    }),
    (Field::SslProtocol, |d, t| {
        d.ssl_protocol = Some(convert::text(t));
        Ok(())
    }),
    (Field::TargetGroupArn, |d, t| {
        d.target_group_arn = Some(convert::text(t));
        Ok(())
    }),
    (Field::TraceId, |d, t| {
        d.trace_id = Some(convert::text(t));
        Ok(())
    }),
    (Field::DomainName, |d, t| {
        d.domain_name = Some(convert::text(t));
        Ok(())
    }),
    (Field::ChosenCertArn, |d, t| {
        d.chosen_cert_arn = Some(convert::text(t));
        Ok(())
    }),
    (Field::MatchedRulePriority, |d, t| {
        d.matched_rule_priority = Some(convert::text(t));
        Ok(())
    }),
    (Field::RequestCreationTime, |d, t| {
        d.request_creation_time = Some(convert::text(t));
        Ok(())
    }),
    (Field::ActionsExecuted, |d, t| {
        d.actions_executed = Some(convert::text(t));
        Ok(())
    }),
    (Field::RedirectUrl, |d, t| {
        d.redirect_url = Some(convert::text(t));
        Ok(())
    }),
    (Field::ErrorReason, |d, t| {
        d.error_reason = Some(convert::text(t));
        Ok(())
    }),
    (Field::TargetPortList, |d, t| {
        d.target_port_list = Some(convert::text(t));
        Ok(())
    }),
    (Field::TargetStatusCodeList, |d, t| {
        d.target_status_code_list = Some(convert::text(t));
        Ok(())
    }),
    (Field::Classification, |d, t| {
        d.classification = Some(convert::text(t));
        Ok(())
    }),
    (Field::ClassificationReason, |d, t| {
        d.classification_reason = Some(convert::text(t));
        Ok(())
    }),
];

fn required<T>(value: Option<T>, field: Field) -> ParseResult<T> {
    value.ok_or(ParseError::MissingField {
        index: field.position(),
        field,
    })
}

impl Draft {
    /// A field the generation declares must be present; later ones are
    /// kept when the line happened to supply them.
    fn extra(value: Option<String>, field: Field, generation: Generation) -> ParseResult<Option<String>> {
        if field.position() < generation.typed_len() {
            required(value, field).map(Some)
        } else {
            Ok(value)
        }
    }

    // Fields are checked in wire order, so the error names the first
    // position the line did not supply.
    fn build(self, generation: Generation, overflow: Option<Vec<u8>>) -> ParseResult<Record> {
        let g = generation;
        Ok(Record {
            generation,
            kind: required(self.kind, Field::Type)?,
            time: required(self.time, Field::Time)?,
            elb: required(self.elb, Field::Elb)?,
            client: required(self.client, Field::ClientAndPort)?,
            target: required(self.target, Field::TargetAndPort)?,
            request_processing_time: required(self.request_processing_time, Field::RequestProcessingTime)?,
            target_processing_time: required(self.target_processing_time, Field::TargetProcessingTime)?,
            response_processing_time: required(self.response_processing_time, Field::ResponseProcessingTime)?,
            elb_status_code: required(self.elb_status_code, Field::ElbStatusCode)?,
            target_status_code: required(self.target_status_code, Field::TargetStatusCode)?,
            received_bytes: required(self.received_bytes, Field::ReceivedBytes)?,
            sent_bytes: required(self.sent_bytes, Field::SentBytes)?,
            request: required(self.request, Field::Request)?,
            user_agent: required(self.user_agent, Field::UserAgent)?,
            ssl_cipher: required(self.ssl_cipher, Field::SslCipher)?,
            ssl_protocol: required(self.ssl_protocol, Field::SslProtocol)?,
            target_group_arn: Draft::extra(self.target_group_arn, Field::TargetGroupArn, g)?,
            trace_id: Draft::extra(self.trace_id, Field::TraceId, g)?,
            domain_name: Draft::extra(self.domain_name, Field::DomainName, g)?,
            chosen_cert_arn: Draft::extra(self.chosen_cert_arn, Field::ChosenCertArn, g)?,
            matched_rule_priority: Draft::extra(self.matched_rule_priority, Field::MatchedRulePriority, g)?,
            request_creation_time: Draft::extra(self.request_creation_time, Field::RequestCreationTime, g)?,
            actions_executed: Draft::extra(self.actions_executed, Field::ActionsExecuted, g)?,
            redirect_url: Draft::extra(self.redirect_url, Field::RedirectUrl, g)?,
            error_reason: Draft::extra(self.error_reason, Field::ErrorReason, g)?,
            target_port_list: Draft::extra(self.target_port_list, Field::TargetPortList, g)?,
            target_status_code_list: Draft::extra(self.target_status_code_list, Field::TargetStatusCodeList, g)?,
            classification: Draft::extra(self.classification, Field::Classification, g)?,
            classification_reason: Draft::extra(self.classification_reason, Field::ClassificationReason, g)?,
            overflow,
        })
    }
}

fn utf8(bytes: &[u8], index: usize) -> ParseResult<&str> {
    str::from_utf8(bytes).map_err(|_| ParseError::InvalidField {
        index,
        field: Field::all()[index],
        token: String::from_utf8_lossy(bytes).into_owned(),
        reason: ConvertError::Utf8,
    })
}

/// Turns single lines into records. Holds no state besides its schema
/// choice, so one parser can be shared across threads.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Parser {
    schema: Schema,
}

impl Parser {
    pub fn new(schema: Schema) -> Self {
        Parser { schema }
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Parses one line without its line terminator.
    ///
    /// With `Schema::Auto` every position the line supplies is converted,
    /// and the generation only labels the newest layout the line covers.
    pub fn parse(&self, line: &[u8]) -> ParseResult<Record> {
        let mut tokens = Tokens::new(line);
        let taken: Vec<&[u8]> = tokens.by_ref().take(self.schema.max_tokens()).collect();

        let generation = match self.schema {
            Schema::Fixed(g) => g,
            Schema::Auto => Generation::detect(taken.len()).unwrap_or(Generation::Legacy),
        };

        let mut draft = Draft::default();
        for (index, (&(field, convert), token)) in LAYOUT.iter().zip(&taken).enumerate() {
            let token = utf8(token, index)?;
            convert(&mut draft, token).map_err(|reason| ParseError::InvalidField {
                index,
                field,
                token: token.to_string(),
                reason,
            })?;
        }

        let rest = tokens.remainder();
        let overflow = if generation.captures_overflow() && !rest.is_empty() {
            Some(rest.to_vec())
        } else {
            if !rest.is_empty() {
                debug!("{} line has trailing content, dropping it", generation);
            }
            None
        };

        draft.build(generation, overflow)
    }
}

/// Parses one line with automatic schema detection.
pub fn parse(line: &[u8]) -> ParseResult<Record> {
    Parser::default().parse(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;
    use chrono::TimeZone;
    use std::net::{IpAddr, Ipv4Addr};

    const LEGACY_LINE: &str = r#"http 2015-05-13T23:39:43.945958Z my-loadbalancer 192.168.131.39:2817 10.0.0.1:80 0.000073 0.001048 0.000057 200 200 0 29 "GET http://www.example.com:80/ HTTP/1.1" "curl/7.38.0" - -"#;

    const ACTIONS_LINE: &str = r#"http 2015-05-13T23:39:43.945958Z my-loadbalancer 192.168.131.39:2817 10.0.0.1:80 0.000073 0.001048 0.000057 200 200 0 29 "GET http://www.example.com:80/ HTTP/1.1" "curl/7.38.0" - - arn:aws:elasticloadbalancing:us-east-2:123456789012:targetgroup/my-targets/73e2d6bc24d8a067 "Root=1-58337262-36d228ad5d99923122bbe354" "-" "-" 0 2018-07-02T22:22:48.364000Z "forward" "-" "-""#;

    const EXTENDED_LINE: &str = r#"https 2018-07-02T22:23:00.186641Z app/my-loadbalancer/50dc6c495c0c9188 192.168.131.39:2817 10.0.0.1:80 0.086 0.048 0.037 200 200 0 57 "GET https://www.example.com:443/ HTTP/1.1" "curl/7.46.0" ECDHE-RSA-AES128-GCM-SHA256 TLSv1.2 arn:aws:elasticloadbalancing:us-east-2:123456789012:targetgroup/my-targets/73e2d6bc24d8a067 "Root=1-58337281-1d84f3d73c47ec4e58577259" "www.example.com" "arn:aws:acm:us-east-2:123456789012:certificate/12345678-1234-1234-1234-123456789012" 1 2018-07-02T22:22:48.364000Z "authenticate,forward" "-" "-" "10.0.0.1:80" "200" "-" "-""#;

    fn ip(a: u8, b: u8, c: u8, d: u8) -> Option<IpAddr> {
        Some(IpAddr::V4(Ipv4Addr::new(a, b, c, d)))
    }

    #[test]
    fn test_parse_legacy_line() {
        let record = parse(LEGACY_LINE.as_bytes()).unwrap();

        assert_eq!(record.generation, Generation::Legacy);
        assert_eq!(record.kind, "http");
        assert_eq!(
            record.time,
            Utc.with_ymd_and_hms(2015, 5, 13, 23, 39, 43).unwrap() + Duration::microseconds(945_958)
        );
        assert_eq!(record.elb, "my-loadbalancer");
        assert_eq!(
            record.client,
            Endpoint {
                ip: ip(192, 168, 131, 39),
                port: Some(2817)
            }
        );
        assert_eq!(
            record.target,
            Endpoint {
                ip: ip(10, 0, 0, 1),
                port: Some(80)
            }
        );
        assert_eq!(record.request_processing_time, Duration::microseconds(73));
        assert_eq!(record.target_processing_time, Duration::nanoseconds(1_048_000));
        assert_eq!(record.response_processing_time, Duration::microseconds(57));
        assert_eq!(record.elb_status_code, 200);
        assert_eq!(record.target_status_code, "200");
        assert_eq!(record.received_bytes, 0);
        assert_eq!(record.sent_bytes, 29);
        assert_eq!(record.request, "GET http://www.example.com:80/ HTTP/1.1");
        assert_eq!(record.user_agent, "curl/7.38.0");
        assert_eq!(record.ssl_cipher, "-");
        assert_eq!(record.ssl_protocol, "-");
        assert_eq!(record.target_group_arn, None);
        assert_eq!(record.classification_reason, None);
        assert_eq!(record.overflow, None);
    }

    #[test]
    fn test_parse_actions_line() {
        let record = parse(ACTIONS_LINE.as_bytes()).unwrap();

        assert_eq!(record.generation, Generation::Actions);
        assert_eq!(
            record.target_group_arn.as_deref(),
            Some("arn:aws:elasticloadbalancing:us-east-2:123456789012:targetgroup/my-targets/73e2d6bc24d8a067")
        );
        assert_eq!(record.trace_id.as_deref(), Some("Root=1-58337262-36d228ad5d99923122bbe354"));
        assert_eq!(record.domain_name.as_deref(), Some("-"));
        assert_eq!(record.chosen_cert_arn.as_deref(), Some("-"));
        assert_eq!(record.matched_rule_priority.as_deref(), Some("0"));
        assert_eq!(record.request_creation_time.as_deref(), Some("2018-07-02T22:22:48.364000Z"));
        assert_eq!(record.actions_executed.as_deref(), Some("forward"));
        assert_eq!(record.redirect_url.as_deref(), Some("-"));
        assert_eq!(record.error_reason.as_deref(), Some("-"));
        assert_eq!(record.target_port_list, None);
        assert_eq!(record.overflow, None);
    }

    #[test]
    fn test_parse_extended_line() {
        let record = parse(EXTENDED_LINE.as_bytes()).unwrap();

        assert_eq!(record.generation, Generation::Extended);
        assert_eq!(record.request_processing_time, Duration::milliseconds(86));
        assert_eq!(record.ssl_cipher, "ECDHE-RSA-AES128-GCM-SHA256");
        assert_eq!(record.ssl_protocol, "TLSv1.2");
        assert_eq!(record.domain_name.as_deref(), Some("www.example.com"));
        assert_eq!(record.actions_executed.as_deref(), Some("authenticate,forward"));
        assert_eq!(record.target_port_list.as_deref(), Some("10.0.0.1:80"));
        assert_eq!(record.target_status_code_list.as_deref(), Some("200"));
        assert_eq!(record.classification.as_deref(), Some("-"));
        assert_eq!(record.classification_reason.as_deref(), Some("-"));
        assert_eq!(record.overflow, None);
    }

    #[test]
    fn test_parse_overflow_is_verbatim() {
        let line = format!(r#"{} future-entry-1 "future entry 2"   3 future/entry/4"#, EXTENDED_LINE);
        let record = parse(line.as_bytes()).unwrap();

        assert_eq!(
            record.overflow.as_deref(),
            Some(&br#"future-entry-1 "future entry 2"   3 future/entry/4"#[..])
        );
        assert_eq!(record.classification_reason.as_deref(), Some("-"));
    }

    #[test]
    fn test_parse_overflow_keeps_extra_leading_spaces() {
        let line = format!(r#"{}   "x""#, EXTENDED_LINE);
        let record = parse(line.as_bytes()).unwrap();

        assert_eq!(record.overflow.as_deref(), Some(&br#"  "x""#[..]));
    }

    #[test]
    fn test_parse_overflow_is_not_decoded() {
        let mut line = EXTENDED_LINE.as_bytes().to_vec();
        line.extend_from_slice(b" future-\xff-field");
        let record = parse(&line).unwrap();

        assert_eq!(record.generation, Generation::Extended);
        assert_eq!(record.overflow.as_deref(), Some(&b"future-\xff-field"[..]));
        assert_eq!(record.get(Field::OtherFields).to_string(), "future-\u{fffd}-field");
    }

    #[test]
    fn test_parse_routing_line() {
        let line = format!(
            r#"{} arn:aws:elasticloadbalancing:us-east-2:123456789012:targetgroup/my-targets/73e2d6bc24d8a067 "Root=1-58337262-36d228ad5d99923122bbe354" "www.example.com" "-" 7"#,
            LEGACY_LINE
        );
        let record = parse(line.as_bytes()).unwrap();

        assert_eq!(record.generation, Generation::Routing);
        assert_eq!(record.trace_id.as_deref(), Some("Root=1-58337262-36d228ad5d99923122bbe354"));
        assert_eq!(record.domain_name.as_deref(), Some("www.example.com"));
        assert_eq!(record.chosen_cert_arn.as_deref(), Some("-"));
        assert_eq!(record.matched_rule_priority.as_deref(), Some("7"));
        assert_eq!(record.request_creation_time, None);
        assert_eq!(record.overflow, None);
        assert_eq!(record.to_tuples().len(), 21);
    }

    #[test]
    fn test_parse_keeps_fields_between_legacy_and_routing() {
        let line = format!(r#"{} arn:tg "Root=1-abc""#, LEGACY_LINE);
        let record = parse(line.as_bytes()).unwrap();

        assert_eq!(record.generation, Generation::Legacy);
        assert_eq!(record.target_group_arn.as_deref(), Some("arn:tg"));
        assert_eq!(record.trace_id.as_deref(), Some("Root=1-abc"));
        assert_eq!(record.domain_name, None);
        assert_eq!(record.to_tuples().len(), 18);
    }

    #[test]
    fn test_parse_keeps_fields_between_actions_and_extended() {
        let line = format!(r#"{} "10.0.0.1:80" "200""#, ACTIONS_LINE);
        let record = parse(line.as_bytes()).unwrap();

        assert_eq!(record.generation, Generation::Actions);
        assert_eq!(record.error_reason.as_deref(), Some("-"));
        assert_eq!(record.target_port_list.as_deref(), Some("10.0.0.1:80"));
        assert_eq!(record.target_status_code_list.as_deref(), Some("200"));
        assert_eq!(record.classification, None);
        assert_eq!(record.overflow, None);

        let tuples = record.to_tuples();
        assert_eq!(tuples.len(), 27);
        assert_eq!(
            tuples.last(),
            Some(&(Field::TargetStatusCodeList, Value::String("200".to_string())))
        );
    }

    #[test]
    fn test_parse_fixed_legacy_drops_trailing_fields() {
        let parser = Parser::new(Schema::Fixed(Generation::Legacy));
        let record = parser.parse(EXTENDED_LINE.as_bytes()).unwrap();

        assert_eq!(record.generation, Generation::Legacy);
        assert_eq!(record.ssl_protocol, "TLSv1.2");
        assert_eq!(record.target_group_arn, None);
        assert_eq!(record.overflow, None);
    }

    #[test]
    fn test_parse_fixed_extended_rejects_short_line() {
        let parser = Parser::new(Schema::Fixed(Generation::Extended));

        assert_eq!(
            parser.parse(ACTIONS_LINE.as_bytes()),
            Err(ParseError::MissingField {
                index: 25,
                field: Field::TargetPortList,
            })
        );
    }

    #[test]
    fn test_parse_short_line_fails_fast() {
        let line = r#"http 2015-05-13T23:39:43.945958Z my-loadbalancer 192.168.131.39:2817 10.0.0.1:80 0.000073"#;

        assert_eq!(
            parse(line.as_bytes()),
            Err(ParseError::MissingField {
                index: 6,
                field: Field::TargetProcessingTime,
            })
        );
        assert_eq!(
            parse(b""),
            Err(ParseError::MissingField {
                index: 0,
                field: Field::Type,
            })
        );
    }

    #[test]
    fn test_parse_non_numeric_status_code() {
        let line = LEGACY_LINE.replace(" 200 200 ", " OK 200 ");
        let err = parse(line.as_bytes()).unwrap_err();

        match err {
            ParseError::InvalidField {
                index, field, token, ..
            } => {
                assert_eq!(index, 8);
                assert_eq!(field, Field::ElbStatusCode);
                assert_eq!(token, "OK");
            }
            _ => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn test_parse_bad_timestamp() {
        let line = LEGACY_LINE.replace("2015-05-13T23:39:43.945958Z", "yesterday");
        let err = parse(line.as_bytes()).unwrap_err();

        assert!(matches!(
            err,
            ParseError::InvalidField {
                index: 1,
                field: Field::Time,
                reason: ConvertError::Timestamp(_),
                ..
            }
        ));
    }

    #[test]
    fn test_parse_ipv6_endpoint_is_rejected() {
        let line = LEGACY_LINE.replace("192.168.131.39:2817", "2001:db8::1:2817");

        assert_eq!(
            parse(line.as_bytes()),
            Err(ParseError::InvalidField {
                index: 3,
                field: Field::ClientAndPort,
                token: "2001:db8::1:2817".to_string(),
                reason: ConvertError::Segments(5),
            })
        );
    }

    #[test]
    fn test_parse_endpoint_without_port() {
        let line = LEGACY_LINE.replace("10.0.0.1:80", "10.0.0.1");
        let record = parse(line.as_bytes()).unwrap();

        assert_eq!(record.target.ip, ip(10, 0, 0, 1));
        assert_eq!(record.target.port, None);
    }

    #[test]
    fn test_parse_unreachable_target() {
        let line = LEGACY_LINE
            .replace("10.0.0.1:80", "-")
            .replace("0.000073 0.001048 0.000057 200 200", "-1 -1 -1 504 -");
        let record = parse(line.as_bytes()).unwrap();

        assert_eq!(record.target, Endpoint::default());
        assert_eq!(record.request_processing_time, Duration::seconds(-1));
        assert_eq!(record.elb_status_code, 504);
        assert_eq!(record.target_status_code, "-");
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let mut line = LEGACY_LINE.as_bytes().to_vec();
        let at = line.len() - 1;
        line[at] = 0xff;

        assert!(matches!(
            parse(&line),
            Err(ParseError::InvalidField {
                index: 15,
                field: Field::SslProtocol,
                reason: ConvertError::Utf8,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::MissingField {
            index: 6,
            field: Field::TargetProcessingTime,
        };
        assert_eq!(err.to_string(), "missing field target_processing_time at index 6");
    }
}
