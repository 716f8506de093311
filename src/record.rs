use crate::convert::format_seconds;
use crate::field::{Field, Generation};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::fmt;
use std::net::IpAddr;

/// An address with an optional port. Both parts are unset when the log
/// wrote `-`, which happens when no target was chosen.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, Default)]
pub struct Endpoint {
    pub ip: Option<IpAddr>,
    pub port: Option<u16>,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match (self.ip, self.port) {
            (Some(ip), Some(port)) => write!(fmt, "{}:{}", ip, port),
            (Some(ip), None) => write!(fmt, "{}", ip),
            (None, _) => fmt.write_str("-"),
        }
    }
}

/// One parsed log line.
//Reference: https://docs.aws.amazon.com/elasticloadbalancing/latest/application/load-balancer-access-logs.html
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Record {
    pub generation: Generation,
    pub kind: String,
    pub time: DateTime<Utc>,
    pub elb: String,
    pub client: Endpoint,
    pub target: Endpoint,
    pub request_processing_time: Duration,
    pub target_processing_time: Duration,
    pub response_processing_time: Duration,
    pub elb_status_code: u16,
    pub target_status_code: String,
    pub received_bytes: i64,
    pub sent_bytes: i64,
    pub request: String,
    pub user_agent: String,
    pub ssl_cipher: String,
    pub ssl_protocol: String,
    pub target_group_arn: Option<String>,
    pub trace_id: Option<String>,
    pub domain_name: Option<String>,
    pub chosen_cert_arn: Option<String>,
    pub matched_rule_priority: Option<String>,
    pub request_creation_time: Option<String>,
    pub actions_executed: Option<String>,
    pub redirect_url: Option<String>,
    pub error_reason: Option<String>,
    pub target_port_list: Option<String>,
    pub target_status_code_list: Option<String>,
    pub classification: Option<String>,
    pub classification_reason: Option<String>,
    /// Everything after the last field this crate knows about, byte for
    /// byte. Never decoded, so it may hold any bytes.
    pub overflow: Option<Vec<u8>>,
}

/// A single field of a record, detached from it.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum Value {
    Int(i64),
    String(String),
    DateTime(DateTime<Utc>),
    Duration(Duration),
    Endpoint(Endpoint),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(i) => write!(fmt, "{}", i),
            Value::String(s) => fmt.write_str(s),
            Value::DateTime(dt) => fmt.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Duration(d) => fmt.write_str(&format_seconds(*d)),
            Value::Endpoint(e) => write!(fmt, "{}", e),
            Value::Null => Ok(()),
        }
    }
}

fn optional(s: &Option<String>) -> Value {
    match s {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    }
}

impl Record {
    /// Looks a field up by identifier. Fields the record's generation does
    /// not carry come back as `Value::Null`.
    pub fn get(&self, field: Field) -> Value {
        match field {
            Field::Type => Value::String(self.kind.clone()),
            Field::Time => Value::DateTime(self.time),
            Field::Elb => Value::String(self.elb.clone()),
            Field::ClientAndPort => Value::Endpoint(self.client),
            Field::TargetAndPort => Value::Endpoint(self.target),
            Field::RequestProcessingTime => Value::Duration(self.request_processing_time),
            Field::TargetProcessingTime => Value::Duration(self.target_processing_time),
            Field::ResponseProcessingTime => Value::Duration(self.response_processing_time),
            Field::ElbStatusCode => Value::Int(i64::from(self.elb_status_code)),
            Field::TargetStatusCode => Value::String(self.target_status_code.clone()),
            Field::ReceivedBytes => Value::Int(self.received_bytes),
            Field::SentBytes => Value::Int(self.sent_bytes),
            Field::Request => Value::String(self.request.clone()),
            Field::UserAgent => Value::String(self.user_agent.clone()),
            Field::SslCipher => Value::String(self.ssl_cipher.clone()),
            Field::SslProtocol => Value::String(self.ssl_protocol.clone()),
            Field::TargetGroupArn => optional(&self.target_group_arn),
            Field::TraceId => optional(&self.trace_id),
            Field::DomainName => optional(&self.domain_name),
            Field::ChosenCertArn => optional(&self.chosen_cert_arn),
            Field::MatchedRulePriority => optional(&self.matched_rule_priority),
            Field::RequestCreationTime => optional(&self.request_creation_time),
            Field::ActionsExecuted => optional(&self.actions_executed),
            Field::RedirectUrl => optional(&self.redirect_url),
            Field::ErrorReason => optional(&self.error_reason),
            Field::TargetPortList => optional(&self.target_port_list),
            Field::TargetStatusCodeList => optional(&self.target_status_code_list),
            Field::Classification => optional(&self.classification),
            Field::ClassificationReason => optional(&self.classification_reason),
            Field::OtherFields => match &self.overflow {
                Some(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
                None => Value::Null,
            },
        }
    }

    /// The (field, value) pairs of every field the line supplied: all of
    /// its generation's fields plus any newer ones it happened to carry.
    pub fn to_tuples(&self) -> Vec<(Field, Value)> {
        let declared = self.generation.fields().len();
        Field::all()
            .iter()
            .enumerate()
            .map(|(i, f)| (i, *f, self.get(*f)))
            .filter(|(i, _, value)| *i < declared || *value != Value::Null)
            .map(|(_, f, value)| (f, value))
            .collect()
    }
}
