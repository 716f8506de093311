use std::fmt;
use std::result;
use std::str::FromStr;

//Reference: https://docs.aws.amazon.com/elasticloadbalancing/latest/application/load-balancer-access-logs.html
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Field {
    Type = 0,
    Time = 1,
    Elb = 2,
    ClientAndPort = 3,
    TargetAndPort = 4,
    RequestProcessingTime = 5,
    TargetProcessingTime = 6,
    ResponseProcessingTime = 7,
    ElbStatusCode = 8,
    TargetStatusCode = 9,
    ReceivedBytes = 10,
    SentBytes = 11,
    Request = 12,
    UserAgent = 13,
    SslCipher = 14,
    SslProtocol = 15,
    TargetGroupArn = 16,
    TraceId = 17,
    DomainName = 18,
    ChosenCertArn = 19,
    MatchedRulePriority = 20,
    RequestCreationTime = 21,
    ActionsExecuted = 22,
    RedirectUrl = 23,
    ErrorReason = 24,
    TargetPortList = 25,
    TargetStatusCodeList = 26,
    Classification = 27,
    ClassificationReason = 28,
    OtherFields = 29,
}

static FIELDS: [Field; 30] = [
    Field::Type,
    Field::Time,
    Field::Elb,
    Field::ClientAndPort,
    Field::TargetAndPort,
    Field::RequestProcessingTime,
    Field::TargetProcessingTime,
    Field::ResponseProcessingTime,
    Field::ElbStatusCode,
    Field::TargetStatusCode,
    Field::ReceivedBytes,
    Field::SentBytes,
    Field::Request,
    Field::UserAgent,
    Field::SslCipher,
    Field::SslProtocol,
    Field::TargetGroupArn,
    Field::TraceId,
    Field::DomainName,
    Field::ChosenCertArn,
    Field::MatchedRulePriority,
    Field::RequestCreationTime,
    Field::ActionsExecuted,
    Field::RedirectUrl,
    Field::ErrorReason,
    Field::TargetPortList,
    Field::TargetStatusCodeList,
    Field::Classification,
    Field::ClassificationReason,
    Field::OtherFields,
];

impl Field {
    /// Every field in wire order.
    pub fn all() -> &'static [Field] {
        &FIELDS
    }

    pub fn position(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Type => "type",
            Field::Time => "time",
            Field::Elb => "elb",
            Field::ClientAndPort => "client_and_port",
            Field::TargetAndPort => "target_and_port",
            Field::RequestProcessingTime => "request_processing_time",
            Field::TargetProcessingTime => "target_processing_time",
            Field::ResponseProcessingTime => "response_processing_time",
            Field::ElbStatusCode => "elb_status_code",
            Field::TargetStatusCode => "target_status_code",
            Field::ReceivedBytes => "received_bytes",
            Field::SentBytes => "sent_bytes",
            Field::Request => "request",
            Field::UserAgent => "user_agent",
            Field::SslCipher => "ssl_cipher",
            Field::SslProtocol => "ssl_protocol",
            Field::TargetGroupArn => "target_group_arn",
            Field::TraceId => "trace_id",
            Field::DomainName => "domain_name",
            Field::ChosenCertArn => "chosen_cert_arn",
            Field::MatchedRulePriority => "matched_rule_priority",
            Field::RequestCreationTime => "request_creation_time",
            Field::ActionsExecuted => "actions_executed",
            Field::RedirectUrl => "redirect_url",
            Field::ErrorReason => "error_reason",
            Field::TargetPortList => "target_port_list",
            Field::TargetStatusCodeList => "target_status_code_list",
            Field::Classification => "classification",
            Field::ClassificationReason => "classification_reason",
            Field::OtherFields => "other_fields",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        FIELDS
            .iter()
            .find(|field| field.name() == s)
            .copied()
            .ok_or_else(|| "unknown column name".to_string())
    }
}

/// A schema generation. Each one parses a prefix of the canonical field
/// order; only `Extended` keeps whatever follows its last field.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Generation {
    /// The kind tag followed by the fifteen classic fields.
    Legacy,
    /// Adds target group, trace id, domain, certificate and rule priority.
    Routing,
    /// Adds request creation time, actions, redirect url and error reason.
    Actions,
    /// Adds target port and status lists plus classification, then captures
    /// any trailing bytes verbatim.
    Extended,
}

impl Generation {
    /// From newest to oldest.
    pub const ALL: [Generation; 4] = [
        Generation::Extended,
        Generation::Actions,
        Generation::Routing,
        Generation::Legacy,
    ];

    /// Number of typed positions in this generation.
    pub fn typed_len(self) -> usize {
        match self {
            Generation::Legacy => 16,
            Generation::Routing => 21,
            Generation::Actions => 25,
            Generation::Extended => 29,
        }
    }

    pub fn captures_overflow(self) -> bool {
        self == Generation::Extended
    }

    /// Fields a record of this generation carries, in wire order.
    pub fn fields(self) -> &'static [Field] {
        if self.captures_overflow() {
            &FIELDS[..]
        } else {
            &FIELDS[..self.typed_len()]
        }
    }

    /// Picks the newest generation whose typed fields all fit in `tokens`.
    pub fn detect(tokens: usize) -> Option<Generation> {
        Generation::ALL.iter().copied().find(|g| g.typed_len() <= tokens)
    }

    pub fn name(self) -> &'static str {
        match self {
            Generation::Legacy => "legacy",
            Generation::Routing => "routing",
            Generation::Actions => "actions",
            Generation::Extended => "extended",
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Generation {
    type Err = String;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Generation::Legacy),
            "routing" => Ok(Generation::Routing),
            "actions" => Ok(Generation::Actions),
            "extended" => Ok(Generation::Extended),
            _ => Err("unknown schema generation".to_string()),
        }
    }
}
