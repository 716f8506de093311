//! Parser for load balancer access log lines.
//!
//! Each line is a fixed sequence of space separated fields, some of them
//! quoted. Fields are identified purely by position:
//!
//! ```
//! let line = br#"http 2015-05-13T23:39:43.945958Z my-loadbalancer 192.168.131.39:2817 10.0.0.1:80 0.000073 0.001048 0.000057 200 200 0 29 "GET http://www.example.com:80/ HTTP/1.1" "curl/7.38.0" - -"#;
//! let record = elblog::parse(line).unwrap();
//!
//! assert_eq!(record.elb_status_code, 200);
//! assert_eq!(record.request, "GET http://www.example.com:80/ HTTP/1.1");
//! assert_eq!(record.client.port, Some(2817));
//! ```
//!
//! Multi-line input goes through a `Decoder`:
//!
//! ```
//! use elblog::Decoder;
//!
//! let input = "http 2015-05-13T23:39:43.945958Z lb 10.0.0.2:1234 10.0.0.1:80 0.1 0.2 0.3 200 200 0 29 \"GET / HTTP/1.1\" \"-\" - -\n";
//! let mut dec = Decoder::from_reader(input.as_bytes());
//! while dec.has_more() {
//!     let record = dec.decode().unwrap().unwrap();
//!     assert_eq!(record.elb, "lb");
//! }
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

pub mod convert;
pub mod decoder;
pub mod field;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod parser;
pub mod record;
pub mod scanner;

pub use crate::convert::ConvertError;
pub use crate::decoder::{DecodeError, DecodeResult, Decoder, DecoderBuilder};
pub use crate::field::{Field, Generation};
pub use crate::parser::{parse, ParseError, ParseResult, Parser, Schema};
pub use crate::record::{Endpoint, Record, Value};
