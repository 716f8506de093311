use crate::parser::{ParseError, Parser, Schema};
use crate::record::Record;
use std::fs::File;
use std::io;
use std::io::BufRead;
use std::path::Path;
use std::result;

pub type DecodeResult<T> = result::Result<T, DecodeError>;

#[derive(Fail, Debug)]
pub enum DecodeError {
    #[fail(display = "{}", _0)]
    Io(#[cause] io::Error),
    #[fail(display = "line {}: {}", line, error)]
    Parse {
        line: usize,
        #[cause]
        error: ParseError,
    },
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> DecodeError {
        DecodeError::Io(err)
    }
}

#[derive(Debug)]
pub struct DecoderBuilder {
    capacity: usize,
    schema: Schema,
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        DecoderBuilder {
            capacity: 8 * (1 << 10),
            schema: Schema::Auto,
        }
    }
}

impl DecoderBuilder {
    pub fn new() -> Self {
        DecoderBuilder::default()
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> DecodeResult<Decoder<File>> {
        Ok(Decoder::new(self, File::open(path)?))
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Decoder<R> {
        Decoder::new(self, rdr)
    }

    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut DecoderBuilder {
        self.capacity = capacity;
        self
    }

    pub fn schema(&mut self, schema: Schema) -> &mut DecoderBuilder {
        self.schema = schema;
        self
    }
}

/// Drops a trailing `\n`, `\r\n`, or a lone `\r` left on the last line.
pub(crate) fn trim_line_end(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}

#[derive(Debug)]
enum Lookahead {
    Empty,
    Line(Vec<u8>),
    Failed(io::Error),
    Exhausted,
}

/// Reads newline separated log lines and parses each into a `Record`.
///
/// At most one line is held back, by `has_more`, until the next `decode`.
/// The decoder is meant for a single reader; to parse on several threads,
/// split the input into lines first and hand them to a shared `Parser`.
#[derive(Debug)]
pub struct Decoder<R> {
    rdr: io::BufReader<R>,
    parser: Parser,
    lookahead: Lookahead,
    line: usize,
}

impl<R: io::Read> Decoder<R> {
    fn new(builder: &DecoderBuilder, rdr: R) -> Decoder<R> {
        Decoder {
            rdr: io::BufReader::with_capacity(builder.capacity, rdr),
            parser: Parser::new(builder.schema),
            lookahead: Lookahead::Empty,
            line: 0,
        }
    }

    pub fn from_reader(rdr: R) -> Decoder<R> {
        DecoderBuilder::new().from_reader(rdr)
    }

    /// Number of lines handed out so far.
    pub fn line(&self) -> usize {
        self.line
    }

    fn read_line(&mut self) -> Lookahead {
        let mut buf = Vec::new();
        match self.rdr.read_until(b'\n', &mut buf) {
            Ok(0) => Lookahead::Exhausted,
            Ok(_) => {
                trim_line_end(&mut buf);
                Lookahead::Line(buf)
            }
            Err(err) => Lookahead::Failed(err),
        }
    }

    /// Reports whether another line is available, reading it ahead if
    /// needed. A read failure also counts as "more": the next `decode`
    /// returns it.
    pub fn has_more(&mut self) -> bool {
        if let Lookahead::Empty = self.lookahead {
            self.lookahead = self.read_line();
        }

        match self.lookahead {
            Lookahead::Line(_) | Lookahead::Failed(_) => true,
            Lookahead::Empty | Lookahead::Exhausted => false,
        }
    }

    /// Parses the next line. `Ok(None)` means the input is exhausted. A
    /// read failure is reported once; the decoder is exhausted after it.
    pub fn decode(&mut self) -> DecodeResult<Option<Record>> {
        let next = match std::mem::replace(&mut self.lookahead, Lookahead::Empty) {
            Lookahead::Empty => self.read_line(),
            other => other,
        };

        match next {
            Lookahead::Line(buf) => {
                self.line += 1;
                trace!("decoding line {} ({} bytes)", self.line, buf.len());
                let record = self.parser.parse(&buf).map_err(|error| DecodeError::Parse {
                    line: self.line,
                    error,
                })?;
                Ok(Some(record))
            }
            Lookahead::Failed(err) => {
                self.lookahead = Lookahead::Exhausted;
                Err(DecodeError::Io(err))
            }
            Lookahead::Exhausted => {
                self.lookahead = Lookahead::Exhausted;
                Ok(None)
            }
            Lookahead::Empty => Ok(None),
        }
    }
}

impl<R: io::Read> Iterator for Decoder<R> {
    type Item = DecodeResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode().transpose()
    }
}
