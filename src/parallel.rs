use crate::decoder::{trim_line_end, DecodeResult};
use crate::parser::{ParseResult, Parser};
use crate::record::Record;
use rayon::prelude::*;
use std::io;
use std::io::BufRead;

/// Splits `rdr` into lines on the calling thread.
pub fn split_lines<R: io::Read>(rdr: R) -> DecodeResult<Vec<Vec<u8>>> {
    let mut rdr = io::BufReader::new(rdr);
    let mut lines = Vec::new();

    loop {
        let mut buf = Vec::new();
        if rdr.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        trim_line_end(&mut buf);
        lines.push(buf);
    }

    Ok(lines)
}

/// Parses independent lines on the rayon pool. Results keep input order.
pub fn parse_lines<L>(parser: &Parser, lines: &[L]) -> Vec<ParseResult<Record>>
where
    L: AsRef<[u8]> + Sync,
{
    lines.par_iter().map(|line| parser.parse(line.as_ref())).collect()
}

/// Reads all of `rdr` and parses its lines in parallel. Only a failure to
/// read is an error here; per-line outcomes are returned in order.
pub fn decode_all<R: io::Read>(parser: &Parser, rdr: R) -> DecodeResult<Vec<ParseResult<Record>>> {
    let lines = split_lines(rdr)?;
    debug!("parsing {} lines in parallel", lines.len());
    Ok(parse_lines(parser, &lines))
}
