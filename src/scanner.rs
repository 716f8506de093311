const SPACE: u8 = b' ';
const QUOTE: u8 = b'"';

/// Outcome of a single `scan` call.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Scan<'a> {
    /// A complete token. `advance` counts the bytes consumed, including the
    /// leading spaces and the terminating space if there was one.
    Token { advance: usize, token: &'a [u8] },
    /// The span ends inside a token (or holds only spaces) and more bytes may
    /// follow. Nothing is consumed.
    Incomplete,
    /// Only spaces were left and no more bytes will arrive.
    Exhausted { advance: usize },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum State {
    Between,
    Bare,
    Quoted,
}

/// Extracts the next token from `data`.
///
/// Tokens are separated by spaces, except that a run between double quotes is
/// part of the token even if it contains spaces. A token that is wrapped in a
/// balanced pair of quotes is returned without them. An opening quote that is
/// never closed swallows the rest of the span, which is returned verbatim once
/// `at_eof` is set.
pub fn scan(data: &[u8], at_eof: bool) -> Scan<'_> {
    let mut state = State::Between;
    let mut start = 0;

    for (i, &b) in data.iter().enumerate() {
        state = match (state, b) {
            (State::Between, SPACE) => State::Between,
            (State::Between, QUOTE) => {
                start = i;
                State::Quoted
            }
            (State::Between, _) => {
                start = i;
                State::Bare
            }
            (State::Bare, SPACE) => {
                return Scan::Token {
                    advance: i + 1,
                    token: unquote(&data[start..i]),
                };
            }
            (State::Bare, QUOTE) => State::Quoted,
            (State::Quoted, QUOTE) => State::Bare,
            (s, _) => s,
        };
    }

    if !at_eof {
        return Scan::Incomplete;
    }

    match state {
        State::Between => Scan::Exhausted { advance: data.len() },
        State::Bare => Scan::Token {
            advance: data.len(),
            token: unquote(&data[start..]),
        },
        State::Quoted => Scan::Token {
            advance: data.len(),
            token: &data[start..],
        },
    }
}

// Only called on tokens whose quotes are balanced.
fn unquote(token: &[u8]) -> &[u8] {
    if token.len() >= 2 && token[0] == QUOTE && token[token.len() - 1] == QUOTE {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

/// Iterates the tokens of one complete line.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    line: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    pub fn new(line: &'a [u8]) -> Self {
        Tokens { line, pos: 0 }
    }

    /// The bytes not yet consumed. Right after a token this starts just past
    /// the single space that terminated it.
    pub fn remainder(&self) -> &'a [u8] {
        &self.line[self.pos..]
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        match scan(self.remainder(), true) {
            Scan::Token { advance, token } => {
                self.pos += advance;
                Some(token)
            }
            Scan::Exhausted { advance } => {
                self.pos += advance;
                None
            }
            Scan::Incomplete => None,
        }
    }
}
