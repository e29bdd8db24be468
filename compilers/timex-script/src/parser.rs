use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, not},
    error::{Error, ErrorKind},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

/// Characters allowed in an unquoted literal (`1`, `-5`, `PM`, `#weekdays`).
fn is_bare_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '#' | '-')
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

/// A `"..."` or `'...'` literal. A backslash takes the next character verbatim.
pub fn quoted_literal(input: &str) -> IResult<&str, String> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, c)) if is_quote(c) => c,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };

    let mut text = String::new();
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            text.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((&input[i + c.len_utf8()..], text));
        } else {
            text.push(c);
        }
    }

    // Unterminated
    Err(nom::Err::Error(Error::new(input, ErrorKind::Char)))
}

pub fn bare_literal(input: &str) -> IResult<&str, &str> {
    take_while1(is_bare_char)(input)
}

/// Either literal form, as an owned string.
pub fn literal(input: &str) -> IResult<&str, String> {
    alt((quoted_literal, map(bare_literal, String::from)))(input)
}

/// `timex [ "key" ]`
pub fn timex_key(input: &str) -> IResult<&str, String> {
    preceded(
        tuple((multispace0, tag("timex"), multispace0)),
        delimited(
            tuple((char('['), multispace0)),
            literal,
            tuple((multispace0, char(']'))),
        ),
    )(input)
}

/// `timex["key"] =`, leaving the right-hand side as the remaining input.
pub fn assignment_target(input: &str) -> IResult<&str, String> {
    terminated(timex_key, tuple((multispace0, char('='), not(char('=')))))(input)
}

/// Succeeds only when the whole input is a single literal.
pub fn whole_literal(input: &str) -> Option<String> {
    all_consuming(delimited(multispace0, literal, multispace0))(input)
        .ok()
        .map(|(_, text)| text)
}

/// Succeeds only when the whole input is a single `timex[...]` lookup.
pub fn whole_lookup(input: &str) -> Option<String> {
    all_consuming(terminated(timex_key, multispace0))(input)
        .ok()
        .map(|(_, key)| key)
}

/// Returns the text between the parentheses when `source` is exactly
/// `name( ... )`, with the closing parenthesis balanced against the opening one.
pub fn call_arguments<'a>(source: &'a str, name: &str) -> Option<&'a str> {
    let (rest, _) = tuple((
        multispace0::<&str, Error<&str>>,
        tag(name),
        multispace0,
        char('('),
    ))(source)
    .ok()?;

    let close = TopLevel::new(rest).find(|&(_, c)| c == ')')?.0;
    if !rest[close + 1..].trim().is_empty() {
        return None;
    }
    Some(&rest[..close])
}

/// Splits `source` at every separator that sits outside quotes and outside
/// any `()`, `[]` or `{}` nesting.
pub fn split_top_level(source: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (i, c) in TopLevel::new(source) {
        if is_separator(c) {
            parts.push(&source[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&source[start..]);
    parts
}

/// Iterates the characters of a source string that are at bracket depth
/// zero and outside quoted literals. Opening brackets at depth zero are
/// yielded; so are unbalanced closers, which is how a caller finds the end
/// of an already-opened call.
pub struct TopLevel<'a> {
    chars: std::str::CharIndices<'a>,
    depth: usize,
    quote: Option<char>,
    escaped: bool,
}

impl<'a> TopLevel<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices(),
            depth: 0,
            quote: None,
            escaped: false,
        }
    }
}

impl<'a> Iterator for TopLevel<'a> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        for (i, c) in self.chars.by_ref() {
            if let Some(quote) = self.quote {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == quote {
                    self.quote = None;
                }
                continue;
            }

            match c {
                _ if is_quote(c) => self.quote = Some(c),
                '(' | '[' | '{' => {
                    self.depth += 1;
                    if self.depth == 1 {
                        return Some((i, c));
                    }
                }
                ')' | ']' | '}' => {
                    if self.depth == 0 {
                        return Some((i, c));
                    }
                    self.depth -= 1;
                }
                _ if self.depth == 0 => return Some((i, c)),
                _ => {}
            }
        }
        None
    }
}
