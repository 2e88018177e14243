use std::error::Error;
use std::fmt;

use super::{Mapping, Number, Value};

const CONTEXT_LEN: usize = 24;
/// Lists and mappings nested deeper than this are rejected.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub offset: usize,
    pub expected: &'static str,
    /// Unconsumed input at the failure position, lossily decoded.
    pub context: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} at byte {}, found {:?}",
            self.expected, self.offset, self.context
        )
    }
}

impl Error for SyntaxError {}

/// Parse a complete document. Only whitespace may follow the top-level value.
pub fn parse(input: &[u8]) -> Result<Value, SyntaxError> {
    let mut parser = Parser::new(input);
    let value = parser.parse_value()?;
    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(parser.error("end of input"));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, expected: &'static str) -> SyntaxError {
        let rest = &self.input[self.pos.min(self.input.len())..];
        let end = rest.len().min(CONTEXT_LEN);
        SyntaxError {
            offset: self.pos,
            expected,
            context: String::from_utf8_lossy(&rest[..end]).into_owned(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_literal(&mut self, literal: &[u8]) -> bool {
        if self.input[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self) -> Result<Value, SyntaxError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.nested(Self::parse_mapping),
            Some(b'[') => self.nested(Self::parse_list),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b'+' | b'-' | b'.' | b'0'..=b'9') => self.parse_number(),
            _ if self.eat_literal(b"true") => Ok(Value::Bool(true)),
            _ if self.eat_literal(b"false") => Ok(Value::Bool(false)),
            _ if self.eat_literal(b"null") => Ok(Value::Null),
            _ => Err(self.error("value")),
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, SyntaxError>,
    ) -> Result<Value, SyntaxError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("shallower nesting"));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn parse_mapping(&mut self) -> Result<Value, SyntaxError> {
        self.pos += 1;
        let mut map = Mapping::new();
        if self.eat(b'}') {
            return Ok(Value::Mapping(map));
        }
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(self.error("string key"));
            }
            let key = self.parse_string()?;
            if !self.eat(b':') {
                return Err(self.error("':'"));
            }
            let value = self.parse_value()?;
            // Duplicate keys: last one wins.
            map.insert(super::latin1_to_string(&key), value);

            if self.eat(b',') {
                continue;
            }
            if self.eat(b'}') {
                return Ok(Value::Mapping(map));
            }
            return Err(self.error("',' or '}'"));
        }
    }

    fn parse_list(&mut self) -> Result<Value, SyntaxError> {
        self.pos += 1;
        let mut items = Vec::new();
        if self.eat(b']') {
            return Ok(Value::List(items));
        }
        loop {
            items.push(self.parse_value()?);
            if self.eat(b',') {
                continue;
            }
            if self.eat(b']') {
                return Ok(Value::List(items));
            }
            return Err(self.error("',' or ']'"));
        }
    }

    /// Parses a quoted string starting at the opening quote, folding 2-byte
    /// UTF-8 sequences for U+0080..U+00FF into single bytes.
    fn parse_string(&mut self) -> Result<Vec<u8>, SyntaxError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                self.pos = start;
                return Err(self.error("closing '\"'"));
            };
            self.pos += 1;
            match b {
                b'"' => return Ok(out),
                b'\\' => {
                    let Some(escaped) = self.peek() else {
                        self.pos = start;
                        return Err(self.error("closing '\"'"));
                    };
                    self.pos += 1;
                    out.push(unescape(escaped));
                }
                0xC2 | 0xC3 => match self.peek() {
                    Some(cont @ 0x80..=0xBF) => {
                        self.pos += 1;
                        out.push(((b & 0x1F) << 6) | (cont & 0x3F));
                    }
                    _ => out.push(b),
                },
                _ => out.push(b),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, SyntaxError> {
        let start = self.pos;
        if let Some(b'+' | b'-') = self.peek() {
            self.pos += 1;
        }
        let int_digits = self.skip_digits();
        let mut frac_digits = 0;
        if self.peek() == Some(b'.') {
            let dot = self.pos;
            self.pos += 1;
            frac_digits = self.skip_digits();
            if frac_digits == 0 {
                self.pos = dot;
            }
        }
        if int_digits == 0 && frac_digits == 0 {
            self.pos = start;
            return Err(self.error("number"));
        }

        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| self.error("number"))?;
        let text = text.strip_prefix('+').unwrap_or(text);
        if frac_digits == 0
            && let Ok(v) = text.parse::<i64>()
        {
            return Ok(Value::Number(Number::Int(v)));
        }
        text.parse::<f64>()
            .map(|v| Value::Number(Number::Decimal(v)))
            .map_err(|_| {
                let mut err = self.error("number");
                err.offset = start;
                err
            })
    }

    fn skip_digits(&mut self) -> usize {
        let begin = self.pos;
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        self.pos - begin
    }
}

fn unescape(escaped: u8) -> u8 {
    match escaped {
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'b' => 0x08,
        b'f' => 0x0C,
        // '"', '\\', '/' and anything unrecognised stand for themselves.
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_DEPTH, parse};
    use crate::document::{Number, Value};

    fn int(v: i64) -> Value {
        Value::Number(Number::Int(v))
    }

    fn dec(v: f64) -> Value {
        Value::Number(Number::Decimal(v))
    }

    #[test]
    fn parses_scalars() {
        assert_eq!(parse(b"null").expect("null"), Value::Null);
        assert_eq!(parse(b" true ").expect("true"), Value::Bool(true));
        assert_eq!(parse(b"false").expect("false"), Value::Bool(false));
        assert_eq!(parse(b"\"x\"").expect("string"), Value::String(b"x".to_vec()));
    }

    #[test]
    fn parses_three_number_shapes() {
        assert_eq!(parse(b"12").expect("int"), int(12));
        assert_eq!(parse(b"-7").expect("negative"), int(-7));
        assert_eq!(parse(b"+3").expect("plus"), int(3));
        assert_eq!(parse(b"1.25").expect("int+frac"), dec(1.25));
        assert_eq!(parse(b".5").expect("frac"), dec(0.5));
        assert_eq!(parse(b"-.5").expect("neg frac"), dec(-0.5));
    }

    #[test]
    fn rejects_exponents() {
        let err = parse(b"1e5").expect_err("exponent is not part of the grammar");
        assert_eq!(err.offset, 1);
        assert_eq!(err.context, "e5");
    }

    #[test]
    fn integer_overflow_falls_back_to_decimal() {
        assert_eq!(
            parse(b"92233720368547758070").expect("big"),
            dec(92_233_720_368_547_758_070.0)
        );
    }

    #[test]
    fn parses_nested_structures() {
        let value = parse(br#" { "a" : [ 1 , { "b" : null } ] , "c" : "d" } "#).expect("nested");
        let list = value.get("a").and_then(Value::as_list).expect("list");
        assert_eq!(list.len(), 2);
        assert_eq!(list[1].get("b"), Some(&Value::Null));
        assert_eq!(value.bytes("c"), Some(&b"d"[..]));
    }

    #[test]
    fn duplicate_keys_keep_last_value() {
        let value = parse(br#"{"k":1,"k":2}"#).expect("dup");
        assert_eq!(value.int("k"), Some(2));
    }

    #[test]
    fn escapes_use_table_and_pass_through_unknown() {
        let value = parse(br#""a\nb\t\"\\\/\q\u00e9""#).expect("escapes");
        assert_eq!(value.as_bytes(), Some(&b"a\nb\t\"\\/qu00e9"[..]));
    }

    #[test]
    fn folds_two_byte_utf8_into_latin1() {
        let value = parse("\"Caf\u{e9} \u{a9}\"".as_bytes()).expect("latin1");
        assert_eq!(value.as_bytes(), Some(&[b'C', b'a', b'f', 0xE9, b' ', 0xA9][..]));
    }

    #[test]
    fn keeps_longer_utf8_sequences_unconverted() {
        let value = parse("\"\u{20ac}\"".as_bytes()).expect("euro");
        assert_eq!(value.as_bytes(), Some(&[0xE2, 0x82, 0xAC][..]));
    }

    #[test]
    fn trailing_commas_are_errors() {
        assert!(parse(b"[1,2,]").is_err());
        assert!(parse(br#"{"a":1,}"#).is_err());
    }

    #[test]
    fn missing_delimiters_are_errors() {
        let err = parse(br#"{"a" 1}"#).expect_err("missing colon");
        assert_eq!(err.offset, 5);
        assert!(parse(b"[1 2]").is_err());
        assert!(parse(br#"{"a":1"#).is_err());
    }

    #[test]
    fn unterminated_string_reports_its_start() {
        let err = parse(br#"  "abc"#).expect_err("unterminated");
        assert_eq!(err.offset, 2);
        assert!(err.context.starts_with("\"abc"));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let err = parse(b"{} x").expect_err("garbage");
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let text = format!("{}{}", "[".repeat(100_000), "]".repeat(100_000));
        let err = parse(text.as_bytes()).expect_err("too deep");
        assert_eq!(err.offset, MAX_DEPTH);
        assert_eq!(err.expected, "shallower nesting");

        let text = "{\"a\":".repeat(MAX_DEPTH + 1) + "1" + &"}".repeat(MAX_DEPTH + 1);
        assert!(parse(text.as_bytes()).is_err());
    }

    #[test]
    fn nesting_up_to_the_limit_parses() {
        let text = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        let mut value = parse(text.as_bytes()).expect("parse");
        let mut depth = 0;
        while let Value::List(mut items) = value {
            depth += 1;
            match items.pop() {
                Some(inner) => value = inner,
                None => break,
            }
        }
        assert_eq!(depth, MAX_DEPTH);
    }
}
