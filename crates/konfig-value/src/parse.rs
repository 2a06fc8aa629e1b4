//! Relaxed HOCON-style configuration text parser.
//!
//! The dialect accepted here covers the configuration fragments the binding
//! engine consumes:
//!
//! - the root object may omit its braces (`bb: 1` is a complete document);
//! - keys are bare (dotted keys expand to nested objects) or double-quoted;
//! - `:` and `=` both separate keys from values, and `key { ... }` is
//!   accepted without either;
//! - entries are separated by commas or newlines;
//! - values are objects, lists, `null`, booleans, numbers, double-quoted
//!   strings, or bare strings running to the end of the line;
//! - `#` and `//` start comments running to the end of the line;
//! - a later duplicate key wins, except that two object values for the same
//!   key merge deeply.
//!
//! Strict JSON documents are a subset of the dialect; [`crate::from_json_str`]
//! is available when strictness is wanted.

use indexmap::IndexMap;

use crate::error::ParseError;
use crate::value::{insert_path, Number, Value};

/// Parse configuration text into a value tree.
///
/// The root of a document is always an object.
///
/// # Example
///
/// ```
/// use konfig_value::{parse, Lookup, Number, Value};
///
/// let tree = parse("cc.byte: 127\nlist: [1, 2]").unwrap();
/// assert!(matches!(
///     tree.lookup("cc.byte"),
///     Lookup::Found(Value::Number(Number::Int(127)))
/// ));
/// ```
///
/// # Errors
///
/// Returns [`ParseError::Syntax`] with line and column information when the
/// text violates the grammar.
pub fn parse(text: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(text);
    parser.skip_separators();

    let map = if parser.peek() == Some('{') {
        parser.bump();
        let map = parser.object_body(Some('}'))?;
        parser.skip_separators();
        if let Some(ch) = parser.peek() {
            return Err(parser.error(format!("unexpected `{ch}` after closing brace")));
        }
        map
    } else {
        parser.object_body(None)?
    };

    Ok(Value::Object(map))
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(self.line, self.column, message)
    }

    fn at_comment(&self) -> bool {
        self.peek() == Some('#') || (self.peek() == Some('/') && self.peek_at(1) == Some('/'))
    }

    /// Skip spaces, tabs, carriage returns, and comments, staying on the
    /// current line (the trailing newline of a comment is not consumed).
    fn skip_inline(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.bump();
                }
                _ if self.at_comment() => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    /// Skip whitespace of every kind, comments, and stray commas between
    /// entries.
    fn skip_separators(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\n' | ',') => {
                    self.bump();
                }
                _ if self.at_comment() => self.skip_inline(),
                _ => return,
            }
        }
    }

    fn object_body(
        &mut self,
        end: Option<char>,
    ) -> Result<IndexMap<String, Value>, ParseError> {
        let mut map = IndexMap::new();

        loop {
            self.skip_separators();
            match self.peek() {
                None => {
                    if end.is_none() {
                        return Ok(map);
                    }
                    return Err(self.error("unexpected end of input, expected `}`"));
                }
                Some(ch) if Some(ch) == end => {
                    self.bump();
                    return Ok(map);
                }
                _ => {}
            }

            let segments = self.key()?;
            self.skip_inline();

            let value = match self.peek() {
                Some(':' | '=') => {
                    self.bump();
                    self.skip_inline();
                    self.value()?
                }
                Some('{') => self.value()?,
                Some(ch) => {
                    return Err(self.error(format!("expected `:`, `=`, or `{{` after key, found `{ch}`")))
                }
                None => return Err(self.error("unexpected end of input after key")),
            };

            let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
            insert_path(&mut map, &refs, value);

            self.skip_inline();
            match self.peek() {
                None => {}
                Some('\n' | ',') => {
                    self.bump();
                }
                Some(ch) if Some(ch) == end => {}
                Some(ch) => {
                    return Err(self.error(format!("expected `,` or newline after value, found `{ch}`")))
                }
            }
        }
    }

    fn key(&mut self) -> Result<Vec<String>, ParseError> {
        if self.peek() == Some('"') {
            // Quoted keys are taken verbatim; dots inside them do not nest.
            return Ok(vec![self.quoted_string()?]);
        }

        let mut key = String::new();
        while let Some(ch) = self.peek() {
            if matches!(ch, ':' | '=' | '{' | '}' | ',' | '\n' | '\r' | ' ' | '\t') {
                break;
            }
            key.push(ch);
            self.bump();
        }

        if key.is_empty() {
            return Err(self.error("expected a key"));
        }
        Ok(key.split('.').map(str::to_string).collect())
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some('{') => {
                self.bump();
                Ok(Value::Object(self.object_body(Some('}'))?))
            }
            Some('[') => self.list(),
            Some('"') => Ok(Value::Str(self.quoted_string()?)),
            Some(_) => self.bare_value(),
            None => Err(self.error("expected a value")),
        }
    }

    fn list(&mut self) -> Result<Value, ParseError> {
        self.bump(); // consume `[`
        let mut items = Vec::new();

        loop {
            self.skip_separators();
            match self.peek() {
                None => return Err(self.error("unexpected end of input in list")),
                Some(']') => {
                    self.bump();
                    return Ok(Value::List(items));
                }
                _ => {}
            }

            items.push(self.value()?);

            self.skip_inline();
            match self.peek() {
                None => return Err(self.error("unexpected end of input in list")),
                Some(',' | '\n') => {
                    self.bump();
                }
                Some(']') => {}
                Some(ch) => return Err(self.error(format!("expected `,` or `]`, found `{ch}`"))),
            }
        }
    }

    fn quoted_string(&mut self) -> Result<String, ParseError> {
        self.bump(); // consume opening quote
        let mut out = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.error("unterminated string")),
                Some('"') => {
                    self.bump();
                    return Ok(out);
                }
                Some('\\') => {
                    self.bump();
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated string"))?;
                    match escaped {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        '/' => out.push('/'),
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'u' => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let digit = self
                                    .bump()
                                    .and_then(|c| c.to_digit(16))
                                    .ok_or_else(|| {
                                        self.error("expected four hex digits after \\u")
                                    })?;
                                code = code * 16 + digit;
                            }
                            let ch = char::from_u32(code)
                                .ok_or_else(|| self.error("invalid unicode escape"))?;
                            out.push(ch);
                        }
                        other => {
                            return Err(self.error(format!("invalid escape `\\{other}`")));
                        }
                    }
                }
                Some(_) => {
                    // Safe: peek returned Some.
                    if let Some(ch) = self.bump() {
                        out.push(ch);
                    }
                }
            }
        }
    }

    /// A bare token runs to the end of the line or to the nearest
    /// structural character, then classifies as null, boolean, number, or
    /// string.
    fn bare_value(&mut self) -> Result<Value, ParseError> {
        let mut token = String::new();
        while let Some(ch) = self.peek() {
            if matches!(ch, ',' | ']' | '}' | '\n' | '\r') || self.at_comment() {
                break;
            }
            token.push(ch);
            self.bump();
        }

        let token = token.trim_end();
        if token.is_empty() {
            return Err(self.error("expected a value"));
        }
        Ok(classify(token))
    }
}

fn classify(token: &str) -> Value {
    match token {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if looks_numeric(token) {
        if !token.contains(['.', 'e', 'E']) {
            if let Ok(i) = token.parse::<i64>() {
                return Value::Number(Number::Int(i));
            }
        }
        if let Ok(f) = token.parse::<f64>() {
            return Value::Number(Number::Float(f));
        }
    }

    Value::Str(token.to_string())
}

fn looks_numeric(token: &str) -> bool {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    digits.starts_with(|c: char| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Lookup;
    use proptest::prelude::*;

    fn found<'a>(tree: &'a Value, path: &str) -> &'a Value {
        match tree.lookup(path) {
            Lookup::Found(v) => v,
            other => panic!("expected {path} to resolve, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse("").unwrap(), Value::empty_object());
        assert_eq!(parse("  \n # comment\n").unwrap(), Value::empty_object());
        assert_eq!(parse("{}").unwrap(), Value::empty_object());
    }

    #[test]
    fn test_parse_braceless_root() {
        let tree = parse("bb = 1").unwrap();
        assert_eq!(found(&tree, "bb"), &Value::Number(Number::Int(1)));
    }

    #[test]
    fn test_parse_dotted_key_expands() {
        let tree = parse("cc.byte: 127").unwrap();
        assert_eq!(found(&tree, "cc.byte"), &Value::Number(Number::Int(127)));
        assert_eq!(found(&tree, "cc").kind(), crate::Kind::Object);
    }

    #[test]
    fn test_parse_scalars() {
        let tree = parse(
            "a: true\nb: false\nc: null\nd: 1.5\ne: -2\nf: \"true\"\ng: bare string\nh: 1e3",
        )
        .unwrap();

        assert_eq!(found(&tree, "a"), &Value::Bool(true));
        assert_eq!(found(&tree, "b"), &Value::Bool(false));
        assert_eq!(tree.lookup("c"), Lookup::Null);
        assert_eq!(found(&tree, "d"), &Value::Number(Number::Float(1.5)));
        assert_eq!(found(&tree, "e"), &Value::Number(Number::Int(-2)));
        assert_eq!(found(&tree, "f"), &Value::Str("true".into()));
        assert_eq!(found(&tree, "g"), &Value::Str("bare string".into()));
        assert_eq!(found(&tree, "h"), &Value::Number(Number::Float(1000.0)));
    }

    #[test]
    fn test_parse_nested_lists() {
        let tree = parse("list: [[], [], null]").unwrap();
        let Value::List(items) = found(&tree, "list") else {
            panic!("expected list");
        };
        assert_eq!(
            items,
            &vec![Value::List(vec![]), Value::List(vec![]), Value::Null]
        );
    }

    #[test]
    fn test_parse_objects_in_lists() {
        let tree = parse("list: [{a: 1}, [[[]]], [{a: 2}]]").unwrap();
        let Value::List(items) = found(&tree, "list") else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].kind(), crate::Kind::Object);
        assert_eq!(items[1].kind(), crate::Kind::List);
    }

    #[test]
    fn test_parse_inline_object_value() {
        let tree = parse("map: {a: 1, l: [2, 3], b: null, c: {x: \"i\"}}").unwrap();
        assert_eq!(found(&tree, "map.a"), &Value::Number(Number::Int(1)));
        assert_eq!(found(&tree, "map.c.x"), &Value::Str("i".into()));
        assert_eq!(tree.lookup("map.b"), Lookup::Null);
    }

    #[test]
    fn test_parse_object_without_separator() {
        let tree = parse("server {\n  port: 8080\n}").unwrap();
        assert_eq!(found(&tree, "server.port"), &Value::Number(Number::Int(8080)));
    }

    #[test]
    fn test_parse_comments() {
        let tree = parse("# leading\na: 1 // trailing\n// whole line\nb: 2").unwrap();
        assert_eq!(found(&tree, "a"), &Value::Number(Number::Int(1)));
        assert_eq!(found(&tree, "b"), &Value::Number(Number::Int(2)));
    }

    #[test]
    fn test_parse_duplicate_keys_later_wins() {
        let tree = parse("a: 1\na: 2").unwrap();
        assert_eq!(found(&tree, "a"), &Value::Number(Number::Int(2)));
    }

    #[test]
    fn test_parse_duplicate_objects_merge() {
        let tree = parse("o: {x: 1}\no: {y: 2}").unwrap();
        assert_eq!(found(&tree, "o.x"), &Value::Number(Number::Int(1)));
        assert_eq!(found(&tree, "o.y"), &Value::Number(Number::Int(2)));
    }

    #[test]
    fn test_parse_unterminated_list_is_error() {
        assert!(parse("list: [").is_err());
        assert!(parse("list: [1, ").is_err());
    }

    #[test]
    fn test_parse_unterminated_object_is_error() {
        assert!(parse("{a: 1").is_err());
    }

    #[test]
    fn test_parse_missing_value_is_error() {
        assert!(parse("a:").is_err());
        assert!(parse("a: \n").is_err());
    }

    #[test]
    fn test_parse_error_carries_position() {
        let err = parse("a: 1\nb: [").unwrap_err();
        let ParseError::Syntax { line, .. } = err else {
            panic!("expected syntax error");
        };
        assert_eq!(line, 2);
    }

    #[test]
    fn test_parse_quoted_escapes() {
        let tree = parse(r#"s: "a\"b\\c\ndA""#).unwrap();
        assert_eq!(found(&tree, "s"), &Value::Str("a\"b\\c\ndA".into()));
    }

    #[test]
    fn test_bare_value_with_colon() {
        let tree = parse("cfg: classpath:App2.props").unwrap();
        assert_eq!(found(&tree, "cfg"), &Value::Str("classpath:App2.props".into()));
    }

    proptest! {
        #[test]
        fn prop_integer_literals_parse_exactly(n in any::<i64>()) {
            let tree = parse(&format!("n: {n}")).unwrap();
            prop_assert_eq!(found(&tree, "n"), &Value::Number(Number::Int(n)));
        }

        #[test]
        fn prop_quoted_strings_roundtrip(s in "[a-zA-Z0-9 _.-]*") {
            let tree = parse(&format!("s: \"{s}\"")).unwrap();
            prop_assert_eq!(found(&tree, "s"), &Value::Str(s));
        }
    }
}
