//! Purpose: namel3ss source tokenizer backing `n3_scan`.
//! Exports: `SourceScanner`, `Token`, `scan`, `tokens_to_json`.
//! Role: Indentation-aware lexer producing the token stream consumed by the parser.
//! Invariants: Indentation is measured in leading spaces; dedents must land on a known level.
//! Invariants: Every non-skipped line ends with NEWLINE; the stream always ends with EOF.
//! Invariants: The keyword table is built once per process and never mutated.
//! Notes: Columns and lines are 1-based and count Unicode scalar values.
use crate::core::buffer::InputView;
use crate::core::error::{Error, ErrorKind};
use crate::core::transform::Transform;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

const ESCAPED_IDENTIFIER: &str = "IDENT_ESCAPED";

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Token {
    pub column: usize,
    pub escaped: bool,
    pub line: usize,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: Option<String>,
}

impl Token {
    fn marker(kind: &'static str, line: usize, column: usize) -> Self {
        Self {
            column,
            escaped: false,
            line,
            kind,
            value: None,
        }
    }

    fn valued(kind: &'static str, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            column,
            escaped: false,
            line,
            kind,
            value: Some(value.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SourceScanner;

impl Transform for SourceScanner {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn apply(&self, input: &[u8]) -> Result<Vec<u8>, Error> {
        let source = InputView::new(input).as_str()?;
        let tokens = scan(source)?;
        tokens_to_json(&tokens)
    }
}

pub fn tokens_to_json(tokens: &[Token]) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(tokens).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode tokens")
            .with_source(err)
    })
}

pub fn scan(source: &str) -> Result<Vec<Token>, Error> {
    let lines = split_lines(source);
    let mut tokens = Vec::new();
    let mut indents: Vec<usize> = vec![0];

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if raw.trim().is_empty() || raw.trim_start().starts_with('#') {
            continue;
        }

        let indent = raw.chars().take_while(|ch| *ch == ' ').count();
        let current = indents.last().copied().unwrap_or(0);
        if indent > current {
            tokens.push(Token::marker("INDENT", line_no, 1));
            indents.push(indent);
        } else {
            while indent < indents.last().copied().unwrap_or(0) {
                indents.pop();
                tokens.push(Token::marker("DEDENT", line_no, 1));
            }
            if indent != indents.last().copied().unwrap_or(0) {
                return Err(scan_error(line_no, 1, "inconsistent dedent"));
            }
        }

        // Leading spaces are ASCII, so `indent` is also a byte offset.
        scan_line(&raw[indent..], line_no, indent + 1, &mut tokens)?;
        tokens.push(Token::marker("NEWLINE", line_no, raw.chars().count() + 1));
    }

    while indents.len() > 1 {
        indents.pop();
        tokens.push(Token::marker("DEDENT", lines.len(), 1));
    }
    tokens.push(Token::marker("EOF", lines.len() + 1, 1));
    Ok(tokens)
}

fn scan_line(
    text: &str,
    line_no: usize,
    start_col: usize,
    tokens: &mut Vec<Token>,
) -> Result<(), Error> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let column = start_col + i;
        let ch = chars[i];
        if ch == ' ' {
            i += 1;
            continue;
        }
        if ch == '*' && chars.get(i + 1) == Some(&'*') {
            tokens.push(Token::valued("POWER", "**", line_no, column));
            i += 2;
            continue;
        }
        if let Some(kind) = punctuation(ch) {
            tokens.push(Token::valued(kind, ch.to_string(), line_no, column));
            i += 1;
            continue;
        }
        let (token, consumed) = match ch {
            '`' => {
                let (value, consumed) = read_escaped_identifier(&chars[i..])
                    .ok_or_else(|| scan_error(line_no, column, "invalid escaped identifier"))?;
                let mut token = Token::valued(ESCAPED_IDENTIFIER, value, line_no, column);
                token.escaped = true;
                (token, consumed)
            }
            '"' => {
                let (value, consumed) = read_string(&chars[i..])
                    .ok_or_else(|| scan_error(line_no, column, "unterminated string"))?;
                (Token::valued("STRING", value, line_no, column), consumed)
            }
            ch if ch.is_ascii_digit() => {
                let (value, consumed) = read_number(&chars[i..]);
                (Token::valued("NUMBER", value, line_no, column), consumed)
            }
            ch if ch.is_alphabetic() || ch == '_' => {
                let (value, consumed) = read_identifier(&chars[i..]);
                let kind = keyword(&value).unwrap_or("IDENT");
                (Token::valued(kind, value, line_no, column), consumed)
            }
            _ => return Err(scan_error(line_no, column, "unexpected character")),
        };
        tokens.push(token);
        i += consumed;
    }
    Ok(())
}

fn punctuation(ch: char) -> Option<&'static str> {
    let kind = match ch {
        ':' => "COLON",
        '.' => "DOT",
        '+' => "PLUS",
        '-' => "MINUS",
        '*' => "STAR",
        '/' => "SLASH",
        '%' => "PERCENT",
        '=' => "EQUALS",
        '(' => "LPAREN",
        ')' => "RPAREN",
        '[' => "LBRACKET",
        ']' => "RBRACKET",
        ',' => "COMMA",
        _ => return None,
    };
    Some(kind)
}

/// `chars[0]` is the opening quote. No escape sequences; must close on the same line.
fn read_string(chars: &[char]) -> Option<(String, usize)> {
    let close = chars[1..].iter().position(|ch| *ch == '"')? + 1;
    Some((chars[1..close].iter().collect(), close + 1))
}

fn read_number(chars: &[char]) -> (String, usize) {
    let mut end = chars.iter().take_while(|ch| ch.is_ascii_digit()).count();
    let has_fraction = chars.get(end) == Some(&'.')
        && chars.get(end + 1).is_some_and(|ch| ch.is_ascii_digit());
    if has_fraction {
        end += 1;
        end += chars[end..]
            .iter()
            .take_while(|ch| ch.is_ascii_digit())
            .count();
    }
    (chars[..end].iter().collect(), end)
}

fn read_identifier(chars: &[char]) -> (String, usize) {
    let end = chars
        .iter()
        .take_while(|ch| ch.is_alphanumeric() || **ch == '_')
        .count();
    (chars[..end].iter().collect(), end)
}

/// `chars[0]` is the opening backtick.
fn read_escaped_identifier(chars: &[char]) -> Option<(String, usize)> {
    let close = chars[1..].iter().position(|ch| *ch == '`')? + 1;
    let value: String = chars[1..close].iter().collect();
    if !is_identifier_text(&value) {
        return None;
    }
    Some((value, close + 1))
}

fn is_identifier_text(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

fn scan_error(line: usize, column: usize, what: &str) -> Error {
    Error::new(ErrorKind::Usage).with_message(format!("{what} at line {line}, column {column}"))
}

fn split_lines(source: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0usize;
    let mut iter = source.char_indices().peekable();
    while let Some((idx, ch)) = iter.next() {
        if ch == '\r' {
            lines.push(&source[start..idx]);
            if let Some(&(_, '\n')) = iter.peek() {
                iter.next();
            }
            start = iter.peek().map(|(pos, _)| *pos).unwrap_or(source.len());
        } else if is_line_break(ch) {
            lines.push(&source[start..idx]);
            start = idx + ch.len_utf8();
        }
    }
    if start < source.len() {
        lines.push(&source[start..]);
    }
    lines
}

fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\u{000B}'
            | '\u{000C}'
            | '\u{001C}'
            | '\u{001D}'
            | '\u{001E}'
            | '\u{0085}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

fn keyword(word: &str) -> Option<&'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE
        .get_or_init(|| KEYWORDS.iter().copied().collect())
        .get(word)
        .copied()
}

const KEYWORDS: &[(&str, &str)] = &[
    ("flow", "FLOW"),
    ("page", "PAGE"),
    ("app", "APP"),
    ("spec", "SPEC"),
    ("ai", "AI"),
    ("ask", "ASK"),
    ("with", "WITH"),
    ("input", "INPUT"),
    ("input_schema", "INPUT_SCHEMA"),
    ("output_schema", "OUTPUT_SCHEMA"),
    ("as", "AS"),
    ("provider", "PROVIDER"),
    ("tools", "TOOLS"),
    ("expose", "EXPOSE"),
    ("tool", "TOOL"),
    ("call", "CALL"),
    ("kind", "KIND"),
    ("entry", "ENTRY"),
    ("purity", "PURITY"),
    ("timeout_seconds", "TIMEOUT_SECONDS"),
    ("memory", "MEMORY"),
    ("short_term", "SHORT_TERM"),
    ("semantic", "SEMANTIC"),
    ("profile", "PROFILE"),
    ("agent", "AGENT"),
    ("agents", "AGENTS"),
    ("parallel", "PARALLEL"),
    ("run", "RUN"),
    ("model", "MODEL"),
    ("system_prompt", "SYSTEM_PROMPT"),
    ("title", "TITLE"),
    ("text", "TEXT"),
    ("theme", "THEME"),
    ("theme_tokens", "THEME_TOKENS"),
    ("theme_preference", "THEME_PREFERENCE"),
    ("ui", "UI"),
    ("form", "FORM"),
    ("table", "TABLE"),
    ("button", "BUTTON"),
    ("section", "SECTION"),
    ("card", "CARD"),
    ("row", "ROW"),
    ("column", "COLUMN"),
    ("divider", "DIVIDER"),
    ("image", "IMAGE"),
    ("calls", "CALLS"),
    ("record", "RECORD"),
    ("save", "SAVE"),
    ("create", "CREATE"),
    ("find", "FIND"),
    ("where", "WHERE"),
    ("let", "LET"),
    ("latest", "LATEST"),
    ("set", "SET"),
    ("require", "REQUIRE"),
    ("return", "RETURN"),
    ("repeat", "REPEAT"),
    ("up", "UP"),
    ("to", "TO"),
    ("times", "TIMES"),
    ("for", "FOR"),
    ("each", "EACH"),
    ("in", "IN"),
    ("match", "MATCH"),
    ("when", "WHEN"),
    ("otherwise", "OTHERWISE"),
    ("try", "TRY"),
    ("catch", "CATCH"),
    ("if", "IF"),
    ("else", "ELSE"),
    ("is", "IS"),
    ("greater", "GREATER"),
    ("less", "LESS"),
    ("equal", "EQUAL"),
    ("than", "THAN"),
    ("and", "AND"),
    ("or", "OR"),
    ("not", "NOT"),
    ("state", "STATE"),
    ("constant", "CONSTANT"),
    ("true", "BOOLEAN"),
    ("false", "BOOLEAN"),
    ("null", "NULL"),
    ("string", "TYPE_STRING"),
    ("str", "TYPE_STRING"),
    ("int", "TYPE_INT"),
    ("integer", "TYPE_INT"),
    ("number", "TYPE_NUMBER"),
    ("boolean", "TYPE_BOOLEAN"),
    ("bool", "TYPE_BOOLEAN"),
    ("json", "TYPE_JSON"),
    ("must", "MUST"),
    ("be", "BE"),
    ("present", "PRESENT"),
    ("unique", "UNIQUE"),
    ("pattern", "PATTERN"),
    ("param", "PARAM"),
    ("have", "HAVE"),
    ("length", "LENGTH"),
    ("at", "AT"),
    ("least", "LEAST"),
    ("most", "MOST"),
    ("capabilities", "CAPABILITIES"),
    ("job", "JOB"),
    ("enqueue", "ENQUEUE"),
];

#[cfg(test)]
mod tests {
    use super::{SourceScanner, Token, scan, split_lines};
    use crate::core::error::ErrorKind;
    use crate::core::transform::Transform;

    fn kinds(tokens: &[Token]) -> Vec<&'static str> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn empty_source_is_just_eof() {
        let tokens = scan("").expect("scan");
        assert_eq!(tokens, vec![Token::marker("EOF", 1, 1)]);
        let json = SourceScanner.apply(b"").expect("json");
        assert_eq!(
            String::from_utf8(json).expect("utf8"),
            r#"[{"column":1,"escaped":false,"line":1,"type":"EOF","value":null}]"#
        );
    }

    #[test]
    fn flow_block_indents_and_dedents() {
        let source = "flow \"demo\":\n  set state.total is 10.5\n  return state.total\n";
        let tokens = scan(source).expect("scan");
        assert_eq!(
            kinds(&tokens),
            vec![
                "FLOW", "STRING", "COLON", "NEWLINE", "INDENT", "SET", "STATE", "DOT", "IDENT",
                "IS", "NUMBER", "NEWLINE", "RETURN", "STATE", "DOT", "IDENT", "NEWLINE", "DEDENT",
                "EOF",
            ]
        );
        let number = tokens.iter().find(|t| t.kind == "NUMBER").expect("number");
        assert_eq!(number.value.as_deref(), Some("10.5"));
        assert_eq!((number.line, number.column), (2, 22));
        let eof = tokens.last().expect("eof");
        assert_eq!(eof.line, 4);
    }

    #[test]
    fn newline_column_is_line_length_plus_one() {
        let tokens = scan("ask ai").expect("scan");
        let newline = tokens.iter().find(|t| t.kind == "NEWLINE").expect("newline");
        assert_eq!(newline.column, 7);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let tokens = scan("# header\n\n   \nlet x = 1\n").expect("scan");
        assert_eq!(
            kinds(&tokens),
            vec!["LET", "IDENT", "EQUALS", "NUMBER", "NEWLINE", "EOF"]
        );
        assert_eq!(tokens[0].line, 4);
    }

    #[test]
    fn power_and_star_are_distinct() {
        let tokens = scan("a ** b * c").expect("scan");
        assert_eq!(
            kinds(&tokens),
            vec!["IDENT", "POWER", "IDENT", "STAR", "IDENT", "NEWLINE", "EOF"]
        );
    }

    #[test]
    fn escaped_identifier_is_marked() {
        let tokens = scan("`title`").expect("scan");
        assert_eq!(tokens[0].kind, "IDENT_ESCAPED");
        assert!(tokens[0].escaped);
        assert_eq!(tokens[0].value.as_deref(), Some("title"));
        assert_eq!(tokens[1].column, 8);
    }

    #[test]
    fn dot_without_fraction_digit_stays_separate() {
        let tokens = scan("1.x").expect("scan");
        assert_eq!(kinds(&tokens), vec!["NUMBER", "DOT", "IDENT", "NEWLINE", "EOF"]);
    }

    #[test]
    fn invalid_inputs_are_usage_errors() {
        for source in ["a {", "\"open", "``", "`1a`", "a\n    b\n  c", "x\t"] {
            let err = scan(source).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Usage, "{source:?}");
        }
    }

    #[test]
    fn line_splitting_handles_all_breaks() {
        assert_eq!(split_lines("a\r\nb\rc\u{2028}d\n"), vec!["a", "b", "c", "d"]);
        assert!(split_lines("").is_empty());
    }
}
