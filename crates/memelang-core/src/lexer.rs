//! Lexer/parser (spec component C2, `decode`).
//!
//! Memelang's surface syntax is small but irregular, so this is a hand-rolled
//! multi-pass scanner rather than a declarative grammar: strip comments,
//! split on unescaped `"`, normalize whitespace/delimiters inside each
//! non-quoted segment, then walk a flat token stream assembling `Term`s.

use crate::ast::{Expression, Term, Tokens};
use crate::error::{MemelangError, Result};
use crate::normalize::normalize;
use crate::operand::Operand;
use crate::operator::{CmpOp, LinkTier, OperatorTable};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Side {
    Lhs,
    Rhs,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Completeness {
    Complete,
    Semicomplete,
    Incomplete,
}

/// Parse Memelang source text into [`Tokens`].
pub fn decode(source: &str) -> Result<Tokens> {
    let destripped = strip_group_markers(source);
    let stripped = strip_comments(&destripped);
    let mut prefixed = String::with_capacity(stripped.len() + 1);
    prefixed.push(';');
    prefixed.push_str(&stripped);

    let mut state = ParseState::new();
    for (index, segment) in split_unescaped_quotes(&prefixed).into_iter().enumerate() {
        if index % 2 == 1 {
            state.absorb_quoted(&unescape_quotes(&segment))?;
        } else {
            state.process_segment(&segment)?;
        }
    }
    state.finish()?;

    let mut tokens = state.tokens;
    normalize(&mut tokens)?;
    Ok(tokens)
}

struct ParseState {
    tokens: Tokens,
    expression: Expression,
    link: LinkTier,
    lhs: Option<Operand>,
    cmp: Option<CmpOp>,
    rhs: Option<Operand>,
    last_side: Side,
    has_content: bool,
}

impl ParseState {
    fn new() -> Self {
        ParseState {
            tokens: Vec::new(),
            expression: Vec::new(),
            link: LinkTier::End,
            lhs: None,
            cmp: None,
            rhs: None,
            last_side: Side::Lhs,
            has_content: false,
        }
    }

    fn absorb_quoted(&mut self, content: &str) -> Result<()> {
        self.cmp = Some(CmpOp::EqStr);
        self.rhs = Some(Operand::Str(content.to_string()));
        self.has_content = true;
        self.last_side = Side::Rhs;
        Ok(())
    }

    fn flush_term(&mut self) {
        if self.has_content {
            self.expression.push(Term { op: OperatorTable::compose(self.link, self.cmp), lhs: self.lhs.take(), rhs: self.rhs.take() });
        }
        self.cmp = None;
        self.lhs = None;
        self.rhs = None;
        self.has_content = false;
    }

    fn flush_expression(&mut self) {
        if !self.expression.is_empty() {
            self.tokens.push(std::mem::take(&mut self.expression));
        }
    }

    fn apply_link(&mut self, link: LinkTier) {
        self.flush_term();
        if matches!(link, LinkTier::Imp | LinkTier::End) {
            self.flush_expression();
        }
        self.link = link;
        self.has_content = true;
        self.last_side = Side::Lhs;
    }

    fn apply_cmp(&mut self, cmp: CmpOp) {
        self.cmp = Some(cmp);
        self.has_content = true;
        self.last_side = Side::Rhs;
    }

    fn apply_value(&mut self, raw: &str) -> Result<()> {
        validate_charset(raw)?;
        self.has_content = true;
        match self.last_side {
            Side::Lhs => {
                self.lhs = Some(if is_ascii_digits(raw) {
                    Operand::Id(raw.parse().map_err(|_| MemelangError::Syntax(format!("id literal too large: {raw}")))?)
                } else {
                    Operand::Str(raw.to_string())
                });
            }
            Side::Rhs => {
                self.rhs = Some(parse_rhs_value(raw, &mut self.cmp));
            }
        }
        Ok(())
    }

    fn process_segment(&mut self, raw_segment: &str) -> Result<()> {
        let normalized = normalize_segment(raw_segment);
        let toks = split_on_delimiters(&normalized);
        let tlen = toks.len();
        let mut t = 0usize;
        while t < tlen {
            let tok = toks[t].as_str();
            if tok.is_empty() || tok == "{" || tok == "}" {
                t += 1;
                continue;
            }

            let mut completeness = classify(tok);
            let mut lexeme = tok.to_string();

            if completeness != Completeness::Complete {
                for n in [1usize, 2usize] {
                    if t + n < tlen && !toks[t + n].is_empty() {
                        let combo = format!("{tok}{}", toks[t + n]);
                        if is_known_lexeme(&combo) {
                            completeness = Completeness::Complete;
                            lexeme = combo;
                            t += n;
                        }
                        break;
                    }
                }
                if completeness == Completeness::Incomplete {
                    return Err(MemelangError::Syntax(format!("dangling operator '{tok}'")));
                }
            }

            if let Some(link) = OperatorTable::lookup_link(&lexeme) {
                self.apply_link(link);
            } else if let Some(cmp) = OperatorTable::lookup_cmp(&lexeme) {
                self.apply_cmp(cmp);
            } else {
                self.apply_value(&lexeme)?;
            }
            t += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.flush_term();
        self.flush_expression();
        Ok(())
    }
}

fn is_ascii_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn validate_charset(tok: &str) -> Result<()> {
    if tok.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-') {
        Ok(())
    } else {
        Err(MemelangError::Syntax(format!("invalid character in token '{tok}'")))
    }
}

fn parse_rhs_value(raw: &str, cmp: &mut Option<CmpOp>) -> Operand {
    if let Some(digits) = raw.strip_prefix('a') {
        if is_ascii_digits(digits) {
            if let Ok(id) = digits.parse::<i64>() {
                return Operand::Id(id);
            }
        }
    }
    let has_digit = raw.bytes().any(|b| b.is_ascii_digit());
    let has_letter = raw.bytes().any(|b| b.is_ascii_alphabetic());
    if has_digit && !has_letter {
        if let Ok(f) = raw.parse::<f64>() {
            if *cmp == Some(CmpOp::Eq) {
                *cmp = Some(CmpOp::EqNum);
            }
            return Operand::Amt(f);
        }
    }
    Operand::Str(raw.to_string())
}

/// Single delimiter characters that are valid operators by themselves but
/// should still attempt to extend into a longer lexeme (`=` + `=` -> `==`,
/// `>` + `>` -> `>>`, `>` + `=` -> `>=`) are [`Completeness::Semicomplete`].
/// `!` is not a valid operator alone and must extend into `!=`.
fn classify(tok: &str) -> Completeness {
    match tok {
        " " | "[" | "]" | ";" | "{" | "}" => Completeness::Complete,
        "=" | ">" | "<" => Completeness::Semicomplete,
        "!" => Completeness::Incomplete,
        _ => Completeness::Complete,
    }
}

fn is_known_lexeme(tok: &str) -> bool {
    OperatorTable::lookup_link(tok).is_some() || OperatorTable::lookup_cmp(tok).is_some()
}

/// Strip `;{<graph>:<body> ... }` result-grouping markers (spec §4.2's
/// delimiter class includes `{`/`}`), so a string `encode_grouped` produced
/// decodes back to the matched terms it wraps. The `{<digits>:<digits>`
/// header isn't a term and carries no charset its own tokens would pass, so
/// it's dropped here rather than fed through the normal value/charset path;
/// `}` becomes `;`, closing the group the same way a real statement ends.
fn strip_group_markers(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            while matches!(chars.peek(), Some(c2) if c2.is_ascii_digit() || *c2 == ':') {
                chars.next();
            }
            out.push(' ');
        } else if c == '}' {
            out.push(';');
        } else {
            out.push(c);
        }
    }
    out
}

/// Drop `//`-to-end-of-line comments.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        match line.find("//") {
            Some(idx) => out.push_str(&line[..idx]),
            None => out.push_str(line),
        }
        out.push('\n');
    }
    out
}

/// Split on `"` characters not immediately preceded by `\`, dropping the
/// delimiter itself. Even indices are code; odd indices are quoted string
/// bodies (still carrying their `\"` escapes, see [`unescape_quotes`]).
fn split_unescaped_quotes(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut segments = Vec::new();
    let mut cur = String::new();
    for i in 0..chars.len() {
        let c = chars[i];
        if c == '"' && (i == 0 || chars[i - 1] != '\\') {
            segments.push(std::mem::take(&mut cur));
        } else {
            cur.push(c);
        }
    }
    segments.push(cur);
    segments
}

fn unescape_quotes(s: &str) -> String {
    s.replace("\\\"", "\"")
}

/// Whitespace/delimiter normalization within one non-quoted segment:
/// backslashes become spaces, runs of `;`/newline collapse to one `;`, runs
/// of whitespace collapse to one space, whitespace before `[`/`]` is
/// dropped, and a trailing `;` is trimmed.
fn normalize_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        out.push(if c == '\\' { ' ' } else { c });
    }

    let mut collapsed = String::with_capacity(out.len());
    let mut chars = out.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ';' || c == '\n' || c == '\r' {
            collapsed.push(';');
            while matches!(chars.peek(), Some(';') | Some('\n') | Some('\r')) {
                chars.next();
            }
        } else {
            collapsed.push(c);
        }
    }

    let mut ws_collapsed = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            ws_collapsed.push(' ');
            while matches!(chars.peek(), Some(c2) if c2.is_whitespace()) {
                chars.next();
            }
        } else {
            ws_collapsed.push(c);
        }
    }

    let mut bracket_trimmed = String::with_capacity(ws_collapsed.len());
    let mut chars = ws_collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            if matches!(chars.peek(), Some('[') | Some(']')) {
                continue;
            }
        }
        bracket_trimmed.push(c);
    }

    let mut semi_trimmed = String::with_capacity(bracket_trimmed.len());
    let mut chars = bracket_trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' && matches!(chars.peek(), Some(';')) {
            continue;
        }
        semi_trimmed.push(c);
        if c == ';' {
            while matches!(chars.peek(), Some(' ')) {
                chars.next();
            }
        }
    }

    semi_trimmed.trim_end_matches(';').to_string()
}

/// Split on the delimiter class `[][;!><=\s{}]`, one character at a time,
/// keeping each delimiter as its own token (possibly yielding empty strings
/// between adjacent delimiters, mirroring a capturing-group regex split).
fn split_on_delimiters(s: &str) -> Vec<String> {
    let mut toks = Vec::new();
    let mut cur = String::new();
    for c in s.chars() {
        if matches!(c, '[' | ']' | ';' | '!' | '>' | '<' | '=' | '{' | '}') || c.is_whitespace() {
            toks.push(std::mem::take(&mut cur));
            toks.push(c.to_string());
        } else {
            cur.push(c);
        }
    }
    toks.push(cur);
    toks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Column;

    #[test]
    fn single_bare_relation() {
        let tokens = decode("parent").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].len(), 1);
        assert_eq!(tokens[0][0].op.link, LinkTier::End);
        assert_eq!(tokens[0][0].lhs, Some(Operand::Str("parent".into())));
    }

    #[test]
    fn equality_promotes_numeric_rhs() {
        let tokens = decode("year=1700").unwrap();
        let term = &tokens[0][0];
        assert_eq!(term.op.cmp, Some(CmpOp::EqNum));
        assert_eq!(term.rhs, Some(Operand::Amt(1700.0)));
    }

    #[test]
    fn quoted_string_escapes_round_trip() {
        let tokens = decode("=\"John \\\"Q\\\" Adams\"").unwrap();
        let term = &tokens[0][0];
        assert_eq!(term.rhs, Some(Operand::Str("John \"Q\" Adams".into())));
        assert_eq!(OperatorTable::column_of(term.op), Column::Alp);
    }

    #[test]
    fn forward_chain_stays_one_expression() {
        let tokens = decode("child[birthee year>=1700").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].len(), 3);
        assert_eq!(tokens[0][1].op.link, LinkTier::Fwd);
        assert_eq!(tokens[0][2].op.link, LinkTier::And);
    }

    #[test]
    fn semicolon_splits_statements() {
        let tokens = decode("child;spouse").unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn direct_aid_reference() {
        let tokens = decode("=a1234").unwrap();
        assert_eq!(tokens[0][0].rhs, Some(Operand::Id(1234)));
    }

    #[test]
    fn invalid_character_is_syntax_error() {
        assert!(decode("child@bad").is_err());
    }

    #[test]
    fn grouped_result_text_decodes_to_its_terms() {
        let tokens = decode(";{999:12345 child=JohnAdams parent=AbigailAdams}").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].len(), 2);
        assert_eq!(tokens[0][0].lhs, Some(Operand::Str("child".into())));
        assert_eq!(tokens[0][0].rhs, Some(Operand::Str("JohnAdams".into())));
        assert_eq!(tokens[0][1].lhs, Some(Operand::Str("parent".into())));
    }
}
