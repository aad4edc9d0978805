//! Simple recursive-descent parsing of grammar files
//!
//! ```text
//! // comment
//! NumP -> Num | NumP Noun | NumP NP Det;
//! Num  -> duang | telung;
//! Opt  -> ;
//! ```

use regex::Regex;

use crate::Err;

/// A rule as written: a head and its alternatives, before symbols are
/// classified into terminals and nonterminals
#[derive(Debug, Clone, PartialEq)]
pub struct RawRule {
  pub head: String,
  pub alternatives: Vec<Vec<String>>,
}

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// Try to consume a regex anchored at the start of `s`, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  match re.find(s) {
    Some(m) if m.start() == 0 => (Some(m.as_str()), &s[m.end()..]),
    _ => (None, s),
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", re, excerpt(s)).into())
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Skips whitespace and // comments, possibly none
fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"^(?:\s|//[^\n]*)*");
  optional_re(&WHITESPACE_OR_COMMENT, s).1
}

/// The start of `s`, for error messages
fn excerpt(s: &str) -> &str {
  let line = s.lines().next().unwrap_or("");
  match line.char_indices().nth(40) {
    Some((idx, _)) => &line[..idx],
    None => line,
  }
}

/// Tries to parse a name made of letters, numbers, - and _
fn parse_name(s: &str) -> ParseResult<'_, &str> {
  regex_static!(NAME, r"^[a-zA-Z0-9\-_]+");
  needed_re(&NAME, s).map_err(|err| format!("name: {}", err).into())
}

/// Symbols up to the next | or ;, which is left unconsumed
fn parse_alternative(s: &str) -> ParseResult<'_, Vec<String>> {
  let mut symbols = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.starts_with('|') || rem.starts_with(';') {
      return Ok((symbols, rem));
    }
    if rem.is_empty() {
      return Err("unterminated rule, expected ;".into());
    }
    let (name, s) = parse_name(rem)?;
    symbols.push(name.to_string());
    rem = s;
  }
}

/// Head, arrow, alternatives, terminated by ;
fn parse_rule(s: &str) -> ParseResult<'_, RawRule> {
  #![allow(clippy::trivial_regex)]
  regex_static!(ARROW, "^->");

  let (head, s) = parse_name(s).map_err(|e| -> Err { format!("rule head: {}", e).into() })?;
  let s = skip_whitespace(s);
  let (_, s) = needed_re(&ARROW, s).map_err(|e| -> Err { format!("rule arrow: {}", e).into() })?;

  let mut alternatives = Vec::new();
  let mut rem = s;
  loop {
    let (alt, s) = parse_alternative(rem)
      .map_err(|e| -> Err { format!("rule {}: {}", head, e).into() })?;
    alternatives.push(alt);
    if let (Some(_), s) = optional_char(';', s) {
      rem = s;
      break;
    }
    let (_, s) = optional_char('|', s);
    rem = s;
  }

  Ok((
    RawRule {
      head: head.to_string(),
      alternatives,
    },
    rem,
  ))
}

/// Parses every rule in `s`. The remaining input is empty on success.
pub fn parse_rules(s: &str) -> ParseResult<'_, Vec<RawRule>> {
  let mut rules = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok((rules, rem));
    }
    let (rule, s) = parse_rule(rem)?;
    rules.push(rule);
    rem = s;
  }
}
