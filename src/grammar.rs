use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::parse_grammar::{parse_rules, RawRule};
use crate::rules::{is_binary, is_lexical, Body, Rule, Symbol};
use crate::Err;

/// A context-free grammar: nonterminal -> ordered, duplicate-free list of bodies.
///
/// Heads keep the order they were first declared in, and bodies keep the order
/// they were first added in, so every traversal (and therefore every normalized
/// grammar, table and tree built from it) is reproducible.
///
/// A head may have no bodies at all. It is still a nonterminal, it just can't
/// derive anything.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grammar {
  pub start: String,
  heads: Vec<String>,
  rules: HashMap<String, Vec<Body>>,
  synthetic: HashSet<String>,
}

impl Grammar {
  pub fn new(start: impl Into<String>) -> Self {
    Self {
      start: start.into(),
      ..Default::default()
    }
  }

  /// A grammar with the same start symbol, heads and synthetic markers as
  /// `other`, but no bodies. Normalization phases start from this.
  pub fn with_heads_of(other: &Grammar) -> Self {
    Self {
      start: other.start.clone(),
      heads: other.heads.clone(),
      rules: other
        .heads
        .iter()
        .map(|h| (h.clone(), Vec::new()))
        .collect(),
      synthetic: other.synthetic.clone(),
    }
  }

  /// Declares `head` as a nonterminal without giving it a body
  pub fn add_head(&mut self, head: &str) {
    if !self.rules.contains_key(head) {
      self.heads.push(head.to_string());
      self.rules.insert(head.to_string(), Vec::new());
    }
  }

  /// Adds head -> body, declaring the head if needed. Returns false if the
  /// production was already present.
  pub fn add_rule(&mut self, head: &str, body: Body) -> bool {
    self.add_head(head);
    let bodies = self.rules.entry(head.to_string()).or_default();
    if bodies.contains(&body) {
      false
    } else {
      bodies.push(body);
      true
    }
  }

  /// Marks a head as introduced by normalization rather than written by hand
  pub fn mark_synthetic(&mut self, head: &str) {
    self.add_head(head);
    self.synthetic.insert(head.to_string());
  }

  pub fn is_synthetic(&self, name: &str) -> bool {
    self.synthetic.contains(name)
  }

  pub fn is_nonterminal(&self, name: &str) -> bool {
    self.rules.contains_key(name)
  }

  /// Heads in declaration order
  pub fn heads(&self) -> impl Iterator<Item = &str> {
    self.heads.iter().map(String::as_str)
  }

  /// Bodies of `head` in insertion order, empty if `head` isn't a nonterminal
  pub fn bodies(&self, head: &str) -> &[Body] {
    self.rules.get(head).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Every (head, body) pair, heads in declaration order
  pub fn productions(&self) -> impl Iterator<Item = (&str, &Body)> {
    self
      .heads
      .iter()
      .flat_map(move |h| self.bodies(h).iter().map(move |b| (h.as_str(), b)))
  }

  pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
    self
      .productions()
      .map(|(head, body)| Rule::new(head, body.clone()))
  }

  /// Number of nonterminals
  pub fn len(&self) -> usize {
    self.heads.len()
  }

  pub fn is_empty(&self) -> bool {
    self.heads.is_empty()
  }

  /// Number of productions
  pub fn rule_count(&self) -> usize {
    self.rules.values().map(Vec::len).sum()
  }

  pub fn terminals(&self) -> BTreeSet<&str> {
    self
      .productions()
      .flat_map(|(_, body)| body.iter().filter_map(Symbol::as_terminal))
      .collect()
  }

  /// Every name the grammar uses, nonterminal or terminal
  pub fn symbol_names(&self) -> HashSet<&str> {
    let mut names: HashSet<&str> = self.heads().collect();
    names.extend(self.terminals());
    names
  }

  /// Keeps only the heads in `live`, and only the bodies whose nonterminals
  /// are all in `live`
  pub fn restrict_to(&self, live: &HashSet<String>) -> Grammar {
    let mut out = Grammar::new(self.start.clone());
    for head in self.heads().filter(|h| live.contains(*h)) {
      out.add_head(head);
      if self.is_synthetic(head) {
        out.synthetic.insert(head.to_string());
      }
      for body in self.bodies(head) {
        let all_live = body
          .iter()
          .filter_map(Symbol::as_nonterminal)
          .all(|n| live.contains(n));
        if all_live {
          out.add_rule(head, body.clone());
        }
      }
    }
    out
  }

  pub fn is_cnf(&self) -> bool {
    self.check_cnf().is_ok()
  }

  /// Checks that every body is a single terminal or two declared nonterminals
  pub fn check_cnf(&self) -> Result<(), Err> {
    for (head, body) in self.productions() {
      let ok = is_lexical(body)
        || (is_binary(body)
          && body
            .iter()
            .filter_map(Symbol::as_nonterminal)
            .all(|n| self.is_nonterminal(n)));
      if !ok {
        return Err(format!("not in CNF: {}", Rule::new(head, body.clone())).into());
      }
    }
    Ok(())
  }

  /// Builds a grammar from raw rules. A name is a nonterminal iff it heads some
  /// rule, everything else is a word and gets lowercased. The first rule's head
  /// is the start symbol.
  pub fn from_raw(raw: Vec<RawRule>) -> Result<Self, Err> {
    let first = raw.first().ok_or("empty ruleset")?;
    let heads: HashSet<String> = raw.iter().map(|r| r.head.clone()).collect();

    let valid_name = |s: &str| {
      !s.is_empty()
        && s
          .chars()
          .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    };

    let mut g = Grammar::new(first.head.clone());
    for rule in raw.iter() {
      if !valid_name(&rule.head) {
        return Err(format!("invalid nonterminal name {:?}", rule.head).into());
      }
      g.add_head(&rule.head);
      for alt in rule.alternatives.iter() {
        let mut body = Vec::with_capacity(alt.len());
        for name in alt.iter() {
          if !valid_name(name) {
            return Err(format!("invalid symbol {:?} in a body of {}", name, rule.head).into());
          }
          if heads.contains(name) {
            body.push(Symbol::Nonterminal(name.clone()));
          } else {
            body.push(Symbol::Terminal(name.to_lowercase()));
          }
        }
        g.add_rule(&rule.head, body);
      }
    }

    Ok(g)
  }

  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let path = path.as_ref();
    let src = fs::read_to_string(path)
      .map_err(|e| -> Err { format!("reading {}: {}", path.display(), e).into() })?;
    src.parse()
  }
}

impl FromStr for Grammar {
  type Err = Err;

  /// Parses a grammar from a string. Assumes the first rule's symbol
  /// is the start symbol.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (rules, rest) = parse_rules(s)?;
    if !rest.is_empty() {
      return Err(format!("trailing input: {}", rest).into());
    }
    Self::from_raw(rules)
  }
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "//** start: {}", self.start)?;
    for (head, body) in self.productions() {
      write!(f, "{} ->", head)?;
      for s in body.iter() {
        write!(f, " {}", s)?;
      }
      writeln!(f, ";")?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classifies_symbols_by_head_membership() {
    let g: Grammar = r#"
      NumP -> Num Noun | Num;
      Num -> duang | telung;
      Noun -> AC | buku;
    "#
    .parse()
    .unwrap();

    assert_eq!(g.start, "NumP");
    assert_eq!(g.heads().collect::<Vec<_>>(), vec!["NumP", "Num", "Noun"]);
    assert_eq!(
      g.bodies("NumP")[0],
      vec![Symbol::nonterminal("Num"), Symbol::nonterminal("Noun")]
    );
    // upper-case words are still words, and get lowercased
    assert_eq!(g.bodies("Noun")[0], vec![Symbol::terminal("ac")]);
    assert_eq!(g.terminals().into_iter().collect::<Vec<_>>(), vec!["ac", "buku", "duang", "telung"]);
    assert_eq!(g.rule_count(), 6);
  }

  #[test]
  fn duplicate_bodies_are_dropped() {
    let g: Grammar = "Adv -> ngiring | ngiring | alon;".parse().unwrap();
    assert_eq!(g.bodies("Adv").len(), 2);
  }

  #[test]
  fn empty_bodies_and_bodiless_heads() {
    let g: Grammar = "S -> A b; A -> ;".parse().unwrap();
    assert_eq!(g.bodies("A"), &[Vec::<Symbol>::new()]);
    assert!(g.bodies("missing").is_empty());
    assert!(!g.is_cnf());
  }

  #[test]
  fn malformed_input_fails_before_normalization() {
    assert!("".parse::<Grammar>().is_err());
    assert!("S -> a".parse::<Grammar>().is_err());
    assert!("S a;".parse::<Grammar>().is_err());
    assert!(Grammar::from_raw(vec![RawRule {
      head: "S".to_string(),
      alternatives: vec![vec!["two words".to_string()]],
    }])
    .is_err());
  }

  #[test]
  fn cnf_check_names_the_offending_rule() {
    let g: Grammar = "S -> A B; A -> a; B -> b;".parse().unwrap();
    assert!(g.check_cnf().is_ok());

    let g: Grammar = "S -> A; A -> a;".parse().unwrap();
    let err = g.check_cnf().unwrap_err().to_string();
    assert_eq!(err, "not in CNF: S -> A");
  }

  #[test]
  fn display_reparses_to_the_same_grammar() {
    let g: Grammar = "K -> S P; S -> tiang; P -> duang buku;".parse().unwrap();
    let printed = g.to_string();
    assert!(printed.starts_with("//** start: K\n"));
    let reparsed: Grammar = printed.parse().unwrap();
    assert_eq!(reparsed, g);
  }

  #[test]
  fn restrict_drops_dead_heads_and_bodies() {
    let g: Grammar = "S -> A B | A; A -> a; B -> b;".parse().unwrap();
    let live: HashSet<String> = ["S", "A"].iter().map(|s| s.to_string()).collect();
    let r = g.restrict_to(&live);
    assert_eq!(r.heads().collect::<Vec<_>>(), vec!["S", "A"]);
    assert_eq!(r.bodies("S"), &[vec![Symbol::nonterminal("A")]]);
  }
}
