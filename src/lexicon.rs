//! The shipped grammar of Balinese sentences with a numeral-phrase predicate.
//!
//! Structural rules (`K`, `K1`, `NP`, `NumP`, ...) and the word lists of the
//! lexical categories live together in `grammars/balinese.cfg`.

use crate::grammar::Grammar;
use crate::rules::Symbol;
use crate::Err;

pub const SOURCE: &str = include_str!("../grammars/balinese.cfg");

/// Kalimat: a whole sentence
pub const START: &str = "K";

/// Part-of-speech categories, the heads whose bodies are single words
pub const CATEGORIES: &[&str] = &[
  "PropNoun", "Pronoun", "Adv", "Det", "Noun", "Num", "V", "Prep", "Adj",
];

lazy_static! {
  static ref BALINESE: Option<Grammar> = SOURCE.parse().ok();
}

/// Parses the shipped grammar
pub fn balinese() -> Result<Grammar, Err> {
  SOURCE
    .parse()
    .map_err(|e| -> Err { format!("shipped grammar: {}", e).into() })
}

/// Every nonterminal of `g` with a production that is exactly `word`
pub fn categories_in<'g>(g: &'g Grammar, word: &str) -> Vec<&'g str> {
  let word = Symbol::terminal(word.to_lowercase());
  g.heads()
    .filter(|h| g.bodies(h).iter().any(|b| b.len() == 1 && b[0] == word))
    .collect()
}

/// Categories `word` belongs to in the shipped grammar, empty for unknown words
pub fn categories(word: &str) -> Vec<&'static str> {
  match &*BALINESE {
    Some(g) => categories_in(g, word),
    None => Vec::new(),
  }
}

pub fn is_known(word: &str) -> bool {
  !categories(word).is_empty()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shipped_grammar_parses() {
    let g = balinese().unwrap();
    assert_eq!(g.start, START);
    for head in ["K", "K1", "K2", "S", "P", "Pel", "Ket", "NP", "NumP", "AdjP", "VP", "PP"] {
      assert!(g.is_nonterminal(head), "{} missing", head);
    }
    for category in CATEGORIES {
      assert!(!g.bodies(category).is_empty(), "{} has no words", category);
    }
    assert!(g.terminals().len() > 300);
  }

  #[test]
  fn category_lookup() {
    assert_eq!(categories("duang"), vec!["Num"]);
    assert_eq!(categories("telung"), vec!["Num"]);
    assert_eq!(categories("buku"), vec!["Noun"]);
    assert_eq!(categories("numbas"), vec!["V"]);
    // in declaration order
    assert_eq!(categories("Tiang"), vec!["Pronoun", "Noun"]);
    // written upper-case in the grammar file
    assert_eq!(categories("ac"), vec!["Noun"]);
    assert!(categories("xyz").is_empty());
    assert!(!is_known("xyz"));
  }

  #[test]
  fn structural_heads_are_not_categories() {
    let g: Grammar = "S -> NP; NP -> Noun; Noun -> buku;".parse().unwrap();
    assert_eq!(categories_in(&g, "buku"), vec!["Noun"]);
    assert!(categories_in(&g, "Noun").is_empty());
  }
}
