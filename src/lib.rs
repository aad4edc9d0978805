#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod utils;

pub mod cyk;
pub mod earley;
pub mod grammar;
pub mod lexicon;
pub mod normalize;
pub mod parse_grammar;
pub mod reconstruct;
pub mod rules;
pub mod syntree;

use std::fmt;

use tracing::{debug, warn};

pub use crate::cyk::{ParseTable, Recognizer};
pub use crate::grammar::Grammar;
pub use crate::normalize::normalize;
pub use crate::reconstruct::{build_tree, Reconstructor};
pub use crate::rules::{Rule, Symbol};
pub use crate::syntree::SynTree;
pub use crate::utils::Err;

/// Longest sentence [`Validator`] analyzes unless told otherwise
pub const DEFAULT_MAX_TOKENS: usize = 64;

/// Lowercases `sentence`, drops punctuation and splits it on whitespace
pub fn tokenize(sentence: &str) -> Vec<String> {
  regex_static!(PUNCTUATION, r#"[.,?!;:"]"#);
  let lower = sentence.to_lowercase();
  let stripped = PUNCTUATION.replace_all(&lower, "");
  stripped.split_whitespace().map(str::to_string).collect()
}

/// Everything learned about one sentence
#[derive(Debug, Clone)]
pub struct Analysis {
  pub tokens: Vec<String>,
  pub accepted: bool,
  pub table: ParseTable,
  /// The derivation in the normalized grammar, helper nonterminals included
  pub raw_tree: Option<SynTree<String, String>>,
  /// The same derivation in terms of the hand-written grammar
  pub tree: Option<SynTree<String, String>>,
}

/// A grammar ready to check sentences against: the hand-written grammar, and
/// its normal form, computed once up front. Analysis only reads the two, so a
/// validator can be shared between threads.
#[derive(Debug, Clone)]
pub struct Validator {
  original: Grammar,
  cnf: Grammar,
  max_tokens: usize,
}

impl Validator {
  /// Uses the grammar's own start symbol
  pub fn new(original: Grammar) -> Self {
    let start = original.start.clone();
    Self::with_start(original, &start)
  }

  pub fn with_start(original: Grammar, start: &str) -> Self {
    let cnf = normalize(&original, start);
    Self {
      original,
      cnf,
      max_tokens: DEFAULT_MAX_TOKENS,
    }
  }

  /// The shipped Balinese grammar
  pub fn balinese() -> Result<Self, Err> {
    Ok(Self::with_start(lexicon::balinese()?, lexicon::START))
  }

  /// Sentences with more words than this are refused rather than analyzed.
  /// Recognition is cubic in the sentence length.
  pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
    self.max_tokens = max_tokens;
    self
  }

  pub fn original(&self) -> &Grammar {
    &self.original
  }

  pub fn cnf(&self) -> &Grammar {
    &self.cnf
  }

  pub fn start(&self) -> &str {
    &self.cnf.start
  }

  pub fn max_tokens(&self) -> usize {
    self.max_tokens
  }

  pub fn recognizer(&self) -> Recognizer<'_> {
    Recognizer::new(&self.cnf)
  }

  pub fn analyze(&self, sentence: &str) -> Result<Analysis, Err> {
    let tokens = tokenize(sentence);
    let tokens = tokens.iter().map(String::as_str).collect::<Vec<_>>();
    self.analyze_tokens(&tokens)
  }

  /// Analyzes an already tokenized sentence. Fails only when it's longer than
  /// the configured limit.
  pub fn analyze_tokens(&self, tokens: &[&str]) -> Result<Analysis, Err> {
    self.analyze_with(&self.recognizer(), tokens)
  }

  fn analyze_with(&self, recognizer: &Recognizer<'_>, tokens: &[&str]) -> Result<Analysis, Err> {
    if tokens.len() > self.max_tokens {
      warn!(
        tokens = tokens.len(),
        max = self.max_tokens,
        "refusing to analyze an overlong sentence"
      );
      return Err(
        format!(
          "sentence has {} words, more than the limit of {}",
          tokens.len(),
          self.max_tokens
        )
        .into(),
      );
    }

    let (accepted, table) = recognizer.recognize(tokens, self.start());
    let (raw_tree, tree) = if accepted {
      let r = Reconstructor::new(tokens, &table, &self.cnf, &self.original);
      let raw = r.derivation(self.start());
      let tree = raw.clone().map(|t| r.fold(t));
      (raw, tree)
    } else {
      (None, None)
    };

    Ok(Analysis {
      tokens: tokens.iter().map(|t| t.to_lowercase()).collect(),
      accepted,
      table,
      raw_tree,
      tree,
    })
  }

  /// Whether `sentence` is accepted. Overlong sentences are not.
  pub fn is_valid(&self, sentence: &str) -> bool {
    self.analyze(sentence).is_ok_and(|a| a.accepted)
  }

  /// Checks every sentence against the same normalized grammar
  pub fn validate_batch<S: AsRef<str>>(&self, sentences: impl IntoIterator<Item = S>) -> BatchReport {
    let recognizer = self.recognizer();
    let mut entries = Vec::new();

    for sentence in sentences {
      let sentence = sentence.as_ref();
      let tokens = tokenize(sentence);
      let token_refs = tokens.iter().map(String::as_str).collect::<Vec<_>>();
      let verdict = match self.analyze_with(&recognizer, &token_refs) {
        Ok(a) if a.accepted => Verdict::Valid,
        Ok(_) => Verdict::Invalid,
        Err(_) => Verdict::TooLong,
      };
      entries.push(BatchEntry {
        sentence: sentence.to_string(),
        tokens,
        verdict,
      });
    }

    let report = BatchReport { entries };
    debug!(
      total = report.total(),
      valid = report.valid(),
      invalid = report.invalid(),
      "validated batch"
    );
    report
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
  Valid,
  Invalid,
  /// Not analyzed, see [`Validator::with_max_tokens`]
  TooLong,
}

impl fmt::Display for Verdict {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Valid => write!(f, "valid"),
      Self::Invalid => write!(f, "invalid"),
      Self::TooLong => write!(f, "too long"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
  pub sentence: String,
  pub tokens: Vec<String>,
  pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
  pub entries: Vec<BatchEntry>,
}

impl BatchReport {
  pub fn total(&self) -> usize {
    self.entries.len()
  }

  pub fn valid(&self) -> usize {
    self.count(Verdict::Valid)
  }

  /// Rejected sentences, overlong ones included
  pub fn invalid(&self) -> usize {
    self.total() - self.valid()
  }

  pub fn too_long(&self) -> usize {
    self.count(Verdict::TooLong)
  }

  fn count(&self, verdict: Verdict) -> usize {
    self.entries.iter().filter(|e| e.verdict == verdict).count()
  }
}

/// One `verdict<TAB>sentence` line per entry, then the totals
impl fmt::Display for BatchReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for e in self.entries.iter() {
      writeln!(f, "{}\t{}", e.verdict, e.sentence)?;
    }
    write!(
      f,
      "{} valid, {} invalid, {} total",
      self.valid(),
      self.invalid(),
      self.total()
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  lazy_static! {
    static ref BALINESE: Validator = Validator::balinese().unwrap();
  }

  fn labels(tree: &SynTree<String, String>) -> Vec<&str> {
    tree.children().iter().map(|c| c.label()).collect()
  }

  #[test]
  fn tokenize_strips_punctuation_and_case() {
    assert_eq!(tokenize("Tiang  telung buku."), vec!["tiang", "telung", "buku"]);
    assert_eq!(tokenize("\"Duang, buku?!\""), vec!["duang", "buku"]);
    assert!(tokenize(" .. ").is_empty());
  }

  #[test]
  fn verb_predicate_is_rejected() {
    let a = BALINESE.analyze("tiang numbas buku").unwrap();
    assert!(!a.accepted);
    assert!(!a.table.top().unwrap().contains("K"));
    assert!(a.tree.is_none());
    assert!(a.raw_tree.is_none());
  }

  #[test]
  fn numeral_predicate_is_accepted() {
    let a = BALINESE.analyze("tiang telung buku").unwrap();
    assert!(a.accepted);
    assert!(a.table.top().unwrap().contains("K"));

    let tree = a.tree.unwrap();
    assert_eq!(
      tree.bracketed(),
      "[K [K1 [S [NP [Noun tiang]]] [P [NumP [NumP [Num telung]] [Noun buku]]]]]"
    );
    assert_eq!(tree.leaves(), vec!["tiang", "telung", "buku"]);

    // the normalized derivation skips the unit chains
    let raw = a.raw_tree.unwrap();
    assert_eq!(raw.label(), "K");
    assert_eq!(labels(&raw), vec!["S", "P"]);
  }

  #[test]
  fn verb_before_numeral_phrase_is_rejected() {
    // numbas is only a verb, and verbs only occur in the complement after
    // subject and predicate
    let a = BALINESE.analyze("tiang numbas duang buku").unwrap();
    assert!(!a.accepted);
    assert!(!a.table.top().unwrap().contains("K"));
    // the numeral phrase itself is fine
    assert!(a.table.contains(2, 3, "NumP"));
  }

  #[test]
  fn verb_complement_after_predicate() {
    let a = BALINESE.analyze("tiang duang buku numbas").unwrap();
    assert!(a.accepted);
    let tree = a.tree.unwrap();
    assert_eq!(labels(&tree), vec!["K1", "Pel"]);
    assert_eq!(tree.children()[1].bracketed(), "[Pel [VP [V numbas]]]");

    let k1 = &tree.children()[0];
    assert_eq!(labels(k1), vec!["S", "P"]);
    assert_eq!(k1.span(), (0, 3));
    assert_eq!(k1.children()[1].bracketed(), "[P [NumP [NumP [Num duang]] [Noun buku]]]");
  }

  #[test]
  fn empty_sentence() {
    let a = BALINESE.analyze("").unwrap();
    assert!(!a.accepted);
    assert!(a.tokens.is_empty());
    assert!(a.table.is_empty());
    assert!(a.tree.is_none());
  }

  #[test]
  fn unknown_word() {
    let a = BALINESE.analyze("xyz").unwrap();
    assert!(!a.accepted);
    assert!(a.table.cell(0, 0).is_empty());
    assert_eq!(a.table.render_cell(0, 0), "∅");
  }

  #[test]
  fn case_and_punctuation_do_not_matter() {
    assert!(BALINESE.is_valid("Tiang telung buku."));
    assert!(BALINESE.is_valid("TIANG TELUNG BUKU"));
    let a = BALINESE.analyze_tokens(&["Tiang", "Telung", "Buku"]).unwrap();
    assert!(a.accepted);
    assert_eq!(a.tokens, vec!["tiang", "telung", "buku"]);
  }

  #[test]
  fn trees_cover_the_sentence() {
    for sentence in [
      "tiang telung buku",
      "tiang duang buku numbas",
      "ipun telung",
      "tiang duang buku telung buku",
    ] {
      let a = BALINESE.analyze(sentence).unwrap();
      let Some(tree) = a.tree else {
        continue;
      };
      assert_eq!(tree.label(), "K", "{}", sentence);
      assert_eq!(tree.leaves(), a.tokens.iter().collect::<Vec<_>>(), "{}", sentence);
      assert_eq!(tree.span(), (0, a.tokens.len()));
    }
  }

  #[test]
  fn agrees_with_earley_on_the_unnormalized_grammar() {
    for sentence in [
      "tiang telung buku",
      "tiang numbas buku",
      "tiang numbas duang buku",
      "tiang duang buku numbas",
      "ipun telung",
      "buku",
      "telung buku tiang",
      "xyz telung",
    ] {
      let tokens = tokenize(sentence);
      let tokens = tokens.iter().map(String::as_str).collect::<Vec<_>>();
      assert_eq!(
        BALINESE.analyze_tokens(&tokens).unwrap().accepted,
        earley::recognize(BALINESE.original(), &tokens),
        "{}",
        sentence
      );
    }
  }

  #[test]
  fn overlong_sentences_are_refused() {
    let v = Validator::balinese().unwrap().with_max_tokens(2);
    let err = v.analyze("tiang telung buku").unwrap_err().to_string();
    assert_eq!(err, "sentence has 3 words, more than the limit of 2");
    assert!(!v.is_valid("tiang telung buku"));
    assert!(v.analyze("ipun telung").is_ok());
  }

  #[test]
  fn batch_report() {
    let v = Validator::balinese().unwrap().with_max_tokens(3);
    let report = v.validate_batch([
      "Tiang telung buku.",
      "tiang numbas buku",
      "tiang duang buku numbas",
      "",
    ]);
    let verdicts = report.entries.iter().map(|e| e.verdict).collect::<Vec<_>>();
    assert_eq!(
      verdicts,
      vec![Verdict::Valid, Verdict::Invalid, Verdict::TooLong, Verdict::Invalid]
    );
    assert_eq!(report.entries[0].tokens, vec!["tiang", "telung", "buku"]);
    assert_eq!((report.valid(), report.invalid(), report.total()), (1, 3, 4));
    assert_eq!(report.too_long(), 1);
    assert!(report.to_string().ends_with("1 valid, 3 invalid, 4 total"));
    assert!(report.to_string().starts_with("valid\tTiang telung buku.\n"));
  }

  #[test]
  fn custom_start_symbol() {
    let v = Validator::with_start(lexicon::balinese().unwrap(), "NumP");
    assert_eq!(v.start(), "NumP");
    assert!(v.is_valid("telung buku"));
    assert!(!v.is_valid("tiang telung buku"));

    let v = Validator::with_start(lexicon::balinese().unwrap(), "Missing");
    assert!(v.cnf().is_empty());
    assert!(!v.is_valid("tiang telung buku"));
  }

  #[test]
  fn validator_is_shared_across_threads() {
    let sentences = ["tiang telung buku", "tiang numbas buku", "ipun telung", "xyz"];
    let expected = sentences.map(|s| BALINESE.is_valid(s));

    std::thread::scope(|scope| {
      let handles = (0..4)
        .map(|_| scope.spawn(|| sentences.map(|s| BALINESE.is_valid(s))))
        .collect::<Vec<_>>();
      for h in handles {
        assert_eq!(h.join().unwrap(), expected);
      }
    });
  }
}
