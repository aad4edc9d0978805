use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::{debug, trace, warn};

use crate::grammar::Grammar;
use crate::rules::{Rule, Symbol};

/// The CYK chart: cell (i, j) holds every nonterminal that derives tokens i..=j.
/// Only cells with i <= j exist.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseTable {
  // rows[i][j - i]
  rows: Vec<Vec<BTreeSet<String>>>,
}

impl ParseTable {
  pub fn new(n: usize) -> Self {
    Self {
      rows: (0..n).map(|i| vec![BTreeSet::new(); n - i]).collect(),
    }
  }

  /// Number of tokens the table spans
  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Panics unless i <= j < len
  pub fn cell(&self, i: usize, j: usize) -> &BTreeSet<String> {
    assert!(i <= j && j < self.len(), "no cell ({}, {})", i, j);
    &self.rows[i][j - i]
  }

  pub fn contains(&self, i: usize, j: usize, symbol: &str) -> bool {
    self.cell(i, j).contains(symbol)
  }

  fn insert(&mut self, i: usize, j: usize, symbol: &str) -> bool {
    self.rows[i][j - i].insert(symbol.to_string())
  }

  /// The cell spanning the whole input, None for empty input
  pub fn top(&self) -> Option<&BTreeSet<String>> {
    if self.is_empty() {
      None
    } else {
      Some(self.cell(0, self.len() - 1))
    }
  }

  pub fn render_cell(&self, i: usize, j: usize) -> String {
    format_cell(self.cell(i, j))
  }
}

/// `{A, B}` with symbols sorted, or `∅`
pub fn format_cell(cell: &BTreeSet<String>) -> String {
  if cell.is_empty() {
    "∅".to_string()
  } else {
    let symbols = cell.iter().map(String::as_str).collect::<Vec<_>>();
    format!("{{{}}}", symbols.join(", "))
  }
}

/// Inverted triangle: the whole-sentence cell on the first line, single words
/// on the last.
impl fmt::Display for ParseTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let n = self.len();
    for span in (1..=n).rev() {
      write!(f, "{:>3} |", span)?;
      for i in 0..=(n - span) {
        write!(f, " {} |", self.render_cell(i, i + span - 1))?;
      }
      writeln!(f)?;
    }
    Ok(())
  }
}

/// A CNF grammar indexed for recognition. Build once, recognize many sentences;
/// the grammar is only borrowed, so recognizers on several threads can share it.
#[derive(Debug)]
pub struct Recognizer<'g> {
  grammar: &'g Grammar,
  /// word -> heads deriving it, in declaration order
  lexical: HashMap<&'g str, Vec<&'g str>>,
  /// (head, left, right)
  binary: Vec<(&'g str, &'g str, &'g str)>,
}

impl<'g> Recognizer<'g> {
  /// Bodies that aren't CNF-shaped are logged and ignored
  pub fn new(cnf: &'g Grammar) -> Self {
    let mut lexical: HashMap<&'g str, Vec<&'g str>> = HashMap::new();
    let mut binary = Vec::new();

    for (head, body) in cnf.productions() {
      match body.as_slice() {
        [Symbol::Terminal(w)] => lexical.entry(w.as_str()).or_default().push(head),
        [Symbol::Nonterminal(b), Symbol::Nonterminal(c)] => {
          binary.push((head, b.as_str(), c.as_str()))
        }
        _ => warn!(rule = %Rule::new(head, body.clone()), "ignoring non-CNF production"),
      }
    }

    Self {
      grammar: cnf,
      lexical,
      binary,
    }
  }

  pub fn grammar(&self) -> &'g Grammar {
    self.grammar
  }

  /// Fills the table bottom-up: single tokens on the diagonal, then spans of
  /// increasing length from every split point and binary production.
  pub fn fill(&self, tokens: &[&str]) -> ParseTable {
    let n = tokens.len();
    let mut table = ParseTable::new(n);

    for (i, token) in tokens.iter().enumerate() {
      let word = token.to_lowercase();
      if let Some(heads) = self.lexical.get(word.as_str()) {
        for head in heads {
          table.insert(i, i, head);
        }
      }
      trace!(i, word = %word, cell = %table.render_cell(i, i), "diagonal");
    }

    for len in 2..=n {
      for i in 0..=(n - len) {
        let j = i + len - 1;
        let mut found = Vec::new();
        for k in i..j {
          let (left, right) = (table.cell(i, k), table.cell(k + 1, j));
          if left.is_empty() || right.is_empty() {
            continue;
          }
          for &(head, b, c) in self.binary.iter() {
            if left.contains(b) && right.contains(c) {
              found.push(head);
            }
          }
        }
        for head in found {
          table.insert(i, j, head);
        }
      }
    }

    table
  }

  /// Accepts iff `start` derives the whole input. Empty input is never accepted.
  pub fn recognize(&self, tokens: &[&str], start: &str) -> (bool, ParseTable) {
    let table = self.fill(tokens);
    let accepted = table.top().is_some_and(|top| top.contains(start));
    debug!(tokens = tokens.len(), accepted, "recognized");
    (accepted, table)
  }
}

/// Runs CYK over a CNF grammar. See [`Recognizer`] to reuse the grammar index
/// across sentences.
pub fn recognize(cnf: &Grammar, tokens: &[&str], start: &str) -> (bool, ParseTable) {
  Recognizer::new(cnf).recognize(tokens, start)
}
