//! Parse tree reconstruction from a filled CYK table.
//!
//! Reconstruction happens in two steps. [`Reconstructor::derivation`] walks the
//! table top-down and returns the CNF derivation: binary nodes, helper
//! nonterminals from binarization, and words attached directly to whatever
//! nonterminal unit removal collapsed them into. [`Reconstructor::fold`] then
//! maps that derivation back onto the hand-written grammar. Helper nodes are
//! spliced into their parents, and collapsed unit chains (`S -> NP -> Noun`) are
//! re-expanded as single-child nodes.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::trace;

use crate::cyk::ParseTable;
use crate::grammar::Grammar;
use crate::rules::{Body, Symbol};
use crate::syntree::{Constituent, SynTree, Word};

type Tree = SynTree<String, String>;

fn branch(value: &str, span: (usize, usize), children: Vec<Tree>) -> Tree {
  SynTree::Branch(
    Constituent {
      value: value.to_string(),
      span,
    },
    children,
  )
}

#[derive(Debug)]
pub struct Reconstructor<'a> {
  tokens: Vec<String>,
  table: &'a ParseTable,
  cnf: &'a Grammar,
  original: &'a Grammar,
}

impl<'a> Reconstructor<'a> {
  /// `table` must have been filled from `tokens` with `cnf`, and `cnf` must be
  /// the normalization of `original`
  pub fn new(tokens: &[&str], table: &'a ParseTable, cnf: &'a Grammar, original: &'a Grammar) -> Self {
    Self {
      tokens: tokens.iter().map(|t| t.to_lowercase()).collect(),
      table,
      cnf,
      original,
    }
  }

  /// The first-found CNF derivation of `start` over the whole input, or None
  /// if the top cell doesn't hold `start`
  pub fn derivation(&self, start: &str) -> Option<Tree> {
    if self.tokens.len() != self.table.len() {
      return None;
    }
    if !self.table.top()?.contains(start) {
      return None;
    }
    self.derive(start, 0, self.tokens.len() - 1)
  }

  /// Subtree for `symbol` over tokens i..=j. Split points are tried left to
  /// right, and for each one the head's productions in declaration order.
  fn derive(&self, symbol: &str, i: usize, j: usize) -> Option<Tree> {
    if i == j {
      let word = &self.tokens[i];
      let derives_word = self
        .cnf
        .bodies(symbol)
        .iter()
        .any(|b| matches!(b.as_slice(), [Symbol::Terminal(w)] if w == word));
      return derives_word.then(|| {
        branch(
          symbol,
          (i, i + 1),
          vec![SynTree::Leaf(Word {
            value: word.clone(),
            span: (i, i + 1),
          })],
        )
      });
    }

    for k in i..j {
      for body in self.cnf.bodies(symbol) {
        let [Symbol::Nonterminal(left), Symbol::Nonterminal(right)] = body.as_slice() else {
          continue;
        };
        if !self.table.contains(i, k, left) || !self.table.contains(k + 1, j, right) {
          continue;
        }
        trace!(symbol, i, j, split = k, %left, %right, "split");
        if let (Some(l), Some(r)) = (self.derive(left, i, k), self.derive(right, k + 1, j)) {
          return Some(branch(symbol, (i, j + 1), vec![l, r]));
        }
      }
    }
    None
  }

  /// Rewrites a derivation in terms of the original grammar. Every node but
  /// the root is dropped if it's a binarization helper, in which case its
  /// children move up into its parent.
  pub fn fold(&self, tree: Tree) -> Tree {
    match tree {
      SynTree::Leaf(w) => SynTree::Leaf(w),
      SynTree::Branch(c, children) => {
        let mut folded = Vec::with_capacity(children.len());
        for child in children {
          self.fold_into(child, &mut folded);
        }
        self.expand(c, folded)
      }
    }
  }

  fn fold_into(&self, tree: Tree, out: &mut Vec<Tree>) {
    match tree {
      SynTree::Branch(c, children) if self.cnf.is_synthetic(&c.value) => {
        for child in children {
          self.fold_into(child, out);
        }
      }
      tree => out.push(self.fold(tree)),
    }
  }

  /// Puts `children` under `c`, with the unit chain from `c` down to the
  /// nonterminal that actually has them as a body in between
  fn expand(&self, c: Constituent<String>, children: Vec<Tree>) -> Tree {
    let labels: Body = children
      .iter()
      .map(|t| match t {
        SynTree::Leaf(w) => Symbol::Terminal(w.value.clone()),
        SynTree::Branch(c, _) => Symbol::Nonterminal(c.value.clone()),
      })
      .collect();

    let path = unit_path(self.original, &c.value, |head| {
      self.original.bodies(head).contains(&labels)
    });
    let Some(path) = path else {
      // e.g. a body variant left over from epsilon removal
      trace!(symbol = %c.value, "no original production matches, keeping the normalized one");
      return SynTree::Branch(c, children);
    };

    let span = c.span;
    let mut names = path.into_iter().rev();
    let Some(innermost) = names.next() else {
      return SynTree::Branch(c, children);
    };
    let mut node = SynTree::Branch(
      Constituent {
        value: innermost,
        span,
      },
      children,
    );
    for name in names {
      node = SynTree::Branch(Constituent { value: name, span }, vec![node]);
    }
    SynTree::Branch(c, vec![node])
  }
}

/// Breadth-first search along unit productions from `from` for the first
/// nonterminal satisfying `found`. Returns the nonterminals after `from` on the
/// way there: empty if `from` itself qualifies, None if nothing reachable does.
/// Ties go to the production declared first.
pub fn unit_path(g: &Grammar, from: &str, found: impl Fn(&str) -> bool) -> Option<Vec<String>> {
  if found(from) {
    return Some(Vec::new());
  }

  let mut parent: HashMap<&str, &str> = HashMap::new();
  let mut seen: HashSet<&str> = HashSet::from([from]);
  let mut queue: VecDeque<&str> = VecDeque::from([from]);

  while let Some(current) = queue.pop_front() {
    for body in g.bodies(current) {
      let [Symbol::Nonterminal(next)] = body.as_slice() else {
        continue;
      };
      let next = next.as_str();
      if !seen.insert(next) {
        continue;
      }
      parent.insert(next, current);

      if found(next) {
        let mut path = Vec::new();
        let mut at = next;
        while let Some(&p) = parent.get(at) {
          path.push(at.to_string());
          at = p;
        }
        path.reverse();
        return Some(path);
      }
      queue.push_back(next);
    }
  }

  None
}

/// One parse tree for `tokens`, in terms of `original`'s symbols, or None if
/// `start` isn't in the table's top cell. Ambiguity is resolved by taking the
/// first split point and production that work.
pub fn build_tree(
  tokens: &[&str],
  table: &ParseTable,
  cnf: &Grammar,
  original: &Grammar,
  start: &str,
) -> Option<Tree> {
  let r = Reconstructor::new(tokens, table, cnf, original);
  r.derivation(start).map(|raw| r.fold(raw))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cyk;
  use crate::normalize::normalize;

  struct Fixture {
    original: Grammar,
    cnf: Grammar,
  }

  impl Fixture {
    fn new(src: &str) -> Self {
      let original: Grammar = src.parse().unwrap();
      let cnf = normalize(&original, &original.start);
      Self { original, cnf }
    }

    fn raw(&self, tokens: &[&str]) -> Option<Tree> {
      let (_, table) = cyk::recognize(&self.cnf, tokens, &self.cnf.start);
      Reconstructor::new(tokens, &table, &self.cnf, &self.original).derivation(&self.cnf.start)
    }

    fn tree(&self, tokens: &[&str]) -> Option<Tree> {
      let (_, table) = cyk::recognize(&self.cnf, tokens, &self.cnf.start);
      build_tree(tokens, &table, &self.cnf, &self.original, &self.cnf.start)
    }
  }

  const CHAINS: &str = r#"
    K -> S P;
    S -> NP;
    NP -> Noun;
    P -> NumP;
    NumP -> Num Noun;
    Noun -> tiang | buku;
    Num -> duang;
  "#;

  #[test]
  fn unit_chains_are_re_expanded() {
    let f = Fixture::new(CHAINS);
    let tokens = ["tiang", "duang", "buku"];

    let raw = f.raw(&tokens).unwrap();
    assert_eq!(raw.bracketed(), "[K [S tiang] [P [Num duang] [Noun buku]]]");

    let tree = f.tree(&tokens).unwrap();
    assert_eq!(
      tree.bracketed(),
      "[K [S [NP [Noun tiang]]] [P [NumP [Num duang] [Noun buku]]]]"
    );
    let (_, children) = tree.get_branch().unwrap();
    assert_eq!(children[1].children()[0].span(), (1, 3));
  }

  #[test]
  fn helper_nonterminals_are_folded_away() {
    let f = Fixture::new("S -> a B c D; B -> b; D -> d;");
    let tokens = ["a", "b", "c", "d"];

    let raw = f.raw(&tokens).unwrap();
    assert_eq!(raw.bracketed(), "[S [T_a a] [X1 [B b] [X2 [T_c c] [D d]]]]");

    let tree = f.tree(&tokens).unwrap();
    assert_eq!(tree.bracketed(), "[S a [B b] c [D d]]");
    assert_eq!(tree.children()[0].span(), (0, 1));
    assert!(tree.children()[0].is_leaf());
  }

  #[test]
  fn first_split_wins() {
    let f = Fixture::new("S -> S S | a;");
    let tree = f.tree(&["a", "a", "a"]).unwrap();
    assert_eq!(tree.bracketed(), "[S [S a] [S [S a] [S a]]]");
  }

  #[test]
  fn declaration_order_breaks_ties() {
    let f = Fixture::new("S -> A | B; A -> w; B -> w;");
    assert_eq!(f.tree(&["w"]).unwrap().bracketed(), "[S [A w]]");
    let f = Fixture::new("S -> B | A; A -> w; B -> w;");
    assert_eq!(f.tree(&["w"]).unwrap().bracketed(), "[S [B w]]");
  }

  #[test]
  fn no_tree_without_start_in_top_cell() {
    let f = Fixture::new("S -> a b;");
    assert!(f.tree(&["a", "a"]).is_none());
    assert!(f.tree(&["xyz"]).is_none());
    assert!(f.tree(&[]).is_none());
  }

  #[test]
  fn table_must_match_the_tokens() {
    let f = Fixture::new("S -> a b;");
    let (_, table) = cyk::recognize(&f.cnf, &["a", "b"], "S");
    assert!(build_tree(&["a", "b", "b"], &table, &f.cnf, &f.original, "S").is_none());
  }

  #[test]
  fn unit_path_prefers_earlier_productions() {
    let g: Grammar = "S -> NP | Pronoun; NP -> Noun | Pronoun; Noun -> tiang; Pronoun -> tiang;"
      .parse()
      .unwrap();
    let derives_tiang = |head: &str| g.bodies(head).contains(&vec![Symbol::terminal("tiang")]);
    assert_eq!(unit_path(&g, "S", derives_tiang), Some(vec!["Pronoun".to_string()]));
    assert_eq!(
      unit_path(&g, "NP", derives_tiang),
      Some(vec!["Noun".to_string()])
    );
    assert_eq!(unit_path(&g, "Noun", derives_tiang), Some(Vec::new()));
    assert_eq!(unit_path(&g, "Noun", |h: &str| h == "S"), None);
  }

  #[test]
  fn accepted_sentences_yield_valid_trees() {
    let f = Fixture::new(
      r#"
      S -> A S b | B | c C;
      A -> a | ;
      B -> A | S | b b;
      C -> C c | c;
    "#,
    );

    let mut sentences: Vec<Vec<&str>> = vec![Vec::new()];
    let mut checked = 0;
    for _ in 0..5 {
      sentences = sentences
        .iter()
        .flat_map(|s| {
          ["a", "b", "c"].into_iter().map(move |w| {
            let mut s = s.clone();
            s.push(w);
            s
          })
        })
        .collect();

      for s in sentences.iter() {
        let (accepted, _) = cyk::recognize(&f.cnf, s, "S");
        let tree = f.tree(s);
        assert_eq!(accepted, tree.is_some(), "{:?}", s);
        if let Some(tree) = tree {
          assert_eq!(tree.label(), "S");
          assert_eq!(&tree.leaves(), s, "{:?}", s);
          assert_eq!(tree.span(), (0, s.len()));
          checked += 1;
        }
      }
    }
    assert!(checked > 10);
  }
}
