//! Chomsky Normal Form conversion.
//!
//! [`normalize`] runs four phases in order, each one a pure function from one
//! grammar value to a new one:
//!
//! 1. [`remove_epsilons`]: no body is empty afterwards
//! 2. [`remove_units`]: no body is a lone nonterminal afterwards
//! 3. [`remove_useless`]: every nonterminal is generating and reachable from the start
//! 4. [`binarize`]: every body is one terminal or two nonterminals
//!
//! The empty string is not derivable from the result, even if it was from the
//! input. Sentences are never empty, so nothing is lost.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::grammar::Grammar;
use crate::rules::{is_unit, Body, Symbol};
use crate::utils::combinations;

/// Hands out nonterminal names that collide with nothing in the grammar being
/// normalized, nor with each other.
#[derive(Debug, Clone, Default)]
pub struct FreshNames {
  taken: HashSet<String>,
  counter: usize,
}

impl FreshNames {
  /// Reserves every name `g` uses, terminals included
  pub fn reserving(g: &Grammar) -> Self {
    Self {
      taken: g.symbol_names().into_iter().map(str::to_string).collect(),
      counter: 0,
    }
  }

  /// `base` if it's free, otherwise `base_1`, `base_2`, ...
  pub fn fresh(&mut self, base: &str) -> String {
    let mut name = base.to_string();
    let mut suffix = 0;
    while self.taken.contains(&name) {
      suffix += 1;
      name = format!("{}_{}", base, suffix);
    }
    self.taken.insert(name.clone());
    name
  }

  /// Next name for a binarization chain link: X1, X2, ...
  pub fn chain_link(&mut self) -> String {
    loop {
      self.counter += 1;
      let name = format!("X{}", self.counter);
      if self.taken.insert(name.clone()) {
        return name;
      }
    }
  }

  /// Helper nonterminal standing in for a terminal inside a longer body
  pub fn lifted_terminal(&mut self, word: &str) -> String {
    self.fresh(&format!("T_{}", word))
  }
}

/// Owns the name supply for one normalization run
#[derive(Debug)]
pub struct Normalizer {
  fresh: FreshNames,
}

impl Normalizer {
  pub fn new(cfg: &Grammar) -> Self {
    Self {
      fresh: FreshNames::reserving(cfg),
    }
  }

  pub fn normalize(mut self, cfg: &Grammar) -> Grammar {
    let g = remove_epsilons(cfg);
    let g = remove_units(&g);
    let g = remove_useless(&g);
    binarize(&g, &mut self.fresh)
  }
}

/// Converts `cfg` to CNF with `start` as its start symbol. A start symbol the
/// grammar doesn't define yields an empty grammar, which accepts nothing.
pub fn normalize(cfg: &Grammar, start: &str) -> Grammar {
  let mut cfg = cfg.clone();
  cfg.start = start.to_string();
  let cnf = Normalizer::new(&cfg).normalize(&cfg);
  debug!(
    start,
    nonterminals = cnf.len(),
    rules = cnf.rule_count(),
    "normalized grammar"
  );
  cnf
}

fn body_is_nullable(nullables: &HashSet<String>, body: &[Symbol]) -> bool {
  body.iter().all(|s| match s {
    Symbol::Nonterminal(n) => nullables.contains(n),
    Symbol::Terminal(_) => false,
  })
}

/// Nonterminals that derive the empty string: those with an empty body, or a
/// body made only of nullable nonterminals
pub fn nullable_set(g: &Grammar) -> HashSet<String> {
  let mut nullables: HashSet<String> = HashSet::new();

  let mut changed = true;
  while changed {
    changed = false;
    for (head, body) in g.productions() {
      if !nullables.contains(head) && body_is_nullable(&nullables, body) {
        nullables.insert(head.to_string());
        changed = true;
      }
    }
  }

  nullables
}

/// Drops empty bodies, and adds every variant of every other body with some
/// subset of its nullable symbols deleted
pub fn remove_epsilons(g: &Grammar) -> Grammar {
  let nullables = nullable_set(g);
  let mut out = Grammar::with_heads_of(g);

  for (head, body) in g.productions() {
    if body.is_empty() {
      continue;
    }

    let choices = body
      .iter()
      .map(|s| match s.as_nonterminal() {
        Some(n) if nullables.contains(n) => vec![Some(s), None],
        _ => vec![Some(s)],
      })
      .collect::<Vec<_>>();

    for variant in combinations(&choices) {
      let variant: Body = variant.into_iter().flatten().cloned().collect();
      if !variant.is_empty() {
        out.add_rule(head, variant);
      }
    }
  }

  debug!(
    nullable = nullables.len(),
    rules = out.rule_count(),
    "removed epsilon productions"
  );
  out
}

/// (A, B) for every A that derives B through unit productions alone,
/// in discovery order
pub fn unit_pairs(g: &Grammar) -> Vec<(String, String)> {
  let mut pairs: Vec<(String, String)> = Vec::new();
  let mut seen: HashSet<(String, String)> = HashSet::new();

  for (head, body) in g.productions() {
    if let [Symbol::Nonterminal(target)] = body.as_slice() {
      let pair = (head.to_string(), target.clone());
      if seen.insert(pair.clone()) {
        pairs.push(pair);
      }
    }
  }

  // transitive closure: (a, b) and (b, c) give (a, c)
  let mut changed = true;
  while changed {
    changed = false;
    let snapshot = pairs.clone();
    for (a, b) in snapshot.iter() {
      for (_, c) in snapshot.iter().filter(|(b2, _)| b2 == b) {
        let pair = (a.clone(), c.clone());
        if seen.insert(pair.clone()) {
          pairs.push(pair);
          changed = true;
        }
      }
    }
  }

  pairs
}

/// Replaces unit productions: every head keeps its own non-unit bodies, and
/// inherits the non-unit bodies of everything it reaches through unit chains
pub fn remove_units(g: &Grammar) -> Grammar {
  let pairs = unit_pairs(g);
  let mut targets: HashMap<&str, Vec<&str>> = HashMap::new();
  for (a, b) in pairs.iter() {
    targets.entry(a.as_str()).or_default().push(b.as_str());
  }

  let mut out = Grammar::with_heads_of(g);
  for head in g.heads() {
    let inherited = targets.get(head).map(Vec::as_slice).unwrap_or(&[]);
    for source in std::iter::once(head).chain(inherited.iter().copied()) {
      for body in g.bodies(source).iter().filter(|b| !is_unit(b)) {
        out.add_rule(head, body.clone());
      }
    }
  }

  debug!(
    unit_pairs = pairs.len(),
    rules = out.rule_count(),
    "removed unit productions"
  );
  out
}

/// Nonterminals with some body made only of terminals and generating nonterminals
pub fn generating_set(g: &Grammar) -> HashSet<String> {
  let mut generating: HashSet<String> = HashSet::new();

  let mut changed = true;
  while changed {
    changed = false;
    for (head, body) in g.productions() {
      if generating.contains(head) {
        continue;
      }
      let all_generating = body
        .iter()
        .filter_map(Symbol::as_nonterminal)
        .all(|n| generating.contains(n));
      if all_generating {
        generating.insert(head.to_string());
        changed = true;
      }
    }
  }

  generating
}

/// Nonterminals reachable from the start symbol. Empty if the start symbol
/// isn't a nonterminal of `g`.
pub fn reachable_set(g: &Grammar) -> HashSet<String> {
  let mut reachable: HashSet<String> = HashSet::new();
  if !g.is_nonterminal(&g.start) {
    return reachable;
  }

  let mut stack = vec![g.start.as_str()];
  reachable.insert(g.start.clone());
  while let Some(symbol) = stack.pop() {
    for body in g.bodies(symbol) {
      for n in body.iter().filter_map(Symbol::as_nonterminal) {
        if reachable.insert(n.to_string()) {
          stack.push(n);
        }
      }
    }
  }

  reachable
}

/// Drops non-generating nonterminals, then unreachable ones, along with every
/// production that mentions them
pub fn remove_useless(g: &Grammar) -> Grammar {
  let generating = generating_set(g);
  let g1 = g.restrict_to(&generating);
  let reachable = reachable_set(&g1);
  let out = g1.restrict_to(&reachable);

  debug!(
    generating = generating.len(),
    reachable = reachable.len(),
    nonterminals = out.len(),
    rules = out.rule_count(),
    "removed useless symbols"
  );
  out
}

/// Lifts terminals out of long bodies and splits bodies longer than two into
/// chains: H -> s1 s2 s3 s4 becomes H -> s1 X1, X1 -> s2 X2, X2 -> s3 s4.
/// Bodies of length one are kept as they are.
pub fn binarize(g: &Grammar, fresh: &mut FreshNames) -> Grammar {
  let mut out = Grammar::with_heads_of(g);
  // word -> helper, plus the order helpers were introduced in
  let mut lifted: HashMap<String, String> = HashMap::new();
  let mut lifted_order: Vec<String> = Vec::new();
  let mut links = 0;

  for (head, body) in g.productions() {
    if body.len() <= 1 {
      out.add_rule(head, body.clone());
      continue;
    }

    let symbols = body
      .iter()
      .map(|s| match s {
        Symbol::Terminal(w) => {
          let helper = lifted.entry(w.clone()).or_insert_with(|| {
            lifted_order.push(w.clone());
            fresh.lifted_terminal(w)
          });
          Symbol::Nonterminal(helper.clone())
        }
        nt => nt.clone(),
      })
      .collect::<Vec<_>>();

    let mut current = head.to_string();
    let mut rest = &symbols[..];
    while rest.len() > 2 {
      let link = fresh.chain_link();
      out.mark_synthetic(&link);
      out.add_rule(&current, vec![rest[0].clone(), Symbol::Nonterminal(link.clone())]);
      links += 1;
      current = link;
      rest = &rest[1..];
    }
    out.add_rule(&current, rest.to_vec());
  }

  for word in lifted_order.iter() {
    let helper = &lifted[word];
    out.mark_synthetic(helper);
    out.add_rule(helper, vec![Symbol::Terminal(word.clone())]);
  }

  debug!(
    lifted_terminals = lifted_order.len(),
    chain_links = links,
    rules = out.rule_count(),
    "binarized"
  );
  out
}
