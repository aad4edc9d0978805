//! Earley recognition straight over an unnormalized grammar: epsilon bodies,
//! unit chains and long bodies included. Slower than CYK, but it needs no
//! normalization, which makes it the yardstick normalization is checked against.

use std::collections::HashSet;
use std::fmt;

use crate::grammar::Grammar;
use crate::normalize::nullable_set;
use crate::rules::{Body, Symbol};

#[derive(Debug, Clone, PartialEq)]
pub struct LR0<'g> {
  pub head: &'g str,
  pub body: &'g Body,
  pub pos: usize,
}

impl<'g> LR0<'g> {
  pub fn new(head: &'g str, body: &'g Body) -> Self {
    Self { head, body, pos: 0 }
  }

  pub fn is_active(&self) -> bool {
    self.pos < self.body.len()
  }

  pub fn advance(&self) -> Self {
    assert!(self.is_active());
    Self {
      pos: self.pos + 1,
      ..self.clone()
    }
  }

  pub fn next_symbol(&self) -> Option<&'g Symbol> {
    self.body.get(self.pos)
  }
}

impl fmt::Display for LR0<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} →", self.head)?;
    for (idx, s) in self.body.iter().enumerate() {
      if idx == self.pos {
        write!(f, " ・")?;
      }
      write!(f, " {}", s)?;
    }
    if !self.is_active() {
      write!(f, " ・")?;
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct State<'g> {
  pub lr0: LR0<'g>,
  pub origin: usize,
}

impl<'g> State<'g> {
  pub fn new(lr0: LR0<'g>, origin: usize) -> Self {
    Self { lr0, origin }
  }

  pub fn advance(&self) -> Self {
    Self::new(self.lr0.advance(), self.origin)
  }
}

#[derive(Debug)]
pub struct Chart<'g>(Vec<Vec<State<'g>>>);

impl<'g> Chart<'g> {
  pub fn new(length: usize) -> Self {
    Self(vec![Vec::new(); length])
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn len_at(&self, k: usize) -> usize {
    self.0[k].len()
  }

  pub fn states_at(&self, k: usize) -> &[State<'g>] {
    &self.0[k]
  }

  pub fn has(&self, k: usize, state: &State<'g>) -> bool {
    self.0[k].contains(state)
  }

  pub fn add(&mut self, k: usize, state: State<'g>) {
    if !self.has(k, &state) {
      self.0[k].push(state);
    }
  }

  /// Owned copy so the chart can be mutated while the state is in use.
  /// Cheap: two references and two usizes.
  fn get_state(&self, k: usize, idx: usize) -> State<'g> {
    self.0[k][idx].clone()
  }
}

impl fmt::Display for Chart<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for k in 0..self.len() {
      writeln!(f, "State {}:", k)?;
      for state in self.0[k].iter() {
        writeln!(f, "  {}..{}: {}", state.origin, k, state.lr0)?;
      }
    }
    Ok(())
  }
}

pub fn parse_chart<'g>(g: &'g Grammar, input: &[&str]) -> Chart<'g> {
  let nullables = nullable_set(g);
  let input = input.iter().map(|w| w.to_lowercase()).collect::<Vec<_>>();
  let mut chart = Chart::new(input.len() + 1);

  for body in g.bodies(&g.start) {
    chart.add(0, State::new(LR0::new(&g.start, body), 0));
  }

  for k in 0..chart.len() {
    // need to use while loop because the number of states at k can expand during the loop
    let mut idx = 0;
    while idx < chart.len_at(k) {
      let state = chart.get_state(k, idx);
      idx += 1;

      match state.lr0.next_symbol() {
        None => completer(&mut chart, k, &state),
        Some(Symbol::Nonterminal(n)) => predictor(g, &nullables, &mut chart, k, &state, n),
        Some(Symbol::Terminal(w)) => scanner(&mut chart, k, &state, w, &input),
      };
    }
  }

  chart
}

fn completer(chart: &mut Chart<'_>, k: usize, state: &State<'_>) {
  assert!(!state.lr0.is_active(), "tried to complete active state");

  // lr0 has been completed, now look for states in the chart that are waiting for its symbol
  for idx in 0..chart.len_at(state.origin) {
    let other = chart.get_state(state.origin, idx);

    if let Some(Symbol::Nonterminal(n)) = other.lr0.next_symbol() {
      if n == state.lr0.head {
        // found one, advance its dot and add the new state to the chart *at k*,
        // because it's now waiting on a token there
        chart.add(k, other.advance())
      }
    }
  }
}

fn predictor<'g>(
  g: &'g Grammar,
  nullables: &HashSet<String>,
  chart: &mut Chart<'g>,
  k: usize,
  state: &State<'g>,
  needed: &'g str,
) {
  assert!(state.lr0.is_active(), "tried to predict non-active state");

  // hypothesize that one of the rules for the needed symbol will succeed here
  for body in g.bodies(needed) {
    chart.add(k, State::new(LR0::new(needed, body), k));
  }

  if nullables.contains(needed) {
    // complete `state` past the symbol early, since it can match empty input.
    // completer() won't do it: the empty constituent finishes at k, possibly
    // before `state` was added to the chart
    chart.add(k, state.advance());
  }
}

fn scanner<'g>(chart: &mut Chart<'g>, k: usize, state: &State<'g>, word: &str, input: &[String]) {
  assert!(state.lr0.is_active(), "tried to scan non-active state");

  if k < input.len() && input[k] == word {
    // consume the token, and look for the next one at k + 1
    chart.add(k + 1, state.advance());
  }
}

/// Does `g`'s start symbol derive `input`? Empty input is never accepted, to
/// agree with recognition over the normalized grammar.
pub fn recognize(g: &Grammar, input: &[&str]) -> bool {
  if input.is_empty() {
    return false;
  }
  let chart = parse_chart(g, input);
  chart
    .states_at(input.len())
    .iter()
    .any(|s| s.origin == 0 && !s.lr0.is_active() && s.lr0.head == g.start)
}
