use std::fmt;

/// One symbol occurrence inside a production body. Whether a name is a
/// terminal or a nonterminal is decided once, when the grammar is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
  /// A literal, lowercased word
  Terminal(String),
  /// A name that heads at least one rule of the grammar it was built in
  Nonterminal(String),
}

impl Symbol {
  pub fn terminal(word: impl Into<String>) -> Self {
    Self::Terminal(word.into())
  }

  pub fn nonterminal(name: impl Into<String>) -> Self {
    Self::Nonterminal(name.into())
  }

  pub fn name(&self) -> &str {
    match self {
      Self::Terminal(s) => s,
      Self::Nonterminal(s) => s,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Terminal(_))
  }

  pub fn is_nonterminal(&self) -> bool {
    matches!(self, Self::Nonterminal(_))
  }

  pub fn as_nonterminal(&self) -> Option<&str> {
    match self {
      Self::Nonterminal(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_terminal(&self) -> Option<&str> {
    match self {
      Self::Terminal(s) => Some(s),
      _ => None,
    }
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// The right-hand side of a production
pub type Body = Vec<Symbol>;

/// Is this body a single nonterminal (A -> B)?
pub fn is_unit(body: &[Symbol]) -> bool {
  body.len() == 1 && body[0].is_nonterminal()
}

/// Is this body a single terminal (A -> a)?
pub fn is_lexical(body: &[Symbol]) -> bool {
  body.len() == 1 && body[0].is_terminal()
}

/// Is this body two nonterminals (A -> B C)?
pub fn is_binary(body: &[Symbol]) -> bool {
  body.len() == 2 && body.iter().all(Symbol::is_nonterminal)
}

/// A single production, head -> body. Grammars store bodies grouped by head,
/// this is the owned form handed out when a production travels on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
  pub head: String,
  pub body: Body,
}

impl Rule {
  pub fn new(head: impl Into<String>, body: Body) -> Self {
    Self {
      head: head.into(),
      body,
    }
  }

  pub fn len(&self) -> usize {
    self.body.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_unit(&self) -> bool {
    is_unit(&self.body)
  }

  pub fn is_lexical(&self) -> bool {
    is_lexical(&self.body)
  }

  pub fn is_binary(&self) -> bool {
    is_binary(&self.body)
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ->", self.head)?;
    for s in self.body.iter() {
      write!(f, " {}", s)?;
    }
    Ok(())
  }
}
