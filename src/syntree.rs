use std::fmt;
use std::fmt::Write;

/// A labelled node covering tokens span.0..span.1
#[derive(Debug, PartialEq, Clone)]
pub struct Constituent<T> {
  pub value: T,
  pub span: (usize, usize),
}

impl<T> fmt::Display for Constituent<T>
where
  T: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Word<U> {
  pub value: U,
  pub span: (usize, usize),
}

impl<U> fmt::Display for Word<U>
where
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}: {}", self.span.0, self.span.1, self.value)
  }
}

#[derive(Debug, PartialEq, Clone)]
pub enum SynTree<T, U> {
  Branch(Constituent<T>, Vec<SynTree<T, U>>),
  Leaf(Word<U>),
}

impl<T, U> SynTree<T, U> {
  pub fn is_leaf(&self) -> bool {
    matches!(self, Self::Leaf(_))
  }

  pub fn is_branch(&self) -> bool {
    matches!(self, Self::Branch(_, _))
  }

  pub fn get_leaf(&self) -> Option<&Word<U>> {
    match self {
      Self::Leaf(w) => Some(w),
      _ => None,
    }
  }

  pub fn get_branch(&self) -> Option<(&Constituent<T>, &Vec<SynTree<T, U>>)> {
    match self {
      Self::Branch(c, cs) => Some((c, cs)),
      _ => None,
    }
  }

  pub fn span(&self) -> (usize, usize) {
    match self {
      Self::Branch(c, _) => c.span,
      Self::Leaf(w) => w.span,
    }
  }

  pub fn children(&self) -> &[SynTree<T, U>] {
    match self {
      Self::Branch(_, cs) => cs,
      Self::Leaf(_) => &[],
    }
  }

  /// Leaf values, left to right
  pub fn leaves(&self) -> Vec<&U> {
    let mut out = Vec::new();
    self.collect_leaves(&mut out);
    out
  }

  fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a U>) {
    match self {
      Self::Leaf(w) => out.push(&w.value),
      Self::Branch(_, cs) => cs.iter().for_each(|c| c.collect_leaves(out)),
    }
  }

  /// Number of nodes, leaves included
  pub fn size(&self) -> usize {
    1 + self.children().iter().map(SynTree::size).sum::<usize>()
  }
}

impl SynTree<String, String> {
  /// Symbol for branches, word for leaves
  pub fn label(&self) -> &str {
    match self {
      Self::Branch(c, _) => &c.value,
      Self::Leaf(w) => &w.value,
    }
  }

  /// The tree as a bracketed string without spans: `[K [K1 [S tiang] ...]]`
  pub fn bracketed(&self) -> String {
    match self {
      Self::Leaf(w) => w.value.clone(),
      Self::Branch(c, cs) => {
        let mut s = format!("[{}", c.value);
        for child in cs {
          s.push(' ');
          s.push_str(&child.bracketed());
        }
        s.push(']');
        s
      }
    }
  }
}

impl<T, U> SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  /// Graphviz digraph, edges pointing from parent to child. Words are drawn as
  /// filled boxes.
  pub fn to_dot(&self) -> String {
    let mut out = String::from("digraph parse_tree {\n  rankdir=TB;\n  node [shape=rect];\n");
    let mut next_id = 0;
    self.write_dot(&mut out, &mut next_id, None);
    out.push_str("}\n");
    out
  }

  fn write_dot(&self, out: &mut String, next_id: &mut usize, parent: Option<usize>) {
    let id = *next_id;
    *next_id += 1;

    // writing into a String can't fail
    let _ = match self {
      Self::Branch(c, _) => writeln!(out, "  n{} [label=\"{}\"];", id, escape(&c.value.to_string())),
      Self::Leaf(w) => writeln!(
        out,
        "  n{} [label=\"{}\", style=filled, fillcolor=\"#f1f5f9\"];",
        id,
        escape(&w.value.to_string())
      ),
    };
    if let Some(p) = parent {
      let _ = writeln!(out, "  n{} -> n{};", p, id);
    }

    for child in self.children() {
      child.write_dot(out, next_id, Some(id));
    }
  }
}

fn escape(label: &str) -> String {
  label.replace('\\', "\\\\").replace('"', "\\\"")
}

impl<T, U> fmt::Display for SynTree<T, U>
where
  T: fmt::Display,
  U: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Leaf(t) => write!(f, "{}", t),
      Self::Branch(t, ts) => {
        write!(f, "({}", t)?;
        if ts.len() == 1 {
          write!(f, " ({}))", ts[0])
        } else {
          for t in ts.iter() {
            let fmt = format!("{}", t);
            for line in fmt.lines() {
              write!(f, "\n  {}", line)?;
            }
          }
          write!(f, ")")
        }
      }
    }
  }
}
