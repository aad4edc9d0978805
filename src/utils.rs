use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: regex::Regex = regex::Regex::new($pattern).unwrap();
    }
  };
}

/// Takes a list where each element is a set of choices, and returns every
/// sequence that picks one choice per position. The first position varies
/// fastest, and the first choice of every position comes first, so
/// `[[a, b], [c]]` yields `[a, c]` before `[b, c]`.
///
/// Epsilon removal uses this with `[Some(sym), None]` for nullable symbols:
///
/// ```
/// let body = vec![
///   vec![Some("NumP")],
///   vec![Some("NP"), None],
///   vec![Some("Det"), None],
/// ];
///
/// assert_eq!(wilangan::utils::combinations(&body), vec![
///   vec![Some("NumP"), Some("NP"), Some("Det")],
///   vec![Some("NumP"), None, Some("Det")],
///   vec![Some("NumP"), Some("NP"), None],
///   vec![Some("NumP"), None, None],
/// ]);
/// ```
pub fn combinations<T>(list: &[Vec<T>]) -> Vec<Vec<T>>
where
  T: Clone,
{
  if list.is_empty() {
    return Vec::new();
  }

  // build up from the last position so earlier positions end up varying fastest
  let mut acc: Vec<Vec<T>> = vec![Vec::new()];
  for choices in list.iter().rev() {
    acc = acc
      .iter()
      .flat_map(|tail| {
        choices.iter().map(move |choice| {
          let mut seq = Vec::with_capacity(tail.len() + 1);
          seq.push(choice.clone());
          seq.extend(tail.iter().cloned());
          seq
        })
      })
      .collect();
  }
  acc
}
