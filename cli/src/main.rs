use std::env;
use std::io;
use std::io::{BufRead, Write};
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use wilangan::{lexicon, Analysis, Err, Grammar, Validator, DEFAULT_MAX_TOKENS};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} [FILE] [options]

Checks sentences against FILE, or the built-in Balinese grammar if no FILE
is given. Sentences are read from stdin, one per line.

Options:
  -h, --help            Print this message
  -s, --start SYMBOL    Start symbol (defaults to the grammar's first rule)
  -m, --max-words N     Refuse sentences longer than N words (defaults to {})
  -c, --chart           Print the CYK table (defaults to not printing)
  -n, --no-tree         Don't print the parse tree (defaults to printing)
  -r, --raw             Also print the derivation in the normalized grammar
  -d, --dot             Print trees as Graphviz digraphs
  -b, --batch           Read all of stdin, print one verdict per line and totals
  -g, --print-cnf       Print the normalized grammar before reading sentences

Set RUST_LOG (e.g. RUST_LOG=wilangan=debug) to see what the parser is doing.",
    prog_name, DEFAULT_MAX_TOKENS
  )
}

struct Args {
  filename: Option<String>,
  start: Option<String>,
  max_words: usize,
  print_chart: bool,
  print_tree: bool,
  print_raw: bool,
  dot: bool,
  batch: bool,
  print_cnf: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    let mut iter = v.into_iter();
    let Some(prog_name) = iter.next() else {
      return Err(Self::make_error_message("bad argument vector", "wilangan"));
    };

    let mut args = Self {
      filename: None,
      start: None,
      max_words: DEFAULT_MAX_TOKENS,
      print_chart: false, // default to *not* printing the chart
      print_tree: true,
      print_raw: false,
      dot: false,
      batch: false,
      print_cnf: false,
    };

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-s" || o == "--start" {
        match iter.next() {
          Some(s) => args.start = Some(s),
          None => return Err(Self::make_error_message("missing start symbol", prog_name)),
        }
      } else if o == "-m" || o == "--max-words" {
        match iter.next().and_then(|n| n.parse().ok()) {
          Some(n) => args.max_words = n,
          None => return Err(Self::make_error_message("--max-words needs a number", prog_name)),
        }
      } else if o == "-c" || o == "--chart" {
        args.print_chart = true;
      } else if o == "-n" || o == "--no-tree" {
        args.print_tree = false;
      } else if o == "-r" || o == "--raw" {
        args.print_raw = true;
      } else if o == "-d" || o == "--dot" {
        args.dot = true;
      } else if o == "-b" || o == "--batch" {
        args.batch = true;
      } else if o == "-g" || o == "--print-cnf" {
        args.print_cnf = true;
      } else if o.starts_with('-') {
        return Err(Self::make_error_message(&format!("unknown option {}", o), prog_name));
      } else if args.filename.is_none() {
        args.filename = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    Ok(args)
  }

  fn validator(&self) -> Result<Validator, Err> {
    let g = match &self.filename {
      Some(filename) => Grammar::read_from_file(filename)?,
      None => lexicon::balinese()?,
    };
    let start = self.start.clone().unwrap_or_else(|| g.start.clone());
    if !g.is_nonterminal(&start) {
      return Err(format!("start symbol {} isn't defined by the grammar", start).into());
    }
    Ok(Validator::with_start(g, &start).with_max_tokens(self.max_words))
  }
}

fn print_tree(tree: &wilangan::SynTree<String, String>, dot: bool) {
  if dot {
    print!("{}", tree.to_dot());
  } else {
    println!("{}", tree);
  }
}

fn report(a: &Analysis, opts: &Args) {
  if opts.print_chart {
    println!("table:\n{}", a.table);
  }

  println!("{}", if a.accepted { "valid" } else { "invalid" });

  if opts.print_raw {
    if let Some(raw) = &a.raw_tree {
      println!("derivation:");
      print_tree(raw, opts.dot);
    }
  }
  if opts.print_tree {
    if let Some(tree) = &a.tree {
      print_tree(tree, opts.dot);
    }
  }
  println!();
}

fn batch(v: &Validator) -> Result<(), Err> {
  let lines = io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?;
  let sentences = lines.iter().filter(|l| !l.trim().is_empty());
  println!("{}", v.validate_batch(sentences));
  Ok(())
}

fn repl(v: &Validator, opts: &Args) -> Result<(), Err> {
  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        match v.analyze(input.trim()) {
          Ok(a) => report(&a, opts),
          Err(e) => println!("{}\n", e),
        }
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let v = opts.validator()?;
  info!(
    start = v.start(),
    rules = v.original().rule_count(),
    cnf_rules = v.cnf().rule_count(),
    "grammar loaded"
  );

  if opts.print_cnf {
    println!("{}", v.cnf());
  }

  if opts.batch {
    batch(&v)
  } else {
    repl(&v, &opts)
  }
}
