use criterion::{black_box, criterion_group, criterion_main, Criterion};

use wilangan::{lexicon, normalize, Validator};

fn criterion_benchmark(c: &mut Criterion) {
  let grammar = lexicon::balinese().unwrap();
  let validator = Validator::balinese().unwrap();
  let recognizer = validator.recognizer();

  let short_input = "tiang telung buku".split(' ').collect::<Vec<_>>();
  let long_input = "tiang duang buku telung buku numbas"
    .split(' ')
    .collect::<Vec<_>>();

  c.bench_function("normalize shipped grammar", |b| {
    b.iter(|| normalize(black_box(&grammar), lexicon::START))
  });

  c.bench_function("recognize short", |b| {
    b.iter(|| recognizer.recognize(black_box(&short_input), lexicon::START))
  });

  c.bench_function("analyze short", |b| {
    b.iter(|| validator.analyze_tokens(black_box(&short_input)).map(|a| a.accepted))
  });

  c.bench_function("analyze long", |b| {
    b.iter(|| validator.analyze_tokens(black_box(&long_input)).map(|a| a.accepted))
  });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
