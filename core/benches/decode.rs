//! Decoder benchmarks — the per-request hot path for advanced searches.
//!
//! Measures: bare terms, realistic field expressions, deeply wrapped
//! expressions, and paren garbage (the bot-traffic case).

use detour::decode;

fn main() {
    divan::main();
}

#[divan::bench]
fn bare_term() -> usize {
    decode("spiders").len()
}

#[divan::bench]
fn field_expression() -> usize {
    decode("(t:(spiders and snakes) and not d:(biology) or a:(lee))").len()
}

#[divan::bench]
fn deeply_wrapped() -> usize {
    decode("((((((t:(spiders) or a:(lee)))))))").len()
}

#[divan::bench]
fn paren_garbage() -> usize {
    decode("))))((((").len()
}

#[divan::bench]
fn long_literal(bencher: divan::Bencher) {
    let expression = "spiders and snakes or ".repeat(64);
    bencher.bench(|| decode(&expression).len());
}
