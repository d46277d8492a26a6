//! Benchmarks for grammar parsing, compilation and matching
//!
//! Run with: cargo bench --bench matching

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use speechgram::srgs::{GrammarConfig, SrgsParser};

const CITIES: &[&str] = &[
    "boston", "chicago", "denver", "houston", "miami", "phoenix", "portland", "seattle",
];

fn flight_grammar() -> String {
    let items: String = CITIES
        .iter()
        .map(|c| format!("<item>{} <tag>{}</tag></item>", c, c.to_uppercase()))
        .collect();
    format!(
        r##"<grammar root="flight">
          <rule id="city"><one-of>{}</one-of></rule>
          <rule id="polite"><one-of><item>please</item><item>thanks</item></one-of></rule>
          <rule id="flight">
            <item repeat="0-1">i want to</item> fly from <ruleref uri="#city"/>
            to <ruleref uri="#city"/> <item repeat="0-"><ruleref uri="#polite"/></item>
          </rule>
        </grammar>"##,
        items
    )
}

fn bench_parse(c: &mut Criterion) {
    let doc = flight_grammar();
    let uncached = GrammarConfig::default().with_document_cache(false);
    c.bench_function("parse_flight_grammar", |b| {
        let mut parser = SrgsParser::new("bench").with_config(uncached.clone());
        b.iter(|| {
            let grammar = parser.parse(black_box(&doc)).unwrap();
            parser.release(&grammar);
        })
    });
    c.bench_function("compile_flight_grammar", |b| {
        let mut parser = SrgsParser::new("bench").with_config(uncached.clone());
        b.iter(|| {
            let grammar = parser.parse(&doc).unwrap();
            black_box(grammar.to_regex().unwrap().len());
            parser.release(&grammar);
        })
    });
}

fn bench_match(c: &mut Criterion) {
    let mut parser = SrgsParser::new("bench");
    let grammar = parser.parse(&flight_grammar()).unwrap();
    let _ = grammar.to_regex();

    let mut group = c.benchmark_group("match");
    for input in [
        "fly from boston",
        "i want to fly from denver to seattle",
        "fly from miami to phoenix please thanks please",
        "drive from boston to denver",
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(input), input, |b, input| {
            b.iter(|| grammar.match_input(black_box(input)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_match);
criterion_main!(benches);
