//! Benchmarks for rule tree compilation and end-to-end selects.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde::Deserialize;
use tokio::runtime::Runtime;

use sift::domain::{CalloutResponse, Contact};
use sift::prelude::*;
use sift::schema::FieldDefinition;

/// An OR group of `count` email rules.
fn wide_group(count: usize) -> RuleGroup {
    RuleGroup::or((0..count).map(|i| {
        Rule::new(
            "email",
            Operator::Equal,
            ValueType::Text,
            vec![format!("user{i}@example.com").into()],
        )
        .into()
    }))
}

/// Alternating AND/OR groups nested `depth` deep.
fn deep_group(depth: usize) -> RuleGroup {
    let mut group = RuleGroup::and([Rule::new(
        "amount",
        Operator::Between,
        ValueType::Number,
        vec![5.into(), 20.into()],
    )
    .into()]);
    for level in 1..depth {
        let leaf: RuleNode =
            Rule::new("flag", Operator::Equal, ValueType::Boolean, vec![true.into()]).into();
        group = if level % 2 == 0 {
            RuleGroup::and([leaf, group.into()])
        } else {
            RuleGroup::or([leaf, group.into()])
        };
    }
    group
}

fn contact_filter() -> RuleGroup {
    RuleGroup::from_json(
        r#"{"condition":"AND","rules":[
            {"field":"activeMembership","operator":"equal","type":"boolean","value":[true]},
            {"field":"tags","operator":"contains","type":"array","value":["vip"]},
            {"field":"bio","operator":"contains","type":"text","value":["100%"]},
            {"condition":"OR","rules":[
                {"field":"joined","operator":"between","type":"date","value":["2024-01","$now(d:-1)"]},
                {"field":"callouts.survey-1.hasAnswered","operator":"equal","type":"boolean","value":[true]}
            ]}
        ]}"#,
    )
    .expect("valid rule group")
}

fn bench_compile_shapes(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let handlers = HandlerRegistry::new();
    let schema = FilterSchema::new()
        .field("email", FieldDefinition::new(ValueType::Text))
        .field("amount", FieldDefinition::new(ValueType::Number))
        .field("flag", FieldDefinition::new(ValueType::Boolean));

    for count in [1usize, 10, 100] {
        let rules = wide_group(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("wide", count), &rules, |b, rules| {
            b.iter(|| {
                Compiler::new(&handlers)
                    .schema(&schema)
                    .field_prefix("c.")
                    .compile(black_box(rules))
            })
        });
    }

    for depth in [2usize, 8, 30] {
        let rules = deep_group(depth);
        group.bench_with_input(BenchmarkId::new("deep", depth), &rules, |b, rules| {
            b.iter(|| {
                Compiler::new(&handlers)
                    .schema(&schema)
                    .field_prefix("c.")
                    .compile(black_box(rules))
            })
        });
    }

    group.finish();
}

fn bench_domain_handlers(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain");

    let contact_rules = contact_filter();
    let contact_schema = Contact::filter_schema();
    let contact_handlers = Contact::handlers();
    let contact_prefix = Contact::field_prefix();
    group.bench_function("contact_filter", |b| {
        b.iter(|| {
            contact_schema.validate(black_box(&contact_rules))?;
            Compiler::new(&contact_handlers)
                .schema(&contact_schema)
                .field_prefix(&contact_prefix)
                .compile(black_box(&contact_rules))
        })
    });

    let answer_rules = RuleGroup::or((0..20).map(|i| {
        Rule::new(
            format!("answers.slide{i}.choice"),
            Operator::Contains,
            ValueType::Array,
            vec!["yes".into()],
        )
        .into()
    }));
    let response_handlers = CalloutResponse::handlers();
    let response_prefix = CalloutResponse::field_prefix();
    group.bench_function("answer_fields_20", |b| {
        b.iter(|| {
            Compiler::new(&response_handlers)
                .field_prefix(&response_prefix)
                .compile(black_box(&answer_rules))
        })
    });

    group.bench_function("parse_json", |b| {
        let json = serde_json::to_string(&contact_rules).expect("serializable");
        b.iter(|| RuleGroup::from_json(black_box(&json)))
    });

    group.finish();
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ContactRow {
    id: i64,
}

fn bench_sqlite_select(c: &mut Criterion) {
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(_) => return,
    };

    let engine = rt.block_on(async {
        let engine = SqliteEngine::memory().await.expect("in-memory database");
        engine
            .execute_batch(
                "CREATE TABLE contact (id INTEGER PRIMARY KEY, email TEXT NOT NULL, bio TEXT);
                 CREATE TABLE contact_tag_assignment (contactId INTEGER NOT NULL, tagId TEXT NOT NULL);
                 WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 5000)
                 INSERT INTO contact SELECT n, 'user' || n || '@example.com', CASE WHEN n % 3 = 0 THEN NULL ELSE 'bio ' || n END FROM seq;
                 INSERT INTO contact_tag_assignment SELECT id, 'vip' FROM contact WHERE id % 7 = 0;",
            )
            .await
            .expect("fixture");
        engine
    });

    let rules = RuleGroup::from_json(
        r#"{"condition":"AND","rules":[
            {"field":"tags","operator":"contains","type":"array","value":["vip"]},
            {"field":"bio","operator":"not_equal","type":"text","value":[""]}
        ]}"#,
    )
    .expect("valid rule group");

    let mut group = c.benchmark_group("sqlite");
    group.bench_function("select_page", |b| {
        b.to_async(&rt).iter(|| async {
            let page: Paginated<ContactRow> = SelectOperation::<_, Contact>::new(engine.clone())
                .rules(rules.clone())
                .order_by("c.id")
                .take(25)
                .exec()
                .await
                .expect("select");
            black_box(page)
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_compile_shapes,
    bench_domain_handlers,
    bench_sqlite_select
);
criterion_main!(benches);
