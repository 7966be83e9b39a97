use criterion::{black_box, criterion_group, criterion_main, Criterion};
use futures::executor::block_on;

use cuttle::aggregation::{Aggregations, TermsAggregation};
use cuttle::condition::{
    ConditionSet, IntoCondition, QueryMode, SupportsEquality, SupportsMatch, SupportsRange,
};
use cuttle::schema::{FieldKind, Schema, SchemaBuilder};

fn build_schema() -> Schema {
    SchemaBuilder::new("movies")
        .field("title", FieldKind::Text)
        .field("genre", FieldKind::Keyword)
        .field("rating", FieldKind::Double)
        .field("year", FieldKind::Long)
        .build()
}

fn build_conditions(schema: &Schema) -> ConditionSet {
    let mut set = ConditionSet::new(schema.context(QueryMode::Filter));
    let title = set.field("title").unwrap();
    set.insert(
        title
            .matches("dune")
            .unwrap()
            .or()
            .matches("arrival")
            .unwrap()
            .and()
            .matches("villeneuve")
            .unwrap()
            .into_condition(),
    );
    let genre = set.field("genre").unwrap();
    set.insert(genre.eq(vec!["drama", "scifi"]).unwrap());
    let rating = set.field("rating").unwrap();
    set.insert(rating.gte(3).unwrap().lt(5).unwrap());
    set
}

fn bench_build_query(c: &mut Criterion) {
    let schema = build_schema();
    c.bench_function("build_query", |b| {
        b.iter(|| {
            let set = build_conditions(&schema);
            black_box(block_on(set.build_query()).unwrap())
        })
    });
}

fn bench_compile_aggregations(c: &mut Criterion) {
    c.bench_function("compile_aggregations", |b| {
        b.iter(|| {
            let mut aggs = Aggregations::new();
            aggs.add(
                TermsAggregation::new("genres", "genre")
                    .size(10)
                    .ensure_quality()
                    .avg("rating")
                    .child(TermsAggregation::new("years", "year").sum("rating")),
            );
            black_box(block_on(aggs.to_elastic()).unwrap())
        })
    });
}

criterion_group!(benches, bench_build_query, bench_compile_aggregations);
criterion_main!(benches);
