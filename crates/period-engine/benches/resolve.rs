//! Planning cost for typical comparison requests.

use std::hint::black_box;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};

use period_engine::{
    BaseUnit, CalendarLevel, ComparisonEngine, ComparisonOption, ComparisonRequest, CustomRange,
    EngineOptions, Granularity, IntervalSpec, PeriodResolver, PeriodSpec, StandardPeriod,
};

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
}

fn bench_resolve(c: &mut Criterion) {
    let resolver = PeriodResolver::new(&EngineOptions::default());
    let days = PeriodSpec::Standard(
        StandardPeriod::builder(BaseUnit::Day, reference())
            .repeat_count(365)
            .build()
            .unwrap(),
    );
    c.bench_function("resolve/366_days", |b| {
        b.iter(|| resolver.resolve(black_box(&days), ComparisonOption::Value))
    });

    let custom = PeriodSpec::custom(
        (1..=12)
            .rev()
            .map(|month| {
                let start = NaiveDate::from_ymd_opt(2023, month, 1).unwrap();
                CustomRange::new(format!("m{month}"), start, start + chrono::Days::new(20))
            })
            .collect(),
    );
    c.bench_function("resolve/12_custom", |b| {
        b.iter(|| resolver.resolve(black_box(&custom), ComparisonOption::Value))
    });
}

fn bench_plan(c: &mut Criterion) {
    let engine = ComparisonEngine::default();
    let quarters = PeriodSpec::Standard(
        StandardPeriod::builder(BaseUnit::Quarter, reference())
            .repeat_count(8)
            .to_date(true)
            .build()
            .unwrap(),
    );
    let quarter_to_date =
        ComparisonRequest::new("order_date", quarters).with_interval(IntervalSpec::new(
            CalendarLevel::Day,
            Granularity::QUARTER_TO_DATE,
            CalendarLevel::Quarter,
        ));
    c.bench_function("plan/quarter_to_date_9_quarters", |b| {
        b.iter(|| engine.plan(black_box(&quarter_to_date)))
    });

    let months = PeriodSpec::Standard(
        StandardPeriod::builder(BaseUnit::Month, reference())
            .repeat_count(24)
            .build()
            .unwrap(),
    );
    let week_to_date = ComparisonRequest::new("order_date", months).with_interval(IntervalSpec::new(
        CalendarLevel::Day,
        Granularity::WEEK_TO_DATE,
        CalendarLevel::Month,
    ));
    c.bench_function("plan/week_to_date_25_months", |b| {
        b.iter(|| engine.plan(black_box(&week_to_date)))
    });
}

criterion_group!(benches, bench_resolve, bench_plan);
criterion_main!(benches);
