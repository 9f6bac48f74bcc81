use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use taskeduler_core::clock::ManualClock;
use taskeduler_core::frequency::add_delta;
use taskeduler_core::rules::{ExecutionRule, ExecutionRuleSet};
use taskeduler_core::{Frequency, Scheduler};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 9, 0, 0).unwrap()
}

fn create_scheduler(frequency: Frequency, rules: Vec<ExecutionRule>) -> Scheduler {
    Scheduler::new(
        frequency,
        ExecutionRuleSet::new(rules).unwrap(),
        Tz::UTC,
        Arc::new(ManualClock::new(t0())),
    )
    .unwrap()
}

fn bench_add_delta(c: &mut Criterion) {
    let base = t0();
    c.bench_function("add_delta_monthly", |b| {
        b.iter(|| add_delta(black_box(&base), black_box(Frequency::Monthly)))
    });
    c.bench_function("add_delta_yearly", |b| {
        b.iter(|| add_delta(black_box(&base), black_box(Frequency::Yearly)))
    });
}

fn bench_rule_check(c: &mut Criterion) {
    let rules = ExecutionRuleSet::new(vec![
        ExecutionRule::weekdays([0, 2, 4]).unwrap(),
        ExecutionRule::months([1, 3, 5, 7, 9, 11]).unwrap(),
        ExecutionRule::excluded_dates([NaiveDate::from_ymd_opt(2025, 3, 17).unwrap()]),
    ])
    .unwrap();
    let candidate = t0();

    c.bench_function("rule_set_check", |b| {
        b.iter(|| rules.check(black_box(&candidate)))
    });
}

fn bench_scheduler_creation(c: &mut Criterion) {
    c.bench_function("scheduler_creation_weekly_monday", |b| {
        b.iter(|| {
            create_scheduler(
                black_box(Frequency::Weekly),
                vec![ExecutionRule::weekdays([0]).unwrap()],
            )
        })
    });
}

fn bench_preview_daily_weekdays(c: &mut Criterion) {
    let scheduler = create_scheduler(
        Frequency::Daily,
        vec![ExecutionRule::weekdays([0, 1, 2, 3, 4]).unwrap()],
    );

    c.bench_function("preview_daily_weekdays_100", |b| {
        b.iter(|| scheduler.preview(black_box(100)).unwrap())
    });
}

fn bench_sparse_rules(c: &mut Criterion) {
    // Hourly steps that only land on the 29th of February.
    let scheduler = create_scheduler(
        Frequency::Hourly,
        vec![
            ExecutionRule::months([2]).unwrap(),
            ExecutionRule::month_days([29]).unwrap(),
        ],
    );

    c.bench_function("preview_hourly_leap_day_5", |b| {
        b.iter(|| scheduler.preview(black_box(5)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_add_delta,
    bench_rule_check,
    bench_scheduler_creation,
    bench_preview_daily_weekdays,
    bench_sparse_rules
);
criterion_main!(benches);
