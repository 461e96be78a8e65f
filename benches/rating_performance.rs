//! Performance benchmarks for rating updates and pair selection

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pairwise_ranker::matchmaking::MatchSelector;
use pairwise_ranker::rating::{Glicko2Engine, MatchResult};
use pairwise_ranker::types::{PlayerState, RankedItem, SelectionMode};
use pairwise_ranker::RatingStore;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn state(rating: f64, rd: f64) -> PlayerState {
    PlayerState {
        rating,
        rd,
        ..PlayerState::default()
    }
}

fn create_pool(size: usize) -> Vec<RankedItem> {
    (0..size)
        .map(|i| {
            RankedItem::new(
                format!("image_{:04}.jpg", i),
                state(1300.0 + (i % 50) as f64 * 10.0, 50.0 + (i % 30) as f64 * 10.0),
            )
        })
        .collect()
}

fn bench_rating_calculations(c: &mut Criterion) {
    let engine = Glicko2Engine::default();
    let winner = state(1500.0, 200.0);
    let loser = state(1400.0, 30.0);

    c.bench_function("glicko2_single_decision", |b| {
        b.iter(|| black_box(engine.update_ratings(black_box(&winner), black_box(&loser))))
    });

    let results = vec![
        MatchResult::win(state(1400.0, 30.0)),
        MatchResult::loss(state(1550.0, 100.0)),
        MatchResult::loss(state(1700.0, 300.0)),
    ];
    c.bench_function("glicko2_rating_period_3_opponents", |b| {
        b.iter(|| black_box(engine.rate_period(black_box(&winner), black_box(&results))))
    });
}

fn bench_pair_selection(c: &mut Criterion) {
    let selector = MatchSelector::default();
    let pool = create_pool(1000);
    let mut rng = StdRng::seed_from_u64(42);

    c.bench_function("select_standard_1000_items", |b| {
        b.iter(|| black_box(selector.select(&pool, SelectionMode::Standard, None, &mut rng)))
    });

    c.bench_function("select_elite_tier_1000_items", |b| {
        b.iter(|| black_box(selector.select(&pool, SelectionMode::EliteTier, None, &mut rng)))
    });
}

fn bench_store_decisions(c: &mut Criterion) {
    let ids: Vec<String> = create_pool(500).into_iter().map(|item| item.id).collect();

    c.bench_function("store_decision_and_undo", |b| {
        let mut store = RatingStore::with_seed(42);
        store.initialize_pool(ids.clone(), |_| None);
        let _ = store.select_next(SelectionMode::Standard);

        b.iter(|| {
            if let Some(pair) = store.current_pair().cloned() {
                let _ = black_box(store.record_decision(&pair.first, &pair.second));
                let _ = black_box(store.undo());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_rating_calculations,
    bench_pair_selection,
    bench_store_decisions
);
criterion_main!(benches);
