//! Stress tests for the fill engine.
//!
//! These tests verify:
//! 1. Cumulative fills never exceed order capacity under random load
//! 2. Terminal orders stay terminal
//! 3. OTC nonces only ratchet upward
//! 4. Determinism is preserved across runs
//!
//! ## Running Stress Tests
//!
//! ```bash
//! # Run all stress tests (release mode recommended)
//! cargo test --release --test stress_test -- --nocapture
//!
//! # Run specific test
//! cargo test --release --test stress_test verify_determinism -- --nocapture
//! ```

mod common;

use std::collections::BTreeMap;
use std::time::Instant;

use alloy_primitives::U256;
use common::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use fill_engine::error::{EngineError, LifecycleError, ReplayError};
use fill_engine::types::{BatchReceipt, LimitOrder, OrderStatus, Signature};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

/// Distinct orders in the random book
const ORDER_COUNT: usize = 64;

/// Fill attempts per run
const FILL_COUNT: usize = 4_000;

/// Balance minted to each side so funding never limits a fill
const FUNDING: u128 = 1_000_000_000_000;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Generate deterministic signed limit orders.
///
/// Same seed = same orders, same signatures.
fn generate_orders(ex: &TestExchange, rng: &mut ChaCha8Rng, count: usize) -> Vec<(LimitOrder, Signature)> {
    (0..count)
        .map(|i| {
            let order = LimitOrder {
                taker_amount: rng.gen_range(1..=1_000),
                maker_amount: rng.gen_range(1..=2_000),
                taker_token_fee_amount: rng.gen_range(0..=50),
                salt: U256::from(i as u64),
                ..limit_order(0)
            };
            let signature = sign_limit(ex, &order);
            (order, signature)
        })
        .collect()
}

fn funded(amount: u128) -> TestExchange {
    let mut ex = exchange();
    let host = ex.host_mut();
    host.mint_token(MAKER_TOKEN, maker(), amount);
    host.mint_token(TAKER_TOKEN, TAKER, amount);
    ex
}

/// Run a deterministic fill sequence and return the final state root and
/// a digest of every emitted event.
fn run_deterministic_sequence(seed: u64, fills: usize) -> ([u8; 32], [u8; 32]) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut ex = funded(FUNDING);
    let orders = generate_orders(&ex, &mut rng, ORDER_COUNT);

    for _ in 0..fills {
        let (order, signature) = &orders[rng.gen_range(0..orders.len())];
        let requested = rng.gen_range(1..=600);
        let _ = ex.fill_limit_order(ctx(), order, signature, requested);
    }

    let digest = BatchReceipt::from_events(0, 0, ex.events(), 0).events_root;
    (ex.store().state_root(), digest)
}

// ============================================================================
// STRESS TESTS
// ============================================================================

/// Random fills against a shared book.
///
/// # Verification
/// - Filled amount per order is monotone and never exceeds capacity
/// - An order reports `Filled` exactly when it is exhausted
/// - Fills against exhausted orders fail as not fillable
#[test]
fn stress_random_fills() {
    println!("\n=== STRESS TEST: {} random fills ===\n", FILL_COUNT);

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut ex = funded(FUNDING);
    let orders = generate_orders(&ex, &mut rng, ORDER_COUNT);
    let mut filled: BTreeMap<usize, u128> = BTreeMap::new();

    let start = Instant::now();
    let mut succeeded = 0usize;
    let mut rejected = 0usize;

    for _ in 0..FILL_COUNT {
        let index = rng.gen_range(0..orders.len());
        let (order, signature) = &orders[index];
        let requested = rng.gen_range(1..=600);
        let before = *filled.get(&index).unwrap_or(&0);

        match ex.fill_limit_order(ctx(), order, signature, requested) {
            Ok(result) => {
                succeeded += 1;
                assert_eq!(result.taker_filled, requested.min(order.taker_amount - before));
                assert!(result.maker_filled <= order.maker_amount);
                filled.insert(index, before + result.taker_filled);
            }
            Err(EngineError::Lifecycle(LifecycleError::NotFillable { status, .. })) => {
                rejected += 1;
                assert_eq!(status, OrderStatus::Filled);
                assert_eq!(before, order.taker_amount);
            }
            Err(other) => panic!("unexpected failure: {other}"),
        }

        let info = ex.get_limit_order_info(order, NOW);
        assert!(info.filled_amount <= order.taker_amount);
        assert_eq!(info.filled_amount, *filled.get(&index).unwrap_or(&0));
        assert_eq!(info.status == OrderStatus::Filled, info.filled_amount == order.taker_amount);
    }

    let elapsed = start.elapsed();
    println!("  Fills succeeded:   {:>12}", succeeded);
    println!("  Fills rejected:    {:>12}", rejected);
    println!("  Events emitted:    {:>12}", ex.events().len());
    println!("  Elapsed time:      {:>12.2?}", elapsed);
    println!("  State root:        {}", ex.store().state_root_hex());

    assert_eq!(ex.events().len(), succeeded);
    assert!(rejected > 0, "expected some orders to be exhausted");

    // Conservation: every taker token the taker spent went to the maker or the fee recipient
    let spent = FUNDING - balance(&ex, TAKER_TOKEN, TAKER);
    assert_eq!(spent, balance(&ex, TAKER_TOKEN, maker()) + balance(&ex, TAKER_TOKEN, FEE_RECIPIENT));
    assert_eq!(
        FUNDING - balance(&ex, MAKER_TOKEN, maker()),
        balance(&ex, MAKER_TOKEN, TAKER)
    );

    println!("\n=== STRESS TEST PASSED ===\n");
}

/// Random OTC nonces across a few buckets: a fill succeeds exactly when its
/// nonce is above everything already consumed or cancelled in the bucket.
#[test]
fn stress_otc_nonce_ratchet() {
    println!("\n=== OTC NONCE RATCHET TEST ===\n");

    const ATTEMPTS: usize = 500;
    const BUCKETS: u64 = 4;

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut ex = funded(FUNDING);
    let mut highest: BTreeMap<u64, u128> = BTreeMap::new();

    for _ in 0..ATTEMPTS {
        let bucket = rng.gen_range(0..BUCKETS);
        let nonce: u128 = rng.gen_range(1..=1_000);
        let stored = *highest.get(&bucket).unwrap_or(&0);

        if rng.gen_bool(0.1) {
            ex.cancel_by_nonce(fill_engine::CallContext::new(maker(), NOW), bucket, nonce)
                .unwrap();
            highest.insert(bucket, stored.max(nonce));
            continue;
        }

        let order = otc_order(bucket, nonce);
        let signature = sign_otc(&ex, &order);
        match ex.fill_otc_order(ctx(), &order, &signature, 100) {
            Ok(_) => {
                assert!(nonce > stored);
                highest.insert(bucket, nonce);
            }
            Err(EngineError::Replay(ReplayError::StaleNonce { stored: seen, .. })) => {
                assert!(nonce <= stored);
                assert_eq!(seen, stored);
            }
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }

    for bucket in 0..BUCKETS {
        let expected = *highest.get(&bucket).unwrap_or(&0);
        println!("  Bucket {} last nonce: {:>6}", bucket, expected);
        assert_eq!(ex.last_otc_nonce(maker(), bucket), expected);
    }

    println!("\n=== NONCE RATCHET VERIFIED ===\n");
}

/// Random batches under the revert policy either commit fully or leave the
/// state root untouched.
#[test]
fn stress_all_or_nothing_batches() {
    println!("\n=== ALL-OR-NOTHING BATCH TEST ===\n");

    const BATCHES: usize = 200;

    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut ex = funded(FUNDING);
    let book = generate_orders(&ex, &mut rng, ORDER_COUNT);
    let mut reverted = 0usize;

    for _ in 0..BATCHES {
        let size = rng.gen_range(1..=8);
        let picks: Vec<usize> = (0..size).map(|_| rng.gen_range(0..book.len())).collect();
        let orders: Vec<LimitOrder> = picks.iter().map(|&i| book[i].0.clone()).collect();
        let sigs: Vec<Signature> = picks.iter().map(|&i| book[i].1.clone()).collect();
        let amounts: Vec<u128> = picks.iter().map(|_| rng.gen_range(1..=300)).collect();

        let root = ex.store().state_root();
        let events = ex.events().len();
        match ex.batch_fill_limit_orders(ctx(), &orders, &sigs, &amounts, true) {
            Ok(outcome) => {
                assert!(outcome.outcomes.iter().zip(&amounts).all(|(o, &a)| o.taker_filled() == a));
                assert_eq!(ex.events().len(), events + size);
            }
            Err(err) => {
                reverted += 1;
                assert_eq!(err.kind(), "capacity");
                assert_eq!(ex.store().state_root(), root);
                assert_eq!(ex.events().len(), events);
            }
        }
    }

    println!("  Batches:           {:>12}", BATCHES);
    println!("  Reverted:          {:>12}", reverted);
    assert!(reverted > 0);

    println!("\n=== ALL-OR-NOTHING VERIFIED ===\n");
}

/// Verify determinism: the same fill sequence produces an identical state
/// root and event stream.
#[test]
fn verify_determinism() {
    println!("\n=== DETERMINISM TEST ===\n");

    const SEED: u64 = 12345;
    const FILLS: usize = 1_000;

    let (root1, events1) = run_deterministic_sequence(SEED, FILLS);
    let (root2, events2) = run_deterministic_sequence(SEED, FILLS);

    println!("  Run 1 state root: {}", hex::encode(root1));
    println!("  Run 2 state root: {}", hex::encode(root2));

    assert_eq!(root1, root2, "State roots must match for determinism");
    assert_eq!(events1, events2, "Event streams must match for determinism");

    let (root3, _) = run_deterministic_sequence(SEED + 1, FILLS);
    println!("  Different seed:   {}", hex::encode(root3));
    assert_ne!(root1, root3, "Different seeds should produce different roots");

    println!("\n=== DETERMINISM VERIFIED ===\n");
}
