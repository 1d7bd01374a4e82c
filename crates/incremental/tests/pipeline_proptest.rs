//! Property-based tests for incremental runs.
//!
//! These tests verify that driving a pipeline through a sequence of inputs
//! yields, at every step, the same values a fresh driver computes from
//! scratch, and that repeating a run changes nothing.

use proptest::prelude::*;
use skein_core::CancellationToken;
use skein_incremental::{Driver, EntryState, NodeHandle, Pipeline, RunResult};

/// Handles of every node of the test pipeline.
struct Nodes {
    input: NodeHandle<i32>,
    scaled: NodeHandle<i32>,
    evens: NodeHandle<i32>,
    repeated: NodeHandle<i32>,
    total: NodeHandle<i32>,
    sorted: NodeHandle<i32>,
    pairs: NodeHandle<(i32, i32)>,
    tagged: NodeHandle<i64>,
}

fn build() -> (Pipeline, Nodes) {
    let mut pipeline = Pipeline::new();
    let input = pipeline.input::<i32>();
    let scaled = pipeline.select(&input, |x: &i32| (x * 3).rem_euclid(7));
    let evens = pipeline.filter(&scaled, |x: &i32| x % 2 == 0);
    let repeated = pipeline.select_many(&input, |x: &i32| vec![*x; x.rem_euclid(3) as usize]);
    let total = pipeline.batch(&repeated, |xs: &[i32]| xs.iter().sum::<i32>());
    let sorted = pipeline.batch_many(&evens, |xs: &[i32]| {
        let mut xs = xs.to_vec();
        xs.sort_unstable();
        xs.dedup();
        xs
    });
    let pairs = pipeline.combine(&evens, &total);
    let tagged = pipeline.select(&pairs, |(l, r): &(i32, i32)| i64::from(*l) * 1000 + i64::from(*r));
    let nodes = Nodes {
        input,
        scaled,
        evens,
        repeated,
        total,
        sorted,
        pairs,
        tagged,
    };
    (pipeline, nodes)
}

/// Collects the present values of every node, in node order.
fn snapshot(result: &RunResult, nodes: &Nodes) -> Vec<Vec<i64>> {
    let ints = |node: &NodeHandle<i32>| -> Vec<i64> {
        result
            .table(node)
            .unwrap()
            .batch()
            .into_iter()
            .map(i64::from)
            .collect()
    };
    let pairs: Vec<i64> = result
        .table(&nodes.pairs)
        .unwrap()
        .batch()
        .into_iter()
        .flat_map(|(l, r)| [i64::from(l), i64::from(r)])
        .collect();
    vec![
        ints(&nodes.input),
        ints(&nodes.scaled),
        ints(&nodes.evens),
        ints(&nodes.repeated),
        ints(&nodes.total),
        ints(&nodes.sorted),
        pairs,
        result.table(&nodes.tagged).unwrap().batch(),
    ]
}

fn from_scratch(values: &[i32]) -> Vec<Vec<i64>> {
    let (pipeline, nodes) = build();
    let mut driver = Driver::new(pipeline);
    driver.set_input(&nodes.input, values.to_vec()).unwrap();
    let result = driver.run(&CancellationToken::new()).unwrap();
    snapshot(&result, &nodes)
}

fn inputs_strategy() -> impl Strategy<Value = Vec<Vec<i32>>> {
    prop::collection::vec(prop::collection::vec(-20i32..20, 0..10), 1..8)
}

proptest! {
    /// Property: every incremental run matches a from-scratch run on the same input.
    #[test]
    fn incremental_runs_equal_full_recompute(runs in inputs_strategy()) {
        let (pipeline, nodes) = build();
        let mut driver = Driver::new(pipeline);

        for values in &runs {
            driver.set_input(&nodes.input, values.clone()).unwrap();
            let result = driver.run(&CancellationToken::new()).unwrap();
            prop_assert!(!result.is_faulted());
            prop_assert_eq!(snapshot(&result, &nodes), from_scratch(values));
        }
    }

    /// Property: a second run over the same input reuses every node.
    #[test]
    fn repeated_run_is_a_no_op(runs in inputs_strategy()) {
        let (pipeline, nodes) = build();
        let mut driver = Driver::new(pipeline);

        for values in &runs {
            driver.set_input(&nodes.input, values.clone()).unwrap();
            let first = driver.run(&CancellationToken::new()).unwrap();
            let second = driver.run(&CancellationToken::new()).unwrap();

            prop_assert_eq!(second.stats().executed, 0);
            prop_assert_eq!(second.stats().reused, driver.pipeline().len());
            prop_assert_eq!(snapshot(&first, &nodes), snapshot(&second, &nodes));
        }
    }

    /// Property: a run never tags an item Added where the previous run held a
    /// value at the same position of an input.
    #[test]
    fn input_changes_never_add_at_shared_positions(
        before in prop::collection::vec(-5i32..5, 0..10),
        after in prop::collection::vec(-5i32..5, 0..10),
    ) {
        let (pipeline, nodes) = build();
        let mut driver = Driver::new(pipeline);
        driver.set_input(&nodes.input, before.clone()).unwrap();
        driver.run(&CancellationToken::new()).unwrap();
        driver.set_input(&nodes.input, after.clone()).unwrap();
        let result = driver.run(&CancellationToken::new()).unwrap();

        let input = result.table(&nodes.input).unwrap();
        let shared = before.len().min(after.len());
        let states: Vec<EntryState> = input.iter().map(|e| e.state).collect();
        prop_assert!(states[..shared].iter().all(|s| !s.is_added()));
        prop_assert_eq!(
            states.iter().filter(|s| s.is_removed()).count(),
            before.len().saturating_sub(after.len())
        );
        prop_assert_eq!(
            states.iter().filter(|s| s.is_added()).count(),
            after.len().saturating_sub(before.len())
        );
    }
}
