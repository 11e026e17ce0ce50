//! Property-based tests for rust_scoped_logger using proptest

use proptest::prelude::*;
use rust_scoped_logger::core::{
    AsyncQueue, Formatter, LogLevel, OneLineFormatter, OverflowPolicy, Record, SubmitOutcome,
    LINE_SEPARATOR,
};
use rust_scoped_logger::manager::{sink_kind, NodeTree, Properties};
use std::sync::{Arc, Mutex};

/// Submit `0..count` to a paused queue of `capacity`, then drain it and
/// return the order in which tasks ran.
fn run_paused(capacity: usize, policy: OverflowPolicy, count: usize) -> Vec<usize> {
    let queue = AsyncQueue::new(capacity, policy).unwrap();
    let producer = queue.register(None).unwrap();
    queue.pause();

    let ran = Arc::new(Mutex::new(Vec::new()));
    for i in 0..count {
        let ran = Arc::clone(&ran);
        queue
            .submit(Box::new(move || ran.lock().unwrap().push(i)))
            .unwrap();
        assert!(queue.pending() <= capacity);
    }

    queue.resume();
    queue.deregister(producer);
    let order = ran.lock().unwrap().clone();
    order
}

// ============================================================================
// Overflow Policy Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// DropOldest keeps the newest `capacity` tasks, in order
    #[test]
    fn test_drop_oldest_keeps_most_recent(capacity in 1usize..16, count in 0usize..64) {
        let order = run_paused(capacity, OverflowPolicy::DropOldest, count);
        let expected: Vec<usize> = (count.saturating_sub(capacity)..count).collect();
        prop_assert_eq!(order, expected);
    }

    /// DropNewest keeps the first `capacity - 1` tasks plus the latest one
    #[test]
    fn test_drop_newest_replaces_tail(capacity in 1usize..16, count in 0usize..64) {
        let order = run_paused(capacity, OverflowPolicy::DropNewest, count);
        let expected: Vec<usize> = if count <= capacity {
            (0..count).collect()
        } else {
            (0..capacity - 1).chain(std::iter::once(count - 1)).collect()
        };
        prop_assert_eq!(order, expected);
    }

    /// DropCurrent keeps the first `capacity` tasks
    #[test]
    fn test_drop_current_keeps_earliest(capacity in 1usize..16, count in 0usize..64) {
        let order = run_paused(capacity, OverflowPolicy::DropCurrent, count);
        let expected: Vec<usize> = (0..count.min(capacity)).collect();
        prop_assert_eq!(order, expected);
    }

    /// The most recent submission is never the one removed
    #[test]
    fn test_latest_survives_eviction(
        capacity in 1usize..8,
        count in 1usize..32,
        policy in prop_oneof![Just(OverflowPolicy::DropNewest), Just(OverflowPolicy::DropOldest)],
    ) {
        let order = run_paused(capacity, policy, count);
        prop_assert_eq!(order.last().copied(), Some(count - 1));
    }
}

#[test]
fn test_drop_current_scenario() {
    let queue = AsyncQueue::new(2, OverflowPolicy::DropCurrent).unwrap();
    let producer = queue.register(None).unwrap();
    queue.pause();

    let ran = Arc::new(Mutex::new(Vec::new()));
    let mut outcomes = Vec::new();
    for name in ["R1", "R2", "R3"] {
        let ran = Arc::clone(&ran);
        outcomes.push(
            queue
                .submit(Box::new(move || ran.lock().unwrap().push(name)))
                .unwrap(),
        );
    }
    assert_eq!(
        outcomes,
        vec![
            SubmitOutcome::Queued,
            SubmitOutcome::Queued,
            SubmitOutcome::Discarded
        ]
    );

    queue.resume();
    queue.deregister(producer);
    assert_eq!(*ran.lock().unwrap(), vec!["R1", "R2"]);
    assert_eq!(queue.metrics().dropped_count(), 1);
}

// ============================================================================
// Formatting Tests
// ============================================================================

proptest! {
    /// Whatever the message, one record renders to exactly one line
    #[test]
    fn test_record_renders_single_line(message in ".*") {
        let record = Record::new(LogLevel::Info, "prop", &message);
        let line = OneLineFormatter::new().format(&record).unwrap();
        prop_assert!(line.ends_with(LINE_SEPARATOR));
        prop_assert_eq!(line.matches('\n').count(), 1);
        prop_assert!(!line.trim_end_matches(LINE_SEPARATOR).contains('\r'));
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

proptest! {
    /// Plain keys and values survive parsing, with surrounding blanks trimmed
    #[test]
    fn test_properties_plain_entries(
        key in "[a-zA-Z][a-zA-Z0-9_.]{0,16}",
        value in "[a-zA-Z0-9_,./-]{0,24}",
    ) {
        let text = format!("  {} =   {}\n", key, value);
        let props: Properties = text.parse().unwrap();
        prop_assert_eq!(props.get(&key), Some(value.as_str()));
    }

    /// Numeric codes and names parse to the same policy
    #[test]
    fn test_overflow_policy_codes(policy in prop_oneof![
        Just(OverflowPolicy::DropNewest),
        Just(OverflowPolicy::DropOldest),
        Just(OverflowPolicy::BlockUntilSpace),
        Just(OverflowPolicy::DropCurrent),
    ]) {
        let by_code: OverflowPolicy = policy.code().to_string().parse().unwrap();
        let by_name: OverflowPolicy = policy.to_string().parse().unwrap();
        prop_assert_eq!(by_code, policy);
        prop_assert_eq!(by_name, policy);
    }

    /// A labelled identifier resolves to its kind
    #[test]
    fn test_labelled_sink_identifier(
        digits in "[0-9]{1,3}",
        label in "[a-z]{1,8}",
        kind in "[A-Z][a-zA-Z]{0,12}",
    ) {
        let id = format!("{}{}.{}", digits, label, kind);
        prop_assert_eq!(sink_kind(&id), kind.as_str());
    }

    /// Every dot-prefix of a looked-up name gets a node
    #[test]
    fn test_node_tree_prefixes(segments in prop::collection::vec("[a-z]{1,6}", 1..6)) {
        let name = segments.join(".");
        let mut tree = NodeTree::new();
        let leaf = tree.find_node(&name);
        prop_assert_eq!(tree.full_name(leaf), name.clone());
        for end in 1..=segments.len() {
            let prefix = segments[..end].join(".");
            prop_assert!(tree.lookup(&prefix).is_some(), "missing {}", prefix);
        }
    }
}
