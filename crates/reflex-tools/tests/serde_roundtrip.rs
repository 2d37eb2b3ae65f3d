#![cfg(feature = "serde")]

use reflex_tools::{TraceEvent, TraceLog};

#[test]
fn trace_log_roundtrips_through_json() {
    let mut log = TraceLog::default();
    log.push(TraceEvent::new(3, "goal.commit").with_goal(1).with_node(4));

    let json = serde_json::to_string(&log).unwrap();
    let back: TraceLog = serde_json::from_str(&json).unwrap();
    assert_eq!(back, log);
}
