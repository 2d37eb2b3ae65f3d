use reflex_tools::{TraceEvent, TraceSink, VecTraceSink};

#[test]
fn vec_sink_records_in_emission_order() {
    let mut sink = VecTraceSink::default();
    sink.emit(TraceEvent::new(0, "goal.commit").with_goal(1).with_node(2));
    sink.emit(TraceEvent::new(1, "node.succeeded").with_node(2));

    assert_eq!(sink.tags(), vec!["goal.commit", "node.succeeded"]);
    assert_eq!(sink.events[0].goal, 1);
    assert_eq!(sink.events[1].node, 2);
}
