use st_qa_engine::analysis::timings;

#[test]
fn timings_summary_produces_output() {
    std::env::set_var("ST_QA_TIMINGS", "1");
    timings::record("qa/analyze", 10);
    timings::record("qa/analyze", 12);
    timings::record("qa/analyze", 8);
    let doubled = timings::timed("usage/analyze", || 21 * 2);
    assert_eq!(doubled, 42);

    let s = timings::summary();
    assert!(s.contains("=== TIMINGS (ms) ==="));
    assert!(s.contains("qa/analyze: count=3 p50=10"), "{s}");
    assert!(s.contains("usage/analyze"));
}

#[test]
fn rule_engine_runs_are_timed() {
    std::env::set_var("ST_QA_TIMINGS", "1");
    st_qa_engine::QaRuleEngine::new()
        .analyze(&st_qa_engine::qa::ChangeSet::default())
        .expect("run completes");
    assert!(timings::summary().contains("qa_rules: count="), "{}", timings::summary());
}
