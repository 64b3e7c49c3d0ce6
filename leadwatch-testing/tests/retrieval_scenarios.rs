//! Scripted retrieval scenarios
//!
//! Each scenario from the catalogue runs against a fresh driver and
//! in-memory coordination service.

use leadwatch_testing::{create_test_scenarios, init_test_tracing, RetrievalTestHarness};

#[tokio::test]
async fn test_all_scenarios() {
    init_test_tracing();

    for scenario in create_test_scenarios() {
        let harness = RetrievalTestHarness::start("/leader", scenario.policy)
            .await
            .unwrap();

        let result = harness.run_scenario(&scenario).await;
        harness.close().await;

        assert!(
            result.success,
            "scenario '{}' failed: {:?} (notifications: {:?})",
            result.scenario_name, result.error_message, result.notifications
        );
        assert_eq!(result.steps_executed, scenario.steps.len());
    }
}

#[tokio::test]
async fn test_scenario_failure_is_reported() {
    use leadwatch_core::ClearancePolicy;
    use leadwatch_testing::{test_leader, ScenarioStep, TestScenario};

    init_test_tracing();

    // A bare suspension under the lenient policy never clears the leader
    let mut scenario = TestScenario::new(
        "wrong expectation",
        ClearancePolicy::OnLostConnection,
        vec![
            ScenarioStep::Publish(test_leader(1)),
            ScenarioStep::ExpectLeader(test_leader(1)),
            ScenarioStep::Fault(leadwatch_testing::SessionFault::Suspend),
            ScenarioStep::ExpectLeader(leadwatch_core::LeaderInformation::Empty),
            ScenarioStep::ExpectSilence,
        ],
    );
    scenario.timeout = std::time::Duration::from_millis(200);

    let harness = RetrievalTestHarness::start("/leader", scenario.policy)
        .await
        .unwrap();
    let result = harness.run_scenario(&scenario).await;
    harness.close().await;

    assert!(!result.success);
    assert_eq!(result.steps_executed, 4);
    assert!(result.error_message.is_some());
}
