use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use uuid::Uuid;

use leadwatch_core::{
    codec::{LeaderRecordCodec, LengthPrefixedCodec},
    ClearancePolicy, CoordinationClient, LeaderInformation, Result,
};
use leadwatch_driver::{LeaderRetrievalDriver, QueueLeaderListener};

use crate::coordinator::InMemoryCoordinationService;
use crate::handlers::TestingFatalErrorHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFault {
    Suspend,
    Reconnect,
    /// Suspend followed by reconnect
    Restart,
    ExpireSession,
}

#[derive(Debug, Clone)]
pub enum ScenarioStep {
    /// Another party writes the encoded leader to the record
    Publish(LeaderInformation),
    /// Another party writes arbitrary bytes to the record
    PublishRaw(Vec<u8>),
    DeleteRecord,
    Fault(SessionFault),
    ExpectLeader(LeaderInformation),
    /// No notification within the scenario's silence window
    ExpectSilence,
    ExpectFatalError,
}

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    pub policy: ClearancePolicy,
    pub steps: Vec<ScenarioStep>,
    pub timeout: Duration,
    pub silence_window: Duration,
}

impl TestScenario {
    pub fn new(name: impl Into<String>, policy: ClearancePolicy, steps: Vec<ScenarioStep>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            policy,
            steps,
            timeout: Duration::from_secs(5),
            silence_window: Duration::from_millis(100),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct TestResult {
    pub scenario_name: String,
    pub success: bool,
    pub steps_executed: usize,
    pub notifications: Vec<LeaderInformation>,
    pub fatal_errors: usize,
    pub duration: Duration,
    pub error_message: Option<String>,
}

/// A driver wired to an in-memory coordination service, a queue listener and
/// a recording fatal-error handler.
pub struct RetrievalTestHarness {
    pub service: Arc<InMemoryCoordinationService>,
    pub listener: Arc<QueueLeaderListener>,
    pub fatal_errors: Arc<TestingFatalErrorHandler>,
    pub driver: LeaderRetrievalDriver,
    path: String,
}

impl RetrievalTestHarness {
    pub const LISTENER_CAPACITY: usize = 16;

    pub async fn start(path: &str, policy: ClearancePolicy) -> Result<Self> {
        Self::start_on(Arc::new(InMemoryCoordinationService::new()), path, policy).await
    }

    pub async fn start_on(
        service: Arc<InMemoryCoordinationService>,
        path: &str,
        policy: ClearancePolicy,
    ) -> Result<Self> {
        let listener = Arc::new(QueueLeaderListener::new(Self::LISTENER_CAPACITY));
        let fatal_errors = Arc::new(TestingFatalErrorHandler::new());
        let client: Arc<dyn CoordinationClient> = service.clone();

        let driver = LeaderRetrievalDriver::start(
            client,
            path,
            listener.clone(),
            policy,
            fatal_errors.clone(),
        )
        .await?;

        Ok(Self {
            service,
            listener,
            fatal_errors,
            driver,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Write `leader` as another party would, regardless of this session.
    pub fn publish(&self, leader: &LeaderInformation) {
        self.service
            .put_raw(&self.path, LengthPrefixedCodec.encode(leader));
    }

    pub fn inject(&self, fault: SessionFault) {
        info!(?fault, "Injecting session fault");
        match fault {
            SessionFault::Suspend => self.service.suspend(),
            SessionFault::Reconnect => self.service.reconnect(),
            SessionFault::Restart => self.service.restart(),
            SessionFault::ExpireSession => self.service.expire_session(),
        }
    }

    pub async fn next_notification(&self, timeout: Duration) -> Option<LeaderInformation> {
        self.listener.next_timeout(timeout).await.ok().flatten()
    }

    pub async fn close(&self) {
        self.driver.close().await;
        self.listener.shutdown();
    }

    pub async fn run_scenario(&self, scenario: &TestScenario) -> TestResult {
        info!(scenario = %scenario.name, "Running retrieval scenario");
        let start_time = Instant::now();

        let mut notifications = Vec::new();
        let mut expected_fatal = self.fatal_errors.error_count();
        let mut steps_executed = 0;
        let mut error_message = None;

        for (index, step) in scenario.steps.iter().enumerate() {
            let outcome = match step {
                ScenarioStep::Publish(leader) => {
                    self.publish(leader);
                    Ok(())
                }
                ScenarioStep::PublishRaw(bytes) => {
                    self.service.put_raw(&self.path, bytes.clone());
                    Ok(())
                }
                ScenarioStep::DeleteRecord => {
                    self.service.remove(&self.path);
                    Ok(())
                }
                ScenarioStep::Fault(fault) => {
                    self.inject(*fault);
                    Ok(())
                }
                ScenarioStep::ExpectLeader(expected) => {
                    match self.next_notification(scenario.timeout).await {
                        Some(actual) => {
                            notifications.push(actual.clone());
                            if &actual == expected {
                                Ok(())
                            } else {
                                Err(format!("expected {}, notified {}", expected, actual))
                            }
                        }
                        None => Err(format!("no notification, expected {}", expected)),
                    }
                }
                ScenarioStep::ExpectSilence => {
                    match self.next_notification(scenario.silence_window).await {
                        Some(actual) => {
                            notifications.push(actual.clone());
                            Err(format!("unexpected notification {}", actual))
                        }
                        None => Ok(()),
                    }
                }
                ScenarioStep::ExpectFatalError => {
                    expected_fatal += 1;
                    if self
                        .fatal_errors
                        .wait_for_errors(expected_fatal, scenario.timeout)
                        .await
                    {
                        Ok(())
                    } else {
                        Err("no fatal error reported".to_string())
                    }
                }
            };

            steps_executed += 1;
            if let Err(message) = outcome {
                error!(scenario = %scenario.name, step = index, %message, "Scenario step failed");
                error_message = Some(format!("step {} ({:?}): {}", index, step, message));
                break;
            }
        }

        TestResult {
            scenario_name: scenario.name.clone(),
            success: error_message.is_none(),
            steps_executed,
            notifications,
            fatal_errors: self.fatal_errors.error_count(),
            duration: start_time.elapsed(),
            error_message,
        }
    }
}

/// Leader published by the scenarios; `n` picks a distinct session id.
pub fn test_leader(n: u128) -> LeaderInformation {
    LeaderInformation::known(Uuid::from_u128(n), "localhost")
}

pub fn create_test_scenarios() -> Vec<TestScenario> {
    use ScenarioStep::*;

    let first = test_leader(1);
    let second = test_leader(2);

    vec![
        TestScenario::new(
            "suspension clears and reconnection re-announces",
            ClearancePolicy::OnSuspendedConnection,
            vec![
                Publish(first.clone()),
                ExpectLeader(first.clone()),
                Fault(SessionFault::Restart),
                ExpectLeader(LeaderInformation::Empty),
                ExpectLeader(first.clone()),
                ExpectSilence,
            ],
        )
        .with_description("Suspended then reconnected without a record change"),
        TestScenario::new(
            "session loss clears when suspension is tolerated",
            ClearancePolicy::OnLostConnection,
            vec![
                Publish(first.clone()),
                ExpectLeader(first.clone()),
                Fault(SessionFault::ExpireSession),
                ExpectLeader(LeaderInformation::Empty),
                ExpectSilence,
            ],
        )
        .with_description("Exactly one empty notification after the session is lost"),
        TestScenario::new(
            "new leader after reconnection",
            ClearancePolicy::OnSuspendedConnection,
            vec![
                Publish(first.clone()),
                ExpectLeader(first.clone()),
                Fault(SessionFault::Restart),
                ExpectLeader(LeaderInformation::Empty),
                ExpectLeader(first.clone()),
                Publish(second.clone()),
                ExpectLeader(second.clone()),
                ExpectSilence,
            ],
        )
        .with_description("The stale leader is never delivered after the new one"),
        TestScenario::new(
            "tolerated suspension is silent",
            ClearancePolicy::OnLostConnection,
            vec![
                Publish(first.clone()),
                ExpectLeader(first.clone()),
                Fault(SessionFault::Suspend),
                ExpectSilence,
            ],
        )
        .with_description("A bare suspension produces no notification"),
        TestScenario::new(
            "repeated writes are deduplicated",
            ClearancePolicy::OnSuspendedConnection,
            vec![
                Publish(first.clone()),
                ExpectLeader(first.clone()),
                Publish(first.clone()),
                ExpectSilence,
                Publish(second.clone()),
                ExpectLeader(second),
                DeleteRecord,
                ExpectLeader(LeaderInformation::Empty),
                Publish(LeaderInformation::Empty),
                ExpectSilence,
            ],
        ),
        TestScenario::new(
            "malformed record keeps the last leader",
            ClearancePolicy::OnSuspendedConnection,
            vec![
                Publish(first.clone()),
                ExpectLeader(first),
                PublishRaw(vec![0, 0, 0, 9, b'x']),
                ExpectFatalError,
                ExpectSilence,
            ],
        ),
    ]
}
