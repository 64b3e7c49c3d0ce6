//! # Leadwatch Testing
//!
//! Test support for leader retrieval: an in-memory coordination service with
//! session fault injection, a recording fatal-error handler, and a harness
//! that runs scripted retrieval scenarios against a real driver.

pub mod coordinator;
pub mod fault_injection;
pub mod handlers;

pub use coordinator::{publish_leader, CoordinatorStats, InMemoryCoordinationService};
pub use fault_injection::{
    create_test_scenarios, test_leader, RetrievalTestHarness, ScenarioStep, SessionFault,
    TestResult, TestScenario,
};
pub use handlers::TestingFatalErrorHandler;

/// Install a WARN-level fmt subscriber once per process.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_test_writer()
        .try_init();
}
