use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use leadwatch_core::{ClearancePolicy, ConnectionState, LeaderInformation};
use leadwatch_driver::{next_action, PolicyInput};
use leadwatch_testing::{test_leader, RetrievalTestHarness, SessionFault};
use std::time::Duration;
use tokio::runtime::Runtime;

fn benchmark_policy(c: &mut Criterion) {
    let last = test_leader(1);
    let inputs = [
        ("same_record", PolicyInput::Record(test_leader(1))),
        ("new_record", PolicyInput::Record(test_leader(2))),
        ("suspended", PolicyInput::Connection(ConnectionState::Suspended)),
        ("reconnected", PolicyInput::Connection(ConnectionState::Reconnected)),
    ];

    let mut group = c.benchmark_group("next_action");
    for (name, input) in &inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, input| {
            b.iter(|| {
                next_action(
                    ClearancePolicy::OnSuspendedConnection,
                    black_box(input),
                    black_box(&last),
                )
            })
        });
    }
    group.finish();
}

fn benchmark_notification_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let harness = rt
        .block_on(RetrievalTestHarness::start(
            "/bench/leader",
            ClearancePolicy::OnSuspendedConnection,
        ))
        .unwrap();

    let leaders = [test_leader(1), test_leader(2)];
    let mut round = 0usize;

    c.bench_function("record_change_to_notification", |b| {
        b.iter(|| {
            round += 1;
            let leader = &leaders[round % 2];
            harness.publish(leader);
            let notified = rt.block_on(harness.next_notification(Duration::from_secs(5)));
            assert_eq!(notified.as_ref(), Some(leader));
        })
    });

    c.bench_function("reconnect_resync", |b| {
        b.iter(|| {
            harness.inject(SessionFault::Restart);
            let cleared = rt.block_on(harness.next_notification(Duration::from_secs(5)));
            let resynced = rt.block_on(harness.next_notification(Duration::from_secs(5)));
            assert_eq!(cleared, Some(LeaderInformation::Empty));
            assert!(resynced.is_some());
        })
    });

    rt.block_on(harness.close());
}

criterion_group!(benches, benchmark_policy, benchmark_notification_latency);
criterion_main!(benches);
