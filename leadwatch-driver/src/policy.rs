//! The notification decision, as a pure function of policy, input and the
//! last notified leader.

use leadwatch_core::{ClearancePolicy, ConnectionState, LeaderInformation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyInput {
    /// The record was read after a watch event or at start-up
    Record(LeaderInformation),
    /// The record was re-read after a reconnection
    Resynced(LeaderInformation),
    Connection(ConnectionState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Ignore,
    /// Deliver to the listener and remember as last notified
    Notify(LeaderInformation),
    /// Re-register the watch and re-read the record
    Resync,
}

pub fn next_action(
    policy: ClearancePolicy,
    input: &PolicyInput,
    last_notified: &LeaderInformation,
) -> Action {
    match input {
        PolicyInput::Record(leader) if leader != last_notified => Action::Notify(leader.clone()),
        PolicyInput::Record(_) => Action::Ignore,
        // Always re-announced: the listener may have missed the clearing
        PolicyInput::Resynced(leader) => Action::Notify(leader.clone()),
        PolicyInput::Connection(ConnectionState::Reconnected) => Action::Resync,
        PolicyInput::Connection(state) => {
            if policy.clears_on(*state) && !last_notified.is_empty() {
                Action::Notify(LeaderInformation::Empty)
            } else {
                Action::Ignore
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn leader(address: &str) -> LeaderInformation {
        LeaderInformation::known(Uuid::new_v4(), address)
    }

    #[test]
    fn test_record_changes_are_deduplicated() {
        let current = leader("a");
        for policy in [
            ClearancePolicy::OnSuspendedConnection,
            ClearancePolicy::OnLostConnection,
        ] {
            assert_eq!(
                next_action(policy, &PolicyInput::Record(current.clone()), &current),
                Action::Ignore
            );
            let next = leader("b");
            assert_eq!(
                next_action(policy, &PolicyInput::Record(next.clone()), &current),
                Action::Notify(next)
            );
        }
    }

    #[test]
    fn test_deleted_record_clears_only_known_leader() {
        let policy = ClearancePolicy::OnSuspendedConnection;
        assert_eq!(
            next_action(policy, &PolicyInput::Record(LeaderInformation::Empty), &leader("a")),
            Action::Notify(LeaderInformation::Empty)
        );
        assert_eq!(
            next_action(
                policy,
                &PolicyInput::Record(LeaderInformation::Empty),
                &LeaderInformation::Empty
            ),
            Action::Ignore
        );
    }

    #[test]
    fn test_suspension_under_each_policy() {
        let suspended = PolicyInput::Connection(ConnectionState::Suspended);
        let current = leader("a");

        assert_eq!(
            next_action(ClearancePolicy::OnSuspendedConnection, &suspended, &current),
            Action::Notify(LeaderInformation::Empty)
        );
        assert_eq!(
            next_action(ClearancePolicy::OnLostConnection, &suspended, &current),
            Action::Ignore
        );
        assert_eq!(
            next_action(
                ClearancePolicy::OnSuspendedConnection,
                &suspended,
                &LeaderInformation::Empty
            ),
            Action::Ignore
        );
    }

    #[test]
    fn test_loss_under_each_policy() {
        let lost = PolicyInput::Connection(ConnectionState::Lost);

        assert_eq!(
            next_action(ClearancePolicy::OnLostConnection, &lost, &leader("a")),
            Action::Notify(LeaderInformation::Empty)
        );
        // Cleared at suspension already
        assert_eq!(
            next_action(
                ClearancePolicy::OnSuspendedConnection,
                &lost,
                &LeaderInformation::Empty
            ),
            Action::Ignore
        );
    }

    #[test]
    fn test_reconnect_resyncs_and_reannounces() {
        let current = leader("a");
        assert_eq!(
            next_action(
                ClearancePolicy::OnLostConnection,
                &PolicyInput::Connection(ConnectionState::Reconnected),
                &current
            ),
            Action::Resync
        );
        assert_eq!(
            next_action(
                ClearancePolicy::OnSuspendedConnection,
                &PolicyInput::Resynced(current.clone()),
                &current
            ),
            Action::Notify(current)
        );
    }

    #[test]
    fn test_plain_connected_is_ignored() {
        assert_eq!(
            next_action(
                ClearancePolicy::OnSuspendedConnection,
                &PolicyInput::Connection(ConnectionState::Connected),
                &leader("a")
            ),
            Action::Ignore
        );
    }
}
