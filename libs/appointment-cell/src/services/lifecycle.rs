use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// Allowed lifecycle moves.
///
/// ```text
/// pending  -> approved | rejected | cancelled
/// approved -> completed | cancelled
/// ```
/// `rejected`, `completed` and `cancelled` are terminal.
pub fn valid_transitions(current: AppointmentStatus) -> &'static [AppointmentStatus] {
    match current {
        AppointmentStatus::Pending => &[
            AppointmentStatus::Approved,
            AppointmentStatus::Rejected,
            AppointmentStatus::Cancelled,
        ],
        AppointmentStatus::Approved => &[
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ],
        AppointmentStatus::Rejected
        | AppointmentStatus::Completed
        | AppointmentStatus::Cancelled => &[],
    }
}

pub fn is_terminal(status: AppointmentStatus) -> bool {
    valid_transitions(status).is_empty()
}

pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Every status that may move to `target`; the precondition of a conditional write.
pub fn sources_for(target: AppointmentStatus) -> Vec<AppointmentStatus> {
    AppointmentStatus::ALL
        .into_iter()
        .filter(|from| can_transition(*from, target))
        .collect()
}

pub fn validate_transition(from: AppointmentStatus, to: AppointmentStatus) -> Result<(), AppointmentError> {
    if can_transition(from, to) {
        debug!("Status transition validated: {} -> {}", from, to);
        Ok(())
    } else {
        warn!("Invalid status transition attempted: {} -> {}", from, to);
        Err(AppointmentError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use AppointmentStatus::*;

    #[test]
    fn test_transition_table() {
        assert!(can_transition(Pending, Approved));
        assert!(can_transition(Pending, Rejected));
        assert!(can_transition(Pending, Cancelled));
        assert!(can_transition(Approved, Completed));
        assert!(can_transition(Approved, Cancelled));

        assert!(!can_transition(Pending, Completed));
        assert!(!can_transition(Approved, Rejected));
        assert!(!can_transition(Rejected, Approved));
        assert!(!can_transition(Approved, Approved));
    }

    #[test]
    fn test_terminal_states() {
        for status in [Rejected, Completed, Cancelled] {
            assert!(is_terminal(status));
            for target in AppointmentStatus::ALL {
                assert_matches!(
                    validate_transition(status, target),
                    Err(AppointmentError::InvalidTransition { .. })
                );
            }
        }
        assert!(!is_terminal(Pending));
        assert!(!is_terminal(Approved));
    }

    #[test]
    fn test_sources_for_target() {
        assert_eq!(sources_for(Approved), vec![Pending]);
        assert_eq!(sources_for(Cancelled), vec![Pending, Approved]);
        assert_eq!(sources_for(Completed), vec![Approved]);
        assert!(sources_for(Pending).is_empty());
    }
}
