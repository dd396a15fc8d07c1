//! Property-based tests for the report lifecycle.

use proptest::prelude::*;

use crate::error::{ActivityError, ErrorKind};
use crate::report::lifecycle::ReportLifecycle;
use crate::report::types::{LifecycleTransition, ReportStatus};

fn arb_status() -> impl Strategy<Value = ReportStatus> {
    prop_oneof![
        Just(ReportStatus::Draft),
        Just(ReportStatus::Submitted),
        Just(ReportStatus::Locked),
    ]
}

/// Known status names mixed with arbitrary words.
fn arb_requested() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("draft".to_string()),
        Just("submitted".to_string()),
        Just("locked".to_string()),
        "[a-z]{1,12}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// No update ever leads back to draft.
    #[test]
    fn prop_no_path_back_to_draft(status in arb_status(), requested in arb_requested()) {
        if let Ok(Some(transition)) = ReportLifecycle::plan_update(status, Some(&requested)) {
            prop_assert_ne!(transition.target(), ReportStatus::Draft);
            prop_assert!(ReportLifecycle::is_valid_transition(status, transition.target()));
        }
    }

    /// Every planned transition is a single forward step.
    #[test]
    fn prop_planned_transitions_are_single_steps(status in arb_status(), requested in arb_requested()) {
        match ReportLifecycle::plan_update(status, Some(&requested)) {
            Ok(Some(LifecycleTransition::Submit)) => prop_assert_eq!(status, ReportStatus::Draft),
            Ok(Some(LifecycleTransition::Lock)) => prop_assert_eq!(status, ReportStatus::Submitted),
            Ok(None) => prop_assert!(false, "a requested status always yields a decision"),
            Err(_) => {}
        }
    }

    /// Locked reports reject every update with a conflict.
    #[test]
    fn prop_locked_is_terminal(requested in proptest::option::of(arb_requested())) {
        let result = ReportLifecycle::plan_update(ReportStatus::Locked, requested.as_deref());
        prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::Conflict);
        prop_assert_eq!(ReportLifecycle::lock(ReportStatus::Locked).unwrap_err().kind(), ErrorKind::Conflict);
    }

    /// Submit only succeeds from draft with at least one entry.
    #[test]
    fn prop_submit_guard(status in arb_status(), active in 0_usize..50) {
        let result = ReportLifecycle::submit(status, active);
        match (status, active) {
            (ReportStatus::Draft, 0) => {
                prop_assert!(matches!(result, Err(ActivityError::InvalidPayload(_))));
            }
            (ReportStatus::Draft, _) => prop_assert_eq!(result.unwrap(), ReportStatus::Submitted),
            _ => prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::Conflict),
        }
    }

    /// Unknown status names are invalid transitions, never conflicts, outside locked.
    #[test]
    fn prop_unknown_status_is_invalid_transition(
        status in prop_oneof![Just(ReportStatus::Draft), Just(ReportStatus::Submitted)],
        word in "[a-z]{1,12}",
    ) {
        prop_assume!(ReportStatus::parse(&word).is_none());
        let err = ReportLifecycle::plan_update(status, Some(&word)).unwrap_err();
        prop_assert!(
            matches!(err, ActivityError::InvalidTransition { .. }),
            "unexpected error: {err:?}"
        );
    }
}
