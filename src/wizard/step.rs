//! Wizard steps and the transition table between them.
//!
//! Rendering is not modelled here; [`WizardStep::title`] only supplies the
//! heading a front end would show.

use crate::domain::booking::MIN_STAY_MONTHS;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    UserType,
    Details,
    Duration,
    NotEligible,
    TokenConfirm,
    DropSchedule,
    DropConfirmed,
    Processing,
    Success,
    Failed,
}

/// Inputs that move the wizard between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardEvent {
    CategoryChosen,
    DetailsEntered,
    DurationChosen { months: u8 },
    ChangeDuration,
    TokenAccepted,
    DropScheduled,
    Pay,
    PaymentVerified,
    PaymentFailed,
    Retry,
    Back,
}

impl WizardStep {
    pub fn title(self) -> &'static str {
        match self {
            WizardStep::UserType => "Tell us about yourself",
            WizardStep::Details => "Your details",
            WizardStep::Duration => "How long do you plan to stay?",
            WizardStep::NotEligible => "Minimum Stay Required",
            WizardStep::TokenConfirm => "Lock this room",
            WizardStep::DropSchedule => "Schedule your visit",
            WizardStep::DropConfirmed => "Visit scheduled",
            WizardStep::Processing => "Processing payment",
            WizardStep::Success => "Room Locked",
            WizardStep::Failed => "Payment failed",
        }
    }

    /// The step `Back` returns to. Nothing goes back once payment has started.
    pub fn previous(self) -> Option<WizardStep> {
        match self {
            WizardStep::Details => Some(WizardStep::UserType),
            WizardStep::Duration => Some(WizardStep::Details),
            WizardStep::NotEligible | WizardStep::TokenConfirm => Some(WizardStep::Duration),
            WizardStep::DropSchedule => Some(WizardStep::TokenConfirm),
            WizardStep::DropConfirmed => Some(WizardStep::DropSchedule),
            WizardStep::UserType
            | WizardStep::Processing
            | WizardStep::Success
            | WizardStep::Failed => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WizardStep::UserType => "user-type",
            WizardStep::Details => "details",
            WizardStep::Duration => "duration",
            WizardStep::NotEligible => "not-eligible",
            WizardStep::TokenConfirm => "token-confirm",
            WizardStep::DropSchedule => "drop-schedule",
            WizardStep::DropConfirmed => "drop-confirmed",
            WizardStep::Processing => "processing",
            WizardStep::Success => "success",
            WizardStep::Failed => "failed",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the step reached from `step` on `event`, or `None` when the event
/// is not legal there.
pub fn transition(step: WizardStep, event: WizardEvent) -> Option<WizardStep> {
    use WizardEvent as E;
    use WizardStep as S;

    match (step, event) {
        (_, E::Back) => step.previous(),
        (S::UserType, E::CategoryChosen) => Some(S::Details),
        (S::Details, E::DetailsEntered) => Some(S::Duration),
        (S::Duration, E::DurationChosen { months }) if months >= MIN_STAY_MONTHS => {
            Some(S::TokenConfirm)
        }
        (S::Duration, E::DurationChosen { .. }) => Some(S::NotEligible),
        (S::NotEligible, E::ChangeDuration) => Some(S::Duration),
        (S::TokenConfirm, E::TokenAccepted) => Some(S::DropSchedule),
        (S::DropSchedule, E::DropScheduled) => Some(S::DropConfirmed),
        (S::DropConfirmed, E::Pay) | (S::Failed, E::Retry) => Some(S::Processing),
        (S::Processing, E::PaymentVerified) => Some(S::Success),
        (S::Processing, E::PaymentFailed) => Some(S::Failed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let events = [
            WizardEvent::CategoryChosen,
            WizardEvent::DetailsEntered,
            WizardEvent::DurationChosen { months: 6 },
            WizardEvent::TokenAccepted,
            WizardEvent::DropScheduled,
            WizardEvent::Pay,
            WizardEvent::PaymentVerified,
        ];
        let last = events
            .into_iter()
            .try_fold(WizardStep::UserType, transition)
            .unwrap();
        assert_eq!(last, WizardStep::Success);
    }

    #[test]
    fn test_minimum_stay_gate() {
        for months in [1, 3, 5] {
            assert_eq!(
                transition(WizardStep::Duration, WizardEvent::DurationChosen { months }),
                Some(WizardStep::NotEligible)
            );
        }
        for months in [6, 9, 12] {
            assert_eq!(
                transition(WizardStep::Duration, WizardEvent::DurationChosen { months }),
                Some(WizardStep::TokenConfirm)
            );
        }
        assert_eq!(
            transition(WizardStep::NotEligible, WizardEvent::ChangeDuration),
            Some(WizardStep::Duration)
        );
    }

    #[test]
    fn test_back_stops_at_processing() {
        assert_eq!(
            transition(WizardStep::DropConfirmed, WizardEvent::Back),
            Some(WizardStep::DropSchedule)
        );
        assert_eq!(transition(WizardStep::UserType, WizardEvent::Back), None);
        assert_eq!(transition(WizardStep::Processing, WizardEvent::Back), None);
        assert_eq!(transition(WizardStep::Failed, WizardEvent::Back), None);
    }

    #[test]
    fn test_failed_only_retries_into_processing() {
        assert_eq!(
            transition(WizardStep::Failed, WizardEvent::Retry),
            Some(WizardStep::Processing)
        );
        assert_eq!(transition(WizardStep::Failed, WizardEvent::Pay), None);
        assert_eq!(transition(WizardStep::Success, WizardEvent::Retry), None);
        assert_eq!(transition(WizardStep::TokenConfirm, WizardEvent::Pay), None);
    }

    #[test]
    fn test_kebab_case_names() {
        assert_eq!(
            serde_json::to_string(&WizardStep::DropConfirmed).unwrap(),
            "\"drop-confirmed\""
        );
        assert_eq!(WizardStep::NotEligible.to_string(), "not-eligible");
    }
}
