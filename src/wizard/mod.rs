//! Client-side booking wizard.
//!
//! [`step`] holds the pure transition table; [`session`] drives one renter
//! through it against a [`ReservationApi`](crate::application::reservation::ReservationApi).

pub mod session;
pub mod step;

use crate::error::ReservationError;
use step::{WizardEvent, WizardStep};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WizardError {
    #[error("{event:?} is not allowed at step {step}")]
    IllegalTransition { step: WizardStep, event: WizardEvent },
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Service(#[from] ReservationError),
}
