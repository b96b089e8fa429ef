//! Caller / phone-call domain model.
//!
//! # Responsibility
//! - Define the two records persisted by core: `Caller` and `PhoneCall`.
//! - Own field-level validation shared by repository and context write paths.
//!
//! # Invariants
//! - Identity (`id`) is assigned by storage, never by callers of the API.
//! - A `Caller` owns its calls; a `PhoneCall` only keeps a back-reference.

pub mod caller;
pub mod phone_call;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Field-level validation failure for domain records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// `Caller::name` is empty or whitespace only.
    EmptyCallerName,
    /// `PhoneCall::phone_number` is empty or whitespace only.
    EmptyPhoneNumber,
    /// Topic at the given position is empty or whitespace only.
    BlankTopic(usize),
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCallerName => write!(f, "caller name must not be empty"),
            Self::EmptyPhoneNumber => write!(f, "phone number must not be empty"),
            Self::BlankTopic(index) => write!(f, "topic at index {index} is blank"),
        }
    }
}

impl Error for ModelValidationError {}
