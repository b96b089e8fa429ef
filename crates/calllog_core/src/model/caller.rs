//! Caller record.
//!
//! # Invariants
//! - `name` is non-empty after trimming.
//! - Every owned call satisfies `PhoneCall::validate()`.
//! - `phone_calls` keeps insertion order; storage reads return them by id.

use super::phone_call::PhoneCall;
use super::ModelValidationError;
use serde::{Deserialize, Serialize};

/// Storage-assigned caller identity.
pub type CallerId = i64;

/// A person placing phone calls. Owns zero or more `PhoneCall` records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// `None` until the caller has been saved.
    pub id: Option<CallerId>,
    pub name: String,
    /// Calls saved together with this caller.
    #[serde(default)]
    pub phone_calls: Vec<PhoneCall>,
}

impl Caller {
    /// Creates an unsaved caller without calls.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            phone_calls: Vec::new(),
        }
    }

    /// Creates an unsaved caller owning `calls`.
    pub fn with_calls(name: impl Into<String>, calls: Vec<PhoneCall>) -> Self {
        Self {
            id: None,
            name: name.into(),
            phone_calls: calls,
        }
    }

    /// Validates the caller and every owned call.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.name.trim().is_empty() {
            return Err(ModelValidationError::EmptyCallerName);
        }
        for call in &self.phone_calls {
            call.validate()?;
        }
        Ok(())
    }

    pub fn is_saved(&self) -> bool {
        self.id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::Caller;
    use crate::model::phone_call::PhoneCall;
    use crate::model::ModelValidationError;

    #[test]
    fn new_caller_is_unsaved_and_empty() {
        let caller = Caller::new("John Doe");
        assert_eq!(caller.id, None);
        assert!(caller.phone_calls.is_empty());
        assert!(!caller.is_saved());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let caller = Caller::new("   ");
        assert_eq!(
            caller.validate().unwrap_err(),
            ModelValidationError::EmptyCallerName
        );
    }

    #[test]
    fn validate_propagates_call_errors() {
        let caller = Caller::with_calls("John Doe", vec![PhoneCall::new("", 0)]);
        assert_eq!(
            caller.validate().unwrap_err(),
            ModelValidationError::EmptyPhoneNumber
        );
    }
}
