//! Phone call record.
//!
//! # Invariants
//! - `phone_number` is non-empty after trimming.
//! - Topics are free-text labels with set semantics: blank values are
//!   rejected, duplicates collapse to their first occurrence.
//! - `caller_id` is a back-reference populated by storage; a call never owns
//!   its caller.

use super::caller::CallerId;
use super::ModelValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// Storage-assigned phone call identity.
pub type PhoneCallId = i64;

/// One phone call with optional topic labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneCall {
    /// `None` until the call has been saved.
    pub id: Option<PhoneCallId>,
    /// Unix epoch milliseconds (UTC).
    pub call_time: i64,
    pub phone_number: String,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Owning caller, if any.
    #[serde(default)]
    pub caller_id: Option<CallerId>,
}

impl PhoneCall {
    /// Creates an unsaved call at `call_time` epoch milliseconds.
    pub fn new(phone_number: impl Into<String>, call_time: i64) -> Self {
        Self {
            id: None,
            call_time,
            phone_number: phone_number.into(),
            topics: Vec::new(),
            caller_id: None,
        }
    }

    /// Creates an unsaved call stamped with the current time.
    pub fn now(phone_number: impl Into<String>) -> Self {
        Self::new(phone_number, now_epoch_ms())
    }

    /// Replaces the topic list.
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.phone_number.trim().is_empty() {
            return Err(ModelValidationError::EmptyPhoneNumber);
        }
        if let Some(index) = self.topics.iter().position(|topic| topic.trim().is_empty()) {
            return Err(ModelValidationError::BlankTopic(index));
        }
        Ok(())
    }

    /// Returns trimmed topics with duplicates removed, first occurrence wins.
    pub fn normalized_topics(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.topics
            .iter()
            .map(|topic| topic.trim())
            .filter(|topic| !topic.is_empty())
            .filter(|topic| seen.insert(*topic))
            .map(str::to_string)
            .collect()
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.iter().any(|value| value == topic)
    }
}

/// Current UTC time in epoch milliseconds. Clamps to 0 for pre-epoch clocks.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{now_epoch_ms, PhoneCall};
    use crate::model::ModelValidationError;

    #[test]
    fn normalized_topics_trims_and_deduplicates() {
        let call = PhoneCall::new("123-456-7890", 0).with_topics([
            " Support ",
            "Billing",
            "Support",
        ]);
        assert_eq!(
            call.normalized_topics(),
            vec!["Support".to_string(), "Billing".to_string()]
        );
    }

    #[test]
    fn validate_rejects_blank_topic_with_position() {
        let call = PhoneCall::new("123-456-7890", 0).with_topics(["Support", "  "]);
        assert_eq!(
            call.validate().unwrap_err(),
            ModelValidationError::BlankTopic(1)
        );
    }

    #[test]
    fn validate_rejects_empty_phone_number() {
        let call = PhoneCall::new(" ", 0);
        assert_eq!(
            call.validate().unwrap_err(),
            ModelValidationError::EmptyPhoneNumber
        );
    }

    #[test]
    fn now_is_after_2020() {
        assert!(now_epoch_ms() > 1_577_836_800_000);
    }

    #[test]
    fn serialization_uses_snake_case_fields() {
        let call = PhoneCall::new("987-654-3210", 1_700_000_000_000).with_topics(["Billing"]);
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["phone_number"], "987-654-3210");
        assert_eq!(json["call_time"], 1_700_000_000_000_i64);
        assert_eq!(json["topics"][0], "Billing");
        assert!(json["id"].is_null());
        assert!(json["caller_id"].is_null());
    }
}
