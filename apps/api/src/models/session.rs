use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{FieldError, Validate};

/// Survey configuration supplied by a founder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FounderInputs {
    pub idea_summary: String,
    pub target_user: String,
    /// Must hold at least one entry.
    pub problems: Vec<String>,
    #[serde(default)]
    pub value_prop: Option<String>,
    #[serde(default)]
    pub target_action: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionCreate {
    pub founder_inputs: FounderInputs,
}

impl Validate for SessionCreate {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        if self.founder_inputs.problems.is_empty() {
            return Err(vec![FieldError::new(
                "body.founder_inputs.problems",
                "List should have at least 1 item after validation, not 0",
            )]);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCreateResponse {
    pub session_id: Uuid,
}

/// On-disk shape of `sessions/*.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub founder_inputs: FounderInputs,
    pub created_at_utc: String,
    pub version: String,
}
