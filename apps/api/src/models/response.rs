use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::validation::{FieldError, Validate};

/// One respondent's answers for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    /// Interview/session id.
    pub session_id: String,
    /// Unique respondent id (or email hash).
    pub respondent_id: String,
    /// Arbitrary answer map.
    pub answers: Map<String, Value>,
    #[serde(default)]
    pub meta: Option<Map<String, Value>>,
}

// Field shapes are enforced by deserialization; nothing further to check.
impl Validate for ResponsePayload {
    fn validate(&self) -> Result<(), Vec<FieldError>> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseAck {
    pub ok: bool,
    pub hash: String,
    pub file: String,
}

/// On-disk shape of `responses/*.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub received_at_utc: String,
    pub hash_sha256: String,
    pub payload: ResponsePayload,
    pub version: String,
}
