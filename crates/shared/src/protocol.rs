use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Successful reply of the frame action endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReceived {
    pub ok: bool,
    pub received: Value,
}

impl ActionReceived {
    pub fn new(received: Value) -> Self {
        Self { ok: true, received }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailed {
    pub ok: bool,
    pub error: String,
}

impl ActionFailed {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}
