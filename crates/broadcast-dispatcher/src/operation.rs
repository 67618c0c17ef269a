//! Operation and confirmation types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One blockchain operation in `[name, body]` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation(pub String, pub Value);

impl Operation {
    pub fn new(kind: impl Into<String>, body: Value) -> Self {
        Self(kind.into(), body)
    }

    /// Operation name, e.g. `comment`.
    pub fn kind(&self) -> &str {
        &self.0
    }

    pub fn body(&self) -> &Value {
        &self.1
    }
}

/// Transaction confirmation returned by every signer backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxConfirmation {
    /// Transaction id.
    pub id: String,
    #[serde(default)]
    pub block_num: u64,
    #[serde(default)]
    pub trx_num: u32,
    #[serde(default)]
    pub expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_wire_shape() {
        let op = Operation::new("vote", json!({ "voter": "alice", "weight": 10000 }));
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!(["vote", { "voter": "alice", "weight": 10000 }])
        );
        assert_eq!(op.kind(), "vote");
    }

    #[test]
    fn test_confirmation_tolerates_missing_fields() {
        let tx: TxConfirmation = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert_eq!(tx.id, "abc");
        assert_eq!(tx.block_num, 0);
        assert!(!tx.expired);
    }
}
