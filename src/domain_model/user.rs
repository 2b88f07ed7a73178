use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Signed-in user as reported by the profile endpoint.
///
/// Only `email` and `role` are interpreted; every other field is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}
