use bytes::Bytes;
use std::collections::BTreeMap;

/// Content type attached to every message.
pub const CONTENT_TYPE: &str = "application/json";

/// Application property carrying the priority label.
pub const PRIORITY_PROPERTY: &str = "Priority";

/// A message ready to be published. Built once and sent unchanged on every repetition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub body: Bytes,

    pub content_type: &'static str,

    /// User defined key-value pairs delivered alongside the body.
    pub properties: BTreeMap<String, String>,
}

impl Message {
    /// Build a message; a priority of 0 means no priority property.
    pub fn new(body: Bytes, priority: i64) -> Self {
        let mut properties = BTreeMap::new();
        if priority != 0 {
            properties.insert(PRIORITY_PROPERTY.to_string(), format!("P{priority}"));
        }
        Self {
            body,
            content_type: CONTENT_TYPE,
            properties,
        }
    }
}
