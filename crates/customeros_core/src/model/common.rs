//! Sub-records shared by several domain kinds.

use serde::{Deserialize, Serialize};

/// Server-side bookkeeping attached to most records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub id: String,
    pub created: Option<String>,
    pub last_updated: Option<String>,
    pub source: Option<String>,
}

/// Id-only metadata of a referenced record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefMetadata {
    pub id: String,
}

/// Reference to a record living in another collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityRef {
    pub metadata: RefMetadata,
    /// Display name copied by the server for list rendering.
    pub name: Option<String>,
}

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            metadata: RefMetadata { id: id.into() },
            name: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

/// Tenant user, used as record owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Social {
    pub id: String,
    pub url: String,
    pub followers_count: Option<i64>,
}
