use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapter::Created;

/// Logical storage responsibility, independent of the engine that fulfils it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendRole {
    Vector,
    Graph,
    Relational,
    File,
}

impl BackendRole {
    pub const ALL: [Self; 4] = [Self::Vector, Self::Graph, Self::Relational, Self::File];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Graph => "graph",
            Self::Relational => "relational",
            Self::File => "file",
        }
    }
}

impl fmt::Display for BackendRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backend role '{0}' (expected vector, graph, relational or file)")]
pub struct UnknownRole(pub String);

impl FromStr for BackendRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vector" => Ok(Self::Vector),
            "graph" => Ok(Self::Graph),
            "relational" => Ok(Self::Relational),
            "file" => Ok(Self::File),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
}

impl OperationKind {
    pub const ALL: [Self; 4] = [Self::Create, Self::Read, Self::Update, Self::Delete];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier under which a compensation is registered, e.g. `relational-create`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompensationKey(String);

impl CompensationKey {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn for_operation(role: BackendRole, kind: OperationKind) -> Self {
        Self(format!("{role}-{kind}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompensationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record handed to a backend adapter.
///
/// `id` is the caller's natural key. When absent the adapter assigns one and
/// reports it back, which is what makes create compensations possible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub body: Value,
}

impl Document {
    #[must_use]
    pub fn new(body: Value) -> Self {
        Self { id: None, body }
    }

    #[must_use]
    pub fn with_id(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: Some(id.into()),
            body,
        }
    }
}

/// What a forward step captured for its own compensation.
///
/// Every field a compensation needs must be present here; compensations never
/// look at sibling steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Backend-assigned (or caller-supplied) identifier of the touched record.
    pub record_id: Option<String>,
    /// Record body as it was before the forward action overwrote or removed it.
    pub previous: Option<Value>,
    /// Data returned by the forward action (read steps).
    pub data: Option<Value>,
    /// A create step found the record already in place and wrote nothing, so
    /// there is nothing of its own to undo.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub preexisting: bool,
}

impl StepResult {
    #[must_use]
    pub fn created(record_id: impl Into<String>) -> Self {
        Self {
            record_id: Some(record_id.into()),
            ..Self::default()
        }
    }

    /// A create that matched an existing identical record.
    #[must_use]
    pub fn already_present(record_id: impl Into<String>) -> Self {
        Self {
            record_id: Some(record_id.into()),
            preexisting: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn replaced(record_id: impl Into<String>, previous: Value) -> Self {
        Self {
            record_id: Some(record_id.into()),
            previous: Some(previous),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn read(record_id: impl Into<String>, data: Value) -> Self {
        Self {
            record_id: Some(record_id.into()),
            data: Some(data),
            ..Self::default()
        }
    }
}

impl From<Created> for StepResult {
    fn from(created: Created) -> Self {
        match created {
            Created::Written(id) => Self::created(id),
            Created::AlreadyPresent(id) => Self::already_present(id),
        }
    }
}
