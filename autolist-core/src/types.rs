//! Domain types for auto-updated project lists.
//!
//! All types are serializable/deserializable via serde + serde_yaml so the
//! YAML-backed collaborators can persist them unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a project list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListId(pub String);

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl ListId {
    /// Reject ids that would escape the store directory when used as a
    /// file stem.
    pub fn validate(&self) -> Result<(), StoreError> {
        let reason = if self.0.is_empty() {
            "must not be empty"
        } else if self.0 == "." || self.0 == ".." {
            "must not be a relative path component"
        } else if self.0.contains(['/', '\\']) {
            "must not contain path separators"
        } else if self.0.contains('\0') {
            "must not contain NUL"
        } else {
            return Ok(());
        };
        Err(StoreError::InvalidListId {
            id: self.0.clone(),
            reason,
        })
    }
}

/// Parses and validates; use `From<&str>` to skip validation.
impl FromStr for ListId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Self::from(s);
        id.validate()?;
        Ok(id)
    }
}

impl From<String> for ListId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ListId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identity of a list member (a project).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberKey(pub String);

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for MemberKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MemberKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A strongly-typed identifier for a caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PrincipalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// The identity a rebuild or incremental update runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }
}

/// A list whose membership is derived from a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectList {
    pub id: ListId,
    pub name: String,
    /// Incremental updates run under this principal.
    pub author: Principal,
    pub created_at: DateTime<Utc>,
}

impl ProjectList {
    pub fn new(id: impl Into<ListId>, name: impl Into<String>, author: Principal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            author,
            created_at: Utc::now(),
        }
    }
}

/// One materialized member of a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub list: ListId,
    pub member: MemberKey,
    /// Display hint. `None` asks the store to append after existing items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
}

impl ListItem {
    pub fn new(list: ListId, member: MemberKey, position: Option<u64>) -> Self {
        Self {
            list,
            member,
            position,
        }
    }
}

/// Session established for one collaborator-facing unit of work.
///
/// Passed explicitly into every collaborator call; there is no ambient,
/// process-wide identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub principal: Principal,
    pub session: String,
    pub established_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
