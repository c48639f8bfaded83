//! The caller on whose behalf an operation runs.
//!
//! There is no ambient "current user": every operation that depends on who is
//! asking takes an [`Actor`] explicitly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns pets and requests bookings.
    Owner,
    /// Offers pet care and answers booking requests.
    Sitter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Sitter => "sitter",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "sitter" => Ok(Role::Sitter),
            other => Err(CoreError::validation(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn owner(id: impl Into<String>) -> Self {
        Self::new(id, Role::Owner)
    }

    pub fn sitter(id: impl Into<String>) -> Self {
        Self::new(id, Role::Sitter)
    }

    /// True when this actor is the owner identified by `owner_id`.
    pub fn is_owner(&self, owner_id: &str) -> bool {
        self.role == Role::Owner && self.id == owner_id
    }

    /// True when this actor is the sitter identified by `sitter_id`.
    pub fn is_sitter(&self, sitter_id: &str) -> bool {
        self.role == Role::Sitter && self.id == sitter_id
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.id)
    }
}

/// Parses `role:id`, e.g. `sitter:sam`.
impl FromStr for Actor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (role, id) = s
            .split_once(':')
            .ok_or_else(|| CoreError::validation(format!("actor must be role:id, got '{s}'")))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(CoreError::validation("actor id must not be empty"));
        }
        Ok(Actor::new(id, role.parse()?))
    }
}
