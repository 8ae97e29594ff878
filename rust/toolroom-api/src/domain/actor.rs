//! Principal identity threaded through every mutating call.
//!
//! Mutations always carry an explicit [`Actor`] rather than defaulting to a
//! hardcoded sentinel, so downstream audit sinks can attribute changes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of principal performed an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// The scheduler itself (periodic scan, eager rescheduling).
    System,
    /// A human operator acting through the surrounding application.
    User,
}

/// The principal performing a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id when the actor is a person; `None` for the system actor.
    pub id: Option<Uuid>,
    /// Display name for logs and events.
    pub name: String,
    /// Principal kind.
    pub kind: ActorKind,
}

impl Actor {
    /// The scheduler acting on its own behalf (daily scan, eager reschedule).
    #[must_use]
    pub fn system() -> Self {
        Self {
            id: None,
            name: "scheduler".to_string(),
            kind: ActorKind::System,
        }
    }

    /// A human operator.
    #[must_use]
    pub fn user(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            kind: ActorKind::User,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ActorKind::System => write!(f, "system:{}", self.name),
            ActorKind::User => write!(f, "user:{}", self.name),
        }
    }
}
