//! Session data types for the ListKeeper server.
//!
//! Everything a visitor owns lives in one [`SessionData`] value: the ordered
//! sequence of their lists and at most one pending flash message.

use serde::{Deserialize, Serialize};

/// A single item within a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub name: String,
    pub completed: bool,
}

impl Todo {
    /// Creates a new, not yet completed todo.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completed: false,
        }
    }
}

/// A named, ordered collection of todos.
///
/// `id` is unique within a session and never reused while the list it was
/// assigned to still exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: u64,
    pub name: String,
    pub todos: Vec<Todo>,
}

impl TodoList {
    /// Creates an empty list.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            todos: Vec::new(),
        }
    }
}

/// One-shot message displayed on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Flash {
    Success(String),
    Error(String),
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// The message text regardless of kind.
    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) | Self::Error(message) => message,
        }
    }
}

/// Per-session state: the visitor's lists plus a pending flash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub lists: Vec<TodoList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

impl SessionData {
    /// Removes and returns the pending flash, if any.
    pub fn take_flash(&mut self) -> Option<Flash> {
        self.flash.take()
    }

    /// Replaces any pending flash with `flash`.
    pub fn set_flash(&mut self, flash: Flash) {
        self.flash = Some(flash);
    }
}
