//! src/session/mod.rs
//!
//! Edit lifecycle of one entity at a time:
//!
//! ```text
//! Viewing --begin_edit--> Editing --begin_save--> Saving --finish_save(ok)--> Viewing
//!                           |  ^                     |
//!                           |  +--finish_save(err)---+
//!                           +--cancel--> Viewing
//! Viewing --request_destroy--> ConfirmPending --confirm--> Destroying --finish_destroy--> Viewing
//!                                    +--decline--> Viewing
//! ```
//!
//! Field changes only touch the scratch buffer; the mirror is not involved
//! until a save is issued, so cancelling never needs to undo anything.

use std::fmt;

use serde_json::Value;

use ottonrent_common::Error;
use ottonrent_common::traits::Entity;

/// A change that needs explicit confirmation before it is sent.
#[derive(Debug, Clone, PartialEq)]
pub enum DestructiveAction {
    /// Delete the entity.
    Remove,
    /// Delete one location below the entity.
    RemoveAt(Vec<String>),
    /// Overwrite the entity itself (empty `field`) or one location below it.
    SetAt { field: Vec<String>, value: Value },
    /// Drop `item` from the list at `field`. The remaining list is computed
    /// when the action is confirmed, not when it is requested.
    RemoveItem { field: Vec<String>, item: Value },
}

impl fmt::Display for DestructiveAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestructiveAction::Remove => write!(f, "delete"),
            DestructiveAction::RemoveAt(field) => write!(f, "delete {}", field.join("/")),
            DestructiveAction::SetAt { field, value } if field.is_empty() => write!(f, "set to {value}"),
            DestructiveAction::SetAt { field, value } => write!(f, "set {} to {}", field.join("/"), value),
            DestructiveAction::RemoveItem { field, item } => write!(f, "remove {} from {}", item, field.join("/")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditState<V> {
    Viewing,
    Editing {
        key: String,
        original: Option<V>,
        scratch: V,
    },
    Saving {
        key: String,
        original: Option<V>,
        scratch: V,
    },
    ConfirmPending {
        key: String,
        action: DestructiveAction,
    },
    Destroying {
        key: String,
        action: DestructiveAction,
    },
}

impl<V> EditState<V> {
    pub fn name(&self) -> &'static str {
        match self {
            EditState::Viewing => "viewing",
            EditState::Editing { .. } => "editing",
            EditState::Saving { .. } => "saving",
            EditState::ConfirmPending { .. } => "awaiting confirmation",
            EditState::Destroying { .. } => "destroying",
        }
    }
}

/// What `begin_save` hands to the caller to send.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest<V> {
    pub key: String,
    /// `None` for an entity that does not exist yet.
    pub original: Option<V>,
    pub value: V,
}

impl<V> SaveRequest<V> {
    pub fn is_new(&self) -> bool {
        self.original.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct EditSession<V> {
    state: EditState<V>,
}

impl<V> Default for EditSession<V> {
    fn default() -> Self {
        Self { state: EditState::Viewing }
    }
}

impl<V: Entity> EditSession<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState<V> {
        &self.state
    }

    pub fn is_viewing(&self) -> bool {
        matches!(self.state, EditState::Viewing)
    }

    /// Key of the entity currently in focus, whatever the state.
    pub fn focus(&self) -> Option<&str> {
        match &self.state {
            EditState::Viewing => None,
            EditState::Editing { key, .. }
            | EditState::Saving { key, .. }
            | EditState::ConfirmPending { key, .. }
            | EditState::Destroying { key, .. } => Some(key.as_str()),
        }
    }

    pub fn scratch(&self) -> Option<&V> {
        match &self.state {
            EditState::Editing { scratch, .. } | EditState::Saving { scratch, .. } => Some(scratch),
            _ => None,
        }
    }

    pub fn scratch_mut(&mut self) -> Result<&mut V, Error> {
        let state = self.state.name();
        match &mut self.state {
            EditState::Editing { scratch, .. } => Ok(scratch),
            _ => Err(Error::InvalidTransition { action: "change a field", state }),
        }
    }

    pub fn pending_confirmation(&self) -> Option<(&str, &DestructiveAction)> {
        match &self.state {
            EditState::ConfirmPending { key, action } => Some((key.as_str(), action)),
            _ => None,
        }
    }

    fn expect_viewing(&self, action: &'static str) -> Result<(), Error> {
        if self.is_viewing() {
            Ok(())
        } else {
            Err(Error::InvalidTransition { action, state: self.state.name() })
        }
    }

    /// Starts editing an existing entity; the scratch buffer starts as a copy.
    pub fn begin_edit(&mut self, key: &str, current: V) -> Result<(), Error> {
        self.expect_viewing("begin editing")?;
        self.state = EditState::Editing {
            key: key.to_string(),
            original: Some(current.clone()),
            scratch: current,
        };
        Ok(())
    }

    /// Starts editing an entity that does not exist yet.
    pub fn begin_create(&mut self, key: &str, initial: V) -> Result<(), Error> {
        self.expect_viewing("begin creating")?;
        self.state = EditState::Editing {
            key: key.to_string(),
            original: None,
            scratch: initial,
        };
        Ok(())
    }

    /// Drops the scratch buffer and returns it.
    pub fn cancel(&mut self) -> Result<V, Error> {
        match std::mem::replace(&mut self.state, EditState::Viewing) {
            EditState::Editing { scratch, .. } => Ok(scratch),
            other => {
                let state = other.name();
                self.state = other;
                Err(Error::InvalidTransition { action: "cancel", state })
            }
        }
    }

    /// Validates the scratch buffer and moves to `Saving`. On a validation
    /// failure the session stays in `Editing` with the buffer untouched.
    pub fn begin_save(&mut self) -> Result<SaveRequest<V>, Error> {
        match std::mem::replace(&mut self.state, EditState::Viewing) {
            EditState::Editing { key, original, scratch } => {
                if let Err(e) = scratch.validate() {
                    self.state = EditState::Editing { key, original, scratch };
                    return Err(e.into());
                }
                let request = SaveRequest {
                    key: key.clone(),
                    original: original.clone(),
                    value: scratch.clone(),
                };
                self.state = EditState::Saving { key, original, scratch };
                Ok(request)
            }
            other => {
                let state = other.name();
                self.state = other;
                Err(Error::InvalidTransition { action: "save", state })
            }
        }
    }

    /// Resolves a save. A failed write returns to `Editing` with the scratch
    /// buffer intact so nothing typed is lost.
    pub fn finish_save(&mut self, succeeded: bool) -> Result<(), Error> {
        match std::mem::replace(&mut self.state, EditState::Viewing) {
            EditState::Saving { key, original, scratch } => {
                if !succeeded {
                    self.state = EditState::Editing { key, original, scratch };
                }
                Ok(())
            }
            other => {
                let state = other.name();
                self.state = other;
                Err(Error::InvalidTransition { action: "finish saving", state })
            }
        }
    }

    pub fn request_destroy(&mut self, key: &str, action: DestructiveAction) -> Result<(), Error> {
        self.expect_viewing("request a destructive action")?;
        self.state = EditState::ConfirmPending {
            key: key.to_string(),
            action,
        };
        Ok(())
    }

    /// Accepts the pending destructive action and hands it out for execution.
    pub fn confirm(&mut self) -> Result<(String, DestructiveAction), Error> {
        match std::mem::replace(&mut self.state, EditState::Viewing) {
            EditState::ConfirmPending { key, action } => {
                self.state = EditState::Destroying {
                    key: key.clone(),
                    action: action.clone(),
                };
                Ok((key, action))
            }
            other => {
                let state = other.name();
                self.state = other;
                Err(Error::InvalidTransition { action: "confirm", state })
            }
        }
    }

    pub fn finish_destroy(&mut self) -> Result<(), Error> {
        match std::mem::replace(&mut self.state, EditState::Viewing) {
            EditState::Destroying { .. } => Ok(()),
            other => {
                let state = other.name();
                self.state = other;
                Err(Error::InvalidTransition { action: "finish destroying", state })
            }
        }
    }

    pub fn decline(&mut self) -> Result<(), Error> {
        match std::mem::replace(&mut self.state, EditState::Viewing) {
            EditState::ConfirmPending { .. } => Ok(()),
            other => {
                let state = other.name();
                self.state = other;
                Err(Error::InvalidTransition { action: "decline", state })
            }
        }
    }
}
