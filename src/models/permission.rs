//! Authorization rules.
//!
//! Every access decision in the server goes through [`authorize`], which maps
//! an (actor, resource, action) triple to allow / 401 / 403.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// The authenticated caller as carried by an access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i32,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Book,
    /// A borrowing owned by `owner_id`; `None` for the collection
    Borrowing { owner_id: Option<i32> },
    /// A user account; `None` for the collection
    User { user_id: Option<i32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Return,
}

fn unauthenticated() -> AppError {
    AppError::Authentication("Authentication credentials were not provided.".to_string())
}

fn forbidden() -> AppError {
    AppError::Authorization("You do not have permission to perform this action.".to_string())
}

/// Decide whether `actor` may perform `action` on `resource`
pub fn authorize(actor: Option<&Actor>, resource: Resource, action: Action) -> AppResult<()> {
    // The catalog is public for reading
    if resource == Resource::Book && action == Action::Read {
        return Ok(());
    }
    // Self-registration
    if resource == (Resource::User { user_id: None }) && action == Action::Create {
        return Ok(());
    }

    let actor = actor.ok_or_else(unauthenticated)?;
    if actor.is_admin() {
        return Ok(());
    }

    let allowed = match (resource, action) {
        (Resource::Book, _) => false,
        // Listing is scoped to the caller's own rows elsewhere
        (Resource::Borrowing { owner_id: None }, Action::Read | Action::Create) => true,
        (Resource::Borrowing { owner_id: Some(owner) }, Action::Read | Action::Return) => {
            owner == actor.user_id
        }
        (Resource::Borrowing { .. }, _) => false,
        (Resource::User { user_id: Some(id) }, Action::Read | Action::Update) => id == actor.user_id,
        (Resource::User { .. }, _) => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(forbidden())
    }
}
