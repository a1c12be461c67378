//! Directory of user profiles seen by the API, used to resolve document
//! owners for display. Account storage itself lives behind the auth
//! boundary; this only remembers profiles of authenticated actors.

use crate::model::{Actor, UserId};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl UserProfile {
    /// Placeholder profile for owners the directory has never seen.
    pub fn unknown(id: UserId) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
        }
    }
}

#[derive(Default)]
pub struct UserDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&self, actor: &Actor) {
        let profile = UserProfile {
            id: actor.id.clone(),
            name: actor.name.clone(),
            email: actor.email.clone(),
        };
        self.users.write().insert(actor.id.clone(), profile);
    }

    pub fn lookup(&self, id: &UserId) -> Option<UserProfile> {
        self.users.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Actor, Role};

    #[test]
    fn remembers_and_resolves_actors() {
        let dir = UserDirectory::new();
        let actor = Actor {
            id: UserId::from("u1"),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            role: Role::User,
        };
        assert!(dir.lookup(&actor.id).is_none());
        dir.remember(&actor);
        let profile = dir.lookup(&actor.id).unwrap();
        assert_eq!(profile.name, "Alice");
        assert_eq!(profile.email, "alice@example.com");
    }
}
