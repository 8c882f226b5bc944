//! Rider directory backing the register-user boundary operation.

use crate::clock::Clock;
use crate::error::{DispatchError, DispatchResult, EntityKind};
use crate::models::{User, UserId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default)]
struct UserTable {
    next_id: UserId,
    users: BTreeMap<UserId, User>,
    by_contact: HashMap<String, UserId>,
}

pub struct UserDirectory {
    table: RwLock<UserTable>,
    clock: Arc<dyn Clock>,
}

impl UserDirectory {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            table: RwLock::new(UserTable {
                next_id: 1,
                ..UserTable::default()
            }),
            clock,
        }
    }

    /// Register a rider, idempotent on `contact`
    pub fn register(&self, name: &str, contact: &str) -> DispatchResult<UserId> {
        if contact.trim().is_empty() {
            return Err(DispatchError::Validation(
                "user contact must not be empty".to_string(),
            ));
        }

        let mut table = self.table.write();
        if let Some(existing) = table.by_contact.get(contact) {
            return Ok(*existing);
        }

        let user_id = table.next_id;
        table.next_id += 1;
        table.by_contact.insert(contact.to_string(), user_id);
        table.users.insert(
            user_id,
            User {
                user_id,
                name: name.to_string(),
                contact: contact.to_string(),
                created_at: self.clock.now(),
            },
        );

        info!(user_id, "👤 USER: registered");
        Ok(user_id)
    }

    pub fn get(&self, user_id: UserId) -> DispatchResult<User> {
        self.table
            .read()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| DispatchError::not_found(EntityKind::User, user_id))
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.table.read().users.contains_key(&user_id)
    }
}
