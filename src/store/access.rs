use anyhow::{anyhow, bail, Result};
use log::warn;

use crate::models::{Role, User};

use super::WorkshopSnapshot;

/// The staff member on whose behalf a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

pub fn resolve_actor(snapshot: &WorkshopSnapshot, user_id: &str) -> Result<Actor> {
    snapshot
        .user(user_id)
        .map(Actor::from)
        .ok_or_else(|| anyhow!("unknown user {user_id}"))
}

/// Resolves `user_id` and checks it may use the administrative surface.
pub fn resolve_admin(snapshot: &WorkshopSnapshot, user_id: &str) -> Result<Actor> {
    let actor = resolve_actor(snapshot, user_id)?;
    if !actor.role.can_administer() {
        warn!("User {} tried an administrative action", actor.id);
        bail!("not permitted");
    }
    Ok(actor)
}

/// Looks up the target mechanic of an administrative action.
pub fn resolve_mechanic(snapshot: &WorkshopSnapshot, mechanic_id: &str) -> Result<Actor> {
    resolve_actor(snapshot, mechanic_id)
}
