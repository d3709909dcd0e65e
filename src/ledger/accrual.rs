use chrono::{DateTime, Utc};
use log::debug;

use crate::models::{SettlementRecord, User};

use super::SettlementArchive;

/// Adds a finished service's tax to the mechanic's pending balance.
///
/// Returns the new user list, or `None` when the mechanic is unknown or the
/// tax would not increase the balance.
pub fn accrue(users: &[User], mechanic_id: &str, tax: f64) -> Option<Vec<User>> {
    if !tax.is_finite() || tax <= 0.0 {
        debug!("Ignoring non-positive tax {tax} for mechanic {mechanic_id}");
        return None;
    }

    let index = users.iter().position(|user| user.id == mechanic_id)?;
    let mut next = users.to_vec();
    next[index].pending_tax += tax;
    Some(next)
}

/// Who is settling, as written into the archive entry.
#[derive(Debug, Clone)]
pub struct Settler<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

/// Zeroes a mechanic's balance and produces the matching archive entry.
///
/// Both collections come back together or not at all, so a balance is never
/// cleared without its record. A zero balance settles nothing.
pub fn settle(
    users: &[User],
    archive: &SettlementArchive,
    mechanic_id: &str,
    settlement_id: String,
    settler: &Settler<'_>,
    now: DateTime<Utc>,
) -> Option<(Vec<User>, SettlementArchive)> {
    let index = users.iter().position(|user| user.id == mechanic_id)?;
    let mechanic = &users[index];
    if !mechanic.can_settle() {
        debug!("Mechanic {mechanic_id} has no pending tax to settle");
        return None;
    }

    let record = SettlementRecord {
        id: settlement_id,
        mechanic_id: mechanic.id.clone(),
        mechanic_name: mechanic.name.clone(),
        amount: mechanic.pending_tax,
        settled_by_id: settler.id.to_string(),
        settled_by_name: settler.name.to_string(),
        timestamp: now,
    };

    let mut next_users = users.to_vec();
    next_users[index].pending_tax = 0.0;
    Some((next_users, archive.appended(record)))
}
