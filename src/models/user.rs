use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Manager,
    Mechanic,
}

impl Role {
    /// Owners and managers drive other people's shifts and settle tax.
    pub fn can_administer(&self) -> bool {
        matches!(self, Role::Owner | Role::Manager)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Mechanic
    }
}

/// Staff member of a workshop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    /// Tax owed since the last settlement.
    #[serde(default)]
    pub pending_tax: f64,
}

impl User {
    pub fn can_settle(&self) -> bool {
        self.pending_tax > 0.0
    }
}
