//! Workshop profile, settings and sync-status commands.

use crate::{
    models::{SettingsUpdate, WorkshopProfile},
    store::{resolve_admin, Action},
    sync::SyncStatus,
    AppState,
};

pub fn get_workshop(state: &AppState) -> WorkshopProfile {
    state.store.snapshot().workshop.as_ref().clone()
}

pub fn update_settings(
    state: &AppState,
    actor_id: &str,
    update: SettingsUpdate,
) -> Result<WorkshopProfile, String> {
    resolve_admin(&state.store.snapshot(), actor_id).map_err(|e| e.to_string())?;
    update.validate().map_err(|e| e.to_string())?;

    state.dispatch(&Action::UpdateSettings { update });
    Ok(get_workshop(state))
}

pub fn sync_status(state: &AppState) -> SyncStatus {
    state.sync.status()
}

/// Foreground/background switch from the client; hidden clients stop polling.
pub fn set_visible(state: &AppState, visible: bool) -> bool {
    state.sync.set_visible(visible);
    state.sync.is_visible()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Role, User},
        test_support::state_with_users,
    };

    fn staff() -> Vec<User> {
        vec![
            User {
                id: "boss".into(),
                name: "Benny".into(),
                role: Role::Owner,
                pending_tax: 0.0,
            },
            User {
                id: "m1".into(),
                name: "Rico".into(),
                role: Role::Mechanic,
                pending_tax: 0.0,
            },
        ]
    }

    #[tokio::test]
    async fn owner_updates_tax_rate() {
        let (state, _memory) = state_with_users(staff());
        let profile = update_settings(&state, "boss", SettingsUpdate::TaxRate(15.0)).unwrap();
        assert_eq!(profile.settings.tax_rate_percent, 15.0);
        assert_eq!(get_workshop(&state), profile);
    }

    #[tokio::test]
    async fn invalid_or_unauthorized_updates_are_rejected() {
        let (state, _memory) = state_with_users(staff());

        assert!(update_settings(&state, "boss", SettingsUpdate::TaxRate(-1.0)).is_err());
        assert_eq!(
            update_settings(&state, "m1", SettingsUpdate::Rename("Mine".into())).unwrap_err(),
            "not permitted"
        );
        assert_eq!(get_workshop(&state), WorkshopProfile::default());
    }

    #[tokio::test]
    async fn visibility_round_trips() {
        let (state, _memory) = state_with_users(staff());
        assert!(!set_visible(&state, false));
        assert!(set_visible(&state, true));
    }
}
