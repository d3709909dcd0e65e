use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{ServiceRecord, SettlementRecord},
    pricing::ServiceDraft,
    reports::{revenue_by_mechanic as per_mechanic, revenue_summary, MechanicRevenue, RevenueScope, RevenueSummary},
    store::{resolve_actor, resolve_admin, Action, Confirmation},
    AppState,
};

/// Prices a draft for the acting mechanic and books it, accruing its tax.
pub fn record_service(
    state: &AppState,
    actor_id: &str,
    draft: ServiceDraft,
) -> Result<ServiceRecord, String> {
    let snapshot = state.store.snapshot();
    let mechanic = resolve_actor(&snapshot, actor_id).map_err(|e| e.to_string())?;

    let record = draft
        .finalize(
            Uuid::new_v4().to_string(),
            &mechanic.id,
            &mechanic.name,
            &snapshot.workshop.settings,
            crate::now(),
        )
        .map_err(|e| e.to_string())?;

    state.dispatch(&Action::RecordService {
        record: record.clone(),
    });
    Ok(record)
}

/// Whether the settle control should be offered for `mechanic_id`.
pub fn can_settle(state: &AppState, mechanic_id: &str) -> bool {
    state
        .store
        .snapshot()
        .user(mechanic_id)
        .is_some_and(|user| user.can_settle())
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub mechanic_id: String,
    pub mechanic_name: String,
    pub pending_tax: f64,
    pub can_settle: bool,
}

/// Outstanding tax per staff member, in roster order. Administrators only.
pub fn balances(state: &AppState, actor_id: &str) -> Result<Vec<Balance>, String> {
    let snapshot = state.store.snapshot();
    resolve_admin(&snapshot, actor_id).map_err(|e| e.to_string())?;
    Ok(snapshot
        .users
        .iter()
        .map(|user| Balance {
            mechanic_id: user.id.clone(),
            mechanic_name: user.name.clone(),
            pending_tax: user.pending_tax,
            can_settle: user.can_settle(),
        })
        .collect())
}

/// Settles the full pending balance. `Ok(None)` when the operator declined.
pub fn settle(
    state: &AppState,
    actor_id: &str,
    mechanic_id: &str,
    confirmed: bool,
) -> Result<Option<SettlementRecord>, String> {
    let admin = resolve_admin(&state.store.snapshot(), actor_id).map_err(|e| e.to_string())?;
    if !can_settle(state, mechanic_id) {
        return Err(format!("nothing to settle for {mechanic_id}"));
    }

    let settlement_id = Uuid::new_v4().to_string();
    let action = Action::Settle {
        settlement_id: settlement_id.clone(),
        mechanic_id: mechanic_id.to_string(),
        settled_by_id: admin.id,
        settled_by_name: admin.name,
        confirmation: Confirmation::from(confirmed),
    };

    Ok(state.dispatch(&action).and_then(|next| {
        next.settlements
            .entries()
            .iter()
            .find(|record| record.id == settlement_id)
            .cloned()
    }))
}

/// Settlement history, most recent first.
pub fn settlements(state: &AppState, actor_id: &str) -> Result<Vec<SettlementRecord>, String> {
    let snapshot = state.store.snapshot();
    let me = resolve_actor(&snapshot, actor_id).map_err(|e| e.to_string())?;

    let mut history = snapshot.settlements.newest_first();
    if !me.role.can_administer() {
        history.retain(|record| record.mechanic_id == me.id);
    }
    Ok(history)
}

/// Mechanics always get their own figures regardless of the requested scope.
pub fn revenue(
    state: &AppState,
    actor_id: &str,
    scope: RevenueScope,
) -> Result<RevenueSummary, String> {
    let snapshot = state.store.snapshot();
    let me = resolve_actor(&snapshot, actor_id).map_err(|e| e.to_string())?;

    let scope = if me.role.can_administer() {
        scope
    } else {
        RevenueScope::Mechanic(me.id)
    };
    Ok(revenue_summary(&snapshot.services, &scope))
}

pub fn revenue_by_mechanic(state: &AppState, actor_id: &str) -> Result<Vec<MechanicRevenue>, String> {
    let snapshot = state.store.snapshot();
    resolve_admin(&snapshot, actor_id).map_err(|e| e.to_string())?;
    Ok(per_mechanic(&snapshot.services))
}
