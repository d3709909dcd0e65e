use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{parse_datetime, to_i64, to_u64},
    },
    store::WorkshopSnapshot,
    sync::{FetchOutcome, SnapshotStore, StoreFuture},
};

/// Raw stored document for one tenant.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub tenant_id: String,
    pub body: String,
    pub revision: u64,
    pub updated_at: DateTime<Utc>,
}

fn row_to_document(row: &Row) -> Result<StoredDocument> {
    let revision: i64 = row.get("revision")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(StoredDocument {
        tenant_id: row.get("tenant_id")?,
        body: row.get("body")?,
        revision: to_u64(revision, "revision")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn load_document(&self, tenant_id: &str) -> Result<Option<StoredDocument>> {
        let tenant_id = tenant_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tenant_id, body, revision, updated_at
                 FROM documents
                 WHERE tenant_id = ?1",
            )?;
            let document = stmt
                .query_row(params![tenant_id], |row| Ok(row_to_document(row)))
                .optional()?
                .transpose()?;
            Ok(document)
        })
        .await
    }

    /// Writes `body` as the tenant's document and returns the new revision.
    pub async fn save_document(&self, tenant_id: &str, body: String) -> Result<u64> {
        let tenant_id = tenant_id.to_string();
        self.execute(move |conn| {
            let now = Utc::now().to_rfc3339();
            let body_bytes = to_i64(body.len() as u64)?;
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO documents (tenant_id, body, revision, updated_at)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                     body = excluded.body,
                     revision = documents.revision + 1,
                     updated_at = excluded.updated_at",
                params![tenant_id, body, now],
            )
            .context("failed to upsert document")?;

            let revision: i64 = tx.query_row(
                "SELECT revision FROM documents WHERE tenant_id = ?1",
                params![tenant_id],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO save_log (tenant_id, revision, body_bytes, saved_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![tenant_id, revision, body_bytes, now],
            )
            .context("failed to append save log")?;

            tx.commit()?;
            to_u64(revision, "revision")
        })
        .await
    }
}

/// The SQLite database seen as one tenant's document store.
#[derive(Clone)]
pub struct DocumentStore {
    db: Database,
    tenant_id: String,
}

impl DocumentStore {
    pub fn new(db: Database, tenant_id: impl Into<String>) -> Self {
        Self {
            db,
            tenant_id: tenant_id.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl SnapshotStore for DocumentStore {
    fn fetch_snapshot(&self) -> StoreFuture<'_, FetchOutcome> {
        Box::pin(async move {
            let Some(document) = self.db.load_document(&self.tenant_id).await? else {
                return Ok(FetchOutcome::Empty);
            };
            let snapshot = serde_json::from_str(&document.body).with_context(|| {
                format!(
                    "failed to decode revision {} for tenant {}",
                    document.revision, document.tenant_id
                )
            })?;
            Ok(FetchOutcome::Snapshot(snapshot))
        })
    }

    fn save_snapshot<'a>(&'a self, snapshot: &'a WorkshopSnapshot) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let body = serde_json::to_string(snapshot).context("failed to encode snapshot")?;
            self.db.save_document(&self.tenant_id, body).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Role, User},
        store::{Action, Store},
    };

    fn open_store(dir: &tempfile::TempDir, tenant: &str) -> DocumentStore {
        let db = Database::new(dir.path().join("workbay.sqlite3")).unwrap();
        DocumentStore::new(db, tenant)
    }

    #[tokio::test]
    async fn round_trips_snapshot_and_bumps_revision() {
        let dir = tempfile::tempdir().unwrap();
        let documents = open_store(&dir, "bennys");
        assert_eq!(documents.fetch_snapshot().await.unwrap(), FetchOutcome::Empty);

        let store = Store::new(WorkshopSnapshot::default().with_users(vec![User {
            id: "m1".into(),
            name: "Rico".into(),
            role: Role::Mechanic,
            pending_tax: 0.0,
        }]));
        let started = store
            .apply(
                &Action::StartSession {
                    session_id: "s1".into(),
                    mechanic_id: "m1".into(),
                    mechanic_name: "Rico".into(),
                },
                crate::now(),
            )
            .unwrap();
        let paused = store
            .apply(&Action::PauseSession { mechanic_id: "m1".into() }, crate::now())
            .unwrap();

        documents.save_snapshot(&started).await.unwrap();
        documents.save_snapshot(&paused).await.unwrap();

        match documents.fetch_snapshot().await.unwrap() {
            FetchOutcome::Snapshot(loaded) => assert_eq!(loaded, *paused),
            FetchOutcome::Empty => panic!("document missing after save"),
        }

        let stored = documents.db.load_document("bennys").await.unwrap().unwrap();
        assert_eq!(stored.revision, 2);

        let logged: Vec<(i64, i64)> = documents
            .db
            .execute(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT revision, body_bytes FROM save_log
                     WHERE tenant_id = 'bennys' ORDER BY revision",
                )?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await
            .unwrap();
        assert_eq!(logged.len(), 2);
        assert_eq!(logged[1].0, 2);
        assert!(logged.iter().all(|(_, bytes)| *bytes > 0));
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let first = open_store(&dir, "north");
        first.save_snapshot(&WorkshopSnapshot::default()).await.unwrap();

        let second = DocumentStore::new(first.db.clone(), "south");
        assert_eq!(second.fetch_snapshot().await.unwrap(), FetchOutcome::Empty);
        assert_eq!(second.tenant_id(), "south");
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let documents = open_store(&dir, "bennys");
        documents
            .db
            .save_document("bennys", "{not json".into())
            .await
            .unwrap();
        assert!(documents.fetch_snapshot().await.is_err());
    }
}
