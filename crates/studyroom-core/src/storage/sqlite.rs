//! SQLite-backed entity store.
//!
//! Each record is one JSON document in the `records` table, keyed by kind
//! and id. Ordering and limits are applied on the decoded documents so any
//! field can be used as a sort key.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::{decode, Entity, EntityKind, EntityStore, OrderBy};
use crate::error::StoreError;

/// Fields owned by the store; callers cannot overwrite them on update.
const RESERVED_FIELDS: [&str; 2] = ["id", "created_date"];

/// SQLite database holding tasks, sessions and goals.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                kind    TEXT NOT NULL,
                id      TEXT NOT NULL,
                data    TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_kind ON records(kind);",
        )
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(conn: &Connection, kind: EntityKind, id: &str) -> Result<Option<Value>, StoreError> {
        let text = conn
            .query_row(
                "SELECT data FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.api_name(), id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        text.map(|text| parse_document(kind, &text)).transpose()
    }

    /// Number of records of one kind.
    pub fn count(&self, kind: EntityKind) -> Result<u64, StoreError> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM records WHERE kind = ?1",
            params![kind.api_name()],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

impl EntityStore for SqliteStore {
    async fn list<E: Entity>(
        &self,
        order_by: &str,
        limit: Option<usize>,
    ) -> Result<Vec<E>, StoreError> {
        let order = OrderBy::parse(order_by)?;
        let mut docs = {
            let conn = self.conn();
            let mut stmt =
                conn.prepare("SELECT data FROM records WHERE kind = ?1 ORDER BY rowid")?;
            let rows = stmt.query_map(params![E::KIND.api_name()], |row| row.get::<_, String>(0))?;
            let mut docs = Vec::new();
            for row in rows {
                docs.push(parse_document(E::KIND, &row?)?);
            }
            docs
        };
        order.sort(&mut docs);
        if let Some(limit) = limit {
            docs.truncate(limit);
        }
        docs.into_iter().map(decode::<E>).collect()
    }

    async fn get<E: Entity>(&self, id: &str) -> Result<Option<E>, StoreError> {
        let doc = Self::load(&self.conn(), E::KIND, id)?;
        doc.map(decode::<E>).transpose()
    }

    async fn create<E: Entity>(&self, fields: Value) -> Result<E, StoreError> {
        let mut doc = into_object(E::KIND, fields)?;
        let id = Uuid::new_v4().to_string();
        let now = timestamp();
        doc.insert("id".into(), Value::String(id.clone()));
        doc.insert("created_date".into(), Value::String(now.clone()));
        doc.insert("updated_date".into(), Value::String(now));

        let doc = Value::Object(doc);
        let entity = decode::<E>(doc.clone())?;
        self.conn().execute(
            "INSERT INTO records (kind, id, data) VALUES (?1, ?2, ?3)",
            params![E::KIND.api_name(), id, doc.to_string()],
        )?;
        debug!(kind = %E::KIND, %id, "record created");
        Ok(entity)
    }

    async fn update<E: Entity>(&self, id: &str, fields: Value) -> Result<E, StoreError> {
        let changes = into_object(E::KIND, fields)?;
        let conn = self.conn();
        let mut doc = match Self::load(&conn, E::KIND, id)? {
            Some(Value::Object(doc)) => doc,
            _ => {
                return Err(StoreError::NotFound {
                    kind: E::KIND,
                    id: id.to_string(),
                })
            }
        };
        for (key, value) in changes {
            if !RESERVED_FIELDS.contains(&key.as_str()) {
                doc.insert(key, value);
            }
        }
        doc.insert("updated_date".into(), Value::String(timestamp()));

        let doc = Value::Object(doc);
        let entity = decode::<E>(doc.clone())?;
        conn.execute(
            "UPDATE records SET data = ?3 WHERE kind = ?1 AND id = ?2",
            params![E::KIND.api_name(), id, doc.to_string()],
        )?;
        debug!(kind = %E::KIND, %id, "record updated");
        Ok(entity)
    }

    async fn delete<E: Entity>(&self, id: &str) -> Result<(), StoreError> {
        let removed = self.conn().execute(
            "DELETE FROM records WHERE kind = ?1 AND id = ?2",
            params![E::KIND.api_name(), id],
        )?;
        if removed == 0 {
            return Err(StoreError::NotFound {
                kind: E::KIND,
                id: id.to_string(),
            });
        }
        debug!(kind = %E::KIND, %id, "record deleted");
        Ok(())
    }
}

fn parse_document(kind: EntityKind, text: &str) -> Result<Value, StoreError> {
    serde_json::from_str(text).map_err(|source| StoreError::Decode { kind, source })
}

fn into_object(kind: EntityKind, fields: Value) -> Result<Map<String, Value>, StoreError> {
    match fields {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidFields { kind }),
    }
}

/// Fixed-width UTC timestamps so string order matches time order.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Goal, Session, Task, TaskStatus};
    use serde_json::json;

    #[tokio::test]
    async fn create_assigns_id_and_created_date() {
        let store = SqliteStore::open_memory().unwrap();
        let task: Task = store
            .create(json!({"title": "Lab report", "subject": "Chemistry"}))
            .await
            .unwrap();
        assert!(!task.id.is_empty());
        assert!(task.created_date.is_some());
        assert_eq!(task.subject, "Chemistry");

        let fetched: Task = store.get(&task.id).await.unwrap().unwrap();
        assert_eq!(fetched, task);
        assert_eq!(store.count(EntityKind::Task).unwrap(), 1);
    }

    #[tokio::test]
    async fn create_rejects_documents_missing_required_fields() {
        let store = SqliteStore::open_memory().unwrap();
        let err = store
            .create::<Session>(json!({"session_type": "pomodoro"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Decode { kind: EntityKind::Session, .. }));
        assert_eq!(store.count(EntityKind::Session).unwrap(), 0);

        let err = store.create::<Goal>(json!(["not", "an", "object"])).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidFields { .. }));
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_identity() {
        let store = SqliteStore::open_memory().unwrap();
        let task: Task = store.create(json!({"title": "Essay"})).await.unwrap();
        let updated: Task = store
            .update(
                &task.id,
                json!({"status": "in_progress", "actual_hours": 1.5, "id": "hijack"}),
            )
            .await
            .unwrap();
        assert_eq!(updated.id, task.id);
        assert_eq!(updated.title, "Essay");
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.actual_hours, Some(1.5));
        assert_eq!(updated.created_date, task.created_date);
    }

    #[tokio::test]
    async fn update_and_delete_unknown_ids_fail() {
        let store = SqliteStore::open_memory().unwrap();
        let err = store.update::<Task>("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: EntityKind::Task, .. }));
        let err = store.delete::<Task>("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_orders_and_limits_per_kind() {
        let store = SqliteStore::open_memory().unwrap();
        for (title, due) in [("a", "2026-03-05"), ("b", "2026-03-01"), ("c", "2026-03-09")] {
            let _: Task = store
                .create(json!({"title": title, "due_date": due}))
                .await
                .unwrap();
        }
        let _: Goal = store
            .create(json!({"title": "10h of maths", "target_hours_weekly": 10}))
            .await
            .unwrap();

        let tasks: Vec<Task> = store.list("-due_date", None).await.unwrap();
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["c", "a", "b"]);

        let newest: Vec<Task> = store.list("-created_date", Some(2)).await.unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0].title, "c");

        let goals: Vec<Goal> = store.list("-created_date", None).await.unwrap();
        assert_eq!(goals.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let store = SqliteStore::open_memory().unwrap();
        let goal: Goal = store.create(json!({"title": "Read daily"})).await.unwrap();
        store.delete::<Goal>(&goal.id).await.unwrap();
        assert!(store.get::<Goal>(&goal.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studyroom.db");
        let id = {
            let store = SqliteStore::open(&path).unwrap();
            let task: Task = store.create(json!({"title": "Flashcards"})).await.unwrap();
            task.id
        };
        let store = SqliteStore::open(&path).unwrap();
        let task: Task = store.get(&id).await.unwrap().unwrap();
        assert_eq!(task.title, "Flashcards");
    }
}
