//! Typed values: JSON payloads attached to records under an object type

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::super::sqlite::{get_timestamp, get_uuid, now, timestamp, Database, DbResult};
use super::access_grants::type_visibility_predicate;
use super::records::find_record;
use crate::caller::Caller;
use crate::models::{payload_text, FieldDef, Payload, TypedValue, TypedValueView};

const VALUE_COLUMNS: &str = "v.id, v.obj_id, v.type_id, v.type_values, v.created_at, v.updated_at";

/// Which typed values of a record a read may return
#[derive(Debug, Clone, Copy)]
pub enum ValueVisibility<'a> {
    Caller(&'a Caller),
    /// Only values whose type is public
    Public,
}

fn row_to_typed_value(row: &rusqlite::Row) -> rusqlite::Result<TypedValue> {
    let payload_json: String = row.get(3)?;
    let payload: Payload = serde_json::from_str(&payload_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(TypedValue {
        id: get_uuid(row, 0)?,
        record_id: get_uuid(row, 1)?,
        object_type_id: get_uuid(row, 2)?,
        payload,
        created_at: get_timestamp(row, 4)?,
        updated_at: get_timestamp(row, 5)?,
    })
}

fn find_typed_value(conn: &Connection, id: Uuid) -> DbResult<Option<TypedValue>> {
    let sql = format!("SELECT {} FROM obj_type_values v WHERE v.id = ?1", VALUE_COLUMNS);
    Ok(conn
        .query_row(&sql, [id.to_string()], row_to_typed_value)
        .optional()?)
}

fn index_typed_value(conn: &Connection, value: &TypedValue) -> DbResult<()> {
    conn.execute(
        "DELETE FROM type_values_fts WHERE value_id = ?1",
        [value.id.to_string()],
    )?;
    conn.execute(
        "INSERT INTO type_values_fts (value_id, body) VALUES (?1, ?2)",
        params![value.id.to_string(), payload_text(&value.payload)],
    )?;
    Ok(())
}

/// Values of one record joined with their type's metadata, oldest first.
pub(crate) fn select_value_views(
    conn: &Connection,
    record_id: Uuid,
    visibility: ValueVisibility<'_>,
) -> DbResult<Vec<TypedValueView>> {
    let (predicate, param) = match visibility {
        ValueVisibility::Caller(caller) => {
            let (predicate, param) = type_visibility_predicate(caller, "v.type_id");
            (predicate, Some(param))
        }
        ValueVisibility::Public => ("t.is_public = 1".to_string(), None),
    };

    let sql = format!(
        "SELECT {}, t.name, t.icon, t.fields
         FROM obj_type_values v
         JOIN object_types t ON t.id = v.type_id
         WHERE v.obj_id = ? AND {}
         ORDER BY v.created_at, v.id",
        VALUE_COLUMNS, predicate
    );

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row| -> rusqlite::Result<TypedValueView> {
        let fields_json: String = row.get(8)?;
        let fields: Vec<FieldDef> = serde_json::from_str(&fields_json).unwrap_or_default();
        Ok(TypedValueView {
            value: row_to_typed_value(row)?,
            object_type_name: row.get(6)?,
            object_type_icon: row.get(7)?,
            object_type_fields: fields,
        })
    };

    let views = match param {
        Some(param) => stmt
            .query_map(params![record_id.to_string(), param], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        None => stmt
            .query_map([record_id.to_string()], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
    };
    Ok(views)
}

impl Database {
    /// Attach a payload to a live record of the organization. `None` when the
    /// record does not exist there.
    pub fn insert_typed_value(
        &self,
        organization_id: Uuid,
        record_id: Uuid,
        type_id: Uuid,
        payload: Payload,
    ) -> DbResult<Option<TypedValue>> {
        self.with_transaction(|tx| {
            if find_record(tx, organization_id, record_id)?.is_none() {
                return Ok(None);
            }

            let created_at = now();
            let value = TypedValue {
                id: Uuid::new_v4(),
                record_id,
                object_type_id: type_id,
                payload,
                created_at,
                updated_at: created_at,
            };

            tx.execute(
                "INSERT INTO obj_type_values (id, obj_id, type_id, type_values, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    value.id.to_string(),
                    record_id.to_string(),
                    type_id.to_string(),
                    serde_json::to_string(&value.payload)?,
                    timestamp(&created_at),
                ],
            )?;
            index_typed_value(tx, &value)?;
            Ok(Some(value))
        })
    }

    /// Replace a payload. The value must belong to `record_id` inside the
    /// organization, otherwise `None` and nothing changes.
    pub fn update_typed_value(
        &self,
        organization_id: Uuid,
        record_id: Uuid,
        value_id: Uuid,
        payload: Payload,
    ) -> DbResult<Option<TypedValue>> {
        self.with_transaction(|tx| {
            let changed = tx.execute(
                "UPDATE obj_type_values SET type_values = ?1, updated_at = ?2
                 WHERE id = ?3 AND obj_id = ?4
                   AND obj_id IN (SELECT id FROM objects WHERE org_id = ?5)",
                params![
                    serde_json::to_string(&payload)?,
                    timestamp(&now()),
                    value_id.to_string(),
                    record_id.to_string(),
                    organization_id.to_string(),
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            let value = find_typed_value(tx, value_id)?;
            if let Some(value) = &value {
                index_typed_value(tx, value)?;
            }
            Ok(value)
        })
    }

    pub fn delete_typed_value(
        &self,
        organization_id: Uuid,
        record_id: Uuid,
        value_id: Uuid,
    ) -> DbResult<bool> {
        self.with_transaction(|tx| {
            let changed = tx.execute(
                "DELETE FROM obj_type_values
                 WHERE id = ?1 AND obj_id = ?2
                   AND obj_id IN (SELECT id FROM objects WHERE org_id = ?3)",
                params![
                    value_id.to_string(),
                    record_id.to_string(),
                    organization_id.to_string()
                ],
            )?;
            if changed > 0 {
                tx.execute(
                    "DELETE FROM type_values_fts WHERE value_id = ?1",
                    [value_id.to_string()],
                )?;
            }
            Ok(changed > 0)
        })
    }

    #[cfg(test)]
    pub fn get_typed_value(&self, id: Uuid) -> DbResult<Option<TypedValue>> {
        let conn = self.conn()?;
        find_typed_value(&conn, id)
    }

    pub fn typed_values_for_record(
        &self,
        record_id: Uuid,
        visibility: ValueVisibility<'_>,
    ) -> DbResult<Vec<TypedValueView>> {
        let conn = self.conn()?;
        select_value_views(&conn, record_id, visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::Role;
    use crate::db::sqlite::testing::test_db;
    use crate::models::{ObjectTypeDef, RecordRequest};
    use serde_json::json;

    fn setup(db: &Database, caller: &Caller, is_public: bool) -> (Uuid, Uuid) {
        let object_type = db
            .create_object_type(
                caller,
                ObjectTypeDef {
                    name: "Company".to_string(),
                    description: String::new(),
                    icon: "file".to_string(),
                    fields: vec![],
                    is_public,
                    measure_field: None,
                },
            )
            .unwrap();
        let record = db
            .create_record(
                caller,
                RecordRequest {
                    name: "Acme".to_string(),
                    ..Default::default()
                },
            )
            .unwrap();
        (record.id, object_type.id)
    }

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_insert_indexes_payload() {
        let (_dir, db) = test_db();
        let caller = Caller::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);
        let (record_id, type_id) = setup(&db, &caller, true);

        let value = db
            .insert_typed_value(caller.organization_id, record_id, type_id, payload(json!({"revenue": 125000})))
            .unwrap()
            .unwrap();

        let body: String = db
            .conn()
            .unwrap()
            .query_row(
                "SELECT body FROM type_values_fts WHERE value_id = ?1",
                [value.id.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(body, "125000");

        assert!(db
            .insert_typed_value(Uuid::new_v4(), record_id, type_id, Payload::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_and_delete_are_org_scoped() {
        let (_dir, db) = test_db();
        let caller = Caller::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);
        let (record_id, type_id) = setup(&db, &caller, true);
        let value = db
            .insert_typed_value(caller.organization_id, record_id, type_id, payload(json!({"a": 1})))
            .unwrap()
            .unwrap();

        let other_org = Uuid::new_v4();
        assert!(db
            .update_typed_value(other_org, record_id, value.id, payload(json!({"a": 2})))
            .unwrap()
            .is_none());
        assert!(!db.delete_typed_value(other_org, record_id, value.id).unwrap());
        assert_eq!(db.get_typed_value(value.id).unwrap().unwrap().payload["a"], json!(1));

        let updated = db
            .update_typed_value(caller.organization_id, record_id, value.id, payload(json!({"a": 2})))
            .unwrap()
            .unwrap();
        assert_eq!(updated.payload["a"], json!(2));
        assert!(updated.updated_at >= value.updated_at);

        assert!(db.delete_typed_value(caller.organization_id, record_id, value.id).unwrap());
        assert!(db.get_typed_value(value.id).unwrap().is_none());
    }

    #[test]
    fn test_concurrent_attaches_all_commit() {
        let (_dir, db) = test_db();
        let caller = Caller::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);
        let (record_id, type_id) = setup(&db, &caller, true);
        let db = std::sync::Arc::new(db);
        let org = caller.organization_id;

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let db = db.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|i| {
                            db.insert_typed_value(
                                org,
                                record_id,
                                type_id,
                                payload(json!({"worker": worker, "seq": i})),
                            )
                        })
                        .filter(|result| !matches!(result, Ok(Some(_))))
                        .count()
                })
            })
            .collect();

        let failures: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
        assert_eq!(failures, 0);

        let stored: i64 = db
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM obj_type_values", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stored, 200);
    }

    #[test]
    fn test_value_views_respect_visibility() {
        let (_dir, db) = test_db();
        let org = Uuid::new_v4();
        let admin = Caller::new(Uuid::new_v4(), org, Role::Admin);
        let member = Caller::new(Uuid::new_v4(), org, Role::Member);
        let (record_id, type_id) = setup(&db, &admin, false);
        db.insert_typed_value(org, record_id, type_id, payload(json!({"a": 1})))
            .unwrap();

        let as_admin = db
            .typed_values_for_record(record_id, ValueVisibility::Caller(&admin))
            .unwrap();
        assert_eq!(as_admin.len(), 1);
        assert_eq!(as_admin[0].object_type_name, "Company");

        assert!(db
            .typed_values_for_record(record_id, ValueVisibility::Caller(&member))
            .unwrap()
            .is_empty());
        assert!(db
            .typed_values_for_record(record_id, ValueVisibility::Public)
            .unwrap()
            .is_empty());
    }
}
