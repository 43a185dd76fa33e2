//! Per-member object type grants

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::super::sqlite::{now, timestamp, Database, DbResult};
use crate::caller::Caller;

/// Idempotent insert. Returns whether a new row was written.
pub(crate) fn insert_grant(conn: &Connection, creator_id: Uuid, type_id: Uuid) -> DbResult<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO obj_type_access (creator_id, obj_type_id, created_at)
         VALUES (?1, ?2, ?3)",
        params![creator_id.to_string(), type_id.to_string(), timestamp(&now())],
    )?;
    Ok(changed > 0)
}

/// SQL predicate restricting `column` (an object type id) to the types the
/// caller may see. Binds one positional parameter, returned alongside.
pub(crate) fn type_visibility_predicate(caller: &Caller, column: &str) -> (String, String) {
    if caller.is_admin() {
        (
            format!("{} IN (SELECT id FROM object_types WHERE org_id = ?)", column),
            caller.organization_id.to_string(),
        )
    } else {
        (
            format!(
                "{} IN (SELECT obj_type_id FROM obj_type_access WHERE creator_id = ?)",
                column
            ),
            caller.creator_id.to_string(),
        )
    }
}

impl Database {
    /// Grant `creator_id` access to an organization type. `None` when the
    /// type is not in the organization, otherwise whether a row was added.
    pub fn grant_object_type_access(
        &self,
        organization_id: Uuid,
        creator_id: Uuid,
        type_id: Uuid,
    ) -> DbResult<Option<bool>> {
        self.with_transaction(|tx| {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM object_types WHERE id = ?1 AND org_id = ?2)",
                params![type_id.to_string(), organization_id.to_string()],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }
            insert_grant(tx, creator_id, type_id).map(Some)
        })
    }

    /// Remove a grant on an organization type. Missing grants are not an error.
    pub fn revoke_object_type_access(
        &self,
        organization_id: Uuid,
        creator_id: Uuid,
        type_id: Uuid,
    ) -> DbResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "DELETE FROM obj_type_access
             WHERE creator_id = ?1 AND obj_type_id = ?2
               AND obj_type_id IN (SELECT id FROM object_types WHERE org_id = ?3)",
            params![
                creator_id.to_string(),
                type_id.to_string(),
                organization_id.to_string()
            ],
        )?;
        Ok(changed > 0)
    }

    /// Whether the caller may see `type_id`: admins any type of their
    /// organization, members only granted ones.
    pub fn object_type_visible_to(&self, caller: &Caller, type_id: Uuid) -> DbResult<bool> {
        let conn = self.conn()?;
        let (predicate, param) = type_visibility_predicate(caller, "t.id");
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM object_types t WHERE t.id = ? AND t.org_id = ? AND {})",
            predicate
        );
        let visible = conn.query_row(
            &sql,
            params![
                type_id.to_string(),
                caller.organization_id.to_string(),
                param
            ],
            |row| row.get(0),
        )?;
        Ok(visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::Role;
    use crate::db::sqlite::testing::test_db;
    use crate::db::tables::object_types::TypeScope;
    use crate::models::ObjectTypeDef;

    fn def(name: &str) -> ObjectTypeDef {
        ObjectTypeDef {
            name: name.to_string(),
            description: String::new(),
            icon: "file".to_string(),
            fields: vec![],
            is_public: true,
            measure_field: None,
        }
    }

    #[test]
    fn test_grant_is_idempotent() {
        let (_dir, db) = test_db();
        let admin = Caller::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);
        let member = Uuid::new_v4();
        let company = db.create_object_type(&admin, def("Company")).unwrap();

        assert_eq!(
            db.grant_object_type_access(admin.organization_id, member, company.id).unwrap(),
            Some(true)
        );
        assert_eq!(
            db.grant_object_type_access(admin.organization_id, member, company.id).unwrap(),
            Some(false)
        );

        let rows: i64 = db
            .conn()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM obj_type_access WHERE creator_id = ?1",
                [member.to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_grant_requires_type_in_organization() {
        let (_dir, db) = test_db();
        let admin = Caller::new(Uuid::new_v4(), Uuid::new_v4(), Role::Admin);
        let company = db.create_object_type(&admin, def("Company")).unwrap();

        assert_eq!(
            db.grant_object_type_access(Uuid::new_v4(), Uuid::new_v4(), company.id).unwrap(),
            None
        );
    }

    #[test]
    fn test_visibility_follows_grants() {
        let (_dir, db) = test_db();
        let org = Uuid::new_v4();
        let admin = Caller::new(Uuid::new_v4(), org, Role::Admin);
        let member = Caller::new(Uuid::new_v4(), org, Role::Member);
        let company = db.create_object_type(&admin, def("Company")).unwrap();
        let deal = db.create_object_type(&admin, def("Deal")).unwrap();

        assert!(db.object_type_visible_to(&admin, deal.id).unwrap());
        assert!(!db.object_type_visible_to(&member, company.id).unwrap());

        db.grant_object_type_access(org, member.creator_id, company.id).unwrap();
        assert!(db.object_type_visible_to(&member, company.id).unwrap());
        let visible = db.object_types_in_scope(TypeScope::for_caller(&member)).unwrap();
        assert_eq!(visible.len(), 1);

        assert!(db.revoke_object_type_access(org, member.creator_id, company.id).unwrap());
        assert!(!db.revoke_object_type_access(org, member.creator_id, company.id).unwrap());
        assert!(!db.object_type_visible_to(&member, company.id).unwrap());
    }
}
