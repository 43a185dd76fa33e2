//! Object type registry operations

use rusqlite::{params, Connection, OptionalExtension, ToSql};
use uuid::Uuid;

use super::super::sqlite::{get_timestamp, get_uuid, now, timestamp, Database, DbResult};
use super::access_grants::insert_grant;
use crate::caller::Caller;
use crate::models::{FieldDef, ObjectType, ObjectTypeDef, PageParams};

const COLUMNS: &str = "t.id, t.org_id, t.name, t.description, t.icon, t.fields, t.is_public, \
                       t.measure_field, t.creator_id, t.created_at";

/// Result of a guarded type deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// At least one typed value still references the type
    InUse,
}

/// Which slice of an organization's types a query may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeScope {
    Organization(Uuid),
    GrantedTo {
        creator_id: Uuid,
        organization_id: Uuid,
    },
    Public(Uuid),
}

impl TypeScope {
    /// Admins see the whole organization, members only what was granted.
    pub fn for_caller(caller: &Caller) -> Self {
        if caller.is_admin() {
            TypeScope::Organization(caller.organization_id)
        } else {
            TypeScope::GrantedTo {
                creator_id: caller.creator_id,
                organization_id: caller.organization_id,
            }
        }
    }
}

/// Shared WHERE builder so a listing and its count never disagree.
#[derive(Debug, Clone)]
pub struct TypeFilter {
    pub scope: TypeScope,
    pub query: Option<String>,
}

impl TypeFilter {
    pub fn new(scope: TypeScope, query: Option<&str>) -> Self {
        let query = query.map(str::trim).filter(|q| !q.is_empty()).map(str::to_string);
        Self { scope, query }
    }

    fn where_clause(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        match self.scope {
            TypeScope::Organization(org) => {
                conditions.push("t.org_id = ?");
                params.push(Box::new(org.to_string()));
            }
            TypeScope::GrantedTo {
                creator_id,
                organization_id,
            } => {
                conditions.push("t.org_id = ?");
                conditions.push("t.id IN (SELECT obj_type_id FROM obj_type_access WHERE creator_id = ?)");
                params.push(Box::new(organization_id.to_string()));
                params.push(Box::new(creator_id.to_string()));
            }
            TypeScope::Public(org) => {
                conditions.push("t.org_id = ?");
                conditions.push("t.is_public = 1");
                params.push(Box::new(org.to_string()));
            }
        }

        if let Some(q) = &self.query {
            conditions.push("(t.name LIKE ? ESCAPE '\\' OR t.description LIKE ? ESCAPE '\\')");
            let pattern = format!("%{}%", escape_like(q));
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }

        (conditions.join(" AND "), params)
    }
}

/// LIKE is case-insensitive for ASCII in SQLite; only the wildcards need escaping.
fn escape_like(q: &str) -> String {
    let mut out = String::with_capacity(q.len());
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn row_to_object_type(row: &rusqlite::Row) -> rusqlite::Result<ObjectType> {
    let id = get_uuid(row, 0)?;
    let fields_json: String = row.get(5)?;
    let fields: Vec<FieldDef> = serde_json::from_str(&fields_json).unwrap_or_else(|e| {
        log::warn!("[REGISTRY] Unreadable field list on type {}: {}", id, e);
        Vec::new()
    });

    Ok(ObjectType {
        id,
        organization_id: get_uuid(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        icon: row.get(4)?,
        fields,
        is_public: row.get::<_, i64>(6)? != 0,
        measure_field: row.get(7)?,
        creator_id: get_uuid(row, 8)?,
        created_at: get_timestamp(row, 9)?,
    })
}

/// Select types matching `filter`, newest first; `page` of `None` returns all.
pub(crate) fn select_object_types(
    conn: &Connection,
    filter: &TypeFilter,
    page: Option<PageParams>,
) -> DbResult<Vec<ObjectType>> {
    let (where_sql, mut params) = filter.where_clause();
    let mut sql = format!(
        "SELECT {} FROM object_types t WHERE {} ORDER BY t.created_at DESC, t.id",
        COLUMNS, where_sql
    );
    if let Some(page) = page {
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Box::new(page.limit()));
        params.push(Box::new(page.offset()));
    }

    let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let types = stmt
        .query_map(params_ref.as_slice(), row_to_object_type)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(types)
}

pub(crate) fn count_object_types(conn: &Connection, filter: &TypeFilter) -> DbResult<i64> {
    let (where_sql, params) = filter.where_clause();
    let sql = format!("SELECT COUNT(*) FROM object_types t WHERE {}", where_sql);
    let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
    Ok(conn.query_row(&sql, params_ref.as_slice(), |row| row.get(0))?)
}

pub(crate) fn find_object_type(
    conn: &Connection,
    organization_id: Uuid,
    id: Uuid,
) -> DbResult<Option<ObjectType>> {
    let sql = format!(
        "SELECT {} FROM object_types t WHERE t.id = ?1 AND t.org_id = ?2",
        COLUMNS
    );
    Ok(conn
        .query_row(
            &sql,
            params![id.to_string(), organization_id.to_string()],
            row_to_object_type,
        )
        .optional()?)
}

fn insert_object_type(conn: &Connection, object_type: &ObjectType) -> DbResult<()> {
    conn.execute(
        "INSERT INTO object_types (id, org_id, creator_id, name, description, icon, fields,
         is_public, measure_field, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            object_type.id.to_string(),
            object_type.organization_id.to_string(),
            object_type.creator_id.to_string(),
            &object_type.name,
            &object_type.description,
            &object_type.icon,
            serde_json::to_string(&object_type.fields)?,
            object_type.is_public as i64,
            &object_type.measure_field,
            timestamp(&object_type.created_at),
        ],
    )?;
    Ok(())
}

impl Database {
    /// Insert a type and its creator's self-grant as one unit of work.
    pub fn create_object_type(&self, caller: &Caller, def: ObjectTypeDef) -> DbResult<ObjectType> {
        let object_type = ObjectType {
            id: Uuid::new_v4(),
            organization_id: caller.organization_id,
            name: def.name,
            description: def.description,
            icon: def.icon,
            fields: def.fields,
            is_public: def.is_public,
            measure_field: def.measure_field,
            creator_id: caller.creator_id,
            created_at: now(),
        };

        self.with_transaction(|tx| {
            insert_object_type(tx, &object_type)?;
            insert_grant(tx, caller.creator_id, object_type.id)?;
            Ok(object_type)
        })
    }

    pub fn get_object_type(&self, organization_id: Uuid, id: Uuid) -> DbResult<Option<ObjectType>> {
        let conn = self.conn()?;
        find_object_type(&conn, organization_id, id)
    }

    /// Replace every mutable attribute. Returns `None` when the type is not in
    /// the organization.
    pub fn update_object_type(
        &self,
        organization_id: Uuid,
        id: Uuid,
        def: ObjectTypeDef,
    ) -> DbResult<Option<ObjectType>> {
        self.with_transaction(|tx| {
            let changed = tx.execute(
                "UPDATE object_types
                 SET name = ?1, description = ?2, icon = ?3, fields = ?4, is_public = ?5, measure_field = ?6
                 WHERE id = ?7 AND org_id = ?8",
                params![
                    &def.name,
                    &def.description,
                    &def.icon,
                    serde_json::to_string(&def.fields)?,
                    def.is_public as i64,
                    &def.measure_field,
                    id.to_string(),
                    organization_id.to_string(),
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            find_object_type(tx, organization_id, id)
        })
    }

    /// Delete a type unless a typed value still uses it. Grants go with it.
    pub fn delete_object_type(&self, organization_id: Uuid, id: Uuid) -> DbResult<DeleteOutcome> {
        self.with_transaction(|tx| {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM object_types WHERE id = ?1 AND org_id = ?2)",
                params![id.to_string(), organization_id.to_string()],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(DeleteOutcome::NotFound);
            }

            let in_use: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM obj_type_values WHERE type_id = ?1)",
                [id.to_string()],
                |row| row.get(0),
            )?;
            if in_use {
                return Ok(DeleteOutcome::InUse);
            }

            tx.execute("DELETE FROM object_types WHERE id = ?1", [id.to_string()])?;
            Ok(DeleteOutcome::Deleted)
        })
    }

    /// One page of matching types plus the total match count.
    pub fn list_object_types(
        &self,
        filter: &TypeFilter,
        page: PageParams,
    ) -> DbResult<(Vec<ObjectType>, i64)> {
        let conn = self.conn()?;
        let items = select_object_types(&conn, filter, Some(page))?;
        let total = count_object_types(&conn, filter)?;
        Ok((items, total))
    }

    /// Every type in scope, unpaginated.
    pub fn object_types_in_scope(&self, scope: TypeScope) -> DbResult<Vec<ObjectType>> {
        let conn = self.conn()?;
        select_object_types(&conn, &TypeFilter::new(scope, None), None)
    }
}
