//! Record ("object") storage and its field index

use rusqlite::{params, Connection, OptionalExtension, ToSql};
use uuid::Uuid;

use super::super::sqlite::{
    get_timestamp, get_uuid, now, parse_opt_timestamp, timestamp, Database, DbResult,
};
use crate::caller::Caller;
use crate::models::{PageParams, Record, RecordRequest};

pub(crate) const RECORD_COLUMNS: &str = "o.id, o.org_id, o.creator_id, o.name, o.description, \
                                         o.business_key, o.aliases, o.created_at, o.deleted_at";

pub(crate) fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
    let id = get_uuid(row, 0)?;
    let aliases_json: String = row.get(6)?;
    let aliases: Vec<String> = serde_json::from_str(&aliases_json).unwrap_or_else(|e| {
        log::warn!("[RECORDS] Unreadable aliases on record {}: {}", id, e);
        Vec::new()
    });

    Ok(Record {
        id,
        organization_id: get_uuid(row, 1)?,
        creator_id: get_uuid(row, 2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        business_key: row.get(5)?,
        aliases,
        created_at: get_timestamp(row, 7)?,
        deleted_at: parse_opt_timestamp(8, row.get(8)?)?,
    })
}

/// Live (not soft-deleted) record in the organization.
pub(crate) fn find_record(
    conn: &Connection,
    organization_id: Uuid,
    id: Uuid,
) -> DbResult<Option<Record>> {
    let sql = format!(
        "SELECT {} FROM objects o WHERE o.id = ?1 AND o.org_id = ?2 AND o.deleted_at IS NULL",
        RECORD_COLUMNS
    );
    Ok(conn
        .query_row(
            &sql,
            params![id.to_string(), organization_id.to_string()],
            row_to_record,
        )
        .optional()?)
}

/// Live records among `ids`, in no particular order.
pub(crate) fn find_records(
    conn: &Connection,
    organization_id: Uuid,
    ids: &[Uuid],
) -> DbResult<Vec<Record>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT {} FROM objects o
         WHERE o.org_id = ? AND o.deleted_at IS NULL AND o.id IN ({})",
        RECORD_COLUMNS, placeholders
    );

    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(organization_id.to_string())];
    params.extend(ids.iter().map(|id| Box::new(id.to_string()) as Box<dyn ToSql>));
    let params_ref: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params_ref.as_slice(), row_to_record)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Rewrite the record's field index row.
fn index_record(conn: &Connection, record: &Record) -> DbResult<()> {
    conn.execute(
        "DELETE FROM records_fts WHERE record_id = ?1",
        [record.id.to_string()],
    )?;
    conn.execute(
        "INSERT INTO records_fts (record_id, name, description, aliases) VALUES (?1, ?2, ?3, ?4)",
        params![
            record.id.to_string(),
            &record.name,
            &record.description,
            record.aliases.join(" "),
        ],
    )?;
    Ok(())
}

impl Database {
    pub fn create_record(&self, caller: &Caller, req: RecordRequest) -> DbResult<Record> {
        let record = Record {
            id: Uuid::new_v4(),
            organization_id: caller.organization_id,
            creator_id: caller.creator_id,
            name: req.name,
            description: req.description,
            business_key: req.business_key,
            aliases: req.aliases,
            created_at: now(),
            deleted_at: None,
        };

        self.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO objects (id, org_id, creator_id, name, description, business_key, aliases, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    record.organization_id.to_string(),
                    record.creator_id.to_string(),
                    &record.name,
                    &record.description,
                    &record.business_key,
                    serde_json::to_string(&record.aliases)?,
                    timestamp(&record.created_at),
                ],
            )?;
            index_record(tx, &record)?;
            Ok(record)
        })
    }

    pub fn get_record(&self, organization_id: Uuid, id: Uuid) -> DbResult<Option<Record>> {
        let conn = self.conn()?;
        find_record(&conn, organization_id, id)
    }

    pub fn update_record(
        &self,
        organization_id: Uuid,
        id: Uuid,
        req: RecordRequest,
    ) -> DbResult<Option<Record>> {
        self.with_transaction(|tx| {
            let changed = tx.execute(
                "UPDATE objects SET name = ?1, description = ?2, business_key = ?3, aliases = ?4
                 WHERE id = ?5 AND org_id = ?6 AND deleted_at IS NULL",
                params![
                    &req.name,
                    &req.description,
                    &req.business_key,
                    serde_json::to_string(&req.aliases)?,
                    id.to_string(),
                    organization_id.to_string(),
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            let record = find_record(tx, organization_id, id)?;
            if let Some(record) = &record {
                index_record(tx, record)?;
            }
            Ok(record)
        })
    }

    /// Mark the record deleted and drop it from the field index.
    pub fn soft_delete_record(&self, organization_id: Uuid, id: Uuid) -> DbResult<bool> {
        self.with_transaction(|tx| {
            let changed = tx.execute(
                "UPDATE objects SET deleted_at = ?1
                 WHERE id = ?2 AND org_id = ?3 AND deleted_at IS NULL",
                params![
                    timestamp(&now()),
                    id.to_string(),
                    organization_id.to_string()
                ],
            )?;
            if changed > 0 {
                tx.execute(
                    "DELETE FROM records_fts WHERE record_id = ?1",
                    [id.to_string()],
                )?;
            }
            Ok(changed > 0)
        })
    }

    pub fn get_records(&self, organization_id: Uuid, ids: &[Uuid]) -> DbResult<Vec<Record>> {
        let conn = self.conn()?;
        find_records(&conn, organization_id, ids)
    }

    /// Newest live records first, with the total live count.
    pub fn recent_records(
        &self,
        organization_id: Uuid,
        page: PageParams,
    ) -> DbResult<(Vec<Record>, i64)> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM objects o
             WHERE o.org_id = ?1 AND o.deleted_at IS NULL
             ORDER BY o.created_at DESC, o.id
             LIMIT ?2 OFFSET ?3",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![organization_id.to_string(), page.limit(), page.offset()],
                row_to_record,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM objects WHERE org_id = ?1 AND deleted_at IS NULL",
            [organization_id.to_string()],
            |row| row.get(0),
        )?;
        Ok((records, total))
    }

    /// Live records carrying at least one value of `type_id`.
    pub fn records_with_type(&self, organization_id: Uuid, type_id: Uuid) -> DbResult<Vec<Record>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM objects o
             WHERE o.org_id = ?1 AND o.deleted_at IS NULL
               AND EXISTS (SELECT 1 FROM obj_type_values v WHERE v.obj_id = o.id AND v.type_id = ?2)
             ORDER BY o.created_at DESC, o.id",
            RECORD_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(
                params![organization_id.to_string(), type_id.to_string()],
                row_to_record,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
