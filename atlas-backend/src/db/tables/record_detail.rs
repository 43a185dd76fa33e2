//! Multi-query record detail assembly

use rusqlite::Connection;
use uuid::Uuid;

use super::super::sqlite::{
    get_opt_uuid, get_timestamp, get_uuid, parse_opt_timestamp, Database, DbResult,
};
use super::notes::select_notes_for_record;
use super::records::find_record;
use super::type_values::{select_value_views, ValueVisibility};
use crate::caller::Caller;
use crate::models::{PublicRecordDetail, RecordDetail, StepAndFunnel, Tag, Task};

fn select_tags(conn: &Connection, record_id: Uuid) -> DbResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.color FROM tags t
         JOIN record_tags rt ON rt.tag_id = t.id
         WHERE rt.record_id = ?1
         ORDER BY t.name",
    )?;
    let tags = stmt
        .query_map([record_id.to_string()], |row| {
            Ok(Tag {
                id: get_uuid(row, 0)?,
                name: row.get(1)?,
                color: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tags)
}

fn select_tasks(conn: &Connection, record_id: Uuid) -> DbResult<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT k.id, k.content, k.deadline, k.status, k.assigned_id, k.created_at FROM tasks k
         JOIN task_records tr ON tr.task_id = k.id
         WHERE tr.record_id = ?1 AND k.deleted_at IS NULL
         ORDER BY k.created_at DESC",
    )?;
    let tasks = stmt
        .query_map([record_id.to_string()], |row| {
            Ok(Task {
                id: get_uuid(row, 0)?,
                content: row.get(1)?,
                deadline: parse_opt_timestamp(2, row.get(2)?)?,
                status: row.get(3)?,
                assigned_id: get_opt_uuid(row, 4)?,
                created_at: get_timestamp(row, 5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

fn select_steps(conn: &Connection, record_id: Uuid) -> DbResult<Vec<StepAndFunnel>> {
    let mut stmt = conn.prepare(
        "SELECT rs.id, s.id, s.name, f.id, f.name, rs.sub_status, rs.created_at
         FROM record_steps rs
         JOIN steps s ON s.id = rs.step_id
         JOIN funnels f ON f.id = s.funnel_id
         WHERE rs.record_id = ?1 AND rs.deleted_at IS NULL
         ORDER BY f.name, s.step_order",
    )?;
    let steps = stmt
        .query_map([record_id.to_string()], |row| {
            Ok(StepAndFunnel {
                id: get_uuid(row, 0)?,
                step_id: get_uuid(row, 1)?,
                step_name: row.get(2)?,
                funnel_id: get_uuid(row, 3)?,
                funnel_name: row.get(4)?,
                sub_status: row.get(5)?,
                created_at: get_timestamp(row, 6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(steps)
}

impl Database {
    /// Everything shown on a record page, read in one transaction. Any failing
    /// sub-query fails the whole read.
    pub fn record_detail(&self, caller: &Caller, id: Uuid) -> DbResult<Option<RecordDetail>> {
        self.with_read_transaction(|tx| {
            let Some(record) = find_record(tx, caller.organization_id, id)? else {
                return Ok(None);
            };

            Ok(Some(RecordDetail {
                tags: select_tags(tx, id)?,
                type_values: select_value_views(tx, id, ValueVisibility::Caller(caller))?,
                tasks: select_tasks(tx, id)?,
                steps_and_funnels: select_steps(tx, id)?,
                notes: select_notes_for_record(tx, id)?,
                record,
            }))
        })
    }

    /// Unauthenticated view: the record, its notes and values of public types.
    pub fn public_record_detail(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> DbResult<Option<PublicRecordDetail>> {
        self.with_read_transaction(|tx| {
            let Some(record) = find_record(tx, organization_id, id)? else {
                return Ok(None);
            };

            Ok(Some(PublicRecordDetail {
                type_values: select_value_views(tx, id, ValueVisibility::Public)?,
                notes: select_notes_for_record(tx, id)?,
                record,
            }))
        })
    }
}
