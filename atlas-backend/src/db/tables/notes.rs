//! Free-text notes linked to records

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::super::sqlite::{
    get_timestamp, get_uuid, now, parse_opt_timestamp, timestamp, Database, DbResult,
};
use super::records::find_records;
use crate::caller::Caller;
use crate::models::{Note, NoteRequest};

fn row_to_note(row: &rusqlite::Row) -> rusqlite::Result<Note> {
    Ok(Note {
        id: get_uuid(row, 0)?,
        organization_id: get_uuid(row, 1)?,
        creator_id: get_uuid(row, 2)?,
        text: row.get(3)?,
        location: row.get(4)?,
        happened_at: parse_opt_timestamp(5, row.get(5)?)?,
        created_at: get_timestamp(row, 6)?,
    })
}

/// Notes linked to a record, most recent first.
pub(crate) fn select_notes_for_record(conn: &Connection, record_id: Uuid) -> DbResult<Vec<Note>> {
    let mut stmt = conn.prepare(
        "SELECT n.id, n.org_id, n.creator_id, n.text, n.location, n.happened_at, n.created_at
         FROM notes n
         JOIN note_records nr ON nr.note_id = n.id
         WHERE nr.record_id = ?1
         ORDER BY COALESCE(n.happened_at, n.created_at) DESC, n.id",
    )?;
    let notes = stmt
        .query_map([record_id.to_string()], row_to_note)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notes)
}

impl Database {
    /// Insert a note and its record links. `None` when any linked record is
    /// not a live record of the caller's organization; nothing is written then.
    pub fn create_note(&self, caller: &Caller, req: NoteRequest) -> DbResult<Option<Note>> {
        let note = Note {
            id: Uuid::new_v4(),
            organization_id: caller.organization_id,
            creator_id: caller.creator_id,
            text: req.text,
            location: req.location,
            happened_at: req.happened_at,
            created_at: now(),
        };
        let record_ids = req.record_ids;

        self.with_transaction(|tx| {
            let linked = find_records(tx, caller.organization_id, &record_ids)?;
            if linked.len() != record_ids.len() {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO notes (id, org_id, creator_id, text, location, happened_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    note.id.to_string(),
                    note.organization_id.to_string(),
                    note.creator_id.to_string(),
                    &note.text,
                    &note.location,
                    note.happened_at.as_ref().map(timestamp),
                    timestamp(&note.created_at),
                ],
            )?;
            for record_id in &record_ids {
                tx.execute(
                    "INSERT INTO note_records (note_id, record_id) VALUES (?1, ?2)",
                    params![note.id.to_string(), record_id.to_string()],
                )?;
            }
            tx.execute(
                "INSERT INTO notes_fts (note_id, text) VALUES (?1, ?2)",
                params![note.id.to_string(), &note.text],
            )?;
            Ok(Some(note))
        })
    }

    pub fn delete_note(&self, organization_id: Uuid, id: Uuid) -> DbResult<bool> {
        self.with_transaction(|tx| {
            let changed = tx.execute(
                "DELETE FROM notes WHERE id = ?1 AND org_id = ?2",
                params![id.to_string(), organization_id.to_string()],
            )?;
            if changed > 0 {
                tx.execute("DELETE FROM notes_fts WHERE note_id = ?1", [id.to_string()])?;
            }
            Ok(changed > 0)
        })
    }

    #[cfg(test)]
    pub fn notes_for_record(&self, record_id: Uuid) -> DbResult<Vec<Note>> {
        let conn = self.conn()?;
        select_notes_for_record(&conn, record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::Role;
    use crate::db::sqlite::testing::test_db;
    use crate::models::RecordRequest;

    fn record(db: &Database, caller: &Caller, name: &str) -> Uuid {
        db.create_record(
            caller,
            RecordRequest {
                name: name.to_string(),
                ..Default::default()
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_note_links_records() {
        let (_dir, db) = test_db();
        let caller = Caller::new(Uuid::new_v4(), Uuid::new_v4(), Role::Member);
        let acme = record(&db, &caller, "Acme");
        let globex = record(&db, &caller, "Globex");

        let note = db
            .create_note(
                &caller,
                NoteRequest {
                    text: "Met at the trade fair".to_string(),
                    record_ids: vec![acme, globex],
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(db.notes_for_record(acme).unwrap()[0].id, note.id);
        assert_eq!(db.notes_for_record(globex).unwrap().len(), 1);

        assert!(db.delete_note(caller.organization_id, note.id).unwrap());
        assert!(db.notes_for_record(acme).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_record_writes_nothing() {
        let (_dir, db) = test_db();
        let caller = Caller::new(Uuid::new_v4(), Uuid::new_v4(), Role::Member);
        let acme = record(&db, &caller, "Acme");

        let created = db
            .create_note(
                &caller,
                NoteRequest {
                    text: "Orphan".to_string(),
                    record_ids: vec![acme, Uuid::new_v4()],
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(created.is_none());

        let count: i64 = db
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
