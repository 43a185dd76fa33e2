//! Full-text matching across the three indexed sources
//!
//! Ranking, merging and paging run in SQL: the per-source matches are unioned,
//! each record keeps its best source, and only the requested page window is
//! read back. Headlines are computed for that window alone.

use rusqlite::types::Type;
use rusqlite::{Connection, ToSql};
use std::collections::HashMap;
use uuid::Uuid;

use super::super::sqlite::{get_uuid, Database, DbResult};
use super::access_grants::type_visibility_predicate;
use super::records::find_records;
use crate::caller::Caller;
use crate::models::{Headlines, MatchSource, PageParams, Record, SearchHit, SourceMatch};

/// Tokens of context kept around highlighted terms
const SNIPPET_TOKENS: i64 = 12;

/// Markers handed to `snippet()`. They never occur in indexed text and are
/// swapped for `<b>`/`</b>` after the excerpt is escaped.
const MARK_OPEN: char = '\u{2}';
const MARK_CLOSE: char = '\u{3}';

struct Source {
    kind: MatchSource,
    table: &'static str,
    /// Column passed to `snippet()`; -1 lets FTS5 pick the best one
    snippet_column: i64,
    joins: &'static str,
}

const SOURCES: [Source; 3] = [
    Source {
        kind: MatchSource::Field,
        table: "records_fts",
        snippet_column: -1,
        joins: "JOIN objects o ON o.id = records_fts.record_id",
    },
    // one row per (note, linked record) pair
    Source {
        kind: MatchSource::Note,
        table: "notes_fts",
        snippet_column: 1,
        joins: "JOIN note_records nr ON nr.note_id = notes_fts.note_id
                JOIN objects o ON o.id = nr.record_id",
    },
    Source {
        kind: MatchSource::TypedValue,
        table: "type_values_fts",
        snippet_column: 1,
        joins: "JOIN obj_type_values v ON v.id = type_values_fts.value_id
                JOIN objects o ON o.id = v.obj_id",
    },
];

/// Keeps each record's best source: highest rank, equal ranks resolved by
/// source priority. Reads a `matches(record_id, created_at, source, priority,
/// rank)` relation defined by the enclosing `WITH`.
const BEST_PER_RECORD: &str = "best AS (
    SELECT record_id, created_at, source, rank,
           ROW_NUMBER() OVER (
               PARTITION BY record_id ORDER BY rank DESC, priority DESC
           ) AS pos
    FROM matches
)
SELECT record_id, source, rank FROM best
WHERE pos = 1
ORDER BY rank DESC, created_at DESC, record_id";

/// Build an FTS5 MATCH expression: every word becomes a quoted prefix term
/// and terms are OR-ed. Words with no letters or digits carry nothing the
/// tokenizer would keep and are dropped. `None` when nothing is searchable.
pub fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .map(|word| format!("\"{}\"*", word.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// One source's matches for the caller as `record_id, rank, <extra>`.
/// Pushes the statement's parameters in placeholder order.
fn source_select(
    source: &Source,
    caller: &Caller,
    fts: &str,
    extra: &str,
    params: &mut Vec<Box<dyn ToSql>>,
) -> String {
    let mut sql = format!(
        "SELECT o.id AS record_id, -bm25({table}) AS rank, {extra}
         FROM {table} {joins}
         WHERE {table} MATCH ? AND o.org_id = ? AND o.deleted_at IS NULL",
        table = source.table,
        joins = source.joins,
        extra = extra,
    );
    params.push(Box::new(fts.to_string()));
    params.push(Box::new(caller.organization_id.to_string()));

    // payload matches only count for types the caller can see
    if source.kind == MatchSource::TypedValue {
        let (visible, param) = type_visibility_predicate(caller, "v.type_id");
        sql.push_str(" AND ");
        sql.push_str(&visible);
        params.push(Box::new(param));
    }
    sql
}

fn matches_cte(caller: &Caller, fts: &str, params: &mut Vec<Box<dyn ToSql>>) -> String {
    let members: Vec<String> = SOURCES
        .iter()
        .map(|source| {
            let extra = format!(
                "o.created_at AS created_at, '{}' AS source, {} AS priority",
                source.kind.as_ref(),
                source.kind.priority()
            );
            source_select(source, caller, fts, &extra, params)
        })
        .collect();
    format!("WITH matches AS ({})", members.join(" UNION ALL "))
}

fn as_params(params: &[Box<dyn ToSql>]) -> Vec<&dyn ToSql> {
    params.iter().map(|p| p.as_ref()).collect()
}

/// Distinct records matched by any source.
fn count_matches(conn: &Connection, caller: &Caller, fts: &str) -> DbResult<i64> {
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();
    let sql = format!(
        "{} SELECT COUNT(DISTINCT record_id) FROM matches",
        matches_cte(caller, fts, &mut params)
    );
    Ok(conn.query_row(&sql, as_params(&params).as_slice(), |row| row.get(0))?)
}

struct RankedRow {
    record_id: Uuid,
    source: MatchSource,
    rank: f64,
}

fn row_to_ranked(row: &rusqlite::Row) -> rusqlite::Result<RankedRow> {
    let source: String = row.get(1)?;
    let source = source
        .parse::<MatchSource>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(RankedRow {
        record_id: get_uuid(row, 0)?,
        source,
        rank: row.get(2)?,
    })
}

/// The requested page of records, best first.
fn ranked_window(
    conn: &Connection,
    caller: &Caller,
    fts: &str,
    page: PageParams,
) -> DbResult<Vec<RankedRow>> {
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();
    let sql = format!(
        "{}, {} LIMIT ? OFFSET ?",
        matches_cte(caller, fts, &mut params),
        BEST_PER_RECORD
    );
    params.push(Box::new(page.limit()));
    params.push(Box::new(page.offset()));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(as_params(&params).as_slice(), row_to_ranked)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Escape an excerpt for HTML and turn the snippet markers into `<b>` tags.
pub(crate) fn render_headline(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            MARK_OPEN => out.push_str("<b>"),
            MARK_CLOSE => out.push_str("</b>"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Per-source headlines for the given records.
fn window_matches(
    conn: &Connection,
    caller: &Caller,
    fts: &str,
    ids: &[Uuid],
) -> DbResult<Vec<SourceMatch>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let mut matches = Vec::new();
    for source in &SOURCES {
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        let extra = format!(
            "snippet({}, {}, '{}', '{}', '...', {})",
            source.table, source.snippet_column, MARK_OPEN, MARK_CLOSE, SNIPPET_TOKENS
        );
        let mut sql = source_select(source, caller, fts, &extra, &mut params);
        sql.push_str(&format!(" AND o.id IN ({})", placeholders));
        params.extend(ids.iter().map(|id| Box::new(id.to_string()) as Box<dyn ToSql>));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(as_params(&params).as_slice(), |row| {
            let headline: String = row.get(2)?;
            Ok(SourceMatch {
                record_id: get_uuid(row, 0)?,
                source: source.kind,
                rank: row.get(1)?,
                headline: render_headline(&headline),
            })
        })?;
        for m in rows {
            matches.push(m?);
        }
    }
    Ok(matches)
}

/// Within one source the best-ranked match supplies the record's headline.
pub(crate) fn best_headlines(matches: Vec<SourceMatch>) -> HashMap<Uuid, Headlines> {
    let mut best: HashMap<(Uuid, MatchSource), SourceMatch> = HashMap::new();
    for m in matches {
        let key = (m.record_id, m.source);
        let replace = best.get(&key).is_none_or(|current| m.rank > current.rank);
        if replace {
            best.insert(key, m);
        }
    }

    let mut headlines: HashMap<Uuid, Headlines> = HashMap::new();
    for m in best.into_values() {
        headlines.entry(m.record_id).or_default().set(m.source, m.headline);
    }
    headlines
}

impl Database {
    /// One page of ranked hits for an FTS expression built by [`fts_query`],
    /// with the total number of matching records. All reads share a snapshot.
    pub fn search_records(
        &self,
        caller: &Caller,
        fts: &str,
        page: PageParams,
    ) -> DbResult<(Vec<SearchHit>, i64)> {
        self.with_read_transaction(|tx| {
            let total = count_matches(tx, caller, fts)?;
            let window = ranked_window(tx, caller, fts, page)?;

            let ids: Vec<Uuid> = window.iter().map(|r| r.record_id).collect();
            let mut headlines = best_headlines(window_matches(tx, caller, fts, &ids)?);
            let mut records: HashMap<Uuid, Record> = find_records(tx, caller.organization_id, &ids)?
                .into_iter()
                .map(|r| (r.id, r))
                .collect();

            let hits: Vec<SearchHit> = window
                .into_iter()
                .filter_map(|r| {
                    let record = records.remove(&r.record_id)?;
                    Some(SearchHit {
                        record,
                        match_source: Some(r.source),
                        rank: r.rank,
                        headlines: headlines.remove(&r.record_id).unwrap_or_default(),
                    })
                })
                .collect();

            log::debug!("[SEARCH] {} of {} records for {:?}", hits.len(), total, fts);
            Ok((hits, total))
        })
    }
}
