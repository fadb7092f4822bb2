use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::entities::{Breeder, Dog, Litter, DATE_FORMAT};
use crate::grading::DogScores;
use crate::ids::normalize_id;
use crate::parser::Field;

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // Breeder deletes null out dog/litter links instead of cascading
    conn.pragma_update(None, "foreign_keys", "ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS breeders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bg_person_id TEXT UNIQUE,
            first_name TEXT,
            last_name TEXT,
            kennel_name TEXT,
            city TEXT,
            state TEXT,
            country TEXT,
            email TEXT,
            phone TEXT,
            website TEXT,
            dogs_bred_count INTEGER NOT NULL DEFAULT 0,
            litters_count INTEGER NOT NULL DEFAULT 0,
            grade REAL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS dogs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bg_dog_id TEXT UNIQUE,
            registered_name TEXT,
            call_name TEXT,
            sex TEXT,
            birth_date TEXT,
            death_date TEXT,
            age_years INTEGER,
            color TEXT,
            -- Breeder link
            breeder_id INTEGER REFERENCES breeders(id) ON DELETE SET NULL,
            breeder_name TEXT,
            -- Health clearances (free text from the registry)
            hip_rating TEXT,
            elbow_rating TEXT,
            heart_status TEXT,
            eye_status TEXT,
            dm_status TEXT,
            dna_status TEXT,
            ofa_certified INTEGER NOT NULL DEFAULT 0,
            -- Pedigree: external dog ids, deliberately not foreign keys
            sire_id TEXT,
            dam_id TEXT,
            sire_name TEXT,
            dam_name TEXT,
            -- Registration & details
            primary_image TEXT,
            registration_number TEXT,
            dna_number TEXT,
            microchip TEXT,
            titles TEXT,
            owner_name TEXT,
            owner_id TEXT,
            weight TEXT,
            height TEXT,
            bite TEXT,
            tail TEXT,
            eye_color TEXT,
            stud_book TEXT,
            frozen_semen INTEGER NOT NULL DEFAULT 0,
            rescue_type TEXT,
            litter_id TEXT,
            -- Grading
            health_score REAL,
            longevity_score REAL,
            pedigree_longevity_score REAL,
            grade REAL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS litters (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bg_litter_id TEXT UNIQUE,
            birth_date TEXT,
            birth_year INTEGER,
            sire_id TEXT,
            dam_id TEXT,
            sire_name TEXT,
            dam_name TEXT,
            breeder_id INTEGER REFERENCES breeders(id) ON DELETE SET NULL,
            breeder_name TEXT,
            puppies_count INTEGER,
            males_count INTEGER,
            females_count INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Import events (audit trail: one row per pipeline stage run)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS import_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            stage TEXT NOT NULL,
            source_file TEXT,
            source_sha256 TEXT,
            counts TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_breeders_state ON breeders(state);
         CREATE INDEX IF NOT EXISTS idx_breeders_country ON breeders(country);
         CREATE INDEX IF NOT EXISTS idx_breeders_kennel ON breeders(kennel_name);
         CREATE INDEX IF NOT EXISTS idx_breeders_grade ON breeders(grade);
         CREATE INDEX IF NOT EXISTS idx_dogs_breeder ON dogs(breeder_id);
         CREATE INDEX IF NOT EXISTS idx_dogs_grade ON dogs(grade);
         CREATE INDEX IF NOT EXISTS idx_dogs_birth_date ON dogs(birth_date);
         CREATE INDEX IF NOT EXISTS idx_dogs_age ON dogs(age_years);
         CREATE INDEX IF NOT EXISTS idx_dogs_registered_name ON dogs(registered_name);
         CREATE INDEX IF NOT EXISTS idx_litters_birth_year ON litters(birth_year);
         CREATE INDEX IF NOT EXISTS idx_litters_sire ON litters(sire_id);
         CREATE INDEX IF NOT EXISTS idx_litters_dam ON litters(dam_id);
         CREATE INDEX IF NOT EXISTS idx_events_stage ON import_events(stage);",
    )?;

    Ok(())
}

/// Empty all three entity stores (`import --fresh`)
pub fn truncate_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM litters;
         DELETE FROM dogs;
         DELETE FROM breeders;",
    )
    .context("Failed to truncate entity tables")?;
    Ok(())
}

// ============================================================================
// ENTITY KINDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Breeder,
    Dog,
    Litter,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Breeder => "breeders",
            EntityKind::Dog => "dogs",
            EntityKind::Litter => "litters",
        }
    }

    /// Column holding the external registry id
    pub fn key_column(&self) -> &'static str {
        match self {
            EntityKind::Breeder => "bg_person_id",
            EntityKind::Dog => "bg_dog_id",
            EntityKind::Litter => "bg_litter_id",
        }
    }
}

// ============================================================================
// PATCH (partial update)
// ============================================================================

/// Column assignments for one upsert. Columns the source file did not carry
/// are simply never added, so an update leaves them untouched.
#[derive(Debug, Clone, Default)]
pub struct Patch {
    columns: Vec<(&'static str, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Unconditional assignment
    pub fn set(&mut self, column: &'static str, value: Value) -> &mut Self {
        self.columns.retain(|(c, _)| *c != column);
        self.columns.push((column, value));
        self
    }

    pub fn text(&mut self, column: &'static str, field: &Field<String>) -> &mut Self {
        match field {
            Field::Missing => self,
            Field::Null => self.set(column, Value::Null),
            Field::Value(v) => self.set(column, Value::Text(v.clone())),
        }
    }

    pub fn int(&mut self, column: &'static str, field: &Field<i64>) -> &mut Self {
        match field {
            Field::Missing => self,
            Field::Null => self.set(column, Value::Null),
            Field::Value(v) => self.set(column, Value::Integer(*v)),
        }
    }

    /// NOT NULL counter columns: unparseable or empty cells count as 0
    pub fn count(&mut self, column: &'static str, field: &Field<i64>) -> &mut Self {
        match field {
            Field::Missing => self,
            Field::Null => self.set(column, Value::Integer(0)),
            Field::Value(v) => self.set(column, Value::Integer(*v)),
        }
    }

    pub fn date(&mut self, column: &'static str, field: &Field<NaiveDate>) -> &mut Self {
        match field {
            Field::Missing => self,
            Field::Null => self.set(column, Value::Null),
            Field::Value(d) => self.set(column, Value::Text(d.format(DATE_FORMAT).to_string())),
        }
    }

    pub fn flag(&mut self, column: &'static str, field: &Field<bool>) -> &mut Self {
        match field {
            Field::Missing => self,
            Field::Null => self.set(column, Value::Integer(0)),
            Field::Value(b) => self.set(column, Value::Integer(*b as i64)),
        }
    }

    /// Only assigns when there is a value (never clears)
    pub fn text_if_some(&mut self, column: &'static str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.set(column, Value::Text(v.to_string())),
            None => self,
        }
    }
}

// ============================================================================
// UPSERT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub id: i64,
    pub created: bool,
}

/// Merge one record into an entity store, keyed by normalized external id.
///
/// Found → update only the patched columns in place (internal id unchanged).
/// Not found → insert a new row. A `None` external id never matches anything
/// and always inserts.
///
/// The key is looked up on every call (unique index), not from a snapshot,
/// so a row inserted earlier in the same file is found by later rows and the
/// last row for a key wins.
pub fn upsert(
    conn: &Connection,
    kind: EntityKind,
    external_id: Option<&str>,
    patch: &Patch,
) -> Result<Upserted> {
    let external_id = normalize_id(external_id);
    let table = kind.table();
    let key = kind.key_column();

    let existing: Option<i64> = match &external_id {
        Some(ext) => conn
            .query_row(
                &format!("SELECT id FROM {} WHERE {} = ?1", table, key),
                [ext],
                |row| row.get(0),
            )
            .optional()?,
        None => None,
    };

    if let Some(id) = existing {
        if !patch.is_empty() {
            let assignments: Vec<String> = patch
                .columns
                .iter()
                .enumerate()
                .map(|(i, (col, _))| format!("{} = ?{}", col, i + 1))
                .collect();
            let sql = format!(
                "UPDATE {} SET {}, updated_at = CURRENT_TIMESTAMP WHERE id = ?{}",
                table,
                assignments.join(", "),
                patch.columns.len() + 1
            );
            let mut values: Vec<Value> = patch.columns.iter().map(|(_, v)| v.clone()).collect();
            values.push(Value::Integer(id));
            conn.execute(&sql, rusqlite::params_from_iter(values))
                .with_context(|| format!("Failed to update {} row {}", table, id))?;
        }
        return Ok(Upserted { id, created: false });
    }

    let mut columns = vec![key];
    let mut values = vec![external_id.map(Value::Text).unwrap_or(Value::Null)];
    for (col, value) in &patch.columns {
        columns.push(*col);
        values.push(value.clone());
    }
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, rusqlite::params_from_iter(values))
        .with_context(|| format!("Failed to insert into {}", table))?;

    Ok(Upserted {
        id: conn.last_insert_rowid(),
        created: true,
    })
}

// ============================================================================
// LOOKUP SNAPSHOTS
// ============================================================================

/// External id → internal id for one entity store.
///
/// Built with a single full-table read and then passed by reference into
/// the import/linking stages that need it. It is a snapshot: rows inserted
/// afterwards are not visible through it.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    ids: HashMap<String, i64>,
}

impl IdMap {
    pub fn load(conn: &Connection, kind: EntityKind) -> Result<Self> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, id FROM {} WHERE {} IS NOT NULL",
            kind.key_column(),
            kind.table(),
            kind.key_column()
        ))?;

        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_pairs(pairs))
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: AsRef<str>,
    {
        IdMap {
            ids: pairs
                .into_iter()
                .filter_map(|(ext, id)| normalize_id(Some(ext.as_ref())).map(|k| (k, id)))
                .collect(),
        }
    }

    /// Lookup by external id (normalized before comparing)
    pub fn get(&self, external_id: &str) -> Option<i64> {
        normalize_id(Some(external_id)).and_then(|key| self.ids.get(&key).copied())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ============================================================================
// READS
// ============================================================================

pub fn get_all_dogs(conn: &Connection) -> Result<Vec<Dog>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM dogs ORDER BY id", Dog::COLUMNS))?;
    let dogs = stmt
        .query_map([], |row| Dog::from_sql(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dogs)
}

pub fn get_dog(conn: &Connection, id: i64) -> Result<Option<Dog>> {
    let dog = conn
        .query_row(
            &format!("SELECT {} FROM dogs WHERE id = ?1", Dog::COLUMNS),
            [id],
            |row| Dog::from_sql(row),
        )
        .optional()?;
    Ok(dog)
}

/// Resolve a soft reference: the dog whose external id matches, if any
pub fn find_dog_by_external_id(conn: &Connection, external_id: &str) -> Result<Option<Dog>> {
    let Some(key) = normalize_id(Some(external_id)) else {
        return Ok(None);
    };
    let dog = conn
        .query_row(
            &format!("SELECT {} FROM dogs WHERE bg_dog_id = ?1", Dog::COLUMNS),
            [key],
            |row| Dog::from_sql(row),
        )
        .optional()?;
    Ok(dog)
}

pub fn get_all_breeders(conn: &Connection) -> Result<Vec<Breeder>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM breeders ORDER BY id",
        Breeder::COLUMNS
    ))?;
    let breeders = stmt
        .query_map([], |row| Breeder::from_sql(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(breeders)
}

pub fn get_all_litters(conn: &Connection) -> Result<Vec<Litter>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM litters ORDER BY id",
        Litter::COLUMNS
    ))?;
    let litters = stmt
        .query_map([], |row| Litter::from_sql(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(litters)
}

pub fn count(conn: &Connection, kind: EntityKind) -> Result<i64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", kind.table()),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

// ============================================================================
// SCORE WRITES
// ============================================================================

/// Persist the four dog scores plus (possibly derived) age
pub fn update_dog_scores(conn: &Connection, dog_id: i64, scores: &DogScores) -> Result<()> {
    conn.execute(
        "UPDATE dogs
         SET age_years = ?1, health_score = ?2, longevity_score = ?3,
             pedigree_longevity_score = ?4, grade = ?5, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?6",
        params![
            scores.age_years,
            scores.health_score,
            scores.longevity_score,
            scores.pedigree_longevity_score,
            scores.grade,
            dog_id
        ],
    )?;
    Ok(())
}

pub fn update_breeder_grade(conn: &Connection, breeder_id: i64, grade: f64) -> Result<()> {
    conn.execute(
        "UPDATE breeders SET grade = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
        params![grade, breeder_id],
    )?;
    Ok(())
}

// ============================================================================
// IMPORT EVENTS (audit trail)
// ============================================================================

/// One pipeline stage run, as recorded in `import_events`
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImportEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub stage: String,
    pub source_file: Option<String>,
    pub source_sha256: Option<String>,
    pub counts: serde_json::Value,
}

impl ImportEvent {
    pub fn new(stage: &str, source: Option<&Path>, counts: serde_json::Value) -> Result<Self> {
        let source_sha256 = match source {
            Some(path) => Some(file_sha256(path)?),
            None => None,
        };
        Ok(Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            stage: stage.to_string(),
            source_file: source.map(|p| p.display().to_string()),
            source_sha256,
            counts,
        })
    }
}

/// Fingerprint of an input file, so a run can be tied to the exact extract
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn insert_event(conn: &Connection, event: &ImportEvent) -> Result<()> {
    let counts_json = serde_json::to_string(&event.counts)?;

    conn.execute(
        "INSERT INTO import_events (
            event_id, timestamp, stage, source_file, source_sha256, counts
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.stage,
            event.source_file,
            event.source_sha256,
            counts_json,
        ],
    )?;

    Ok(())
}

/// Most recent events first
pub fn get_recent_events(conn: &Connection, limit: usize) -> Result<Vec<ImportEvent>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, stage, source_file, source_sha256, counts
         FROM import_events
         ORDER BY id DESC
         LIMIT ?1",
    )?;

    let events = stmt
        .query_map([limit as i64], |row| {
            let timestamp_str: String = row.get(1)?;
            let counts_json: String = row.get(5)?;

            Ok(ImportEvent {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?
                    .with_timezone(&Utc),
                stage: row.get(2)?,
                source_file: row.get(3)?,
                source_sha256: row.get(4)?,
                counts: serde_json::from_str(&counts_json)
                    .map_err(|_| rusqlite::Error::InvalidQuery)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}
