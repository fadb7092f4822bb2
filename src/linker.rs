// 🔗 Cross-Reference Linker - Resolve soft references between stores
//
// Three passes, each with its own overwrite policy:
// 1. Dog → Breeder from the breeder-side `dogs_bred_ids` lists (insert-only)
// 2. Litter → sire/dam from explicit detail ids (overwrites when supplied)
// 3. Litter → sire/dam by registered name (fills empty slots only)
//
// Lookups go through `IdMap`/`NameIndex` snapshots built once per pass.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::db::IdMap;
use crate::ids::{is_numeric_id, normalize_id, normalize_name};
use crate::parser::{BreederDogsRecord, LitterDetailRecord};

// ============================================================================
// DOG → BREEDER (dogs_bred_ids)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreederLinkReport {
    pub rows: usize,
    /// Dogs whose breeder link was set by this run
    pub linked: usize,
    /// Dogs that already had a breeder; left untouched
    pub already_linked: usize,
    /// Dog ids listed in the file but not in the dog store
    pub not_found: usize,
    /// Non-numeric entries in an id list
    pub invalid: usize,
    /// Rows whose breeder is not in the breeder store
    pub unknown_breeder: usize,
}

/// Link dogs to the breeders whose `dogs_bred_ids` list them.
///
/// Never overwrites: a dog that already has a breeder keeps it, however
/// many times this runs and whatever the file says.
pub fn link_dogs_by_breeder_ids<I>(
    conn: &Connection,
    records: I,
    breeders: &IdMap,
    dogs: &IdMap,
) -> Result<BreederLinkReport>
where
    I: IntoIterator<Item = BreederDogsRecord>,
{
    let mut report = BreederLinkReport::default();
    let tx = conn.unchecked_transaction()?;

    {
        let mut link = tx.prepare(
            "UPDATE dogs SET breeder_id = ?1, breeder_name = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3 AND breeder_id IS NULL",
        )?;

        for record in records {
            report.rows += 1;

            if record.dogs_bred_ids.is_empty() {
                continue;
            }
            let Some(breeder_id) = record.bg_person_id.as_deref().and_then(|id| breeders.get(id)) else {
                report.unknown_breeder += 1;
                continue;
            };

            for dog_ext in &record.dogs_bred_ids {
                if !is_numeric_id(dog_ext) {
                    report.invalid += 1;
                    continue;
                }
                let Some(dog_id) = dogs.get(dog_ext) else {
                    report.not_found += 1;
                    continue;
                };

                let changed = link.execute(params![breeder_id, record.display_name(), dog_id])?;
                if changed > 0 {
                    report.linked += 1;
                } else {
                    report.already_linked += 1;
                }
            }
        }
    }

    tx.commit()?;
    info!(
        linked = report.linked,
        already_linked = report.already_linked,
        not_found = report.not_found,
        "Linked dogs to breeders"
    );
    Ok(report)
}

// ============================================================================
// LITTER → SIRE/DAM (explicit ids)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LitterIdReport {
    pub rows: usize,
    pub updated: usize,
    /// Litter found, but the supplied ids were already stored (or none supplied)
    pub unchanged: usize,
    pub not_found: usize,
    /// Rows without a litter id
    pub skipped: usize,
}

/// Backfill litter sire/dam ids from the litter detail extract.
///
/// A supplied id overwrites whatever is stored; an absent one (empty or
/// "None") leaves the stored value alone.
pub fn backfill_litter_parent_ids<I>(conn: &Connection, records: I, litters: &IdMap) -> Result<LitterIdReport>
where
    I: IntoIterator<Item = LitterDetailRecord>,
{
    let mut report = LitterIdReport::default();
    let tx = conn.unchecked_transaction()?;

    for record in records {
        report.rows += 1;

        let Some(key) = record.bg_litter_id.as_deref() else {
            report.skipped += 1;
            continue;
        };
        let Some(litter_id) = litters.get(key) else {
            report.not_found += 1;
            continue;
        };

        let stored: Option<(Option<String>, Option<String>)> = tx
            .query_row(
                "SELECT sire_id, dam_id FROM litters WHERE id = ?1",
                [litter_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((sire, dam)) = stored else {
            report.not_found += 1;
            continue;
        };

        let new_sire = record.sire_dog_id.clone().or(sire.clone());
        let new_dam = record.dam_dog_id.clone().or(dam.clone());
        if new_sire == sire && new_dam == dam {
            report.unchanged += 1;
            continue;
        }

        tx.execute(
            "UPDATE litters SET sire_id = ?1, dam_id = ?2, updated_at = CURRENT_TIMESTAMP WHERE id = ?3",
            params![new_sire, new_dam, litter_id],
        )?;
        report.updated += 1;
    }

    tx.commit()?;
    info!(updated = report.updated, not_found = report.not_found, "Backfilled litter parent ids");
    Ok(report)
}

// ============================================================================
// LITTER → SIRE/DAM (name fallback)
// ============================================================================

/// Uppercased registered name → external dog id.
///
/// Built in row-id order, so when two dogs share a name the later row wins.
/// That makes the fallback lossy for duplicate names; it is a best-effort
/// match, not an identity.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    names: HashMap<String, String>,
}

impl NameIndex {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT registered_name, bg_dog_id FROM dogs
             WHERE registered_name IS NOT NULL AND bg_dog_id IS NOT NULL
             ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut pairs = Vec::new();
        for row in rows {
            pairs.push(row?);
        }
        Ok(Self::from_pairs(pairs))
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut names = HashMap::new();
        for (name, id) in pairs {
            if let (Some(name), Some(id)) = (normalize_name(Some(name.as_ref())), normalize_id(Some(id.as_ref()))) {
                names.insert(name, id);
            }
        }
        NameIndex { names }
    }

    pub fn get(&self, name: Option<&str>) -> Option<&str> {
        normalize_name(name).and_then(|key| self.names.get(&key).map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameLinkReport {
    /// Litters whose links were wiped first (`--fresh`)
    pub cleared: usize,
    pub names_indexed: usize,
    /// Litters missing a sire or a dam id
    pub candidates: usize,
    pub sires_linked: usize,
    pub dams_linked: usize,
}

/// Fill empty litter sire/dam ids by matching the stored parent names
/// against dogs' registered names. With `fresh`, all litter parent ids are
/// cleared first.
pub fn link_litters_by_name(conn: &Connection, fresh: bool) -> Result<NameLinkReport> {
    let mut report = NameLinkReport::default();
    let tx = conn.unchecked_transaction()?;

    if fresh {
        report.cleared = tx.execute(
            "UPDATE litters SET sire_id = NULL, dam_id = NULL, updated_at = CURRENT_TIMESTAMP",
            [],
        )?;
        info!(cleared = report.cleared, "Cleared litter parent links");
    }

    let index = NameIndex::load(&tx)?;
    report.names_indexed = index.len();

    let candidates: Vec<(i64, Option<String>, Option<String>, Option<String>, Option<String>)> = {
        let mut stmt = tx.prepare(
            "SELECT id, sire_id, dam_id, sire_name, dam_name FROM litters
             WHERE sire_id IS NULL OR sire_id = '' OR dam_id IS NULL OR dam_id = ''
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    report.candidates = candidates.len();

    for (litter_id, sire_id, dam_id, sire_name, dam_name) in candidates {
        let sire = match normalize_id(sire_id.as_deref()) {
            Some(_) => None,
            None => index.get(sire_name.as_deref()),
        };
        let dam = match normalize_id(dam_id.as_deref()) {
            Some(_) => None,
            None => index.get(dam_name.as_deref()),
        };

        if let Some(id) = sire {
            tx.execute(
                "UPDATE litters SET sire_id = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![id, litter_id],
            )?;
            report.sires_linked += 1;
        }
        if let Some(id) = dam {
            tx.execute(
                "UPDATE litters SET dam_id = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![id, litter_id],
            )?;
            report.dams_linked += 1;
        }
    }

    tx.commit()?;
    debug!(names = report.names_indexed, candidates = report.candidates, "Name index built");
    info!(sires = report.sires_linked, dams = report.dams_linked, "Linked litters by name");
    Ok(report)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_all_litters, get_dog, setup_database, upsert, EntityKind, Patch};
    use crate::parser::Field;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn breeder_row(person: &str, name: &str, ids: &[&str]) -> BreederDogsRecord {
        BreederDogsRecord {
            bg_person_id: Some(person.to_string()),
            name: Some(name.to_string()),
            kennel_name: None,
            dogs_bred_ids: ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn detail(litter: Option<&str>, sire: Option<&str>, dam: Option<&str>) -> LitterDetailRecord {
        LitterDetailRecord {
            bg_litter_id: litter.map(str::to_string),
            sire_dog_id: sire.map(str::to_string),
            dam_dog_id: dam.map(str::to_string),
        }
    }

    fn litter(conn: &Connection, key: &str, sire_name: Option<&str>, dam_name: Option<&str>) -> i64 {
        let mut patch = Patch::new();
        patch
            .text("sire_name", &sire_name.map_or(Field::Null, |n| Field::Value(n.to_string())))
            .text("dam_name", &dam_name.map_or(Field::Null, |n| Field::Value(n.to_string())));
        upsert(conn, EntityKind::Litter, Some(key), &patch).unwrap().id
    }

    fn named_dog(conn: &Connection, key: &str, name: &str) -> i64 {
        let mut patch = Patch::new();
        patch.text("registered_name", &Field::Value(name.to_string()));
        upsert(conn, EntityKind::Dog, Some(key), &patch).unwrap().id
    }

    #[test]
    fn test_dogs_bred_ids_links_found_dogs() {
        let conn = test_db();
        let breeder = upsert(&conn, EntityKind::Breeder, Some("7"), &Patch::new()).unwrap().id;
        let dog_10 = upsert(&conn, EntityKind::Dog, Some("10"), &Patch::new()).unwrap().id;
        let dog_30 = upsert(&conn, EntityKind::Dog, Some("30"), &Patch::new()).unwrap().id;

        let breeders = IdMap::load(&conn, EntityKind::Breeder).unwrap();
        let dogs = IdMap::load(&conn, EntityKind::Dog).unwrap();

        // "20.0" normalizes to "20", which is not in the store
        let rows = vec![breeder_row("7", "Jo Smith", &["10", "20", "30"])];
        let report = link_dogs_by_breeder_ids(&conn, rows, &breeders, &dogs).unwrap();

        assert_eq!(report.linked, 2);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.already_linked, 0);

        for id in [dog_10, dog_30] {
            let dog = get_dog(&conn, id).unwrap().unwrap();
            assert_eq!(dog.breeder_id, Some(breeder));
            assert_eq!(dog.breeder_name.as_deref(), Some("Jo Smith"));
        }
    }

    #[test]
    fn test_linking_never_overwrites() {
        let conn = test_db();
        let first = upsert(&conn, EntityKind::Breeder, Some("1"), &Patch::new()).unwrap().id;
        upsert(&conn, EntityKind::Breeder, Some("2"), &Patch::new()).unwrap();
        let dog = upsert(&conn, EntityKind::Dog, Some("10"), &Patch::new()).unwrap().id;

        let breeders = IdMap::load(&conn, EntityKind::Breeder).unwrap();
        let dogs = IdMap::load(&conn, EntityKind::Dog).unwrap();

        link_dogs_by_breeder_ids(&conn, vec![breeder_row("1", "First", &["10"])], &breeders, &dogs).unwrap();
        let second = link_dogs_by_breeder_ids(
            &conn,
            vec![breeder_row("2", "Second", &["10"])],
            &breeders,
            &dogs,
        )
        .unwrap();

        assert_eq!(second.linked, 0);
        assert_eq!(second.already_linked, 1);
        let stored = get_dog(&conn, dog).unwrap().unwrap();
        assert_eq!(stored.breeder_id, Some(first));
        assert_eq!(stored.breeder_name.as_deref(), Some("First"));
    }

    #[test]
    fn test_unknown_breeder_and_invalid_ids() {
        let conn = test_db();
        upsert(&conn, EntityKind::Breeder, Some("1"), &Patch::new()).unwrap();
        let breeders = IdMap::load(&conn, EntityKind::Breeder).unwrap();
        let dogs = IdMap::default();

        let rows = vec![
            breeder_row("99", "Ghost", &["10"]),
            breeder_row("1", "Real", &["abc", "11"]),
        ];
        let report = link_dogs_by_breeder_ids(&conn, rows, &breeders, &dogs).unwrap();

        assert_eq!(report.rows, 2);
        assert_eq!(report.unknown_breeder, 1);
        assert_eq!(report.invalid, 1);
        assert_eq!(report.not_found, 1);
    }

    #[test]
    fn test_backfill_overwrites_only_supplied_ids() {
        let conn = test_db();
        let mut patch = Patch::new();
        patch
            .text("sire_id", &Field::Value("1".to_string()))
            .text("dam_id", &Field::Value("2".to_string()));
        upsert(&conn, EntityKind::Litter, Some("L1"), &patch).unwrap();
        let litters = IdMap::load(&conn, EntityKind::Litter).unwrap();

        let rows = vec![
            detail(Some("L1"), Some("5"), None),
            detail(Some("L404"), Some("5"), None),
            detail(None, None, None),
        ];
        let report = backfill_litter_parent_ids(&conn, rows, &litters).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.skipped, 1);

        let stored = &get_all_litters(&conn).unwrap()[0];
        assert_eq!(stored.sire_id.as_deref(), Some("5"));
        assert_eq!(stored.dam_id.as_deref(), Some("2"), "absent id must not clear");

        // Same data again changes nothing
        let again = backfill_litter_parent_ids(&conn, vec![detail(Some("L1"), Some("5"), None)], &litters).unwrap();
        assert_eq!(again.updated, 0);
        assert_eq!(again.unchanged, 1);
    }

    #[test]
    fn test_name_fallback_fills_empty_slots() {
        let conn = test_db();
        named_dog(&conn, "100", "Alpenhof's Bruno");
        named_dog(&conn, "200", "Bella vom Berg");
        litter(&conn, "L1", Some("  alpenhof's bruno "), Some("Unknown Dam"));

        let report = link_litters_by_name(&conn, false).unwrap();
        assert_eq!(report.sires_linked, 1);
        assert_eq!(report.dams_linked, 0);

        let stored = &get_all_litters(&conn).unwrap()[0];
        assert_eq!(stored.sire_id.as_deref(), Some("100"));
        assert_eq!(stored.dam_id, None);

        // Nothing new to link on a second pass
        let again = link_litters_by_name(&conn, false).unwrap();
        assert_eq!(again.sires_linked + again.dams_linked, 0);
    }

    #[test]
    fn test_name_fallback_keeps_existing_ids_unless_fresh() {
        let conn = test_db();
        named_dog(&conn, "100", "Bruno");
        let mut patch = Patch::new();
        patch
            .text("sire_id", &Field::Value("999".to_string()))
            .text("sire_name", &Field::Value("Bruno".to_string()));
        upsert(&conn, EntityKind::Litter, Some("L1"), &patch).unwrap();

        link_litters_by_name(&conn, false).unwrap();
        assert_eq!(get_all_litters(&conn).unwrap()[0].sire_id.as_deref(), Some("999"));

        let report = link_litters_by_name(&conn, true).unwrap();
        assert_eq!(report.cleared, 1);
        let stored = &get_all_litters(&conn).unwrap()[0];
        assert_eq!(stored.sire_id.as_deref(), Some("100"));
        assert!(!stored.has_both_parents());
    }

    #[test]
    fn test_name_index_last_write_wins() {
        let index = NameIndex::from_pairs(vec![("Bruno", "1.0"), ("BRUNO ", "2"), ("Max", "")]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(Some("bruno")), Some("2"));
        assert_eq!(index.get(Some("Max")), None);
        assert_eq!(index.get(None), None);
    }
}
