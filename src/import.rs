// 📥 Import Pipeline - CSV extracts → entity stores
//
// Stages run strictly in order (breeders → dogs → breeder links → litters →
// grades) because each one builds its lookup snapshots from what the earlier
// stages wrote. Every stage is idempotent, so a failed run is simply re-run.
// A missing input file skips its stage with a warning.

use anyhow::Result;
use chrono::{Datelike, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{self, insert_event, truncate_all, upsert, EntityKind, IdMap, ImportEvent, Patch, Upserted};
use crate::grading::{self, GradeSummary, GradingEngine};
use crate::ids::convert_image_path;
use crate::linker::{self, BreederLinkReport, LitterIdReport, NameLinkReport};
use crate::parser::{
    columns, open_source, BreederDogsRecord, BreederRecord, CsvRows, DogRecord, Field, FromRow,
    HealthCertRecord, LitterDetailRecord, LitterRecord, ParentDogRecord, SourceKind,
};

// ============================================================================
// REPORTS
// ============================================================================

/// Counts for one import stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    /// File that was read; `None` when no candidate file exists
    pub source: Option<PathBuf>,
    pub rows: usize,
    pub created: usize,
    pub updated: usize,
    /// Rows dropped: no usable key, or (health) an unknown dog
    pub skipped: usize,
    /// Health rows that carry no certification
    pub no_data: usize,
    /// Dogs graded as a follow-up of this stage
    pub graded: usize,
}

impl StageReport {
    fn new(stage: &str, source: Option<&Path>) -> Self {
        StageReport {
            stage: stage.to_string(),
            source: source.map(Path::to_path_buf),
            ..Default::default()
        }
    }

    fn tally(&mut self, upserted: Upserted) {
        if upserted.created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }

    pub fn file_found(&self) -> bool {
        self.source.is_some()
    }
}

/// Entity counts after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub breeders: i64,
    pub dogs: i64,
    pub litters: i64,
}

impl StoreCounts {
    pub fn load(conn: &Connection) -> Result<Self> {
        Ok(StoreCounts {
            breeders: db::count(conn, EntityKind::Breeder)?,
            dogs: db::count(conn, EntityKind::Dog)?,
            litters: db::count(conn, EntityKind::Litter)?,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    pub breeders: StageReport,
    pub dogs: StageReport,
    /// `None` when the breeder details file (or its id column) is absent
    pub breeder_links: Option<BreederLinkReport>,
    pub litters: StageReport,
    pub grades: GradeSummary,
    pub counts: StoreCounts,
}

// ============================================================================
// IMPORTER
// ============================================================================

pub struct Importer<'a> {
    conn: &'a Connection,
    config: &'a Config,
    engine: GradingEngine,
}

impl<'a> Importer<'a> {
    pub fn new(conn: &'a Connection, config: &'a Config) -> Self {
        Importer {
            conn,
            config,
            engine: GradingEngine::with_weights(config.grade_weights),
        }
    }

    /// Full pipeline. With `fresh`, all three entity stores are emptied first.
    pub fn run_pipeline(&self, fresh: bool) -> Result<PipelineReport> {
        if fresh {
            info!("Truncating entity tables");
            truncate_all(self.conn)?;
        }

        let breeders = self.import_breeders()?;
        let dogs = self.import_dogs()?;
        let breeder_links = self.link_breeders()?;
        let litters = self.import_litters()?;
        let grades = self.recalculate_grades()?;

        Ok(PipelineReport {
            breeders,
            dogs,
            breeder_links,
            litters,
            grades,
            counts: StoreCounts::load(self.conn)?,
        })
    }

    // ------------------------------------------------------------------------
    // Main entity files
    // ------------------------------------------------------------------------

    pub fn import_breeders(&self) -> Result<StageReport> {
        let Some(rows) = self.open(SourceKind::Breeders)? else {
            return self.finish(StageReport::new("breeders", None));
        };
        let mut report = StageReport::new("breeders", Some(rows.path()));

        let tx = self.conn.unchecked_transaction()?;
        for row in rows.typed::<BreederRecord>() {
            report.rows += 1;
            let Some(record) = decoded(row, &mut report) else {
                continue;
            };
            if !self.keyed(&record.bg_person_id, &mut report) {
                continue;
            }

            let mut patch = Patch::new();
            patch
                .text("first_name", &record.first_name)
                .text("last_name", &record.last_name)
                .text("kennel_name", &record.kennel_name)
                .text("city", &record.city)
                .text("state", &record.state)
                .text("country", &record.country)
                .text("email", &record.email)
                .text("phone", &record.phone)
                .text("website", &record.website)
                .count("dogs_bred_count", &record.dogs_bred_count)
                .count("litters_count", &record.litters_count);

            report.tally(upsert(&tx, EntityKind::Breeder, record.bg_person_id.as_deref(), &patch)?);
        }
        tx.commit()?;

        self.finish(report)
    }

    pub fn import_dogs(&self) -> Result<StageReport> {
        let Some(rows) = self.open(SourceKind::Dogs)? else {
            return self.finish(StageReport::new("dogs", None));
        };
        let mut report = StageReport::new("dogs", Some(rows.path()));
        let breeders = IdMap::load(self.conn, EntityKind::Breeder)?;

        let tx = self.conn.unchecked_transaction()?;
        for row in rows.typed::<DogRecord>() {
            report.rows += 1;
            let Some(record) = decoded(row, &mut report) else {
                continue;
            };
            if !self.keyed(&record.bg_dog_id, &mut report) {
                continue;
            }

            // Unknown breeder ids resolve to no link rather than a dangling one
            let breeder_id = record.breeder_ref.clone().and_then(|ext| breeders.get(&ext));
            let image = self.image(record.primary_image.clone());

            let mut patch = Patch::new();
            patch
                .text("registered_name", &record.registered_name)
                .text("call_name", &record.call_name)
                .text("sex", &record.sex)
                .date("birth_date", &record.birth_date)
                .date("death_date", &record.death_date)
                .int("age_years", &record.age_years)
                .text("color", &record.color)
                .int("breeder_id", &breeder_id)
                .text("breeder_name", &record.breeder_name)
                .text("hip_rating", &record.hip_rating)
                .text("elbow_rating", &record.elbow_rating)
                .text("heart_status", &record.heart_status)
                .text("eye_status", &record.eye_status)
                .text("dm_status", &record.dm_status)
                .text("dna_status", &record.dna_status)
                .flag("ofa_certified", &record.ofa_certified)
                .text("sire_id", &record.sire_id)
                .text("dam_id", &record.dam_id)
                .text("sire_name", &record.sire_name)
                .text("dam_name", &record.dam_name)
                .text("primary_image", &image)
                .text("registration_number", &record.registration_number)
                .text("dna_number", &record.dna_number)
                .text("microchip", &record.microchip)
                .text("owner_name", &record.owner_name)
                .text("owner_id", &record.owner_id)
                .text("titles", &record.titles);

            report.tally(upsert(&tx, EntityKind::Dog, record.bg_dog_id.as_deref(), &patch)?);
        }
        tx.commit()?;

        self.finish(report)
    }

    pub fn import_litters(&self) -> Result<StageReport> {
        let Some(rows) = self.open(SourceKind::Litters)? else {
            return self.finish(StageReport::new("litters", None));
        };
        let mut report = StageReport::new("litters", Some(rows.path()));
        let breeders = IdMap::load(self.conn, EntityKind::Breeder)?;

        let tx = self.conn.unchecked_transaction()?;
        for row in rows.typed::<LitterRecord>() {
            report.rows += 1;
            let Some(record) = decoded(row, &mut report) else {
                continue;
            };
            if !self.keyed(&record.bg_litter_id, &mut report) {
                continue;
            }

            let breeder_id = record.breeder_ref.clone().and_then(|ext| breeders.get(&ext));

            let mut patch = Patch::new();
            patch
                .date("birth_date", &record.birth_date)
                .int("birth_year", &record.birth_year)
                .text("sire_id", &record.sire_id)
                .text("dam_id", &record.dam_id)
                .text("sire_name", &record.sire_name)
                .text("dam_name", &record.dam_name)
                .int("breeder_id", &breeder_id)
                .text("breeder_name", &record.breeder_name)
                .int("puppies_count", &record.puppies_count)
                .int("males_count", &record.males_count)
                .int("females_count", &record.females_count);

            report.tally(upsert(&tx, EntityKind::Litter, record.bg_litter_id.as_deref(), &patch)?);
        }
        tx.commit()?;

        self.finish(report)
    }

    // ------------------------------------------------------------------------
    // Supplementary files
    // ------------------------------------------------------------------------

    /// Merge health certifications into existing dogs, regrade the dogs that
    /// changed, then every breeder.
    pub fn import_health_certifications(&self) -> Result<StageReport> {
        let Some(rows) = self.open(SourceKind::HealthCertifications)? else {
            return self.finish(StageReport::new("health_certifications", None));
        };
        let mut report = StageReport::new("health_certifications", Some(rows.path()));
        let dogs = IdMap::load(self.conn, EntityKind::Dog)?;

        let mut touched = Vec::new();
        let tx = self.conn.unchecked_transaction()?;
        for row in rows.typed::<HealthCertRecord>() {
            report.rows += 1;
            let Some(record) = decoded(row, &mut report) else {
                continue;
            };

            let Some(key) = record.bg_dog_id.as_deref() else {
                report.skipped += 1;
                continue;
            };
            if !record.has_certifications {
                report.no_data += 1;
                continue;
            }
            let Some(dog_id) = dogs.get(key) else {
                report.skipped += 1;
                continue;
            };

            // Only certifications the row actually has overwrite stored ones
            let certifications = record.certifications();
            if certifications.is_empty() {
                report.no_data += 1;
                continue;
            }
            let mut patch = Patch::new();
            for (column, value) in certifications {
                patch.text(column, &Field::Value(value.to_string()));
            }

            upsert(&tx, EntityKind::Dog, Some(key), &patch)?;
            report.updated += 1;
            touched.push(dog_id);
        }
        tx.commit()?;

        touched.sort_unstable();
        touched.dedup();
        report.graded = grading::regrade_dogs(self.conn, &self.engine, &touched)?;
        grading::recalculate_breeder_grades(self.conn)?;

        self.finish(report)
    }

    /// Upsert dogs from scraped detail pages (mostly sires and dams that the
    /// main dog extract never listed), then grade every ungraded dog.
    pub fn import_parent_dogs(&self) -> Result<StageReport> {
        let Some(rows) = self.open(SourceKind::ParentDogs)? else {
            return self.finish(StageReport::new("parent_dogs", None));
        };
        let mut report = StageReport::new("parent_dogs", Some(rows.path()));
        let today = Utc::now().date_naive();

        let tx = self.conn.unchecked_transaction()?;
        for row in rows.typed::<ParentDogRecord>() {
            report.rows += 1;
            let Some(record) = decoded(row, &mut report) else {
                continue;
            };
            let Some(key) = record.bg_dog_id.as_deref() else {
                report.skipped += 1;
                continue;
            };

            let image = self.image(record.primary_image.clone());

            let mut patch = Patch::new();
            patch
                .text("registered_name", &record.registered_name)
                .text("call_name", &record.call_name)
                .text("sex", &record.sex)
                .date("birth_date", &record.birth_date)
                .date("death_date", &record.death_date)
                .text("color", &record.color)
                .text("primary_image", &image)
                .text("registration_number", &record.registration_number)
                .text("dna_number", &record.dna_number)
                .text("microchip", &record.microchip)
                .text("weight", &record.weight)
                .text("height", &record.height)
                .text("bite", &record.bite)
                .text("tail", &record.tail)
                .text("eye_color", &record.eye_color)
                .text("stud_book", &record.stud_book)
                .flag("frozen_semen", &record.frozen_semen)
                .text("rescue_type", &record.rescue_type)
                .text("litter_id", &record.litter_id)
                .text("owner_name", &record.owner_name)
                .text("owner_id", &record.owner_id)
                .text("titles", &record.titles)
                .text_if_some("sire_id", record.sire_id.as_deref())
                .text_if_some("dam_id", record.dam_id.as_deref())
                .text_if_some("sire_name", record.sire_name.as_deref())
                .text_if_some("dam_name", record.dam_name.as_deref());

            // Age in whole years, to the death date or (still alive) today
            if let Some(birth) = record.birth_date.value() {
                let end = record.death_date.value().copied().unwrap_or(today);
                patch.int("age_years", &Field::Value(whole_years(*birth, end)));
            }

            report.tally(upsert(&tx, EntityKind::Dog, Some(key), &patch)?);
        }
        tx.commit()?;

        report.graded = grading::grade_ungraded(self.conn, &self.engine)?;
        self.finish(report)
    }

    // ------------------------------------------------------------------------
    // Linking & grading
    // ------------------------------------------------------------------------

    /// Dog → breeder links from `dogs_bred_ids`. `None` when there is no
    /// breeder details file or it lacks the id list column.
    pub fn link_breeders(&self) -> Result<Option<BreederLinkReport>> {
        let Some(rows) = self.open(SourceKind::BreederDetails)? else {
            self.record_skip("link_breeders", None, "no input file")?;
            return Ok(None);
        };
        if let Err(e) = rows.require("dogs_bred_ids", columns::DOGS_BRED_IDS) {
            warn!("Skipping breeder linking: {}", e);
            self.record_skip("link_breeders", Some(rows.path()), "missing dogs_bred_ids column")?;
            return Ok(None);
        }

        let source = rows.path().to_path_buf();
        let breeders = IdMap::load(self.conn, EntityKind::Breeder)?;
        let dogs = IdMap::load(self.conn, EntityKind::Dog)?;
        info!(breeders = breeders.len(), dogs = dogs.len(), "Built lookup maps");

        let report = linker::link_dogs_by_breeder_ids(
            self.conn,
            readable::<BreederDogsRecord>(rows),
            &breeders,
            &dogs,
        )?;
        self.record("link_breeders", Some(&source), &report)?;
        Ok(Some(report))
    }

    /// Explicit litter sire/dam ids from the litter details file
    pub fn update_litter_ids(&self) -> Result<Option<LitterIdReport>> {
        let Some(rows) = self.open(SourceKind::LitterDetails)? else {
            self.record_skip("update_litter_ids", None, "no input file")?;
            return Ok(None);
        };
        let source = rows.path().to_path_buf();
        let litters = IdMap::load(self.conn, EntityKind::Litter)?;

        let report = linker::backfill_litter_parent_ids(
            self.conn,
            readable::<LitterDetailRecord>(rows),
            &litters,
        )?;
        self.record("update_litter_ids", Some(&source), &report)?;
        Ok(Some(report))
    }

    pub fn link_litters(&self, fresh: bool) -> Result<NameLinkReport> {
        let report = linker::link_litters_by_name(self.conn, fresh)?;
        self.record("link_litters", None, &report)?;
        Ok(report)
    }

    pub fn recalculate_grades(&self) -> Result<GradeSummary> {
        let summary = grading::recalculate_all(self.conn, &self.engine)?;
        info!(
            dogs = summary.dogs,
            breeders = summary.breeders,
            avg_grade = summary.avg_grade,
            "Grades recalculated"
        );
        self.record("grades", None, &summary)?;
        Ok(summary)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn open(&self, kind: SourceKind) -> Result<Option<CsvRows>> {
        let rows = open_source(&self.config.import_dir, kind)?;
        match &rows {
            Some(rows) => info!("Importing {} from {}", kind.name(), rows.path().display()),
            None => warn!(
                "No {} file in {} (looked for {})",
                kind.name(),
                self.config.import_dir.display(),
                kind.candidate_files().join(", ")
            ),
        }
        Ok(rows)
    }

    /// Rows without an external id are skipped unless configured otherwise
    fn keyed(&self, key: &Option<String>, report: &mut StageReport) -> bool {
        if key.is_some() || self.config.keep_unkeyed_rows {
            return true;
        }
        report.skipped += 1;
        false
    }

    fn image(&self, field: Field<String>) -> Field<String> {
        field.and_then(|path| convert_image_path(Some(&path), &self.config.image_url_prefix))
    }

    fn finish(&self, report: StageReport) -> Result<StageReport> {
        info!(
            stage = %report.stage,
            rows = report.rows,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            "Stage complete"
        );
        self.record(&report.stage, report.source.as_deref(), &report)?;
        Ok(report)
    }

    fn record_skip(&self, stage: &str, source: Option<&Path>, reason: &str) -> Result<()> {
        self.record(stage, source, &serde_json::json!({ "skipped": reason }))
    }

    fn record<T: Serialize>(&self, stage: &str, source: Option<&Path>, counts: &T) -> Result<()> {
        let event = ImportEvent::new(stage, source, serde_json::to_value(counts)?)?;
        insert_event(self.conn, &event)
    }
}

/// A row the CSV reader could not decode is counted as skipped
fn decoded<R>(row: Result<R>, report: &mut StageReport) -> Option<R> {
    match row {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(stage = %report.stage, "Skipping unreadable row: {:#}", e);
            report.skipped += 1;
            None
        }
    }
}

/// Typed rows, dropping (with a warning) any the CSV reader cannot decode
fn readable<R: FromRow>(rows: CsvRows) -> impl Iterator<Item = R> {
    rows.typed::<R>().filter_map(|row| match row {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Skipping unreadable row: {:#}", e);
            None
        }
    })
}

/// Completed years between two dates (never negative)
fn whole_years(birth: NaiveDate, end: NaiveDate) -> i64 {
    let mut years = (end.year() - birth.year()) as i64;
    if (end.month(), end.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_all_breeders, get_all_dogs, get_all_litters, get_recent_events, setup_database};
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Connection, Config) {
        let dir = TempDir::new().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        let config = Config {
            import_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        (dir, conn, config)
    }

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_missing_files_skip_stages() {
        let (_dir, conn, config) = setup();
        let report = Importer::new(&conn, &config).run_pipeline(false).unwrap();

        assert!(!report.breeders.file_found());
        assert!(!report.dogs.file_found());
        assert!(report.breeder_links.is_none());
        assert_eq!(report.counts, StoreCounts::default());

        // One audit row per stage, skipped ones included
        let events = get_recent_events(&conn, 10).unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0].stage, "grades");
        let links = events.iter().find(|e| e.stage == "link_breeders").unwrap();
        assert_eq!(links.counts["skipped"], "no input file");
        assert!(links.source_file.is_none());
    }

    #[test]
    fn test_missing_litter_details_records_skip() {
        let (_dir, conn, config) = setup();
        let report = Importer::new(&conn, &config).update_litter_ids().unwrap();
        assert!(report.is_none());

        let events = get_recent_events(&conn, 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stage, "update_litter_ids");
        assert_eq!(events[0].counts["skipped"], "no input file");
    }

    #[test]
    fn test_repeated_key_in_one_file_last_row_wins() {
        let (dir, conn, config) = setup();
        write(&dir, "ALL_DOGS.csv", "bg_dog_id,registered_name\n1,Bruno\n1.0,Bruno II\n");

        let report = Importer::new(&conn, &config).import_dogs().unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);

        let dogs = get_all_dogs(&conn).unwrap();
        assert_eq!(dogs.len(), 1);
        assert_eq!(dogs[0].registered_name.as_deref(), Some("Bruno II"));
    }

    #[test]
    fn test_non_utf8_cell_keeps_row() {
        let (dir, conn, config) = setup();
        fs::write(
            dir.path().join("ALL_DOGS.csv"),
            b"bg_dog_id,registered_name\n1,Bruno\n2,M\xFCller\n3,Max\n",
        )
        .unwrap();

        let report = Importer::new(&conn, &config).import_dogs().unwrap();
        assert_eq!(report.rows, 3);
        assert_eq!(report.created, 3);
        assert_eq!(report.skipped, 0);

        let dogs = get_all_dogs(&conn).unwrap();
        let keys: Vec<_> = dogs.iter().filter_map(|d| d.bg_dog_id.as_deref()).collect();
        assert_eq!(keys, vec!["1", "2", "3"]);
        assert_eq!(dogs[1].registered_name.as_deref(), Some("M\u{FFFD}ller"));
    }

    #[test]
    fn test_unkeyed_rows_skipped_by_default() {
        let (dir, conn, mut config) = setup();
        write(&dir, "ALL_BREEDERS.csv", "breeder_id,kennel_name\n1.0,Alpenhof\n,Nameless\n");

        let report = Importer::new(&conn, &config).import_breeders().unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);

        config.keep_unkeyed_rows = true;
        let report = Importer::new(&conn, &config).import_breeders().unwrap();
        assert_eq!(report.created, 1, "unkeyed row inserted");
        assert_eq!(report.updated, 1);
        assert_eq!(get_all_breeders(&conn).unwrap().len(), 2);
    }

    #[test]
    fn test_dog_import_resolves_breeder_and_image() {
        let (dir, conn, config) = setup();
        write(&dir, "ALL_BREEDERS.csv", "breeder_id,kennel_name\n7,Alpenhof\n");
        write(
            &dir,
            "ALL_DOGS.csv",
            "bg_dog_id,name,breeder_id,primary_image,ofa_certified,heart_rating\n\
             500.0,Bruno,7.0,output/images/dog_500.jpg,True,Normal\n\
             501,Bella,99,https://cdn.example/b.jpg,false,\n",
        );

        let importer = Importer::new(&conn, &config);
        importer.import_breeders().unwrap();
        let report = importer.import_dogs().unwrap();
        assert_eq!(report.created, 2);

        let dogs = get_all_dogs(&conn).unwrap();
        let bruno = &dogs[0];
        assert_eq!(bruno.bg_dog_id.as_deref(), Some("500"));
        assert_eq!(bruno.registered_name.as_deref(), Some("Bruno"));
        assert!(bruno.breeder_id.is_some());
        assert_eq!(bruno.primary_image.as_deref(), Some("/dog-images/dog_500.jpg"));
        assert!(bruno.ofa_certified);
        assert_eq!(bruno.heart_status.as_deref(), Some("Normal"));

        let bella = &dogs[1];
        assert_eq!(bella.breeder_id, None, "unknown breeder id resolves to no link");
        assert_eq!(bella.primary_image.as_deref(), Some("https://cdn.example/b.jpg"));
        assert!(!bella.ofa_certified);
    }

    #[test]
    fn test_health_import_regrades_touched_dogs() {
        let (dir, conn, config) = setup();
        write(&dir, "ALL_DOGS.csv", "bg_dog_id,hip_rating\n1,Fair\n2,\n");
        write(
            &dir,
            "health_certifications.csv",
            "bg_dog_id,has_certifications,hip_rating,elbow_rating,heart_status,eye_status,dm_status,dna_status\n\
             1.0,True,,Normal,,,Clear,\n\
             2,False,Good,,,,,\n\
             3,yes,Good,,,,,\n\
             ,1,Good,,,,,\n",
        );

        let importer = Importer::new(&conn, &config);
        importer.import_dogs().unwrap();
        importer.recalculate_grades().unwrap();
        let before = get_all_dogs(&conn).unwrap()[0].grade;

        let report = importer.import_health_certifications().unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.no_data, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.graded, 1);

        let dog = &get_all_dogs(&conn).unwrap()[0];
        assert_eq!(dog.hip_rating.as_deref(), Some("Fair"), "empty cell keeps stored hips");
        assert_eq!(dog.elbow_rating.as_deref(), Some("Normal"));
        assert_eq!(dog.dm_status.as_deref(), Some("Clear"));
        assert!(dog.grade > before);
    }

    #[test]
    fn test_parent_dogs_keep_existing_parents_and_derive_age() {
        let (dir, conn, config) = setup();
        write(
            &dir,
            "ALL_DOGS.csv",
            "bg_dog_id,registered_name,sire_id,dam_id\n10,Bruno,1,2\n",
        );
        write(
            &dir,
            "parent_dogs_details.csv",
            "bg_dog_id,dog name,whelp date,deceased,frozen semen,sire_id,dam_id,sire,dam\n\
             10,Bruno vom Berg,2010-05-01,2021-04-30,No,,3.0,,Bella\n\
             11,Max,2012-01-01,2020-01-01,Yes,,,,\n",
        );

        let importer = Importer::new(&conn, &config);
        importer.import_dogs().unwrap();
        let report = importer.import_parent_dogs().unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.graded, 2);

        let dogs = get_all_dogs(&conn).unwrap();
        let bruno = &dogs[0];
        assert_eq!(bruno.registered_name.as_deref(), Some("Bruno vom Berg"));
        assert_eq!(bruno.sire_id.as_deref(), Some("1"), "empty sire id keeps stored link");
        assert_eq!(bruno.dam_id.as_deref(), Some("3"));
        assert_eq!(bruno.dam_name.as_deref(), Some("Bella"));
        assert_eq!(bruno.age_years, Some(10));
        assert!(!bruno.frozen_semen);

        let max = &dogs[1];
        assert_eq!(max.age_years, Some(8));
        assert!(max.frozen_semen);
        assert!(max.grade.is_some());
    }

    #[test]
    fn test_litter_stages() {
        let (dir, conn, config) = setup();
        write(
            &dir,
            "ALL_DOGS.csv",
            "bg_dog_id,registered_name\n100,ALPENHOF'S BRUNO\n",
        );
        write(
            &dir,
            "litters.csv",
            "litter_id,birth_date,sire_name,dam_name\nL1,2022-03-15,Alpenhof's Bruno,Bella\nL2,,,\n",
        );
        write(
            &dir,
            "recent_litters_details.csv",
            "bg_litter_id,sire_dog_id,dam_dog_id\nL2,None,200.0\nL9,1,2\n",
        );

        let importer = Importer::new(&conn, &config);
        importer.import_dogs().unwrap();
        let litters = importer.import_litters().unwrap();
        assert_eq!(litters.created, 2);

        let ids = importer.update_litter_ids().unwrap().unwrap();
        assert_eq!(ids.updated, 1);
        assert_eq!(ids.not_found, 1);

        let names = importer.link_litters(false).unwrap();
        assert_eq!(names.sires_linked, 1);

        let stored = get_all_litters(&conn).unwrap();
        assert_eq!(stored[0].birth_year, Some(2022));
        assert_eq!(stored[0].sire_id.as_deref(), Some("100"));
        assert_eq!(stored[1].dam_id.as_deref(), Some("200"));
        assert_eq!(stored[1].sire_id, None);
    }

    #[test]
    fn test_link_breeders_without_id_column() {
        let (dir, conn, config) = setup();
        write(&dir, "breeders_details.csv", "bg_person_id,name\n1,Ann\n");
        let report = Importer::new(&conn, &config).link_breeders().unwrap();
        assert!(report.is_none());

        let events = get_recent_events(&conn, 10).unwrap();
        assert_eq!(events[0].counts["skipped"], "missing dogs_bred_ids column");
        assert!(events[0].source_file.is_some());
    }

    #[test]
    fn test_whole_years() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(whole_years(d(2010, 5, 1), d(2021, 4, 30)), 10);
        assert_eq!(whole_years(d(2010, 5, 1), d(2021, 5, 1)), 11);
        assert_eq!(whole_years(d(2021, 5, 1), d(2010, 5, 1)), 0);
    }
}
