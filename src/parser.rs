// 📥 CSV Import Readers - Typed rows from scraper extracts
// The scraper has gone through several schema variants, so every logical
// field is resolved through an alias list and every file kind through a
// list of candidate file names.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::{ByteRecordsIntoIter, ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ImportError;
use crate::ids::{is_sentinel, normalize_id, split_id_list};

// ============================================================================
// SOURCE KINDS
// ============================================================================

/// SourceKind - which scraper extract a file is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Breeders,
    Dogs,
    Litters,
    BreederDetails,
    HealthCertifications,
    ParentDogs,
    LitterDetails,
}

impl SourceKind {
    /// Human-readable name for logs
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Breeders => "breeders",
            SourceKind::Dogs => "dogs",
            SourceKind::Litters => "litters",
            SourceKind::BreederDetails => "breeder details",
            SourceKind::HealthCertifications => "health certifications",
            SourceKind::ParentDogs => "parent dogs",
            SourceKind::LitterDetails => "litter details",
        }
    }

    /// File names to try, most detailed variant first
    pub fn candidate_files(&self) -> &'static [&'static str] {
        match self {
            SourceKind::Breeders => &["ALL_BREEDERS_MERGED.csv", "ALL_BREEDERS.csv"],
            SourceKind::Dogs => &["ALL_DOGS_MERGED.csv", "ALL_DOGS.csv"],
            SourceKind::Litters => &["litters.csv"],
            SourceKind::BreederDetails => &["breeders_details.csv", "ALL_BREEDERS_MERGED.csv"],
            SourceKind::HealthCertifications => &["health_certifications.csv"],
            SourceKind::ParentDogs => &["parent_dogs_details.csv"],
            SourceKind::LitterDetails => &["recent_litters_details.csv"],
        }
    }

    /// First candidate that exists in `dir`
    pub fn locate(&self, dir: &Path) -> Option<PathBuf> {
        self.candidate_files()
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}

// ============================================================================
// COLUMN ALIASES
// ============================================================================

/// Column alias table. For each logical field, the header names seen across
/// scraper runs, in priority order (first present wins).
pub mod columns {
    pub const BREEDER_KEY: &[&str] = &["breeder_id", "bg_person_id", "person_id"];
    pub const PERSON_KEY: &[&str] = &["bg_person_id", "breeder_id", "person_id"];
    pub const DOG_KEY: &[&str] = &["bg_dog_id", "dog_id"];
    pub const LITTER_KEY: &[&str] = &["bg_litter_id", "litter_id"];

    pub const FIRST_NAME: &[&str] = &["first_name"];
    pub const LAST_NAME: &[&str] = &["last_name"];
    pub const PERSON_NAME: &[&str] = &["name"];
    pub const KENNEL_NAME: &[&str] = &["kennel_name", "kennel name"];
    pub const CITY: &[&str] = &["city"];
    pub const STATE: &[&str] = &["state"];
    pub const COUNTRY: &[&str] = &["country"];
    pub const EMAIL: &[&str] = &["email"];
    pub const PHONE: &[&str] = &["phone"];
    pub const WEBSITE: &[&str] = &["website"];
    pub const DOGS_BRED_COUNT: &[&str] = &["dogs_bred_count"];
    pub const LITTERS_COUNT: &[&str] = &["litters_count"];
    pub const DOGS_BRED_IDS: &[&str] = &["dogs_bred_ids"];

    pub const BREEDER_REF: &[&str] = &["breeder_id"];
    pub const BREEDER_NAME: &[&str] = &["breeder_name"];
    pub const REGISTERED_NAME: &[&str] = &["registered_name", "name", "dog name"];
    pub const CALL_NAME: &[&str] = &["call_name", "call name"];
    pub const SEX: &[&str] = &["sex"];
    pub const BIRTH_DATE: &[&str] = &["birth_date", "whelp date"];
    pub const DEATH_DATE: &[&str] = &["death_date", "deceased"];
    pub const AGE_YEARS: &[&str] = &["age_years", "age_at_death_years"];
    pub const COLOR: &[&str] = &["color", "coat_color"];
    pub const HIP: &[&str] = &["hip_rating"];
    pub const ELBOW: &[&str] = &["elbow_rating"];
    pub const HEART: &[&str] = &["heart_status", "heart_rating"];
    pub const EYE: &[&str] = &["eye_status", "eye_rating"];
    pub const DM: &[&str] = &["dm_status"];
    pub const DNA: &[&str] = &["dna_status"];
    pub const OFA_CERTIFIED: &[&str] = &["ofa_certified"];
    pub const SIRE_ID: &[&str] = &["sire_id"];
    pub const DAM_ID: &[&str] = &["dam_id"];
    pub const SIRE_NAME: &[&str] = &["sire_name", "sire"];
    pub const DAM_NAME: &[&str] = &["dam_name", "dam"];
    pub const IMAGE: &[&str] = &["primary_image", "image_path", "image_url"];
    pub const REGISTRATION: &[&str] = &["registration_number", "registrations"];
    pub const DNA_NUMBER: &[&str] = &["dna_number", "dna reg"];
    pub const MICROCHIP: &[&str] = &["microchip"];
    pub const OWNER_NAME: &[&str] = &["owner_name"];
    pub const OWNER_ID: &[&str] = &["owner_id"];
    pub const TITLES: &[&str] = &["titles"];
    pub const WEIGHT: &[&str] = &["weight"];
    pub const HEIGHT: &[&str] = &["height"];
    pub const BITE: &[&str] = &["bite"];
    pub const TAIL: &[&str] = &["tail"];
    pub const EYE_COLOR: &[&str] = &["eye_color"];
    pub const STUD_BOOK: &[&str] = &["stud_book", "stud book"];
    pub const FROZEN_SEMEN: &[&str] = &["frozen_semen", "frozen semen"];
    pub const RESCUE_TYPE: &[&str] = &["rescue_type", "rescue type"];
    pub const DOG_LITTER_ID: &[&str] = &["litter id", "litter id_id"];

    pub const BIRTH_YEAR: &[&str] = &["birth_year"];
    pub const PUPPIES: &[&str] = &["puppies_count"];
    pub const MALES: &[&str] = &["males_count"];
    pub const FEMALES: &[&str] = &["females_count"];

    pub const HAS_CERTIFICATIONS: &[&str] = &["has_certifications"];
    pub const SIRE_DOG_ID: &[&str] = &["sire_dog_id"];
    pub const DAM_DOG_ID: &[&str] = &["dam_dog_id"];
}

/// Header text as written by the scraper, with NBSPs flattened and trimmed
pub fn normalize_header(header: &str) -> String {
    header
        .replace('\u{feff}', "")
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

// ============================================================================
// FIELD
// ============================================================================

/// A cell value with three states. `Missing` (the file has no such column)
/// leaves stored data alone on upsert; `Null` clears it.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Missing,
    Null,
    Value(T),
}

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Missing => Field::Missing,
            Field::Null => Field::Null,
            Field::Value(v) => Field::Value(f(v)),
        }
    }

    /// Like `map`, but a `None` result degrades the cell to `Null`
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Option<U>) -> Field<U> {
        match self {
            Field::Missing => Field::Missing,
            Field::Null => Field::Null,
            Field::Value(v) => f(v).map_or(Field::Null, Field::Value),
        }
    }
}

// ============================================================================
// VALUE PARSING
// ============================================================================

/// Integers may arrive float-serialized ("12.0"). Garbage is `None`.
pub fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc() as i64)
}

/// Parse the date layouts the registry pages and pandas produce.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if is_sentinel(value) {
        return None;
    }

    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %b %Y", "%d %B %Y",
    ];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }

    None
}

/// Boolean-like strings ("True", "1", "yes", "on"); everything else is false
pub fn parse_bool_like(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ============================================================================
// HEADERS & ROWS
// ============================================================================

/// Normalized header names with a name → column index lookup
#[derive(Debug, Clone)]
pub struct Headers {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Headers {
    pub fn from_record(record: &StringRecord) -> Self {
        let names: Vec<String> = record.iter().map(normalize_header).collect();
        let mut index = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            // Duplicate headers: first column wins
            index.entry(name.clone()).or_insert(i);
        }
        Headers { names, index }
    }

    /// Column index of the first alias present
    pub fn resolve(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| self.index.get(*alias).copied())
    }

    pub fn has(&self, aliases: &[&str]) -> bool {
        self.resolve(aliases).is_some()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// One data row, read through the file's header table
#[derive(Debug, Clone)]
pub struct RawRow {
    headers: Arc<Headers>,
    record: StringRecord,
}

impl RawRow {
    pub fn new(headers: Arc<Headers>, record: StringRecord) -> Self {
        RawRow { headers, record }
    }

    /// Raw trimmed cell. Short rows read as `Null` for the missing cells.
    pub fn cell(&self, aliases: &[&str]) -> Field<&str> {
        let Some(idx) = self.headers.resolve(aliases) else {
            return Field::Missing;
        };
        match self.record.get(idx).map(str::trim) {
            Some(v) if !v.is_empty() => Field::Value(v),
            _ => Field::Null,
        }
    }

    pub fn text(&self, aliases: &[&str]) -> Field<String> {
        self.cell(aliases).map(str::to_string)
    }

    /// Optional text, for fields that never take part in partial updates
    pub fn get(&self, aliases: &[&str]) -> Option<String> {
        self.text(aliases).into_option()
    }

    /// Normalized external id
    pub fn id(&self, aliases: &[&str]) -> Field<String> {
        self.cell(aliases).and_then(|v| normalize_id(Some(v)))
    }

    pub fn int(&self, aliases: &[&str]) -> Field<i64> {
        self.cell(aliases).and_then(parse_int)
    }

    pub fn date(&self, aliases: &[&str]) -> Field<NaiveDate> {
        self.cell(aliases).and_then(parse_date)
    }

    /// Truthy unless the cell is empty or one of `falsy` (case-insensitive)
    pub fn flag(&self, aliases: &[&str], falsy: &[&str]) -> Field<bool> {
        match self.cell(aliases) {
            Field::Missing => Field::Missing,
            Field::Null => Field::Value(false),
            Field::Value(v) => {
                let lower = v.to_lowercase();
                Field::Value(!falsy.iter().any(|f| *f == lower))
            }
        }
    }
}

/// Lazy, single-pass row sequence over one CSV file
pub struct CsvRows {
    path: PathBuf,
    headers: Arc<Headers>,
    records: ByteRecordsIntoIter<File>,
}

impl CsvRows {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

        let headers = reader
            .byte_headers()
            .with_context(|| format!("Failed to read CSV headers: {}", path.display()))?
            .clone();
        let headers = Arc::new(Headers::from_record(&StringRecord::from_byte_record_lossy(headers)));

        Ok(CsvRows {
            path: path.to_path_buf(),
            headers,
            records: reader.into_byte_records(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Fail with `MissingColumn` unless one of `aliases` is a header
    pub fn require(&self, column: &'static str, aliases: &[&str]) -> Result<(), ImportError> {
        if self.headers.has(aliases) {
            return Ok(());
        }
        Err(ImportError::MissingColumn {
            file: self.path.clone(),
            column,
            headers: self.headers.names().join(", "),
        })
    }

    /// Map every row through `R::from_row`
    pub fn typed<R: FromRow>(self) -> impl Iterator<Item = Result<R>> {
        self.map(|row| row.map(|r| R::from_row(&r)))
    }
}

impl Iterator for CsvRows {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.records.next()?;
        Some(
            result
                // Scraped cells are not always UTF-8 (Latin-1 names); keep the row
                .map(|record| {
                    RawRow::new(Arc::clone(&self.headers), StringRecord::from_byte_record_lossy(record))
                })
                .with_context(|| format!("Failed to parse CSV row in {}", self.path.display())),
        )
    }
}

/// Open the preferred file for `kind` under `dir`.
/// A missing file is `Ok(None)`, not an error.
pub fn open_source(dir: &Path, kind: SourceKind) -> Result<Option<CsvRows>> {
    match kind.locate(dir) {
        Some(path) => CsvRows::open(&path).map(Some),
        None => Ok(None),
    }
}

// ============================================================================
// TYPED RECORDS
// ============================================================================

/// Build a typed record from a raw row. Never fails: unparseable cells
/// degrade to `Null`, and a missing key is left for the caller to count.
pub trait FromRow: Sized {
    fn from_row(row: &RawRow) -> Self;
}

/// ALL_BREEDERS(_MERGED).csv
#[derive(Debug, Clone)]
pub struct BreederRecord {
    pub bg_person_id: Option<String>,
    pub first_name: Field<String>,
    pub last_name: Field<String>,
    pub kennel_name: Field<String>,
    pub city: Field<String>,
    pub state: Field<String>,
    pub country: Field<String>,
    pub email: Field<String>,
    pub phone: Field<String>,
    pub website: Field<String>,
    pub dogs_bred_count: Field<i64>,
    pub litters_count: Field<i64>,
}

impl FromRow for BreederRecord {
    fn from_row(row: &RawRow) -> Self {
        use columns::*;
        BreederRecord {
            bg_person_id: row.id(BREEDER_KEY).into_option(),
            first_name: row.text(FIRST_NAME),
            last_name: row.text(LAST_NAME),
            kennel_name: row.text(KENNEL_NAME),
            city: row.text(CITY),
            state: row.text(STATE),
            country: row.text(COUNTRY),
            email: row.text(EMAIL),
            phone: row.text(PHONE),
            website: row.text(WEBSITE),
            dogs_bred_count: row.int(DOGS_BRED_COUNT),
            litters_count: row.int(LITTERS_COUNT),
        }
    }
}

/// ALL_DOGS(_MERGED).csv
#[derive(Debug, Clone)]
pub struct DogRecord {
    pub bg_dog_id: Option<String>,
    /// External breeder id named on the dog row
    pub breeder_ref: Field<String>,
    pub breeder_name: Field<String>,
    pub registered_name: Field<String>,
    pub call_name: Field<String>,
    pub sex: Field<String>,
    pub birth_date: Field<NaiveDate>,
    pub death_date: Field<NaiveDate>,
    pub age_years: Field<i64>,
    pub color: Field<String>,
    pub hip_rating: Field<String>,
    pub elbow_rating: Field<String>,
    pub heart_status: Field<String>,
    pub eye_status: Field<String>,
    pub dm_status: Field<String>,
    pub dna_status: Field<String>,
    pub ofa_certified: Field<bool>,
    pub sire_id: Field<String>,
    pub dam_id: Field<String>,
    pub sire_name: Field<String>,
    pub dam_name: Field<String>,
    pub primary_image: Field<String>,
    pub registration_number: Field<String>,
    pub dna_number: Field<String>,
    pub microchip: Field<String>,
    pub owner_name: Field<String>,
    pub owner_id: Field<String>,
    pub titles: Field<String>,
}

impl FromRow for DogRecord {
    fn from_row(row: &RawRow) -> Self {
        use columns::*;
        DogRecord {
            bg_dog_id: row.id(DOG_KEY).into_option(),
            breeder_ref: row.id(BREEDER_REF),
            breeder_name: row.text(BREEDER_NAME),
            registered_name: row.text(REGISTERED_NAME),
            call_name: row.text(CALL_NAME),
            sex: row.text(SEX),
            birth_date: row.date(BIRTH_DATE),
            death_date: row.date(DEATH_DATE),
            age_years: row.int(AGE_YEARS),
            color: row.text(COLOR),
            hip_rating: row.text(HIP),
            elbow_rating: row.text(ELBOW),
            heart_status: row.text(HEART),
            eye_status: row.text(EYE),
            dm_status: row.text(DM),
            dna_status: row.text(DNA),
            ofa_certified: row.flag(OFA_CERTIFIED, &["false"]),
            sire_id: row.id(SIRE_ID),
            dam_id: row.id(DAM_ID),
            sire_name: row.text(SIRE_NAME),
            dam_name: row.text(DAM_NAME),
            primary_image: row.text(IMAGE),
            registration_number: row.text(REGISTRATION),
            dna_number: row.text(DNA_NUMBER),
            microchip: row.text(MICROCHIP),
            owner_name: row.text(OWNER_NAME),
            owner_id: row.id(OWNER_ID),
            titles: row.text(TITLES),
        }
    }
}

/// litters.csv
#[derive(Debug, Clone)]
pub struct LitterRecord {
    pub bg_litter_id: Option<String>,
    pub birth_date: Field<NaiveDate>,
    pub birth_year: Field<i64>,
    pub sire_id: Field<String>,
    pub dam_id: Field<String>,
    pub sire_name: Field<String>,
    pub dam_name: Field<String>,
    pub breeder_ref: Field<String>,
    pub breeder_name: Field<String>,
    pub puppies_count: Field<i64>,
    pub males_count: Field<i64>,
    pub females_count: Field<i64>,
}

impl FromRow for LitterRecord {
    fn from_row(row: &RawRow) -> Self {
        use chrono::Datelike;
        use columns::*;

        let birth_date = row.date(BIRTH_DATE);
        // Year comes from the date when there is one, else the explicit column
        let birth_year = match (birth_date.value(), row.int(BIRTH_YEAR)) {
            (Some(date), _) => Field::Value(date.year() as i64),
            (None, Field::Missing) if !birth_date.is_missing() => Field::Null,
            (None, explicit) => explicit,
        };

        LitterRecord {
            bg_litter_id: row.id(LITTER_KEY).into_option(),
            birth_date,
            birth_year,
            sire_id: row.id(SIRE_ID),
            dam_id: row.id(DAM_ID),
            sire_name: row.text(SIRE_NAME),
            dam_name: row.text(DAM_NAME),
            breeder_ref: row.id(BREEDER_REF),
            breeder_name: row.text(BREEDER_NAME),
            puppies_count: row.int(PUPPIES),
            males_count: row.int(MALES),
            females_count: row.int(FEMALES),
        }
    }
}

/// breeders_details.csv: who bred which dogs
#[derive(Debug, Clone)]
pub struct BreederDogsRecord {
    pub bg_person_id: Option<String>,
    pub name: Option<String>,
    pub kennel_name: Option<String>,
    /// Normalized ids from the pipe-delimited `dogs_bred_ids` cell
    pub dogs_bred_ids: Vec<String>,
}

impl BreederDogsRecord {
    /// Name denormalized onto linked dogs
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.kennel_name.as_deref())
    }
}

impl FromRow for BreederDogsRecord {
    fn from_row(row: &RawRow) -> Self {
        use columns::*;
        BreederDogsRecord {
            bg_person_id: row.id(PERSON_KEY).into_option(),
            name: row.get(PERSON_NAME),
            kennel_name: row.get(KENNEL_NAME),
            dogs_bred_ids: row
                .cell(DOGS_BRED_IDS)
                .value()
                .map(|ids| split_id_list(ids))
                .unwrap_or_default(),
        }
    }
}

/// health_certifications.csv
#[derive(Debug, Clone)]
pub struct HealthCertRecord {
    pub bg_dog_id: Option<String>,
    pub has_certifications: bool,
    pub hip_rating: Option<String>,
    pub elbow_rating: Option<String>,
    pub heart_status: Option<String>,
    pub eye_status: Option<String>,
    pub dm_status: Option<String>,
    pub dna_status: Option<String>,
}

impl HealthCertRecord {
    /// (column, value) for every certification the row actually carries
    pub fn certifications(&self) -> Vec<(&'static str, &str)> {
        [
            ("hip_rating", &self.hip_rating),
            ("elbow_rating", &self.elbow_rating),
            ("heart_status", &self.heart_status),
            ("eye_status", &self.eye_status),
            ("dm_status", &self.dm_status),
            ("dna_status", &self.dna_status),
        ]
        .into_iter()
        .filter_map(|(col, value)| value.as_deref().map(|v| (col, v)))
        .collect()
    }
}

impl FromRow for HealthCertRecord {
    fn from_row(row: &RawRow) -> Self {
        use columns::*;
        HealthCertRecord {
            bg_dog_id: row.id(DOG_KEY).into_option(),
            has_certifications: row
                .cell(HAS_CERTIFICATIONS)
                .value()
                .map(|v| parse_bool_like(v))
                .unwrap_or(false),
            hip_rating: row.get(HIP),
            elbow_rating: row.get(ELBOW),
            heart_status: row.get(HEART),
            eye_status: row.get(EYE),
            dm_status: row.get(DM),
            dna_status: row.get(DNA),
        }
    }
}

/// parent_dogs_details.csv: scraped dog detail pages
#[derive(Debug, Clone)]
pub struct ParentDogRecord {
    pub bg_dog_id: Option<String>,
    pub registered_name: Field<String>,
    pub call_name: Field<String>,
    pub sex: Field<String>,
    pub birth_date: Field<NaiveDate>,
    pub death_date: Field<NaiveDate>,
    pub color: Field<String>,
    pub primary_image: Field<String>,
    pub registration_number: Field<String>,
    pub dna_number: Field<String>,
    pub microchip: Field<String>,
    pub weight: Field<String>,
    pub height: Field<String>,
    pub bite: Field<String>,
    pub tail: Field<String>,
    pub eye_color: Field<String>,
    pub stud_book: Field<String>,
    pub frozen_semen: Field<bool>,
    pub rescue_type: Field<String>,
    pub litter_id: Field<String>,
    pub owner_name: Field<String>,
    pub owner_id: Field<String>,
    pub titles: Field<String>,
    /// Parent ids/names only overwrite when the page has them
    pub sire_id: Option<String>,
    pub dam_id: Option<String>,
    pub sire_name: Option<String>,
    pub dam_name: Option<String>,
}

impl FromRow for ParentDogRecord {
    fn from_row(row: &RawRow) -> Self {
        use columns::*;
        ParentDogRecord {
            bg_dog_id: row.id(DOG_KEY).into_option(),
            registered_name: row.text(REGISTERED_NAME),
            call_name: row.text(CALL_NAME),
            sex: row.text(SEX),
            birth_date: row.date(BIRTH_DATE),
            death_date: row.date(DEATH_DATE),
            color: row.text(COLOR),
            primary_image: row.text(IMAGE),
            registration_number: row.text(REGISTRATION),
            dna_number: row.text(DNA_NUMBER),
            microchip: row.text(MICROCHIP),
            weight: row.text(WEIGHT),
            height: row.text(HEIGHT),
            bite: row.text(BITE),
            tail: row.text(TAIL),
            eye_color: row.text(EYE_COLOR),
            stud_book: row.text(STUD_BOOK),
            frozen_semen: row.flag(FROZEN_SEMEN, &["no", "false"]),
            rescue_type: row.text(RESCUE_TYPE),
            litter_id: row.id(DOG_LITTER_ID),
            owner_name: row.text(OWNER_NAME),
            owner_id: row.id(OWNER_ID),
            titles: row.text(TITLES),
            sire_id: row.id(SIRE_ID).into_option(),
            dam_id: row.id(DAM_ID).into_option(),
            sire_name: row.get(SIRE_NAME),
            dam_name: row.get(DAM_NAME),
        }
    }
}

/// recent_litters_details.csv: explicit parent ids per litter
#[derive(Debug, Clone)]
pub struct LitterDetailRecord {
    pub bg_litter_id: Option<String>,
    pub sire_dog_id: Option<String>,
    pub dam_dog_id: Option<String>,
}

impl FromRow for LitterDetailRecord {
    fn from_row(row: &RawRow) -> Self {
        use columns::*;
        // "None" is the scraper's way of saying the page had no link
        let parent = |aliases: &[&str]| {
            row.cell(aliases)
                .value()
                .filter(|v| **v != "None")
                .and_then(|v| normalize_id(Some(*v)))
        };
        LitterDetailRecord {
            bg_litter_id: row.id(LITTER_KEY).into_option(),
            sire_dog_id: parent(SIRE_DOG_ID),
            dam_dog_id: parent(DAM_DOG_ID),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
