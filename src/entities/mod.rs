// Entity Models - Breeders, Dogs, Litters
//
// Each entity has:
// - An internal row id that never changes across re-imports
// - An optional external registry id (the dedup key)
// - Soft references (sire_id/dam_id) that are resolved by lookup, never enforced

pub mod breeder;
pub mod dog;
pub mod litter;

pub use breeder::Breeder;
pub use dog::Dog;
pub use litter::Litter;

use chrono::NaiveDate;

/// Storage format for dates (SQLite TEXT column)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read an ISO date column; unparseable text reads as NULL
pub(crate) fn read_date(row: &rusqlite::Row, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(column)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()))
}
