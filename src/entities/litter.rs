// 🐾 Litter Entity

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::read_date;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Litter {
    pub id: i64,
    pub bg_litter_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub birth_year: Option<i64>,
    /// External dog ids; may point at dogs that were never imported
    pub sire_id: Option<String>,
    pub dam_id: Option<String>,
    pub sire_name: Option<String>,
    pub dam_name: Option<String>,
    pub breeder_id: Option<i64>,
    pub breeder_name: Option<String>,
    pub puppies_count: Option<i64>,
    pub males_count: Option<i64>,
    pub females_count: Option<i64>,
}

impl Litter {
    pub const COLUMNS: &'static str = "id, bg_litter_id, birth_date, birth_year, sire_id, dam_id, \
         sire_name, dam_name, breeder_id, breeder_name, puppies_count, males_count, females_count";

    pub fn from_sql(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Litter {
            id: row.get("id")?,
            bg_litter_id: row.get("bg_litter_id")?,
            birth_date: read_date(row, "birth_date")?,
            birth_year: row.get("birth_year")?,
            sire_id: row.get("sire_id")?,
            dam_id: row.get("dam_id")?,
            sire_name: row.get("sire_name")?,
            dam_name: row.get("dam_name")?,
            breeder_id: row.get("breeder_id")?,
            breeder_name: row.get("breeder_name")?,
            puppies_count: row.get("puppies_count")?,
            males_count: row.get("males_count")?,
            females_count: row.get("females_count")?,
        })
    }

    pub fn has_both_parents(&self) -> bool {
        self.sire_id.is_some() && self.dam_id.is_some()
    }
}
