// 🏡 Breeder Entity
// A registry person who has bred at least one dog. Identity is the internal
// row id; `bg_person_id` is the registry's key and drives re-import dedup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breeder {
    pub id: i64,
    pub bg_person_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub kennel_name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub dogs_bred_count: i64,
    pub litters_count: i64,
    /// Mean grade of linked dogs (50 when none are graded)
    pub grade: Option<f64>,
}

impl Breeder {
    pub const COLUMNS: &'static str = "id, bg_person_id, first_name, last_name, kennel_name, \
         city, state, country, email, phone, website, dogs_bred_count, litters_count, grade";

    pub fn from_sql(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Breeder {
            id: row.get("id")?,
            bg_person_id: row.get("bg_person_id")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            kennel_name: row.get("kennel_name")?,
            city: row.get("city")?,
            state: row.get("state")?,
            country: row.get("country")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            website: row.get("website")?,
            dogs_bred_count: row.get("dogs_bred_count")?,
            litters_count: row.get("litters_count")?,
            grade: row.get("grade")?,
        })
    }

    /// "First Last", trimmed; empty when neither is known
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or(""),
            self.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_string()
    }

    /// Kennel name if there is one, else the person's name
    pub fn display_name(&self) -> String {
        match self.kennel_name.as_deref() {
            Some(kennel) if !kennel.trim().is_empty() => kennel.to_string(),
            _ => self.full_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breeder(first: Option<&str>, last: Option<&str>, kennel: Option<&str>) -> Breeder {
        Breeder {
            id: 1,
            bg_person_id: Some("42".to_string()),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            kennel_name: kennel.map(str::to_string),
            city: None,
            state: None,
            country: None,
            email: None,
            phone: None,
            website: None,
            dogs_bred_count: 0,
            litters_count: 0,
            grade: None,
        }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(breeder(Some("Ann"), Some("Lee"), None).full_name(), "Ann Lee");
        assert_eq!(breeder(None, Some("Lee"), None).full_name(), "Lee");
        assert_eq!(breeder(None, None, None).full_name(), "");
    }

    #[test]
    fn test_display_name_prefers_kennel() {
        assert_eq!(
            breeder(Some("Ann"), Some("Lee"), Some("Alpenhof")).display_name(),
            "Alpenhof"
        );
        assert_eq!(breeder(Some("Ann"), Some("Lee"), Some(" ")).display_name(), "Ann Lee");
    }
}
