// 🐕 Dog Entity
// Health fields are free text from the registry, not enums: "OFA Excellent",
// "Normal (OFA)", "Grade II", "Clear by parentage" all occur in the wild.
// Pedigree links (`sire_id`, `dam_id`) are external ids of other dogs that
// may not have been imported yet.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::read_date;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dog {
    pub id: i64,
    pub bg_dog_id: Option<String>,
    pub registered_name: Option<String>,
    pub call_name: Option<String>,
    pub sex: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub age_years: Option<i64>,
    pub color: Option<String>,

    // Breeder link (internal FK) plus the name the registry printed
    pub breeder_id: Option<i64>,
    pub breeder_name: Option<String>,

    // Health clearances
    pub hip_rating: Option<String>,
    pub elbow_rating: Option<String>,
    pub heart_status: Option<String>,
    pub eye_status: Option<String>,
    pub dm_status: Option<String>,
    pub dna_status: Option<String>,
    pub ofa_certified: bool,

    // Pedigree (soft references by external id)
    pub sire_id: Option<String>,
    pub dam_id: Option<String>,
    pub sire_name: Option<String>,
    pub dam_name: Option<String>,

    // Registration & details
    pub primary_image: Option<String>,
    pub registration_number: Option<String>,
    pub dna_number: Option<String>,
    pub microchip: Option<String>,
    pub titles: Option<String>,
    pub owner_name: Option<String>,
    pub owner_id: Option<String>,
    pub weight: Option<String>,
    pub height: Option<String>,
    pub bite: Option<String>,
    pub tail: Option<String>,
    pub eye_color: Option<String>,
    pub stud_book: Option<String>,
    pub frozen_semen: bool,
    pub rescue_type: Option<String>,
    pub litter_id: Option<String>,

    // Scores (written only by the grading engine)
    pub health_score: Option<f64>,
    pub longevity_score: Option<f64>,
    pub pedigree_longevity_score: Option<f64>,
    pub grade: Option<f64>,
}

impl Dog {
    pub const COLUMNS: &'static str = "id, bg_dog_id, registered_name, call_name, sex, \
         birth_date, death_date, age_years, color, breeder_id, breeder_name, \
         hip_rating, elbow_rating, heart_status, eye_status, dm_status, dna_status, ofa_certified, \
         sire_id, dam_id, sire_name, dam_name, primary_image, registration_number, dna_number, \
         microchip, titles, owner_name, owner_id, weight, height, bite, tail, eye_color, \
         stud_book, frozen_semen, rescue_type, litter_id, \
         health_score, longevity_score, pedigree_longevity_score, grade";

    pub fn from_sql(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Dog {
            id: row.get("id")?,
            bg_dog_id: row.get("bg_dog_id")?,
            registered_name: row.get("registered_name")?,
            call_name: row.get("call_name")?,
            sex: row.get("sex")?,
            birth_date: read_date(row, "birth_date")?,
            death_date: read_date(row, "death_date")?,
            age_years: row.get("age_years")?,
            color: row.get("color")?,
            breeder_id: row.get("breeder_id")?,
            breeder_name: row.get("breeder_name")?,
            hip_rating: row.get("hip_rating")?,
            elbow_rating: row.get("elbow_rating")?,
            heart_status: row.get("heart_status")?,
            eye_status: row.get("eye_status")?,
            dm_status: row.get("dm_status")?,
            dna_status: row.get("dna_status")?,
            ofa_certified: row.get("ofa_certified")?,
            sire_id: row.get("sire_id")?,
            dam_id: row.get("dam_id")?,
            sire_name: row.get("sire_name")?,
            dam_name: row.get("dam_name")?,
            primary_image: row.get("primary_image")?,
            registration_number: row.get("registration_number")?,
            dna_number: row.get("dna_number")?,
            microchip: row.get("microchip")?,
            titles: row.get("titles")?,
            owner_name: row.get("owner_name")?,
            owner_id: row.get("owner_id")?,
            weight: row.get("weight")?,
            height: row.get("height")?,
            bite: row.get("bite")?,
            tail: row.get("tail")?,
            eye_color: row.get("eye_color")?,
            stud_book: row.get("stud_book")?,
            frozen_semen: row.get("frozen_semen")?,
            rescue_type: row.get("rescue_type")?,
            litter_id: row.get("litter_id")?,
            health_score: row.get("health_score")?,
            longevity_score: row.get("longevity_score")?,
            pedigree_longevity_score: row.get("pedigree_longevity_score")?,
            grade: row.get("grade")?,
        })
    }

    /// Bare dog with only an internal id, for building test fixtures
    pub fn blank(id: i64) -> Self {
        Dog {
            id,
            bg_dog_id: None,
            registered_name: None,
            call_name: None,
            sex: None,
            birth_date: None,
            death_date: None,
            age_years: None,
            color: None,
            breeder_id: None,
            breeder_name: None,
            hip_rating: None,
            elbow_rating: None,
            heart_status: None,
            eye_status: None,
            dm_status: None,
            dna_status: None,
            ofa_certified: false,
            sire_id: None,
            dam_id: None,
            sire_name: None,
            dam_name: None,
            primary_image: None,
            registration_number: None,
            dna_number: None,
            microchip: None,
            titles: None,
            owner_name: None,
            owner_id: None,
            weight: None,
            height: None,
            bite: None,
            tail: None,
            eye_color: None,
            stud_book: None,
            frozen_semen: false,
            rescue_type: None,
            litter_id: None,
            health_score: None,
            longevity_score: None,
            pedigree_longevity_score: None,
            grade: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.death_date.is_none()
    }

    /// At least one of the four primary clearances is on file
    pub fn has_complete_data(&self) -> bool {
        [
            &self.hip_rating,
            &self.elbow_rating,
            &self.heart_status,
            &self.eye_status,
        ]
        .iter()
        .any(|field| field.is_some())
    }

    /// Hips, elbows or heart on file
    pub fn has_health_clearance(&self) -> bool {
        self.hip_rating.is_some() || self.elbow_rating.is_some() || self.heart_status.is_some()
    }

    /// Call name in quotes after the registered name, when both exist
    pub fn display_name(&self) -> String {
        match (self.registered_name.as_deref(), self.call_name.as_deref()) {
            (Some(reg), Some(call)) => format!("{} \"{}\"", reg, call),
            (Some(reg), None) => reg.to_string(),
            (None, Some(call)) => call.to_string(),
            (None, None) => format!("Dog #{}", self.bg_dog_id.as_deref().unwrap_or("?")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_data_needs_one_primary_clearance() {
        let mut dog = Dog::blank(1);
        dog.dm_status = Some("Clear".to_string());
        assert!(!dog.has_complete_data(), "DM alone is not complete data");

        dog.eye_status = Some("Normal".to_string());
        assert!(dog.has_complete_data());
        assert!(!dog.has_health_clearance(), "eyes are not a structural clearance");
    }

    #[test]
    fn test_alive_and_display_name() {
        let mut dog = Dog::blank(1);
        dog.bg_dog_id = Some("77".to_string());
        assert!(dog.is_alive());
        assert_eq!(dog.display_name(), "Dog #77");

        dog.registered_name = Some("Alpenhof's Bruno".to_string());
        dog.call_name = Some("Bruno".to_string());
        assert_eq!(dog.display_name(), "Alpenhof's Bruno \"Bruno\"");

        dog.death_date = NaiveDate::from_ymd_opt(2020, 1, 1);
        assert!(!dog.is_alive());
    }
}
