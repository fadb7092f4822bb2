// ⭐ Grading Engine - Health, longevity and pedigree scores
// Pure functions over a dog's current field values; the batch helpers at the
// bottom persist them. Every branch has a default, so grading never fails
// on bad data, only on database errors.

use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::db::{get_all_dogs, get_dog, update_breeder_grade, update_dog_scores};
use crate::entities::Dog;
use crate::error::ImportError;
use crate::ids::normalize_id;

/// Score used whenever there is nothing to judge by
pub const NEUTRAL_SCORE: f64 = 50.0;

const HEALTH_BASE: f64 = 50.0;

/// Hip ratings, matched case-sensitively in this order (first hit wins)
const HIP_SCORES: &[(&str, f64)] = &[
    ("Excellent", 30.0),
    ("Good", 25.0),
    ("Fair", 15.0),
    ("Borderline", 5.0),
    ("Mild", -5.0),
    ("Moderate", -15.0),
    ("Severe", -25.0),
];

// ============================================================================
// WEIGHTS
// ============================================================================

/// Composite grade weights: health 50%, own longevity 30%, pedigree 20%
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeWeights {
    pub health: f64,
    pub longevity: f64,
    pub pedigree: f64,
}

impl Default for GradeWeights {
    fn default() -> Self {
        GradeWeights {
            health: 0.5,
            longevity: 0.3,
            pedigree: 0.2,
        }
    }
}

impl GradeWeights {
    /// Weights must be non-negative and sum to 1 so grades stay in 0..=100
    pub fn validate(&self) -> Result<(), ImportError> {
        let all = [self.health, self.longevity, self.pedigree];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ImportError::InvalidConfig(format!(
                "grade weights must be non-negative: {:?}",
                self
            )));
        }
        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ImportError::InvalidConfig(format!(
                "grade weights must sum to 1.0 (got {:.3})",
                sum
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SCORES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DogScores {
    /// Stored age, or one derived from birth/death dates
    pub age_years: Option<i64>,
    pub health_score: f64,
    pub longevity_score: f64,
    pub pedigree_longevity_score: f64,
    pub grade: f64,
}

/// Own longevity score per dog, keyed by normalized external id.
/// Pedigree scores read parents from this snapshot instead of the database.
#[derive(Debug, Clone, Default)]
pub struct LongevityIndex {
    scores: HashMap<String, f64>,
}

impl LongevityIndex {
    /// Freshly computed scores (what a full regrade is about to write)
    pub fn fresh(dogs: &[Dog]) -> Self {
        Self::build(dogs, |dog| {
            GradingEngine::longevity_score(derive_age_years(dog))
        })
    }

    /// Stored scores where present, computed otherwise
    pub fn cached(dogs: &[Dog]) -> Self {
        Self::build(dogs, |dog| {
            dog.longevity_score
                .unwrap_or_else(|| GradingEngine::longevity_score(derive_age_years(dog)))
        })
    }

    fn build(dogs: &[Dog], score: impl Fn(&Dog) -> f64) -> Self {
        let scores = dogs
            .iter()
            .filter_map(|dog| normalize_id(dog.bg_dog_id.as_deref()).map(|id| (id, score(dog))))
            .collect();
        LongevityIndex { scores }
    }

    pub fn get(&self, external_id: Option<&str>) -> Option<f64> {
        normalize_id(external_id).and_then(|id| self.scores.get(&id).copied())
    }
}

// ============================================================================
// GRADING ENGINE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct GradingEngine {
    pub weights: GradeWeights,
}

impl GradingEngine {
    /// Engine with the default 50/30/20 weights
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: GradeWeights) -> Self {
        GradingEngine { weights }
    }

    /// Health score, 0-100 from a base of 50.
    ///
    /// Untested hips/elbows cost 10 points, untested heart/eyes/DM cost 5.
    pub fn health_score(&self, dog: &Dog) -> f64 {
        let mut score = HEALTH_BASE;

        // --- Hips ---
        match present(&dog.hip_rating) {
            Some(hip) => {
                if let Some((_, points)) = HIP_SCORES.iter().find(|(rating, _)| hip.contains(rating)) {
                    score += points;
                }
                // Tested but unrecognized result: no adjustment
            }
            None => score -= 10.0,
        }

        // --- Elbows ---
        // Order matters: "iii" has to be checked before "ii"
        match present(&dog.elbow_rating).map(str::to_lowercase) {
            Some(elbow) => {
                if elbow.contains("normal") {
                    score += 20.0;
                } else if elbow.contains("grade iii") || elbow.contains("grade3") || elbow.contains("iii") {
                    score -= 15.0;
                } else if elbow.contains("grade ii") || elbow.contains("grade2") || elbow.contains("ii") {
                    score -= 5.0;
                } else if elbow.contains("grade i") || elbow.contains("grade1") {
                    score += 5.0;
                }
            }
            None => score -= 10.0,
        }

        // --- Heart & eyes ---
        score += clearance_points(&dog.heart_status);
        score += clearance_points(&dog.eye_status);

        // --- DM: clear +10, carrier 0, affected -10 ---
        match present(&dog.dm_status).map(str::to_lowercase) {
            Some(dm) => {
                if dm.contains("clear") {
                    score += 10.0;
                } else if dm.contains("affected") {
                    score -= 10.0;
                }
            }
            None => score -= 5.0,
        }

        score.clamp(0.0, 100.0)
    }

    /// Own longevity: coarse steps around the breed's 7-10 year lifespan.
    /// Unknown age (or 0 and below) is neutral.
    pub fn longevity_score(age_years: Option<i64>) -> f64 {
        match age_years {
            None => NEUTRAL_SCORE,
            Some(age) if age <= 0 => NEUTRAL_SCORE,
            Some(age) if age >= 12 => 100.0,
            Some(age) if age >= 10 => 90.0,
            Some(age) if age >= 8 => 75.0,
            Some(age) if age >= 6 => 50.0,
            Some(age) if age >= 4 => 30.0,
            Some(_) => 20.0,
        }
    }

    /// Mean longevity of whichever parents resolve; neutral when none do
    pub fn pedigree_longevity_score(&self, dog: &Dog, parents: &LongevityIndex) -> f64 {
        let scores: Vec<f64> = [dog.sire_id.as_deref(), dog.dam_id.as_deref()]
            .into_iter()
            .filter_map(|id| parents.get(id))
            .collect();

        if scores.is_empty() {
            NEUTRAL_SCORE
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }

    pub fn grade(&self, health: f64, longevity: f64, pedigree: f64) -> f64 {
        health * self.weights.health + longevity * self.weights.longevity + pedigree * self.weights.pedigree
    }

    /// All scores for one dog
    pub fn score(&self, dog: &Dog, parents: &LongevityIndex) -> DogScores {
        let age_years = derive_age_years(dog);
        let health = self.health_score(dog);
        let longevity = Self::longevity_score(age_years);
        let pedigree = self.pedigree_longevity_score(dog, parents);

        DogScores {
            age_years,
            health_score: round2(health),
            longevity_score: round2(longevity),
            pedigree_longevity_score: round2(pedigree),
            grade: round2(self.grade(health, longevity, pedigree)),
        }
    }

    /// Mean of the breeder's graded dogs; neutral 50 when there are none
    pub fn breeder_grade(grades: &[f64]) -> f64 {
        if grades.is_empty() {
            return NEUTRAL_SCORE;
        }
        round2(grades.iter().sum::<f64>() / grades.len() as f64)
    }
}

/// Heart/eye rule: normal or clear +10, any other result +3, untested -5
fn clearance_points(status: &Option<String>) -> f64 {
    match present(status).map(str::to_lowercase) {
        Some(s) if s.contains("normal") || s.contains("clear") => 10.0,
        Some(_) => 3.0,
        None => -5.0,
    }
}

/// Non-blank field value
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Stored age, else whole years between birth and death (days / 365.25, rounded)
pub fn derive_age_years(dog: &Dog) -> Option<i64> {
    match (dog.age_years, dog.birth_date, dog.death_date) {
        (Some(age), _, _) if age != 0 => Some(age),
        (age, Some(birth), Some(death)) => {
            let days = (death - birth).num_days();
            if days < 0 {
                age
            } else {
                Some((days as f64 / 365.25).round() as i64)
            }
        }
        (age, _, _) => age,
    }
}

// ============================================================================
// BATCH REGRADING
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradeSummary {
    pub dogs: usize,
    pub breeders: usize,
    pub avg_health: f64,
    pub avg_longevity: f64,
    pub avg_pedigree: f64,
    pub avg_grade: f64,
}

/// Regrade every dog, then every breeder.
///
/// Two phases: own longevity for all dogs first, then pedigree scores read
/// from that snapshot, so the result never depends on row order and a second
/// run writes exactly what the first one did.
pub fn recalculate_all(conn: &Connection, engine: &GradingEngine) -> Result<GradeSummary> {
    let dogs = get_all_dogs(conn)?;
    let parents = LongevityIndex::fresh(&dogs);
    info!(dogs = dogs.len(), "Recalculating dog grades");

    let mut summary = GradeSummary::default();
    let tx = conn.unchecked_transaction()?;
    for dog in &dogs {
        let scores = engine.score(dog, &parents);
        update_dog_scores(&tx, dog.id, &scores)?;

        summary.dogs += 1;
        summary.avg_health += scores.health_score;
        summary.avg_longevity += scores.longevity_score;
        summary.avg_pedigree += scores.pedigree_longevity_score;
        summary.avg_grade += scores.grade;
    }
    tx.commit()?;

    if summary.dogs > 0 {
        let n = summary.dogs as f64;
        summary.avg_health /= n;
        summary.avg_longevity /= n;
        summary.avg_pedigree /= n;
        summary.avg_grade /= n;
    }

    summary.breeders = recalculate_breeder_grades(conn)?;
    Ok(summary)
}

/// Regrade specific dogs (e.g. after a health certification update).
/// Parents are read with their stored longevity scores.
pub fn regrade_dogs(conn: &Connection, engine: &GradingEngine, dog_ids: &[i64]) -> Result<usize> {
    if dog_ids.is_empty() {
        return Ok(0);
    }
    let parents = LongevityIndex::cached(&get_all_dogs(conn)?);

    let tx = conn.unchecked_transaction()?;
    let mut regraded = 0;
    for id in dog_ids {
        if let Some(dog) = get_dog(&tx, *id)? {
            update_dog_scores(&tx, dog.id, &engine.score(&dog, &parents))?;
            regraded += 1;
        }
    }
    tx.commit()?;

    debug!(regraded, "Regraded dogs");
    Ok(regraded)
}

/// Grade dogs that have never been graded (fresh parent-dog imports)
pub fn grade_ungraded(conn: &Connection, engine: &GradingEngine) -> Result<usize> {
    let dogs = get_all_dogs(conn)?;
    let parents = LongevityIndex::cached(&dogs);

    let tx = conn.unchecked_transaction()?;
    let mut graded = 0;
    for dog in dogs.iter().filter(|d| d.grade.is_none()) {
        update_dog_scores(&tx, dog.id, &engine.score(dog, &parents))?;
        graded += 1;
    }
    tx.commit()?;

    Ok(graded)
}

/// Every breeder's grade = mean of their dogs' non-null grades (50 if none)
pub fn recalculate_breeder_grades(conn: &Connection) -> Result<usize> {
    let mut grades: HashMap<i64, Vec<f64>> = HashMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT breeder_id, grade FROM dogs WHERE breeder_id IS NOT NULL AND grade IS NOT NULL",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)))?;
        for row in rows {
            let (breeder_id, grade) = row?;
            grades.entry(breeder_id).or_default().push(grade);
        }
    }

    let breeder_ids: Vec<i64> = {
        let mut stmt = conn.prepare("SELECT id FROM breeders")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };

    let tx = conn.unchecked_transaction()?;
    for id in &breeder_ids {
        let dog_grades = grades.get(id).map(Vec::as_slice).unwrap_or(&[]);
        update_breeder_grade(&tx, *id, GradingEngine::breeder_grade(dog_grades))?;
    }
    tx.commit()?;

    Ok(breeder_ids.len())
}

// ============================================================================
// TESTS
// ============================================================================
