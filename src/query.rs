// 🔎 Query Layer - Filtered reads over the graded stores
// Read-only. Scores are whatever the grading engine last persisted; nothing
// here recomputes them.

use anyhow::Result;
use chrono::{Datelike, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::db::find_dog_by_external_id;
use crate::entities::{Breeder, Dog, Litter};
use crate::ids::normalize_id;

/// Shortest search term worth running
pub const MIN_SEARCH_LEN: usize = 2;

// ============================================================================
// SQL FILTER BUILDER
// ============================================================================

/// AND-joined WHERE clauses with their positional parameters
#[derive(Debug, Default)]
struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    fn push(&mut self, clause: &str, params: impl IntoIterator<Item = Value>) {
        self.clauses.push(format!("({})", clause));
        self.params.extend(params);
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn like(term: &str) -> Value {
    Value::Text(format!("%{}%", term.trim()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    fn sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

fn limit_sql(limit: Option<usize>) -> String {
    limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default()
}

// ============================================================================
// DOGS
// ============================================================================

/// Sortable dog columns (only these reach ORDER BY)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DogSort {
    #[default]
    Grade,
    HealthScore,
    LongevityScore,
    Name,
    BirthDate,
    Age,
}

impl DogSort {
    fn column(&self) -> &'static str {
        match self {
            DogSort::Grade => "grade",
            DogSort::HealthScore => "health_score",
            DogSort::LongevityScore => "longevity_score",
            DogSort::Name => "registered_name",
            DogSort::BirthDate => "birth_date",
            DogSort::Age => "age_years",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DogQuery {
    /// Substring of registered or call name
    pub search: Option<String>,
    pub sex: Option<String>,
    /// Breeder's state
    pub state: Option<String>,
    pub min_grade: Option<f64>,
    pub graded_only: bool,
    /// Hips, elbows or heart on file
    pub has_health_clearance: bool,
    /// Hips, elbows, heart or eyes on file
    pub complete_data: bool,
    pub alive_only: bool,
    pub max_age: Option<i64>,
    /// Hips on file and not Moderate/Severe
    pub require_hips: bool,
    pub require_elbows: bool,
    /// Sire or dam of a litter born in this year or later
    pub litters_since: Option<i32>,
    pub sort: DogSort,
    pub dir: SortDir,
    pub limit: Option<usize>,
}

impl DogQuery {
    /// Best living dogs: graded, complete data, highest grade first
    pub fn best() -> Self {
        DogQuery {
            graded_only: true,
            complete_data: true,
            alive_only: true,
            limit: Some(25),
            ..Default::default()
        }
    }

    fn filter(&self) -> Filter {
        let mut f = Filter::default();

        if let Some(term) = self.search.as_deref().filter(|t| !t.trim().is_empty()) {
            f.push("registered_name LIKE ? OR call_name LIKE ?", [like(term), like(term)]);
        }
        if let Some(sex) = &self.sex {
            f.push("sex = ?", [Value::Text(sex.clone())]);
        }
        if let Some(state) = &self.state {
            f.push(
                "breeder_id IN (SELECT id FROM breeders WHERE state = ?)",
                [Value::Text(state.clone())],
            );
        }
        if let Some(min) = self.min_grade {
            f.push("grade >= ?", [Value::Real(min)]);
        }
        if self.graded_only {
            f.push("grade IS NOT NULL", []);
        }
        if self.has_health_clearance {
            f.push(
                "hip_rating IS NOT NULL OR elbow_rating IS NOT NULL OR heart_status IS NOT NULL",
                [],
            );
        }
        if self.complete_data {
            f.push(
                "hip_rating IS NOT NULL OR elbow_rating IS NOT NULL \
                 OR heart_status IS NOT NULL OR eye_status IS NOT NULL",
                [],
            );
        }
        if self.alive_only {
            f.push("death_date IS NULL", []);
        }
        if let Some(max) = self.max_age {
            f.push("age_years <= ?", [Value::Integer(max)]);
        }
        if self.require_hips {
            f.push(
                "hip_rating IS NOT NULL AND hip_rating NOT LIKE '%Severe%' AND hip_rating NOT LIKE '%Moderate%'",
                [],
            );
        }
        if self.require_elbows {
            f.push("elbow_rating IS NOT NULL", []);
        }
        if let Some(year) = self.litters_since {
            f.push(
                "bg_dog_id IN (SELECT sire_id FROM litters WHERE sire_id IS NOT NULL AND birth_year >= ?) \
                 OR bg_dog_id IN (SELECT dam_id FROM litters WHERE dam_id IS NOT NULL AND birth_year >= ?)",
                [Value::Integer(year as i64), Value::Integer(year as i64)],
            );
        }

        f
    }
}

pub fn find_dogs(conn: &Connection, query: &DogQuery) -> Result<Vec<Dog>> {
    let filter = query.filter();
    let sql = format!(
        "SELECT {} FROM dogs{} ORDER BY {} {}, id ASC{}",
        Dog::COLUMNS,
        filter.sql(),
        query.sort.column(),
        query.dir.sql(),
        limit_sql(query.limit)
    );

    let mut stmt = conn.prepare(&sql)?;
    let dogs = stmt
        .query_map(params_from_iter(filter.params), |row| Dog::from_sql(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dogs)
}

// ============================================================================
// BREEDERS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreederSort {
    #[default]
    Grade,
    KennelName,
    LastName,
    DogsBred,
    Litters,
}

impl BreederSort {
    fn column(&self) -> &'static str {
        match self {
            BreederSort::Grade => "grade",
            BreederSort::KennelName => "kennel_name",
            BreederSort::LastName => "last_name",
            BreederSort::DogsBred => "dogs_bred_count",
            BreederSort::Litters => "litters_count",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreederQuery {
    /// Substring of first, last or kennel name
    pub search: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub min_grade: Option<f64>,
    pub min_dogs_bred: Option<i64>,
    pub sort: BreederSort,
    pub dir: SortDir,
    pub limit: Option<usize>,
}

impl BreederQuery {
    fn filter(&self) -> Filter {
        let mut f = Filter::default();

        if let Some(term) = self.search.as_deref().filter(|t| !t.trim().is_empty()) {
            f.push(
                "first_name LIKE ? OR last_name LIKE ? OR kennel_name LIKE ?",
                [like(term), like(term), like(term)],
            );
        }
        if let Some(state) = &self.state {
            f.push("state = ?", [Value::Text(state.clone())]);
        }
        if let Some(country) = &self.country {
            f.push("country = ?", [Value::Text(country.clone())]);
        }
        if let Some(min) = self.min_grade {
            f.push("grade >= ?", [Value::Real(min)]);
        }
        if let Some(min) = self.min_dogs_bred {
            f.push("dogs_bred_count >= ?", [Value::Integer(min)]);
        }

        f
    }
}

pub fn find_breeders(conn: &Connection, query: &BreederQuery) -> Result<Vec<Breeder>> {
    let filter = query.filter();
    let sql = format!(
        "SELECT {} FROM breeders{} ORDER BY {} {}, id ASC{}",
        Breeder::COLUMNS,
        filter.sql(),
        query.sort.column(),
        query.dir.sql(),
        limit_sql(query.limit)
    );

    let mut stmt = conn.prepare(&sql)?;
    let breeders = stmt
        .query_map(params_from_iter(filter.params), |row| Breeder::from_sql(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(breeders)
}

/// A breeder's dogs, best first
pub fn breeder_dogs(conn: &Connection, breeder_id: i64, limit: usize) -> Result<Vec<Dog>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM dogs WHERE breeder_id = ?1 ORDER BY grade DESC, id ASC LIMIT ?2",
        Dog::COLUMNS
    ))?;
    let dogs = stmt
        .query_map(rusqlite::params![breeder_id, limit as i64], |row| Dog::from_sql(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dogs)
}

/// Distinct breeder states, sorted (for filter pickers)
pub fn breeder_states(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT state FROM breeders WHERE state IS NOT NULL ORDER BY state")?;
    let states = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(states)
}

// ============================================================================
// LITTERS & PEDIGREE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LitterQuery {
    pub birth_year: Option<i64>,
    pub since_year: Option<i64>,
    pub breeder_id: Option<i64>,
    pub limit: Option<usize>,
}

pub fn find_litters(conn: &Connection, query: &LitterQuery) -> Result<Vec<Litter>> {
    let mut f = Filter::default();
    if let Some(year) = query.birth_year {
        f.push("birth_year = ?", [Value::Integer(year)]);
    }
    if let Some(year) = query.since_year {
        f.push("birth_year >= ?", [Value::Integer(year)]);
    }
    if let Some(id) = query.breeder_id {
        f.push("breeder_id = ?", [Value::Integer(id)]);
    }

    let sql = format!(
        "SELECT {} FROM litters{} ORDER BY birth_year DESC, id ASC{}",
        Litter::COLUMNS,
        f.sql(),
        limit_sql(query.limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let litters = stmt
        .query_map(params_from_iter(f.params), |row| Litter::from_sql(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(litters)
}

/// Litters a dog sired or whelped, most recent first
pub fn litters_for_dog(conn: &Connection, bg_dog_id: &str, limit: usize) -> Result<Vec<Litter>> {
    let Some(key) = normalize_id(Some(bg_dog_id)) else {
        return Ok(Vec::new());
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM litters WHERE sire_id = ?1 OR dam_id = ?1
         ORDER BY birth_year DESC, id ASC LIMIT ?2",
        Litter::COLUMNS
    ))?;
    let litters = stmt
        .query_map(rusqlite::params![key, limit as i64], |row| Litter::from_sql(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(litters)
}

/// Birth year of the dog's latest litter as sire or dam
pub fn most_recent_litter_year(conn: &Connection, bg_dog_id: &str) -> Result<Option<i64>> {
    let Some(key) = normalize_id(Some(bg_dog_id)) else {
        return Ok(None);
    };
    let year = conn.query_row(
        "SELECT MAX(birth_year) FROM litters WHERE sire_id = ?1 OR dam_id = ?1",
        [key],
        |row| row.get(0),
    )?;
    Ok(year)
}

/// A dog's parents, resolved through the soft sire/dam references
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parents {
    pub sire: Option<Dog>,
    pub dam: Option<Dog>,
    /// Names as printed on the dog's own record (shown when unresolved)
    pub sire_name: Option<String>,
    pub dam_name: Option<String>,
}

pub fn parents(conn: &Connection, dog: &Dog) -> Result<Parents> {
    let resolve = |id: Option<&str>| -> Result<Option<Dog>> {
        match id {
            Some(id) => find_dog_by_external_id(conn, id),
            None => Ok(None),
        }
    };
    Ok(Parents {
        sire: resolve(dog.sire_id.as_deref())?,
        dam: resolve(dog.dam_id.as_deref())?,
        sire_name: dog.sire_name.clone(),
        dam_name: dog.dam_name.clone(),
    })
}

// ============================================================================
// COMPOSITE VIEWS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub dogs: Vec<Dog>,
    pub breeders: Vec<Breeder>,
}

/// Name search over dogs (50) and breeders (20), best graded first.
/// Terms shorter than two characters return nothing.
pub fn search(conn: &Connection, term: &str, complete_only: bool) -> Result<SearchResults> {
    if term.trim().chars().count() < MIN_SEARCH_LEN {
        return Ok(SearchResults::default());
    }

    let dogs = find_dogs(
        conn,
        &DogQuery {
            search: Some(term.to_string()),
            complete_data: complete_only,
            limit: Some(50),
            ..Default::default()
        },
    )?;
    let breeders = find_breeders(
        conn,
        &BreederQuery {
            search: Some(term.to_string()),
            limit: Some(20),
            ..Default::default()
        },
    )?;

    Ok(SearchResults { dogs, breeders })
}

/// A living dog with its recent litters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveDog {
    pub dog: Dog,
    pub recent_litters: Vec<Litter>,
    pub most_recent_litter_year: Option<i64>,
}

/// First birth year inside a window of `years` back from this year
pub fn since_year(years: i32) -> i32 {
    Utc::now().year() - years
}

/// Living dogs that sired or whelped a litter since `since`, most recent
/// litter first (up to five litters listed per dog).
pub fn active_breeding(conn: &Connection, since: i32, sex: Option<&str>, state: Option<&str>) -> Result<Vec<ActiveDog>> {
    let dogs = find_dogs(
        conn,
        &DogQuery {
            alive_only: true,
            litters_since: Some(since),
            sex: sex.map(str::to_string),
            state: state.map(str::to_string),
            ..Default::default()
        },
    )?;

    let mut active = Vec::with_capacity(dogs.len());
    for dog in dogs {
        let (recent_litters, latest) = match dog.bg_dog_id.as_deref() {
            Some(id) => (litters_for_dog(conn, id, 5)?, most_recent_litter_year(conn, id)?),
            None => (Vec::new(), None),
        };
        active.push(ActiveDog {
            dog,
            recent_litters,
            most_recent_litter_year: latest,
        });
    }

    // Stable: ties keep grade order
    active.sort_by(|a, b| b.most_recent_litter_year.cmp(&a.most_recent_litter_year));
    Ok(active)
}

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub breeders: i64,
    pub dogs: i64,
    pub graded_dogs: i64,
    pub dogs_with_breeder: i64,
    pub litters: i64,
    pub litters_with_sire: i64,
    pub litters_with_dam: i64,
    pub litters_with_both: i64,
}

pub fn registry_stats(conn: &Connection) -> Result<RegistryStats> {
    let stats = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM breeders),
            (SELECT COUNT(*) FROM dogs),
            (SELECT COUNT(*) FROM dogs WHERE grade IS NOT NULL),
            (SELECT COUNT(*) FROM dogs WHERE breeder_id IS NOT NULL),
            (SELECT COUNT(*) FROM litters),
            (SELECT COUNT(*) FROM litters WHERE sire_id IS NOT NULL),
            (SELECT COUNT(*) FROM litters WHERE dam_id IS NOT NULL),
            (SELECT COUNT(*) FROM litters WHERE sire_id IS NOT NULL AND dam_id IS NOT NULL)",
        [],
        |row| {
            Ok(RegistryStats {
                breeders: row.get(0)?,
                dogs: row.get(1)?,
                graded_dogs: row.get(2)?,
                dogs_with_breeder: row.get(3)?,
                litters: row.get(4)?,
                litters_with_sire: row.get(5)?,
                litters_with_dam: row.get(6)?,
                litters_with_both: row.get(7)?,
            })
        },
    )?;
    Ok(stats)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{setup_database, upsert, EntityKind, Patch};
    use crate::parser::Field;
    use chrono::NaiveDate;

    fn text(v: &str) -> Field<String> {
        Field::Value(v.to_string())
    }

    /// Two breeders, four dogs, two litters
    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut co = Patch::new();
        co.text("kennel_name", &text("Alpenhof")).text("state", &text("CO"));
        let co = upsert(&conn, EntityKind::Breeder, Some("1"), &co).unwrap().id;
        let mut wa = Patch::new();
        wa.text("last_name", &text("Berg")).text("state", &text("WA"));
        upsert(&conn, EntityKind::Breeder, Some("2"), &wa).unwrap();

        let dog = |key: &str, name: &str, sex: &str, hip: Option<&str>, grade: f64| {
            let mut p = Patch::new();
            p.text("registered_name", &text(name))
                .text("sex", &text(sex))
                .set("grade", Value::Real(grade))
                .set("breeder_id", Value::Integer(co));
            if let Some(hip) = hip {
                p.text("hip_rating", &text(hip));
            }
            upsert(&conn, EntityKind::Dog, Some(key), &p).unwrap();
        };
        dog("10", "Alpenhof's Bruno", "Male", Some("Excellent"), 80.0);
        dog("11", "Alpenhof's Bella", "Female", Some("Moderate"), 60.0);
        dog("12", "Max vom Berg", "Male", None, 70.0);
        dog("13", "Old Timer", "Male", Some("Good"), 90.0);

        let mut dead = Patch::new();
        dead.date("death_date", &Field::Value(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()));
        upsert(&conn, EntityKind::Dog, Some("13"), &dead).unwrap();

        let litter = |key: &str, year: i64, sire: &str, dam: &str| {
            let mut p = Patch::new();
            p.int("birth_year", &Field::Value(year))
                .text("sire_id", &text(sire))
                .text("dam_id", &text(dam));
            upsert(&conn, EntityKind::Litter, Some(key), &p).unwrap();
        };
        litter("L1", 2015, "12", "11");
        litter("L2", 2099, "10", "11");

        conn
    }

    fn keys(dogs: &[Dog]) -> Vec<&str> {
        dogs.iter().filter_map(|d| d.bg_dog_id.as_deref()).collect()
    }

    #[test]
    fn test_default_query_sorts_by_grade_desc() {
        let conn = fixture();
        let dogs = find_dogs(&conn, &DogQuery::default()).unwrap();
        assert_eq!(keys(&dogs), vec!["13", "10", "12", "11"]);
    }

    #[test]
    fn test_dog_filters() {
        let conn = fixture();

        let alive_males = find_dogs(
            &conn,
            &DogQuery {
                sex: Some("Male".to_string()),
                alive_only: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(keys(&alive_males), vec!["10", "12"]);

        let hips = find_dogs(
            &conn,
            &DogQuery {
                require_hips: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(keys(&hips), vec!["13", "10"]);

        let in_co = find_dogs(
            &conn,
            &DogQuery {
                state: Some("CO".to_string()),
                min_grade: Some(75.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(keys(&in_co), vec!["13", "10"]);
    }

    #[test]
    fn test_best_dogs_are_alive_with_data() {
        let conn = fixture();
        let best = find_dogs(&conn, &DogQuery::best()).unwrap();
        assert_eq!(keys(&best), vec!["10", "11"]);
        assert!(best.iter().all(|d| d.is_alive() && d.has_complete_data()));
    }

    #[test]
    fn test_search_minimum_length() {
        let conn = fixture();
        assert!(search(&conn, "a", false).unwrap().dogs.is_empty());

        let results = search(&conn, "alpenhof", false).unwrap();
        assert_eq!(keys(&results.dogs), vec!["10", "11"]);
        assert_eq!(results.breeders.len(), 1);

        let results = search(&conn, "berg", true).unwrap();
        assert!(results.dogs.is_empty(), "Max has no health data");
        assert_eq!(results.breeders[0].last_name.as_deref(), Some("Berg"));
    }

    #[test]
    fn test_active_breeding_orders_by_recent_litter() {
        let conn = fixture();
        let active = active_breeding(&conn, 2010, None, None).unwrap();

        let order: Vec<&str> = active.iter().filter_map(|a| a.dog.bg_dog_id.as_deref()).collect();
        assert_eq!(order, vec!["10", "11", "12"]);
        assert_eq!(active[1].recent_litters.len(), 2);
        assert_eq!(active[2].most_recent_litter_year, Some(2015));

        let recent = active_breeding(&conn, 2020, Some("Female"), None).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].most_recent_litter_year, Some(2099));
    }

    #[test]
    fn test_parents_resolve_soft_references() {
        let conn = fixture();
        let mut pup = Dog::blank(99);
        pup.sire_id = Some("10.0".to_string());
        pup.dam_id = Some("404".to_string());
        pup.dam_name = Some("Unknown Dam".to_string());

        let parents = parents(&conn, &pup).unwrap();
        assert_eq!(parents.sire.unwrap().bg_dog_id.as_deref(), Some("10"));
        assert!(parents.dam.is_none());
        assert_eq!(parents.dam_name.as_deref(), Some("Unknown Dam"));

        assert_eq!(most_recent_litter_year(&conn, "11.0").unwrap(), Some(2099));
        assert_eq!(most_recent_litter_year(&conn, "404").unwrap(), None);
    }

    #[test]
    fn test_breeder_queries_and_stats() {
        let conn = fixture();
        assert_eq!(breeder_states(&conn).unwrap(), vec!["CO", "WA"]);

        let wa = find_breeders(
            &conn,
            &BreederQuery {
                state: Some("WA".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(wa.len(), 1);
        assert_eq!(breeder_dogs(&conn, 1, 2).unwrap().len(), 2);

        let litters = find_litters(
            &conn,
            &LitterQuery {
                since_year: Some(2020),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(litters.len(), 1);
        assert!(litters[0].has_both_parents());

        let stats = registry_stats(&conn).unwrap();
        assert_eq!(stats.dogs, 4);
        assert_eq!(stats.graded_dogs, 4);
        assert_eq!(stats.litters_with_both, 2);
    }
}
