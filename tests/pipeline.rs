// End-to-end: CSV extracts on disk → SQLite → grades, run twice

use berner_registry::query::{self, DogQuery};
use berner_registry::{
    find_dog_by_external_id, get_all_breeders, get_all_dogs, get_all_litters, setup_database,
    Config, Importer,
};
use rusqlite::Connection;
use std::fs;
use tempfile::TempDir;

const BREEDERS: &str = "\
breeder_id,first_name,last_name,kennel_name,state,dogs_bred_ids
7.0,Ann,Berg,Alpenhof,CO,10|20.0|30
";

const DOGS: &str = "\
bg_dog_id,registered_name,sex,age_years,hip_rating,elbow_rating,heart_status,eye_status,dm_status,sire_id,dam_id,primary_image
500.0,Alpenhof's Bruno,Male,9,Excellent,Normal,Normal,Clear,Clear,,,output/images/500.jpg
10,Alpenhof's Bella,Female,4,Good,,,,,,,
20,Alpenhof's Max,Male,,,,,,,500,10,
";

const LITTERS: &str = "\
bg_litter_id,birth_year,sire_id,dam_id,sire_name,dam_name
L1,2020,500.0,10,Alpenhof's Bruno,Alpenhof's Bella
";

fn fixture() -> (TempDir, Connection, Config) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ALL_BREEDERS_MERGED.csv"), BREEDERS).unwrap();
    fs::write(dir.path().join("ALL_DOGS.csv"), DOGS).unwrap();
    fs::write(dir.path().join("litters.csv"), LITTERS).unwrap();

    let config = Config {
        import_dir: dir.path().to_path_buf(),
        database_path: dir.path().join("berner.db"),
        ..Config::default()
    };
    let conn = Connection::open(&config.database_path).unwrap();
    setup_database(&conn).unwrap();
    (dir, conn, config)
}

#[test]
fn test_pipeline_imports_links_and_grades() {
    let (_dir, conn, config) = fixture();
    let report = Importer::new(&conn, &config).run_pipeline(false).unwrap();

    assert_eq!(report.breeders.created, 1);
    assert_eq!(report.dogs.created, 3);
    assert_eq!(report.litters.created, 1);

    let links = report.breeder_links.unwrap();
    assert_eq!(links.linked, 2);
    assert_eq!(links.not_found, 1);

    assert_eq!(report.counts.breeders, 1);
    assert_eq!(report.counts.dogs, 3);
    assert_eq!(report.counts.litters, 1);

    let bruno = find_dog_by_external_id(&conn, "500").unwrap().unwrap();
    assert_eq!(bruno.bg_dog_id.as_deref(), Some("500"));
    assert_eq!(bruno.health_score, Some(100.0));
    assert_eq!(bruno.grade, Some(82.5));
    assert_eq!(bruno.primary_image.as_deref(), Some("/dog-images/500.jpg"));
    assert!(bruno.breeder_id.is_none(), "not listed in dogs_bred_ids");

    // Max's parents: Bruno (75) and Bella (30)
    let max = find_dog_by_external_id(&conn, "20").unwrap().unwrap();
    assert_eq!(max.pedigree_longevity_score, Some(52.5));

    let breeder = &get_all_breeders(&conn).unwrap()[0];
    assert_eq!(breeder.bg_person_id.as_deref(), Some("7"));
    assert!(breeder.grade.is_some());

    let stats = query::registry_stats(&conn).unwrap();
    assert_eq!(stats.graded_dogs, 3);
    assert_eq!(stats.dogs_with_breeder, 2);
    assert_eq!(stats.litters_with_both, 1);
}

#[test]
fn test_second_run_changes_nothing() {
    let (_dir, conn, config) = fixture();
    let importer = Importer::new(&conn, &config);

    importer.run_pipeline(false).unwrap();
    let dogs = get_all_dogs(&conn).unwrap();
    let breeders = get_all_breeders(&conn).unwrap();
    let litters = get_all_litters(&conn).unwrap();

    let second = importer.run_pipeline(false).unwrap();
    assert_eq!(second.breeders.created, 0);
    assert_eq!(second.dogs.created, 0);
    assert_eq!(second.dogs.updated, 3);

    let links = second.breeder_links.unwrap();
    assert_eq!(links.linked, 0);
    assert_eq!(links.already_linked, 2);

    assert_eq!(get_all_dogs(&conn).unwrap(), dogs);
    assert_eq!(get_all_breeders(&conn).unwrap(), breeders);
    assert_eq!(get_all_litters(&conn).unwrap(), litters);
}

#[test]
fn test_fresh_run_rebuilds_from_files() {
    let (_dir, conn, config) = fixture();
    let importer = Importer::new(&conn, &config);
    importer.run_pipeline(false).unwrap();

    let report = importer.run_pipeline(true).unwrap();
    assert_eq!(report.dogs.created, 3);
    assert_eq!(report.counts.dogs, 3);

    let best = query::find_dogs(&conn, &DogQuery::best()).unwrap();
    assert_eq!(best[0].bg_dog_id.as_deref(), Some("500"));
}
