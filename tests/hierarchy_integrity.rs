//! End-to-end integrity tests for the site hierarchy.
//!
//! These tests verify that:
//! - Invalid simulated captors never reach storage
//! - Site deletion removes exactly the site's captors and measures
//! - Renaming touches nothing but the name
//! - Failed or repeated operations leave the store unchanged

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use bigcorp::{
    Captor, CaptorId, CaptorKind, CaptorStore, HierarchyManager, InMemoryDatabase, Measure,
    MeasureStore, RowCounts, SimulatedCaptor, SimulatedValueGenerator, Site, SiteId, SiteStore,
    StorageError, Transaction, TransactionManager, ValidationError,
};

fn setup() -> (Arc<InMemoryDatabase>, HierarchyManager) {
    let db = Arc::new(InMemoryDatabase::new());
    let manager = HierarchyManager::new(db.clone());
    (db, manager)
}

/// In-memory database that counts the transactions it opens.
#[derive(Default)]
struct CountingDatabase {
    inner: InMemoryDatabase,
    begins: AtomicUsize,
}

impl CountingDatabase {
    fn begins(&self) -> usize {
        self.begins.load(Ordering::SeqCst)
    }
}

impl TransactionManager for CountingDatabase {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StorageError> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        self.inner.begin()
    }
}

/// In-memory database whose deferred constraint check can be made to reject
/// every commit.
#[derive(Default)]
struct ConstrainedDatabase {
    inner: InMemoryDatabase,
    reject: AtomicBool,
}

struct ConstrainedTransaction<'a> {
    inner: Box<dyn Transaction + 'a>,
}

impl TransactionManager for ConstrainedDatabase {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StorageError> {
        let inner = self.inner.begin()?;
        if self.reject.load(Ordering::SeqCst) {
            return Ok(Box::new(ConstrainedTransaction { inner }));
        }
        Ok(inner)
    }
}

impl Transaction for ConstrainedTransaction<'_> {
    fn sites(&mut self) -> &mut dyn SiteStore {
        self.inner.sites()
    }

    fn captors(&mut self) -> &mut dyn CaptorStore {
        self.inner.captors()
    }

    fn measures(&mut self) -> &mut dyn MeasureStore {
        self.inner.measures()
    }

    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        self.inner.rollback();
        Err(StorageError::IntegrityViolation(
            "deferred constraint rejected the transaction".to_string(),
        ))
    }

    fn rollback(self: Box<Self>) {
        self.inner.rollback();
    }
}

/// Creates a site with `captors` simulated captors holding `per_captor` measures each.
fn populated_site(
    manager: &HierarchyManager,
    name: &str,
    captors: usize,
    per_captor: usize,
) -> (Site, Vec<CaptorId>) {
    let site = manager.create(name).unwrap();
    let mut generator = SimulatedValueGenerator::seeded(5);
    let mut ids = Vec::new();
    for i in 0..captors {
        let captor = manager
            .add_captor(Captor::simulated(format!("{name}-{i}"), site.id.clone(), 0, 100).unwrap())
            .unwrap();
        for _ in 0..per_captor {
            manager.simulate_measure(&captor.id, &mut generator).unwrap();
        }
        ids.push(captor.id);
    }
    (site, ids)
}

#[test]
fn inverted_power_range_is_never_persisted() {
    let (db, manager) = setup();
    let site = manager.create("Florange").unwrap();

    assert!(matches!(
        Captor::simulated("C1", site.id.clone(), 500, 100),
        Err(ValidationError::InvalidCaptor { .. })
    ));

    // Same bounds smuggled in through deserialization are rejected as well.
    let json = format!(
        r#"{{"id":"","name":"C1","site_id":"{}","power_source":"SIMULATED","min_power_in_watt":500,"max_power_in_watt":100}}"#,
        site.id
    );
    assert!(serde_json::from_str::<Captor>(&json).is_err());

    assert_eq!(db.counts().unwrap().captors, 0);
}

#[test]
fn inverted_simulated_kind_never_opens_a_transaction() {
    let db = Arc::new(CountingDatabase::default());
    let manager = HierarchyManager::new(db.clone());
    let site = manager.create("Florange").unwrap();
    let opened = db.begins();

    // A CaptorKind cannot carry min=500, max=100 whichever way it is built.
    assert!(SimulatedCaptor::new(500, 100).is_err());
    let mut range = SimulatedCaptor::new(100, 500).unwrap();
    assert!(range.set_power_range(500, 100).is_err());
    assert_eq!((range.min_power_in_watt(), range.max_power_in_watt()), (100, 500));
    assert!(serde_json::from_str::<CaptorKind>(
        r#"{"power_source":"SIMULATED","min_power_in_watt":500,"max_power_in_watt":100}"#
    )
    .is_err());

    // Captors the gate rejects never reach the backend.
    let blank = Captor::new(" ", site.id.clone(), CaptorKind::Simulated(range));
    assert!(manager.add_captor(blank).unwrap_err().is_validation());
    let unbound = Captor::new(
        "C1",
        SiteId::unassigned(),
        CaptorKind::Simulated(SimulatedCaptor::new(10, 50).unwrap()),
    );
    assert!(manager.add_captor(unbound).unwrap_err().is_validation());

    assert_eq!(db.begins(), opened);
    assert_eq!(db.inner.counts().unwrap().captors, 0);
}

#[test]
fn save_runs_in_a_single_transaction() {
    let db = Arc::new(CountingDatabase::default());
    let manager = HierarchyManager::new(db.clone());
    let site = manager.create("Florange").unwrap();
    manager.add_captor(Captor::real("C1", site.id.clone())).unwrap();
    let opened = db.begins();

    let saved = manager.save(Site::with_id(site.id.clone(), "Renamed")).unwrap();

    assert_eq!(db.begins(), opened + 1);
    assert_eq!(saved.name, "Renamed");
    assert_eq!(saved.captors.len(), 1);
}

#[test]
fn store_integrity_violation_is_surfaced_and_nothing_changes() {
    let db = Arc::new(ConstrainedDatabase::default());
    let manager = HierarchyManager::new(db.clone());
    let (site, _) = populated_site(&manager, "Florange", 2, 3);
    let before = db.inner.counts().unwrap();

    db.reject.store(true, Ordering::SeqCst);
    let err = manager.delete(&site.id).unwrap_err();
    assert!(err.is_integrity_violation(), "unexpected error: {err}");
    assert!(manager
        .rename(&site.id, "Renamed")
        .unwrap_err()
        .is_integrity_violation());

    db.reject.store(false, Ordering::SeqCst);
    assert_eq!(db.inner.counts().unwrap(), before);
    assert_eq!(manager.get(&site.id).unwrap().name, "Florange");
}

#[test]
fn measures_view_of_unknown_site_is_not_found() {
    let (_, manager) = setup();
    populated_site(&manager, "Florange", 1, 1);

    let err = manager.measures_view(&SiteId::new("S404")).unwrap_err();

    assert!(err.is_not_found());
}

#[test]
fn deleting_site_removes_exactly_its_rows() {
    let (db, manager) = setup();
    let (doomed, _) = populated_site(&manager, "Florange", 3, 4);
    let (kept, kept_captors) = populated_site(&manager, "Hayange", 2, 5);

    assert_eq!(
        db.counts().unwrap(),
        RowCounts {
            sites: 2,
            captors: 5,
            measures: 22
        }
    );

    let remaining = manager.delete(&doomed.id).unwrap();

    assert_eq!(remaining, vec![kept.clone()]);
    assert_eq!(
        db.counts().unwrap(),
        RowCounts {
            sites: 1,
            captors: 2,
            measures: 10
        }
    );
    assert!(manager.get(&doomed.id).unwrap_err().is_not_found());
    for id in &kept_captors {
        assert_eq!(manager.measures(id).unwrap().len(), 5);
    }
}

#[test]
fn deleting_site_without_captors_removes_only_site() {
    let (db, manager) = setup();
    let empty = manager.create("Empty").unwrap();
    populated_site(&manager, "Hayange", 1, 2);

    manager.delete(&empty.id).unwrap();

    assert_eq!(
        db.counts().unwrap(),
        RowCounts {
            sites: 1,
            captors: 1,
            measures: 2
        }
    );
}

#[test]
fn rename_changes_only_name() {
    let (db, manager) = setup();
    let (site, captors) = populated_site(&manager, "Florange", 2, 1);
    let before = db.counts().unwrap();

    let sites = manager.rename(&site.id, "NewName").unwrap();

    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].name, "NewName");
    assert_eq!(sites[0].id, site.id);
    let mut listed: Vec<CaptorId> = sites[0].captors.iter().map(|c| c.id.clone()).collect();
    listed.sort();
    let mut expected = captors;
    expected.sort();
    assert_eq!(listed, expected);
    assert_eq!(db.counts().unwrap(), before);
}

#[test]
fn save_ignores_client_supplied_captors() {
    let (db, manager) = setup();
    let (site, _) = populated_site(&manager, "Florange", 1, 0);

    let mut posted = Site::with_id(site.id.clone(), "Renamed");
    posted.captors = vec![
        Captor::real("intruder", site.id.clone()).with_id(CaptorId::new("X1")),
        Captor::real("intruder", SiteId::new("elsewhere")).with_id(CaptorId::new("X2")),
    ];

    let saved = manager.save(posted).unwrap();

    assert_eq!(saved.name, "Renamed");
    assert_eq!(saved.captors.len(), 1);
    assert!(saved.captors.iter().all(|c| c.name != "intruder"));
    assert_eq!(db.counts().unwrap().captors, 1);
}

#[test]
fn save_without_id_creates_site() {
    let (_, manager) = setup();
    let saved = manager.save(Site::new("Florange")).unwrap();
    assert!(!saved.id.is_unassigned());
    assert_eq!(manager.list().unwrap().len(), 1);
}

#[test]
fn rename_unknown_site_is_not_found_and_changes_nothing() {
    let (db, manager) = setup();
    populated_site(&manager, "Florange", 1, 1);
    let before = db.counts().unwrap();

    let err = manager.rename(&SiteId::new("S404"), "NewName").unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(db.counts().unwrap(), before);
    assert_eq!(manager.list().unwrap()[0].name, "Florange");
}

#[test]
fn florange_scenario() {
    let (db, manager) = setup();

    let site = manager.create("Florange").unwrap();
    let captor = manager
        .add_captor(Captor::simulated("C1", site.id.clone(), 10, 50).unwrap())
        .unwrap();

    let mut generator = SimulatedValueGenerator::new();
    let measure = generator.generate(&captor).unwrap();
    assert!((10..=50).contains(&measure.value_in_watt));
    manager.record_measure(measure).unwrap();

    let view = manager.measures_view(&site.id).unwrap();
    assert_eq!(view.site.name, "Florange");
    assert_eq!(view.captors.len(), 1);

    let remaining = manager.delete(&site.id).unwrap();

    assert!(remaining.iter().all(|s| s.id != site.id));
    assert!(manager.captor(&captor.id).unwrap_err().is_not_found());
    let mut tx = db.begin().unwrap();
    assert!(tx.measures().find_by_captor(&captor.id).unwrap().is_empty());
    assert_eq!(tx.captors().count().unwrap(), 0);
}

#[test]
fn second_delete_is_not_found() {
    let (_, manager) = setup();
    let (site, _) = populated_site(&manager, "Florange", 1, 3);

    manager.delete(&site.id).unwrap();
    let err = manager.delete(&site.id).unwrap_err();

    assert!(err.is_not_found());
}

#[test]
fn concurrent_deletes_succeed_once() {
    let (db, manager) = setup();
    let (site, _) = populated_site(&manager, "Florange", 4, 10);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            let id = site.id.clone();
            thread::spawn(move || manager.delete(&id))
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();

    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(bigcorp::BigCorpError::is_not_found));
    assert_eq!(db.counts().unwrap(), RowCounts::default());
}

#[test]
fn measure_on_unknown_captor_is_rejected() {
    let (db, manager) = setup();
    let err = manager
        .record_measure(Measure::now(CaptorId::new("C404"), 10))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(db.counts().unwrap().measures, 0);
}
