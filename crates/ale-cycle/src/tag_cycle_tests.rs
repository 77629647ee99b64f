use super::*;

use parking_lot::Mutex;

use ale_protocols::{DecodedTag, ReportsInfo, Tag, TagOperation, Tags, Termination};
use ale_sim::{ReaderPool, SimulatedReader, UriDecoder};

use crate::config::CycleConfig;
use crate::schedule::CycleParams;
use crate::timer::CycleTimer;

#[derive(Default)]
struct RecordingKind {
    tags: Mutex<Vec<(String, String)>>,
}

impl CycleKind for RecordingKind {
    type Data = Tags;
    const LABEL: &'static str = "recording";

    fn interval_termination(&self) -> Termination {
        Termination::StableSet
    }

    fn enqueue(&self, _info: ReportsInfo<Tags>) {}

    fn notify_tag(&self, _cycle: &CommonCycle<Self>, reader: &str, tag: DecodedTag) {
        self.tags.lock().push((reader.to_string(), tag.identity().to_string()));
    }
}

struct Fixture {
    _rt: tokio::runtime::Runtime,
    pool: ReaderPool,
    r1: Arc<SimulatedReader>,
    r2: Arc<SimulatedReader>,
    cycle: Arc<CommonCycle<RecordingKind>>,
}

fn fixture() -> Fixture {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let pool = ReaderPool::new();
    let r1 = SimulatedReader::new("r1");
    let r2 = SimulatedReader::new("r2");
    pool.add_reader(r1.clone()).unwrap();
    pool.add_reader(r2.clone()).unwrap();
    let cycle = CommonCycle::new(
        "owner-1",
        "pipeline",
        RecordingKind::default(),
        CycleParams::default(),
        CycleConfig::default(),
        CycleTimer::new(rt.handle().clone()),
    );
    Fixture {
        _rt: rt,
        pool,
        r1,
        r2,
        cycle,
    }
}

fn inventory() -> Option<ReaderOperation> {
    Some(ReaderOperation::Inventory(TagOperation {
        id: "inventory".to_string(),
        commands: Vec::new(),
    }))
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_define_across_readers() {
    let f = fixture();
    let set = ReaderSet::lock(&f.pool, "owner-1", &names(&["r1", "r2"]), &[]).unwrap();
    assert_eq!(set.len(), 2);
    assert!(f.r1.is_locked() && f.r2.is_locked());

    let pipeline = TagCycle::new(set, inventory(), Arc::new(UriDecoder::new()));
    pipeline.define(&f.cycle).unwrap();
    assert!(pipeline.is_defined());
    assert!(f.r1.is_defined("owner-1"));
    assert!(f.r2.is_defined("owner-1"));
}

#[test]
fn test_define_failure_unwinds_earlier_readers() {
    let f = fixture();
    f.r2.fail_define(true);
    let set = ReaderSet::lock(&f.pool, "owner-1", &names(&["r1", "r2"]), &[]).unwrap();
    let pipeline = TagCycle::new(set, inventory(), Arc::new(UriDecoder::new()));

    assert!(pipeline.define(&f.cycle).is_err());
    assert!(!pipeline.is_defined());
    assert!(!f.r1.is_defined("owner-1"));
    assert_eq!(f.r1.definition_count(), 0);

    pipeline.release();
    assert!(!f.r1.is_locked());
}

#[test]
fn test_lock_failure_releases_locked_readers() {
    let f = fixture();
    let err = ReaderSet::lock(&f.pool, "owner-1", &names(&["r1", "missing"]), &[]);
    assert!(err.is_err());
    assert!(!f.r1.is_locked());
}

#[test]
fn test_target_readers_are_locked_but_not_observed() {
    let f = fixture();
    let set = ReaderSet::lock(&f.pool, "owner-1", &names(&["r1"]), &names(&["r2", "r1"])).unwrap();
    assert_eq!(set.names(), vec!["r1", "r2"]);

    let pipeline = TagCycle::new(set, inventory(), Arc::new(UriDecoder::new()));
    pipeline.define(&f.cycle).unwrap();
    assert!(f.r1.is_defined("owner-1"));
    assert!(!f.r2.is_defined("owner-1"));
    assert!(f.r2.is_locked());
    assert!(pipeline.reader("r2").is_some());
}

#[test]
fn test_release_is_idempotent() {
    let f = fixture();
    let set = ReaderSet::lock(&f.pool, "owner-1", &names(&["r1", "r2"]), &[]).unwrap();
    let pipeline = TagCycle::new(set, inventory(), Arc::new(UriDecoder::new()));
    pipeline.define(&f.cycle).unwrap();

    pipeline.release();
    pipeline.release();
    assert!(!f.r1.is_locked() && !f.r2.is_locked());
    assert_eq!(f.r1.definition_count() + f.r2.definition_count(), 0);
    assert!(pipeline.reader_names().is_empty());
    assert!(f.pool.remove_reader("r1").is_ok());
}

#[test]
fn test_callback_decodes_and_forwards() {
    let f = fixture();
    let set = ReaderSet::lock(&f.pool, "owner-1", &names(&["r1"]), &[]).unwrap();
    let pipeline = TagCycle::new(set, inventory(), Arc::new(UriDecoder::new()));
    pipeline.define(&f.cycle).unwrap();

    assert_eq!(f.r1.inject_tag(Tag::new("", "3034ab")), 1);
    let seen = f.cycle.kind().tags.lock().clone();
    assert_eq!(seen, vec![("r1".to_string(), "urn:epc:raw:24.x3034AB".to_string())]);

    pipeline.disable();
    f.r1.inject_tag(Tag::new("", "3034ab"));
    assert_eq!(f.cycle.kind().tags.lock().len(), 1);
}

#[test]
fn test_callback_after_cycle_dropped_is_ignored() {
    let f = fixture();
    let set = ReaderSet::lock(&f.pool, "owner-1", &names(&["r1"]), &[]).unwrap();
    let pipeline = TagCycle::new(set, inventory(), Arc::new(UriDecoder::new()));
    pipeline.define(&f.cycle).unwrap();

    let Fixture { _rt, pool: _pool, r1, r2: _r2, cycle } = f;
    drop(cycle);
    assert_eq!(r1.inject_tag(Tag::new("", "AA")), 1);
    pipeline.release();
}
