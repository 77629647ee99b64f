//! End-to-end cycle behavior against the in-memory collaborators.

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ale_cycle::{CommandCycle, Cycle, CycleConfig, CycleContext, CycleError, CycleTimer, EventCycle, PortCycle};
use ale_protocols::{
    AleTime, CCBoundarySpec, CCCmdSpec, CCSpec, CommandOp, CycleReport, CycleState, ECBoundarySpec,
    ECReportSpec, ECSpec, Initiation, KeyField, PCBoundarySpec, PCReportSpec, PCSpec, PortOpKind,
    PortOperation, ReaderError, SubscriberController, Tag, Termination,
};
use ale_sim::{
    ChannelSubscriber, CommandReporter, EventReporter, PortReporter, ReaderPool, SimulatedReader,
    TriggerHub, UriDecoder,
};

struct Env {
    _rt: tokio::runtime::Runtime,
    pool: Arc<ReaderPool>,
    hub: Arc<TriggerHub>,
    context: CycleContext,
}

impl Env {
    fn new() -> Self {
        Self::with_config(CycleConfig::default())
    }

    fn with_config(config: CycleConfig) -> Self {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let pool = Arc::new(ReaderPool::new());
        let hub = Arc::new(TriggerHub::new(rt.handle().clone()));
        let context = CycleContext::new(
            pool.clone(),
            hub.clone(),
            Arc::new(UriDecoder::new()),
            CycleTimer::new(rt.handle().clone()),
        )
        .with_config(config);
        Self {
            _rt: rt,
            pool,
            hub,
            context,
        }
    }

    fn reader(&self, name: &str) -> Arc<SimulatedReader> {
        let reader = SimulatedReader::new(name);
        self.pool.add_reader(reader.clone()).unwrap();
        reader
    }

    fn event_cycle(&self, name: &str, spec: ECSpec) -> Result<EventCycle, CycleError> {
        let reports = Arc::new(EventReporter::new(name, &spec));
        EventCycle::new(name, spec, reports, &self.context)
    }

    fn command_cycle(&self, name: &str, spec: CCSpec) -> Result<CommandCycle, CycleError> {
        let reports = Arc::new(CommandReporter::new(name, &spec));
        CommandCycle::new(name, spec, reports, &self.context)
    }

    fn port_cycle(&self, name: &str, spec: PCSpec) -> Result<PortCycle, CycleError> {
        let reports = Arc::new(PortReporter::new(name, &spec));
        PortCycle::new(name, spec, reports, &self.context)
    }
}

fn ms(v: i64) -> Option<AleTime> {
    Some(AleTime::ms(v))
}

fn all_tags() -> Vec<ECReportSpec> {
    vec![ECReportSpec {
        name: "all".to_string(),
        report_if_empty: true,
        ..Default::default()
    }]
}

fn event_spec(boundary: ECBoundarySpec) -> ECSpec {
    ECSpec {
        logical_readers: vec!["dock".to_string()],
        boundary_spec: boundary,
        primary_keys: Vec::new(),
        report_specs: all_tags(),
    }
}

fn subscribe(cycle: &dyn Cycle, uri: &str) -> (Arc<ChannelSubscriber>, Receiver<CycleReport>) {
    let (subscriber, rx) = ChannelSubscriber::new(uri);
    cycle.add(subscriber.clone()).unwrap();
    (subscriber, rx)
}

fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn reported_tags(report: &CycleReport) -> usize {
    report.body["reports"][0]["tags"].as_array().map(Vec::len).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Event cycles
// ---------------------------------------------------------------------------

#[test]
fn test_duration_window_reports_once_then_requested() {
    let env = Env::new();
    let dock = env.reader("dock");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                duration: ms(300),
                ..Default::default()
            }),
        )
        .unwrap();
    let started = Instant::now();
    let (_subscriber, rx) = subscribe(&cycle, "chan://dock");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));

    dock.inject_tag(Tag::new("", "3034AA"));
    dock.inject_tag(Tag::new("", "3034BB"));
    dock.inject_tag(Tag::new("", "3034AA"));

    let report = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(280), "reported too early: {elapsed:?}");
    assert_eq!(report.termination, Termination::Duration);
    assert_eq!(report.initiation, Initiation::Requested);
    assert_eq!(reported_tags(&report), 2);

    assert!(wait_for(Duration::from_millis(200), || cycle.state() == CycleState::Requested));
    assert!(rx.recv_timeout(Duration::from_millis(400)).is_err());
}

#[test]
fn test_stop_trigger_closes_unbounded_window() {
    let env = Env::new();
    env.reader("dock");
    let stop = TriggerHub::manual_uri("dock-stop");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                stop_trigger: Some(stop.clone()),
                ..Default::default()
            }),
        )
        .unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://dock");

    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    assert_eq!(cycle.state(), CycleState::Active);

    assert_eq!(env.hub.fire(&stop), 1);
    let report = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(report.termination, Termination::Trigger);
    assert_eq!(report.termination_trigger.as_deref(), Some(stop.as_str()));
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_start_trigger_opens_window() {
    let env = Env::new();
    env.reader("dock");
    let start = TriggerHub::manual_uri("dock-start");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                start_trigger_list: vec![start.clone()],
                duration: ms(100),
                ..Default::default()
            }),
        )
        .unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://dock");
    assert!(wait_for(Duration::from_millis(100), || cycle.state() == CycleState::Requested));
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    assert_eq!(env.hub.fire(&start), 1);
    let report = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(report.initiation, Initiation::Trigger);
    assert_eq!(report.initiation_trigger.as_deref(), Some(start.as_str()));
    assert_eq!(report.termination, Termination::Duration);
}

#[test]
fn test_when_data_available_waits_for_debounce() {
    let config = CycleConfig {
        reader_cycle_duration_ms: 150,
        ..CycleConfig::default()
    };
    let env = Env::with_config(config);
    let dock = env.reader("dock");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                when_data_available: true,
                duration: ms(5000),
                ..Default::default()
            }),
        )
        .unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://dock");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));

    std::thread::sleep(Duration::from_millis(5));
    let first = Instant::now();
    dock.inject_tag(Tag::new("", "3034AA"));
    std::thread::sleep(Duration::from_millis(20));
    dock.inject_tag(Tag::new("", "3034BB"));

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    let report = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert!(first.elapsed() >= Duration::from_millis(140));
    assert_eq!(report.termination, Termination::DataAvailable);
    assert_eq!(reported_tags(&report), 2);
}

#[test]
fn test_stable_set_interval() {
    let env = Env::new();
    let dock = env.reader("dock");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                stable_set_interval: ms(150),
                ..Default::default()
            }),
        )
        .unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://dock");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));

    for epc in ["AA01", "AA02", "AA03"] {
        dock.inject_tag(Tag::new("", epc));
        std::thread::sleep(Duration::from_millis(80));
    }
    let last_new = Instant::now();
    // Repeated sightings do not extend the window.
    dock.inject_tag(Tag::new("", "AA01"));

    let report = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(report.termination, Termination::StableSet);
    assert!(last_new.elapsed() >= Duration::from_millis(50));
    assert_eq!(reported_tags(&report), 3);
}

#[test]
fn test_stable_set_ignores_incomplete_tags() {
    let env = Env::new();
    let dock = env.reader("dock");
    let mut spec = event_spec(ECBoundarySpec {
        stable_set_interval: ms(150),
        ..Default::default()
    });
    spec.primary_keys = vec![KeyField::Epc, KeyField::Tid];
    let cycle = env.event_cycle("dock-ec", spec).unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://dock");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));

    let mut complete = Tag::new("", "AA01");
    complete.tid = Some("E280AA01".to_string());
    dock.inject_tag(complete);
    // Tracked without a TID, so not reportable yet.
    for epc in ["BB01", "BB02", "BB03", "BB04"] {
        std::thread::sleep(Duration::from_millis(50));
        dock.inject_tag(Tag::new("", epc));
    }

    let report = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(report.termination, Termination::StableSet);
    assert!(
        report.total_milliseconds < 280,
        "window lasted {}ms",
        report.total_milliseconds
    );
}

#[test]
fn test_repeat_period_cadence() {
    let env = Env::new();
    env.reader("dock");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                duration: ms(50),
                repeat_period: ms(200),
                ..Default::default()
            }),
        )
        .unwrap();
    let started = Instant::now();
    let (_subscriber, rx) = subscribe(&cycle, "chan://dock");

    let mut offsets = Vec::new();
    for _ in 0..3 {
        let report = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        offsets.push((started.elapsed().as_millis() as i64, report.initiation));
    }
    for (k, (offset, _)) in offsets.iter().enumerate() {
        let expected = k as i64 * 200 + 50;
        assert!((offset - expected).abs() < 60, "report {k} at {offset}ms, expected ~{expected}ms");
    }
    assert_eq!(offsets[0].1, Initiation::Requested);
    assert_eq!(offsets[1].1, Initiation::RepeatPeriod);
}

#[test]
fn test_remove_last_subscriber_closes_window() {
    let env = Env::new();
    let dock = env.reader("dock");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                duration: ms(5000),
                ..Default::default()
            }),
        )
        .unwrap();
    let (subscriber, _rx) = subscribe(&cycle, "chan://dock");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));
    dock.inject_tag(Tag::new("", "AA"));

    let begin = Instant::now();
    assert!(cycle.remove(subscriber.uri()));
    assert!(begin.elapsed() < Duration::from_secs(1));
    assert!(!subscriber.is_active());
    assert!(wait_for(Duration::from_millis(300), || cycle.state() == CycleState::Unrequested));
    assert!(!cycle.remove(subscriber.uri()));
}

#[test]
fn test_poll_subscriber_reaped_after_budget() {
    let env = Env::new();
    env.reader("dock");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                duration: ms(50),
                repeat_period: ms(50),
                ..Default::default()
            }),
        )
        .unwrap();
    let (poll, rx) = ChannelSubscriber::with_remaining("chan://poll", 1);
    cycle.add(poll.clone()).unwrap();

    assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
    assert!(wait_for(Duration::from_millis(300), || !cycle.exists("chan://poll")));
    assert!(poll.is_disposed());
    assert!(wait_for(Duration::from_millis(300), || cycle.state() == CycleState::Unrequested));
}

// ---------------------------------------------------------------------------
// Construction and teardown
// ---------------------------------------------------------------------------

#[test]
fn test_invalid_boundary_never_locks_readers() {
    let env = Env::new();
    let dock = env.reader("dock");
    let result = env.event_cycle("bad", event_spec(ECBoundarySpec::default()));
    assert!(matches!(result, Err(CycleError::InvalidBoundary { .. })));
    assert!(!dock.is_locked());
}

#[test]
fn test_unknown_reader_unwinds_locks() {
    let env = Env::new();
    let dock = env.reader("dock");
    let mut spec = event_spec(ECBoundarySpec {
        duration: ms(100),
        ..Default::default()
    });
    spec.logical_readers.push("missing".to_string());
    let result = env.event_cycle("bad", spec);
    assert!(matches!(result, Err(CycleError::Reader(ReaderError::NotFound(_)))));
    assert!(!dock.is_locked());
}

#[test]
fn test_define_failure_unwinds_locks_and_triggers() {
    let env = Env::new();
    let dock = env.reader("dock");
    let gate = env.reader("gate");
    gate.fail_define(true);
    let start = TriggerHub::manual_uri("go");
    let mut spec = event_spec(ECBoundarySpec {
        start_trigger: Some(start.clone()),
        duration: ms(100),
        ..Default::default()
    });
    spec.logical_readers.push("gate".to_string());

    assert!(env.event_cycle("bad", spec).is_err());
    assert!(!dock.is_locked() && !gate.is_locked());
    assert_eq!(dock.definition_count(), 0);
    assert_eq!(env.hub.instance_count(&start), 0);
}

#[test]
fn test_reader_in_use_cannot_be_removed() {
    let env = Env::new();
    env.reader("dock");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                duration: ms(100),
                ..Default::default()
            }),
        )
        .unwrap();
    assert!(matches!(env.pool.remove_reader("dock"), Err(ReaderError::InUse(_))));
    drop(cycle);
    assert!(env.pool.remove_reader("dock").is_ok());
}

#[test]
fn test_dispose_is_idempotent_and_final() {
    let env = Env::new();
    let dock = env.reader("dock");
    let cycle = env
        .event_cycle(
            "dock-ec",
            event_spec(ECBoundarySpec {
                duration: ms(5000),
                ..Default::default()
            }),
        )
        .unwrap();
    let (subscriber, rx) = subscribe(&cycle, "chan://dock");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));

    cycle.dispose();
    cycle.dispose();
    assert_eq!(cycle.state(), CycleState::Undefined);
    assert!(!cycle.is_busy());
    assert!(subscriber.is_disposed());
    assert!(!dock.is_locked());

    let last = rx.recv_timeout(Duration::from_millis(500)).unwrap();
    assert_eq!(last.termination, Termination::Undefine);
    assert!(matches!(
        cycle.add(ChannelSubscriber::new("chan://late").0),
        Err(CycleError::Disposed(_))
    ));
}

#[test]
fn test_cycles_behind_trait_objects() {
    let env = Env::new();
    env.reader("dock");
    env.reader("gate");
    let event = env
        .event_cycle(
            "ec",
            event_spec(ECBoundarySpec {
                duration: ms(100),
                ..Default::default()
            }),
        )
        .unwrap();
    let command = env
        .command_cycle(
            "cc",
            CCSpec {
                logical_readers: vec!["dock".to_string()],
                boundary_spec: CCBoundarySpec {
                    duration: ms(100),
                    ..Default::default()
                },
                cmd_specs: Vec::new(),
            },
        )
        .unwrap();
    let port = env
        .port_cycle(
            "pc",
            PCSpec {
                logical_readers: vec!["gate".to_string()],
                boundary_spec: PCBoundarySpec {
                    duration: ms(100),
                    ..Default::default()
                },
                report_specs: Vec::new(),
            },
        )
        .unwrap();

    let cycles: Vec<Box<dyn Cycle>> = vec![Box::new(event), Box::new(command), Box::new(port)];
    let labels: Vec<&str> = cycles.iter().map(|c| c.kind_label()).collect();
    assert_eq!(labels, vec!["event", "command", "port"]);
    assert!(cycles.iter().all(|c| c.state() == CycleState::Unrequested));
    let guids: std::collections::HashSet<&str> = cycles.iter().map(|c| c.guid()).collect();
    assert_eq!(guids.len(), 3);
}

// ---------------------------------------------------------------------------
// Command cycles
// ---------------------------------------------------------------------------

fn command_spec(boundary: CCBoundarySpec, operations: Vec<CommandOp>) -> CCSpec {
    CCSpec {
        logical_readers: vec!["dock".to_string()],
        boundary_spec: boundary,
        cmd_specs: vec![CCCmdSpec {
            name: "user-memory".to_string(),
            filter: Vec::new(),
            operations,
        }],
    }
}

fn command_tags(report: &CycleReport) -> Vec<serde_json::Value> {
    report.body["cmdReports"][0]["tags"].as_array().cloned().unwrap_or_default()
}

#[test]
fn test_count_termination_on_cth_tag() {
    let env = Env::new();
    let dock = env.reader("dock");
    let cycle = env
        .command_cycle(
            "count-cc",
            command_spec(
                CCBoundarySpec {
                    tags_processed_count: Some(3),
                    ..Default::default()
                },
                Vec::new(),
            ),
        )
        .unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://count");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));

    dock.inject_tag(Tag::new("", "AA"));
    dock.inject_tag(Tag::new("", "BB"));
    dock.inject_tag(Tag::new("", "AA"));
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    dock.inject_tag(Tag::new("", "CC"));
    let report = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(report.termination, Termination::Count);
    assert_eq!(command_tags(&report).len(), 3);
}

#[test]
fn test_commands_run_and_results_merge() {
    let env = Env::new();
    let dock = env.reader("dock");
    let cycle = env
        .command_cycle(
            "read-cc",
            command_spec(
                CCBoundarySpec {
                    duration: ms(300),
                    ..Default::default()
                },
                vec![CommandOp::read("user", 3, 0, 2)],
            ),
        )
        .unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://read");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));

    dock.inject_tag(Tag::new("", "AA"));
    let report = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(report.termination, Termination::Duration);
    let tags = command_tags(&report);
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["results"][0]["name"], "user");
    assert_eq!(tags[0]["results"][0]["status"], "SUCCESS");
    assert_eq!(tags[0]["results"][0]["data"], "00000000");
}

#[test]
fn test_after_error_closes_window_once_quiet() {
    let env = Env::new();
    let dock = env.reader("dock");
    dock.fail_operation("lock");
    dock.set_execute_delay(Duration::from_millis(30));
    let cycle = env
        .command_cycle(
            "err-cc",
            command_spec(
                CCBoundarySpec {
                    after_error: true,
                    duration: ms(5000),
                    ..Default::default()
                },
                vec![CommandOp {
                    name: "lock".to_string(),
                    kind: ale_protocols::CommandKind::Lock,
                    bank: 1,
                    offset: 0,
                    length: 0,
                    data: None,
                }],
            ),
        )
        .unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://err");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));

    dock.inject_tag(Tag::new("", "AA"));
    let report = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(report.termination, Termination::Error);
    let tags = command_tags(&report);
    assert_eq!(tags[0]["results"][0]["status"], "MISC_ERROR");
}

#[test]
fn test_no_new_tags_interval() {
    let env = Env::new();
    let dock = env.reader("dock");
    let cycle = env
        .command_cycle(
            "quiet-cc",
            command_spec(
                CCBoundarySpec {
                    no_new_tags_interval: ms(120),
                    ..Default::default()
                },
                Vec::new(),
            ),
        )
        .unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://quiet");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));
    dock.inject_tag(Tag::new("", "AA"));

    let report = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(report.termination, Termination::NoNewTags);
}

// ---------------------------------------------------------------------------
// Port cycles
// ---------------------------------------------------------------------------

fn lamp(reader: &str) -> PortOperation {
    PortOperation {
        name: "lamp".to_string(),
        reader: reader.to_string(),
        kind: PortOpKind::Write,
        port: 4,
        state: Some(true),
        duration_ms: None,
    }
}

#[test]
fn test_port_event_drives_operations() {
    let env = Env::new();
    let gate = env.reader("gate");
    let cycle = env
        .port_cycle(
            "gate-pc",
            PCSpec {
                logical_readers: vec!["gate".to_string()],
                boundary_spec: PCBoundarySpec {
                    duration: ms(300),
                    ..Default::default()
                },
                report_specs: vec![PCReportSpec {
                    name: "door".to_string(),
                    ports: vec![1],
                    operations: vec![lamp("gate")],
                }],
            },
        )
        .unwrap();
    let (_subscriber, rx) = subscribe(&cycle, "chan://gate");
    assert!(wait_for(Duration::from_millis(200), || cycle.cycle().collecting_window().is_some()));

    assert_eq!(gate.inject_port(2, true), 0);
    assert_eq!(gate.inject_port(1, true), 1);
    assert!(wait_for(Duration::from_millis(300), || gate.output(4) == Some(true)));

    let report = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(report.kind, "port");
    let events = report.body["reports"][0]["events"].as_array().cloned().unwrap_or_default();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["completed"], true);
    assert_eq!(events[0]["results"][0]["status"], "SUCCESS");
}

#[test]
fn test_trigger_only_port_cycle() {
    let env = Env::new();
    let output = env.reader("output");
    let go = TriggerHub::manual_uri("lights");
    let cycle = env
        .port_cycle(
            "lights-pc",
            PCSpec {
                logical_readers: Vec::new(),
                boundary_spec: PCBoundarySpec {
                    start_triggers: vec![go.clone()],
                    ..Default::default()
                },
                report_specs: vec![PCReportSpec {
                    name: "lights".to_string(),
                    ports: Vec::new(),
                    operations: vec![lamp("output")],
                }],
            },
        )
        .unwrap();
    assert!(cycle.is_trigger_only());
    assert!(output.is_locked());
    assert_eq!(output.definition_count(), 0);

    let (_subscriber, rx) = subscribe(&cycle, "chan://lights");
    assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());

    assert_eq!(env.hub.fire(&go), 1);
    let report = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(report.termination, Termination::Trigger);
    assert_eq!(report.initiation, Initiation::Trigger);
    assert_eq!(report.termination_trigger.as_deref(), Some(go.as_str()));
    assert_eq!(output.output(4), Some(true));
    assert!(wait_for(Duration::from_millis(200), || cycle.state() == CycleState::Requested));

    // A second firing runs the operations again.
    assert_eq!(env.hub.fire(&go), 1);
    assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
}
