//! Composition root: builds the collaborators and cycles from the config.

use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::Context;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use ale_config::{subscriber_uris, Config, ReaderConfig};
use ale_cycle::{CommandCycle, Cycle, CycleContext, CycleTimer, EventCycle, PortCycle};
use ale_sim::{
    CommandReporter, EventReporter, LoggingSubscriber, PortReporter, ReaderPool, SimulatedReader,
    TriggerHub, UriDecoder,
};

/// Everything `ale run` started, torn down in reverse.
pub(crate) struct Deployment {
    pool: Arc<ReaderPool>,
    hub: Arc<TriggerHub>,
    cycles: Vec<Box<dyn Cycle>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Deployment {
    pub(crate) fn start(config: &Config, handle: &Handle) -> anyhow::Result<Self> {
        let mut deployment = Self {
            pool: Arc::new(ReaderPool::new()),
            hub: Arc::new(TriggerHub::new(handle.clone())),
            cycles: Vec::new(),
            tasks: Vec::new(),
        };
        if let Err(err) = deployment.populate(config, handle) {
            deployment.shutdown();
            return Err(err);
        }
        Ok(deployment)
    }

    pub(crate) fn cycle_count(&self) -> usize {
        self.cycles.len()
    }

    pub(crate) fn reader_count(&self) -> usize {
        self.pool.len()
    }

    fn populate(&mut self, config: &Config, handle: &Handle) -> anyhow::Result<()> {
        for reader in &config.readers {
            self.add_reader(reader, handle)?;
        }
        for trigger in &config.triggers {
            if let Some(every) = trigger.every_ms {
                let uri = TriggerHub::manual_uri(&trigger.name);
                self.tasks.push(spawn_trigger_ticker(
                    handle,
                    Arc::downgrade(&self.hub),
                    uri,
                    Duration::from_millis(every),
                ));
            }
        }

        let context = CycleContext::new(
            self.pool.clone(),
            self.hub.clone(),
            Arc::new(UriDecoder::new()),
            CycleTimer::new(handle.clone()),
        )
        .with_config(config.engine.clone());

        for entry in &config.event_cycles {
            let reports = Arc::new(EventReporter::new(&entry.name, &entry.spec));
            let cycle = EventCycle::new(&entry.name, entry.spec.clone(), reports, &context)
                .with_context(|| format!("defining event cycle '{}'", entry.name))?;
            self.attach(Box::new(cycle), &entry.subscribers)?;
        }
        for entry in &config.command_cycles {
            let reports = Arc::new(CommandReporter::new(&entry.name, &entry.spec));
            let cycle = CommandCycle::new(&entry.name, entry.spec.clone(), reports, &context)
                .with_context(|| format!("defining command cycle '{}'", entry.name))?;
            self.attach(Box::new(cycle), &entry.subscribers)?;
        }
        for entry in &config.port_cycles {
            let reports = Arc::new(PortReporter::new(&entry.name, &entry.spec));
            let cycle = PortCycle::new(&entry.name, entry.spec.clone(), reports, &context)
                .with_context(|| format!("defining port cycle '{}'", entry.name))?;
            self.attach(Box::new(cycle), &entry.subscribers)?;
        }
        Ok(())
    }

    fn add_reader(&mut self, config: &ReaderConfig, handle: &Handle) -> anyhow::Result<()> {
        let reader = SimulatedReader::new(&config.name);
        for operation in &config.failing_operations {
            reader.fail_operation(operation);
        }
        if let Some(delay) = config.execute_delay_ms {
            reader.set_execute_delay(Duration::from_millis(delay));
        }
        self.pool
            .add_reader(reader.clone())
            .with_context(|| format!("adding reader '{}'", config.name))?;

        if !config.epcs.is_empty() {
            reader.start_generator(handle, Duration::from_millis(config.period_ms), config.epcs.clone());
        }
        if let (false, Some(period)) = (config.input_ports.is_empty(), config.gpio_period_ms) {
            self.tasks.push(spawn_gpio_toggler(
                handle,
                Arc::downgrade(&reader),
                config.input_ports.clone(),
                Duration::from_millis(period),
            ));
        }
        Ok(())
    }

    /// Keep the cycle, then subscribe its logging subscribers. The cycle is
    /// stored first so a failed subscription still disposes it.
    fn attach(&mut self, cycle: Box<dyn Cycle>, configured: &[String]) -> anyhow::Result<()> {
        let name = cycle.name().to_string();
        self.cycles.push(cycle);
        let Some(cycle) = self.cycles.last() else {
            return Ok(());
        };
        for uri in subscriber_uris(&name, configured) {
            cycle
                .add(LoggingSubscriber::new(&uri))
                .with_context(|| format!("subscribing '{}' to cycle '{}'", uri, name))?;
        }
        info!(cycle = %name, kind = cycle.kind_label(), guid = %cycle.guid(), state = %cycle.state(), "Cycle started");
        Ok(())
    }

    /// Dispose cycles, then triggers, then readers.
    pub(crate) fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        for cycle in self.cycles.drain(..).rev() {
            cycle.dispose();
            debug!(cycle = %cycle.name(), busy = cycle.is_busy(), "Cycle disposed");
        }
        self.hub.shutdown();
        self.pool.shutdown();
        info!("All cycles, triggers and readers released");
    }
}

fn spawn_trigger_ticker(handle: &Handle, hub: Weak<TriggerHub>, uri: String, period: Duration) -> JoinHandle<()> {
    handle.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(hub) = hub.upgrade() else { break };
            let target = uri.clone();
            match tokio::task::spawn_blocking(move || hub.fire(&target)).await {
                Ok(0) => debug!(trigger = %uri, "Trigger fired, nobody accepted"),
                Ok(accepted) => debug!(trigger = %uri, accepted, "Trigger fired"),
                Err(err) => warn!(trigger = %uri, error = %err, "Trigger fire task failed"),
            }
        }
    })
}

fn spawn_gpio_toggler(
    handle: &Handle,
    reader: Weak<SimulatedReader>,
    ports: Vec<u16>,
    period: Duration,
) -> JoinHandle<()> {
    handle.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        let mut state = false;
        loop {
            ticker.tick().await;
            let Some(reader) = reader.upgrade() else { break };
            state = !state;
            let ports = ports.clone();
            let _ = tokio::task::spawn_blocking(move || {
                for port in ports {
                    reader.inject_port(port, state);
                }
            })
            .await;
        }
    })
}
