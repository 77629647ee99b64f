//! Collaborators a cycle is built against.

use std::sync::Arc;

use ale_protocols::{ReaderRegistry, TagDecoder, TriggerRegistry};

use crate::config::CycleConfig;
use crate::timer::CycleTimer;

/// Handles passed from the composition root to every cycle constructor.
#[derive(Clone)]
pub struct CycleContext {
    pub readers: Arc<dyn ReaderRegistry>,
    pub triggers: Arc<dyn TriggerRegistry>,
    pub decoder: Arc<dyn TagDecoder>,
    pub timer: CycleTimer,
    pub config: CycleConfig,
}

impl CycleContext {
    pub fn new(
        readers: Arc<dyn ReaderRegistry>,
        triggers: Arc<dyn TriggerRegistry>,
        decoder: Arc<dyn TagDecoder>,
        timer: CycleTimer,
    ) -> Self {
        Self {
            readers,
            triggers,
            decoder,
            timer,
            config: CycleConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CycleConfig) -> Self {
        self.config = config;
        self
    }
}
