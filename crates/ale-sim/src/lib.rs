//! # ALE Simulation
//!
//! In-memory collaborators for the cycle engine: logical readers fed by
//! injected or generated sightings, a trigger hub, a tag decoder, reference
//! report builders for each cycle kind and simple subscribers.
//!
//! Used by the engine's tests and by the `ale` binary.

mod decoder;
mod reader;
mod reader_pool;
mod reports;
mod subscriber;
mod trigger_hub;

pub use decoder::UriDecoder;
pub use reader::SimulatedReader;
pub use reader_pool::ReaderPool;
pub use reports::{CommandReporter, EventReporter, PortReporter};
pub use subscriber::{ChannelSubscriber, LoggingSubscriber};
pub use trigger_hub::{TriggerHub, MANUAL_TRIGGER_PREFIX, RTC_TRIGGER_PREFIX};
