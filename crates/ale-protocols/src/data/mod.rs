//! Accumulating report data.

mod events;
mod tags;

pub use events::*;
pub use tags::*;

/// Data collected during one collection window.
///
/// The cycle engine keeps one instance per cycle behind its own guard and
/// drives it through the window lifecycle: `clear` when a window opens,
/// `clone` + `rotate` when it closes, `reset` when the cycle loses its last
/// subscriber.
pub trait CycleData: Clone + Default + Send + Sync + 'static {
    /// Drop the current window's entries, keeping the previous window.
    fn clear(&mut self);

    /// Make the current window the previous one and start empty.
    fn rotate(&mut self);

    /// Drop everything, including the previous window.
    fn reset(&mut self);

    /// Number of entries in the current window.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both collections track the same set of entries.
    fn has_same_data(&self, other: &Self) -> bool;
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
