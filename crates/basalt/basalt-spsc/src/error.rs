/// Reasons a queue could not be built.
///
/// A full or empty queue is not an error; those are reported through the
/// return values of the producer and consumer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue needs at least one slot")]
    ZeroCapacity,

    #[error("{slots} slots exceed the maximum allocation size")]
    CapacityOverflow { slots: usize },

    #[error("failed to allocate {bytes} bytes of slot storage")]
    AllocFailed { bytes: usize },
}
