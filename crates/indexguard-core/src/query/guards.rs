//! Bounds on recursive walks performed while answering a checked query.

/// Longest symlink chain followed when computing a modification time. Longer
/// chains (including cycles) are reported as a filesystem error, which the
/// checker treats as up-to-date.
pub const MAX_SYMLINK_HOPS: usize = 40;

/// Deepest container chain resolved for a single occurrence. A deeper chain
/// means the index recorded a child-of cycle.
pub const MAX_CONTAINER_DEPTH: usize = 128;
