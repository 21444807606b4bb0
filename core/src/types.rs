//! Shared primitive types used across the scoring pipeline.

/// A stable identifier for one company in the snapshot.
pub type EntityId = String;

/// A calendar year (founding year, observation year).
pub type Year = i32;

/// Identifier of one scoring run. Stamped on every output row.
pub type RunId = String;
