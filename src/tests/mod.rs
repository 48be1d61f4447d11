//! Cross-module integration tests. Per-module unit tests live alongside
//! their source files; this tree covers scenarios and invariants that span
//! more than one component.

mod invariants;
mod scenarios;
