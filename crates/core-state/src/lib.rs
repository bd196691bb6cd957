//! Edit history for the spell-checking core.
//!
//! `UndoRedoLog` turns the raw `EditDelta` stream of a buffer into logical actions: runs of
//! single-character typing or deleting merge into one stroke, and a deletion immediately
//! followed by an insertion at the same position (a replace) undoes and redoes as one step.

pub mod undo;

pub use undo::{Action, Availability, DeleteAction, InsertAction, UndoRedoLog};
