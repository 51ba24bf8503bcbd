//! Form schema traversal and response validation.
//!
//! Everything in here is pure: functions take the document or answers they
//! need as arguments and allocate fresh output, so handlers may call them
//! concurrently without coordination.

mod answer;
mod document;
mod fields;
mod flatten;
mod pager;
mod verify;

pub use answer::*;
pub use document::*;
pub use fields::*;
pub use flatten::*;
pub use pager::*;
pub use verify::*;
