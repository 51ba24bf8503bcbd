//! Data models for the Bay form builder API.

mod form;
mod organization;
mod response;

pub use form::*;
pub use organization::*;
pub use response::*;
