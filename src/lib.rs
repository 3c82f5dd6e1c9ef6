//! Expression-level stepping support for an educational debugger, and the
//! message protocol its front end and back end speak.

pub mod debugger;
pub mod logging;
pub mod parser;
pub mod protocol;
pub mod ranges;
