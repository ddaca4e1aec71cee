//! Terminal presentation
//!
//! Plain line-oriented output for `dreamline play`: a presenter that
//! renders player events and a small palette it draws with.

pub mod console;
pub mod style;
