//! Helper functions shared by feeds and commands
//!
//! Dates are formatted for the configured locale, URLs are joined onto the
//! configured site URL.

mod date;
mod url;

pub use date::*;
pub use url::*;
