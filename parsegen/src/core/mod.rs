//! Pure, deterministic logic: session state, table comparison, output
//! sanitization. No I/O.

pub mod sanitize;
pub mod state;
pub mod table;
