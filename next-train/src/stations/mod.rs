//! Station directory.
//!
//! Holds the station list used for name lookups and the station pickers.
//! Starts with a built-in default pair and is replaced wholesale whenever a
//! directory fetch succeeds.

mod directory;

pub use directory::StationDirectory;
