//! Command implementations behind the `aceteam` binary, exposed as a library
//! so integration tests exercise the same code paths.

pub mod commands;
