//! postlog testing utilities

#![doc(html_no_source)]
#![deny(missing_docs)]
//
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]

/// Config shortcut
pub mod config;

/// Sample lines of a Postfix log file.
pub mod fixtures;

/// Stores failing on purpose.
pub mod faulty;

#[cfg(test)]
mod tests;
