//! The `utils` module provides a collection of utility functions and common
//! definitions used across the relay.
//!
//! It centralizes the error types of every subsystem and the logging setup
//! shared by the binary and the tests.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests {
    use super::logging;

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic
        logging::init("info");
        logging::init("debug");
        logging::init("nonsense");
    }
}
