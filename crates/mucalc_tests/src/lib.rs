//! Integration-test crate. All tests live under `tests/`; this library
//! target exists so the package builds on its own.
