//! Integration tests for Paper-Harvest
//!
//! Each test starts a wiremock server standing in for the proceedings site
//! and runs a complete harvest against it.

mod harvest_tests;
