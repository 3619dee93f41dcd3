//! Test helpers shared across module test suites.
