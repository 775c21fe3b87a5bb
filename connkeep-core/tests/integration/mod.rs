//! Integration test suites

mod dispatcher_tests;
mod end_to_end_tests;
