//! Integration tests for both harvest stages
//!
//! Stage tests run against a wiremock server and write into a temporary
//! directory; CLI tests run the built binaries.

mod cli_tests;
mod crawl_tests;
mod extract_tests;
