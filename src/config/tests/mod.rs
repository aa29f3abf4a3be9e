//! Unit tests for configuration loading.

mod settings_tests;
