//! Scenario tests that drive the full scheduler against scripted feeds.

mod cycle_tests;
