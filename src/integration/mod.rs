//! Integration test support: scripted tools, canned inputs and end-to-end
//! pipeline tests

mod e2e;
pub mod fixtures;
