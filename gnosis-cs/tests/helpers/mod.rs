//! Test Helper Utilities
//!
//! In-memory file store, scripted engine fakes and a seeded pipeline harness

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

#[allow(unused_imports)]
pub use fakes::{FakeEncoder, FakeSignaling, MemoryFileStore};
#[allow(unused_imports)]
pub use fixtures::{create_test_db, Harness};
