//! Crate-level tests exercising whole pipeline stages. Helpers in
//! `common` are shared with the per-module unit tests.

pub(crate) mod common;
