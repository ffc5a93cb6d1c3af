//! CLI command implementations. All of these are thin wrappers over the
//! HTTP client except `deploy`, which drives the full pipeline.

pub mod clone;
pub mod db;
pub mod deploy;
pub mod login;
pub mod logout;
pub mod site;
