//! Dock CLI Library
//!
//! Core modules for the `dock` command-line client: the deployment
//! pipeline plus the request/response commands around it.

pub mod commands;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod storage;
