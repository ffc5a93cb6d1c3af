pub mod client;
pub mod projects;
pub mod services;
