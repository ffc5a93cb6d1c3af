pub mod credentials;
pub mod link;
pub mod settings;
