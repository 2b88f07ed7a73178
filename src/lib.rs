pub mod logger;
pub mod settings;

pub mod app;
pub mod client;
pub mod session;

pub mod domain_model;
pub mod domain_port;
pub mod infra_file;
pub mod infra_http;
pub mod infra_memory;
