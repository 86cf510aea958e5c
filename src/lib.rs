// Library for tests to access modules

pub mod config;
pub mod disk_repo;
pub mod error;
pub mod models;
pub mod procfs;
pub mod publisher;
pub mod routes;
pub mod sampler;
