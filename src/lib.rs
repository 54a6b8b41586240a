// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod docker_repo;
pub mod drive_repo;
pub mod error;
pub mod host;
pub mod identity_repo;
pub mod models;
pub mod package_repo;
pub mod procfs_repo;
pub mod routes;
pub mod sensors_repo;
pub mod version;
