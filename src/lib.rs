pub mod advisor;
pub mod catalog;
pub mod config;
pub mod db;
pub mod enrich;
pub mod error;
pub mod export;
pub mod handler;
pub mod page;
