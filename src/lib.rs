pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod fs_util;
pub mod harvest;
pub mod output;
