pub mod common;
pub mod db;
pub mod downloader;
pub mod parser;
pub mod store;
