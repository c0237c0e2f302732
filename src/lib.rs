pub mod app;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod ftp;
pub mod https;
pub mod manifest;
pub mod mirror;
pub mod output;
pub mod remote;
