pub mod admin;
pub mod app;
pub mod attributes;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod readiness;
pub mod recipes;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
