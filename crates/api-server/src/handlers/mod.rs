//! HTTP request handlers.

pub mod admin;
pub mod auth;
pub mod compute;
pub mod health;
