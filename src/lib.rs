// ABOUTME: Library root for cofounder; re-exports all modules for integration testing.
// ABOUTME: The binary entry point is in main.rs, which uses this crate as a library.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod conversation;
pub mod error;
pub mod steps;
pub mod storage;
pub mod tui;
