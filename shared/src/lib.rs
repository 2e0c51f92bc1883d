//! Shared types, Bot API envelopes, errors and local stores for Stickerpull.
pub mod bot_api;
pub mod config;
pub mod dir_history;
pub mod errors;
pub mod models;
pub mod pack_name;
pub mod task_queue;
