//! Easy Apply job application automation core.

pub mod ai;
pub mod classify;
pub mod config;
pub mod documents;
pub mod error;
pub mod forms;
pub mod gate;
pub mod human;
pub mod llm;
pub mod logging;
pub mod model;
pub mod resolver;
pub mod store;
pub mod wizard;
