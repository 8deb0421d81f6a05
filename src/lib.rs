pub mod api;
pub mod app;
pub mod auth;
pub mod avatar;
pub mod chat;
pub mod contacts;
pub mod error;
pub mod session;
pub mod storage;
pub mod utils;
#[cfg(feature = "gui")]
#[allow(deprecated)]
pub mod ui;

pub use error::{Error, Result};
