#![deny(unsafe_code)]

pub mod app;
pub mod bookmarks;
pub mod builtin;
pub mod config;
pub mod constants;
pub mod dns_cache;
pub mod document;
pub mod download;
pub mod error;
pub mod event_handler;
pub mod fetch;
pub mod history;
pub mod logging;
pub mod menu;
pub mod models;
pub mod renderer;
pub mod status;
pub mod transport;
pub mod ui;
pub mod url_codec;
pub mod view;
pub mod wordwrap;
