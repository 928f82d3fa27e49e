// src/web/mod.rs
//! Server-rendered dashboard over the merged view.

pub mod icon;
pub mod render;

pub use icon::sanitize_icon_url;
pub use render::dashboard;
