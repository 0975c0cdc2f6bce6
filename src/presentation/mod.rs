//! egui front end: device lists, pairing actions and settings.

pub mod app;
pub mod components;
pub mod tabs;
pub mod theme;
