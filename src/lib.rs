pub mod error;
pub mod geo;
pub mod io;
pub mod timeline;
pub mod physics;
pub mod layers;
pub mod render;
pub mod ui;
pub mod cache;

#[cfg(test)]
mod tests;
