//! Utility modules for the static site generator.

pub mod assets;
pub mod category;
pub mod css;
pub mod date;
pub mod exec;
pub mod hash;
pub mod minify;
pub mod watch;
