//! Generated artifacts beyond rendered templates.

pub mod rss;

pub use rss::build_feed;
