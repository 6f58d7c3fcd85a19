//! Backend services behind the terminal front-end.
//!
//! - Catalog for browsing and resolving tracks
//! - Player service driving the playback controller

pub mod catalog;
pub mod player;

pub use catalog::LibraryCatalog;
pub use player::PlayerService;
