//! botwrap - HTTP wrapper in front of third-party APIs for a voice bot
//!
//! Serves:
//! - A customer table the bot writes to and reads back by phone number
//! - Phone lookups resolved through a subscriber search API and an
//!   address-wash API, cached locally for 30 days
//! - The power outage feed, filtered by incident type

pub mod api;
pub mod config;
pub mod error;
pub mod lookup;
pub mod storage;
pub mod types;
pub mod upstream;

pub use error::{Error, Result};
