//! Domain types shared by every pipeline stage.

pub mod candidate;
pub mod catalog;
pub mod channel_name;

pub use candidate::{CandidateRecord, CandidateSet, ChannelKey};
pub use catalog::{ChannelCatalog, load_catalog};
pub use channel_name::normalize_channel_name;
