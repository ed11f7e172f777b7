//! Aggregated community data for one time range and platform selection.

pub mod hook;
pub mod state;

pub use hook::CommunityDataHook;
pub use state::{CommunityDataState, HookParams, LoadingFlags};
