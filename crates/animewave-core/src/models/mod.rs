mod filter;
mod playback;

pub use filter::{FilterState, FilterUpdate};
pub use playback::Playback;
