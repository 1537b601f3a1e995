//! Media pipeline — PCM codec, capture adapter, snapshots, playback scheduling.

pub mod capture;
pub mod pcm;
pub mod playback;
pub mod snapshot;
pub mod volume;
