//! Sound resolution, synthesis, and playback via cpal and external players.

pub mod catalog;
pub mod dispatch;
pub mod external;
pub mod playback;
pub mod synth;

pub use catalog::{DEFAULT_SOUND, SoundCatalog, SoundInfo, SoundSource};
pub use dispatch::{LoopingPlayer, PlaybackOutcome, SoundDispatcher};
pub use playback::{Clip, PlaybackBackend};
