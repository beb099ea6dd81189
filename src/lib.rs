//! Spectrum bar shaping and equalizer band mapping for music player
//! visualizers.

pub mod config;
pub mod equalizer;
pub mod error;
pub mod session;
pub mod shaper;

pub use config::VuConfig;
pub use equalizer::{
    BandBinding, BindingResult, EqualizerMapper, EqualizerStage, GainControl, GainRange,
};
pub use error::{ShapeError, ShapeResult};
pub use session::{BarFrame, PlaybackEvent, VisualizerSession, frame_channel};
pub use shaper::{BoostPolicy, ShaperConfig, SpectrumShaper};
