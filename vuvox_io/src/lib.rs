mod analyzer;
mod delivery;
mod error;
mod tap;

pub use analyzer::{AnalyzerSettings, BandAnalyzer, MAX_FFT_SIZE, downmix};
pub use delivery::Delivery;
pub use error::{AnalyzerError, AnalyzerResult};
pub use tap::{TapReader, TapWriter, new_tap};
