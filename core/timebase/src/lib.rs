//! Frame/time arithmetic for sampled signals: resolving episodes from
//! mixed frame, time and datetime parameters, and planning windows over
//! frame ranges. Nothing in this crate performs I/O.

pub mod axis;
pub mod episode;
pub mod error;
pub mod rounding;
pub mod window;

pub use axis::{FramePoint, TimeAxis, duration_string};
pub use episode::{Episode, EpisodeQuery};
pub use error::{TimeAxisError, TimeAxisResult};
pub use window::{WindowSpec, Windows};
