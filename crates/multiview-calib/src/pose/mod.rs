//! # Camera poses
//!
//! Look-at camera construction and the conversions between the conventions of the
//! renderer, the SfM reconstructor and the neural trainer.
//!
//! - [`look_at`] — camera pose type, inversion and the look-at builder
//! - [`convention`] — named axis remaps and per-consumer conventions

mod look_at;
pub use look_at::*;

mod convention;
pub use convention::*;
