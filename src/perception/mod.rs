//! Perception: turns raw classifier output into the per-frame signal used by
//! temporal logic.

mod normalizer;

pub use normalizer::SignalNormalizer;
