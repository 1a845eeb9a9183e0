//! Key normalization.
//!
//! Turns `{type, subtype, feature}` descriptors into canonical string keys at
//! short (clustering) and full (display) granularity.

mod normalize;
mod vocabulary;

pub use normalize::{normalize, DescriptorKeys, KeyPolicy, NOISE_SUBTYPES};
pub use vocabulary::key_vocabulary;
