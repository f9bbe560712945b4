//! Umbrella crate that re-exports the `station-*` building blocks.
//!
//! This crate is intended as a convenient entrypoint for hosts embedding the
//! AI + collision core.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use station_core as core;

#[cfg(feature = "collision")]
#[cfg_attr(docsrs, doc(cfg(feature = "collision")))]
pub use station_collision as collision;

#[cfg(feature = "nav")]
#[cfg_attr(docsrs, doc(cfg(feature = "nav")))]
pub use station_nav as nav;

#[cfg(feature = "agent")]
#[cfg_attr(docsrs, doc(cfg(feature = "agent")))]
pub use station_agent as agent;
