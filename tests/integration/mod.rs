//! End-to-end scenarios driven through the public API with in-memory transports.

mod clear;
mod playback;
