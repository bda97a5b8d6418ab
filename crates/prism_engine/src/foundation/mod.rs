//! Foundation layer: math, geometry, logging, and timing utilities
//!
//! Everything in this module is free of engine-level dependencies so the
//! higher layers (assets, render, ecs) can build on it without cycles.

pub mod geometry;
pub mod logging;
pub mod math;
pub mod time;
