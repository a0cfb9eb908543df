//! Tracking input for the frame driver
//!
//! Everything the driver reads goes through [`tracking::PoseSource`]:
//!
//! 1. [`gamepad_source`] - gilrs gamepad standing in for two hand controllers
//! 2. [`test_pattern`] - synthetic poses and touches for rig calibration
//! 3. [`cancel`] - wraps any source so Ctrl-C arrives as a quit edge
//!
//! # Architecture
//!
//! ```text
//! Source ──► poll_edges() ──► FrameDriver ──► MidiSink
//!        ──► pose()/axis() ──►
//! ```
//!
//! Edges are queued by the source and drained once per tick; poses and
//! touchpad axes are sampled after the drain.

pub mod cancel;
pub mod gamepad_source;
pub mod test_pattern;
pub mod tracking;
