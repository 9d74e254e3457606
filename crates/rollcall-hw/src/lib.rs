//! rollcall-hw — Camera capture for the attendance tracker.
//!
//! Provides V4L2-based webcam access and conversion of raw YUYV/GREY
//! buffers into RGB frames.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, FrameStream, PixelFormat};
pub use frame::{Frame, FrameError};
