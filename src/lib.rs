//! screamdeck - stream full-panel images to Stream Deck XL devices.
//!
//! The panel is treated as one bitmap spanning every key plus the gaps
//! between them. Each update cuts the bitmap into key tiles, skips tiles
//! that did not change, JPEG-encodes the rest and streams them as raw HID
//! reports.
//!
//! # Modules
//!
//! - `device`: Device catalog, transport trait, hidapi and mock transports
//! - `pixel`: Pixel formats and tile extraction
//! - `cache`: Per-key change detection
//! - `codec`: JPEG tile encoding
//! - `report`: HID report layouts
//! - `session`: Device session driving the update pipeline
//! - `config`: Configuration file handling
//! - `error`: Error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod image_ops;
pub mod logging;
pub mod pixel;
pub mod report;
pub mod session;

pub use device::{DeviceDescriptor, DeviceModel, Geometry, Transport};
pub use error::{Result, ScdkError};
pub use pixel::PixelFormat;
pub use session::{DeviceSession, SessionOptions, UpdateStats};
