//! HID report layouts: image streaming, control and input reports.
//!
//! # Image reports
//!
//! Every outbound image report is exactly [`REPORT_LEN`] bytes:
//!
//! | Offset | Field                         |
//! |--------|-------------------------------|
//! | 0      | report id `0x02`              |
//! | 1      | command `0x07` (set key image)|
//! | 2      | key index                     |
//! | 3      | `1` on the last chunk, else 0 |
//! | 4..6   | payload length, little endian |
//! | 6..8   | chunk index, little endian    |
//! | 8..    | payload, zero padded          |
//!
//! # Control reports
//!
//! Brightness and screensaver commands are 32-byte feature reports.

use tracing::{trace, warn};

use crate::device::Transport;
use crate::error::{Result, ScdkError};

/// Length of one outbound image report.
pub const REPORT_LEN: usize = 1024;
/// Length of the image report header.
pub const REPORT_HEADER_LEN: usize = 8;
/// Payload bytes carried by one image report.
pub const REPORT_PAYLOAD_LEN: usize = REPORT_LEN - REPORT_HEADER_LEN;

/// Length of a control feature report.
pub const FEATURE_REPORT_LEN: usize = 32;

/// Length of one inbound input report.
pub const INPUT_REPORT_LEN: usize = 512;
/// Length of the input report header.
pub const INPUT_HEADER_LEN: usize = 4;

const IMAGE_REPORT_ID: u8 = 0x02;
const SET_KEY_IMAGE: u8 = 0x07;

const FEATURE_REPORT_ID: u8 = 0x03;
const SET_BRIGHTNESS: u8 = 0x08;
const SHOW_SCREENSAVER: u8 = 0x02;

const BRIGHTNESS_HEAD: [u8; 3] = [0x23, 0xB8, 0x01];
const BRIGHTNESS_TRAILER_AT: usize = 24;
const BRIGHTNESS_TRAILER: [u8; 6] = [0xA5, 0x49, 0xCD, 0x02, 0xFE, 0x7F];

/// Number of image reports needed for a payload of `len` bytes.
pub const fn chunk_count(len: usize) -> usize {
    len.div_ceil(REPORT_PAYLOAD_LEN)
}

/// Fill `out` with chunk `chunk` of `payload` addressed to `key`.
///
/// Returns the number of payload bytes carried, or `None` if `chunk` is past
/// the end of the payload.
pub fn write_tile_report(
    payload: &[u8],
    key: u8,
    chunk: usize,
    out: &mut [u8; REPORT_LEN],
) -> Option<usize> {
    let start = chunk * REPORT_PAYLOAD_LEN;
    if start >= payload.len() {
        return None;
    }
    let end = (start + REPORT_PAYLOAD_LEN).min(payload.len());
    let data = &payload[start..end];
    let is_last = end == payload.len();

    let (header, body) = out.split_at_mut(REPORT_HEADER_LEN);
    let [len_lo, len_hi] = (data.len() as u16).to_le_bytes();
    let [chunk_lo, chunk_hi] = (chunk as u16).to_le_bytes();
    header.copy_from_slice(&[
        IMAGE_REPORT_ID,
        SET_KEY_IMAGE,
        key,
        u8::from(is_last),
        len_lo,
        len_hi,
        chunk_lo,
        chunk_hi,
    ]);

    let (filled, padding) = body.split_at_mut(data.len());
    filled.copy_from_slice(data);
    padding.fill(0);

    Some(data.len())
}

/// Split a compressed tile into image reports.
///
/// A zero-length payload yields no reports.
pub fn frame_tile(payload: &[u8], key: u8) -> Vec<[u8; REPORT_LEN]> {
    (0..chunk_count(payload.len()))
        .map(|chunk| {
            let mut report = [0u8; REPORT_LEN];
            write_tile_report(payload, key, chunk, &mut report);
            report
        })
        .collect()
}

/// Stream a compressed tile to the device, one report at a time.
///
/// `buf` is reused for every chunk. A write that errors or accepts fewer
/// than [`REPORT_LEN`] bytes fails the tile and aborts the remaining chunks.
/// Returns the number of reports written.
pub fn send_tile<T: Transport + ?Sized>(
    transport: &mut T,
    payload: &[u8],
    key: u8,
    buf: &mut [u8; REPORT_LEN],
) -> Result<usize> {
    let count = chunk_count(payload.len());
    for chunk in 0..count {
        let carried = write_tile_report(payload, key, chunk, buf).unwrap_or_default();
        trace!(key, chunk, carried, "Writing image report");

        let reason = match transport.write(buf.as_slice()) {
            Ok(written) if written >= REPORT_LEN => continue,
            Ok(written) => format!("short write: {written} of {REPORT_LEN} bytes"),
            Err(e) => e.to_string(),
        };
        warn!(key, chunk, %reason, "Image report write failed");
        return Err(ScdkError::ReportWrite {
            key,
            chunk: chunk as u16,
            reason,
        });
    }
    Ok(count)
}

/// Build the brightness feature report, clamping `percent` to 0..=100.
pub fn encode_brightness(percent: i32) -> [u8; FEATURE_REPORT_LEN] {
    let mut report = [0u8; FEATURE_REPORT_LEN];
    report[0] = FEATURE_REPORT_ID;
    report[1] = SET_BRIGHTNESS;
    report[2] = percent.clamp(0, 100) as u8;
    report[3..6].copy_from_slice(&BRIGHTNESS_HEAD);
    report[BRIGHTNESS_TRAILER_AT..BRIGHTNESS_TRAILER_AT + BRIGHTNESS_TRAILER.len()]
        .copy_from_slice(&BRIGHTNESS_TRAILER);
    report
}

/// Build the screensaver feature report.
pub fn encode_screensaver() -> [u8; FEATURE_REPORT_LEN] {
    let mut report = [0u8; FEATURE_REPORT_LEN];
    report[0] = FEATURE_REPORT_ID;
    report[1] = SHOW_SCREENSAVER;
    report
}

/// Decode the key states carried by an input report.
///
/// Each byte after the 4-byte header maps to one key (`> 0` is pressed).
/// Writes `min(out.len(), payload)` entries and returns that count.
pub fn decode_key_states(report: &[u8], out: &mut [bool]) -> usize {
    let payload = report.get(INPUT_HEADER_LEN..).unwrap_or_default();
    let count = out.len().min(payload.len());
    for (state, byte) in out.iter_mut().zip(&payload[..count]) {
        *state = *byte > 0;
    }
    count
}
