//! End-to-end tests of the panel update pipeline.

use std::collections::BTreeSet;

use scdk::device::mock::MockTransport;
use scdk::pixel::{self, PixelFormat};
use scdk::report::{REPORT_HEADER_LEN, REPORT_LEN};
use scdk::{DeviceModel, DeviceSession};

use crate::common::fixtures::{gradient_byte, gradient_panel, keyed_panel};
use crate::common::init_test_logging;

/// Undoing the 180 degree rotation of every tile gives back the panel region.
#[test]
fn test_tiles_unflip_to_panel_region() {
    let g = DeviceModel::Xl.geometry();
    let panel = gradient_panel(g, PixelFormat::Rgb);

    for row in 0..g.rows {
        for column in 0..g.columns {
            let tile = pixel::extract_tile(
                &panel,
                g.panel_width(),
                g.panel_height(),
                PixelFormat::Rgb,
                g,
                column,
                row,
            )
            .unwrap();
            assert_eq!(tile.len(), 96 * 96 * 3);

            let (ox, oy) = g.key_origin(column, row);
            for y in 0..g.key_height {
                for x in 0..g.key_width {
                    let sx = ox + g.key_width - 1 - x;
                    let sy = oy + g.key_height - 1 - y;
                    let at = (y * g.key_width + x) * 3;
                    for c in 0..3 {
                        assert_eq!(
                            tile[at + c],
                            gradient_byte(sx, sy, c),
                            "key ({column}, {row}) pixel ({x}, {y}) channel {c}"
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_bgrx_tile_is_reordered_to_rgba() {
    let g = DeviceModel::Xl.geometry();
    let panel = gradient_panel(g, PixelFormat::Bgrx);
    let (column, row) = (5, 2);
    let tile = pixel::extract_tile(
        &panel,
        g.panel_width(),
        g.panel_height(),
        PixelFormat::Bgrx,
        g,
        column,
        row,
    )
    .unwrap();
    assert_eq!(tile.len(), 96 * 96 * 4);

    let (ox, oy) = g.key_origin(column, row);
    for (x, y) in [(0, 0), (95, 0), (0, 95), (40, 61)] {
        let sx = ox + g.key_width - 1 - x;
        let sy = oy + g.key_height - 1 - y;
        let at = (y * g.key_width + x) * 4;
        assert_eq!(
            &tile[at..at + 4],
            &[
                gradient_byte(sx, sy, 2),
                gradient_byte(sx, sy, 1),
                gradient_byte(sx, sy, 0),
                gradient_byte(sx, sy, 3),
            ]
        );
    }
}

#[test]
fn test_first_update_sends_every_key_then_nothing() {
    init_test_logging();
    let g = DeviceModel::Xl.geometry();
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = DeviceSession::with_transport(mock, g).unwrap();
    let panel = keyed_panel(g, 40);

    let stats = session.set_panel_image(&panel, PixelFormat::Rgb).unwrap();
    assert_eq!(stats.sent, 32);
    assert_eq!(stats.skipped, 0);

    let writes = probe.writes();
    assert_eq!(writes.len(), stats.reports);
    assert!(writes.iter().all(|r| r.len() == REPORT_LEN));
    assert!(writes.iter().all(|r| r[0] == 0x02 && r[1] == 0x07));

    // Keys go out in row-major order, each with at least one report.
    let keys: Vec<u8> = writes.iter().map(|r| r[2]).collect();
    assert!(keys.windows(2).all(|w| w[0] <= w[1]));
    let distinct: BTreeSet<u8> = keys.iter().copied().collect();
    assert_eq!(distinct, (0..32).collect::<BTreeSet<u8>>());

    let stats = session.set_panel_image(&panel, PixelFormat::Rgb).unwrap();
    assert_eq!(stats.sent, 0);
    assert_eq!(stats.skipped, 32);
    assert_eq!(probe.write_count(), writes.len());
}

#[test]
fn test_changed_key_is_the_only_one_resent() {
    let g = DeviceModel::Xl.geometry();
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = DeviceSession::with_transport(mock, g).unwrap();
    let mut panel = keyed_panel(g, 0);

    session.set_panel_image(&panel, PixelFormat::Rgb).unwrap();
    probe.clear_reports();

    let (ox, oy) = g.key_origin(3, 2);
    let at = ((oy + 10) * g.panel_width() + ox + 10) * 3;
    panel[at] ^= 0xFF;

    let stats = session.set_panel_image(&panel, PixelFormat::Rgb).unwrap();
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.skipped, 31);
    let writes = probe.writes();
    assert!(!writes.is_empty());
    assert!(writes.iter().all(|r| r[2] == 3 + 2 * 8));
}

#[test]
fn test_gap_pixels_never_trigger_a_send() {
    let g = DeviceModel::Xl.geometry();
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = DeviceSession::with_transport(mock, g).unwrap();
    let mut panel = keyed_panel(g, 0);
    session.set_panel_image(&panel, PixelFormat::Rgb).unwrap();
    let before = probe.write_count();

    // First column of the gap right of key (0, 0).
    let at = (5 * g.panel_width() + g.key_width) * 3;
    panel[at..at + 3].copy_from_slice(&[1, 2, 3]);

    let stats = session.set_panel_image(&panel, PixelFormat::Rgb).unwrap();
    assert_eq!(stats.sent, 0);
    assert_eq!(probe.write_count(), before);
}

#[test]
fn test_sent_payload_is_a_decodable_key_image() {
    let g = DeviceModel::Xl.geometry();
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = DeviceSession::with_transport(mock, g).unwrap();
    session
        .set_panel_image(&keyed_panel(g, 120), PixelFormat::Rgb)
        .unwrap();

    let mut payload = Vec::new();
    for report in probe.writes().iter().filter(|r| r[2] == 9) {
        let len = usize::from(u16::from_le_bytes([report[4], report[5]]));
        payload.extend_from_slice(&report[REPORT_HEADER_LEN..REPORT_HEADER_LEN + len]);
    }
    assert_eq!(&payload[..2], &[0xFF, 0xD8]);
    assert_eq!(&payload[payload.len() - 2..], &[0xFF, 0xD9]);

    let decoded = image::load_from_memory(&payload).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (96, 96));
    let px = decoded.get_pixel(48, 48).0;
    let expected = [9u8 * 8, 120, 255 - 9];
    for c in 0..3 {
        assert!(
            px[c].abs_diff(expected[c]) <= 8,
            "channel {c}: got {px:?}, expected {expected:?}"
        );
    }
}
