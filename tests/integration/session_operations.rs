//! Integration tests for device sessions over the mock transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use scdk::codec::TileEncoder;
use scdk::device::mock::{MockTransport, MockTransportBuilder};
use scdk::pixel::{PixelFormat, TileLayout};
use scdk::{DeviceModel, DeviceSession, ScdkError, SessionOptions};

use crate::common::fixtures::{gradient_panel, keyed_panel};
use crate::common::init_test_logging;

const TIMEOUT: Duration = Duration::from_millis(10);

/// Emits a fixed-size payload so report counts are predictable.
struct FixedEncoder {
    len: usize,
    qualities: Arc<Mutex<Vec<u8>>>,
}

impl TileEncoder for FixedEncoder {
    fn encode(
        &mut self,
        tile: &[u8],
        _width: usize,
        _height: usize,
        _layout: TileLayout,
        quality: u8,
        out: &mut Vec<u8>,
    ) -> Result<(), String> {
        self.qualities.lock().unwrap().push(quality);
        out.clear();
        out.resize(self.len, tile.first().copied().unwrap_or_default());
        Ok(())
    }

    fn max_encoded_len(&self, _width: usize, _height: usize) -> usize {
        self.len
    }
}

struct FailingEncoder;

impl TileEncoder for FailingEncoder {
    fn encode(
        &mut self,
        _tile: &[u8],
        _width: usize,
        _height: usize,
        _layout: TileLayout,
        _quality: u8,
        _out: &mut Vec<u8>,
    ) -> Result<(), String> {
        Err("out of coffee".to_string())
    }

    fn max_encoded_len(&self, _width: usize, _height: usize) -> usize {
        0
    }
}

fn fixed_session(mock: MockTransport, len: usize) -> DeviceSession<MockTransport, FixedEncoder> {
    fixed_session_recording(mock, len, Arc::default())
}

fn fixed_session_recording(
    mock: MockTransport,
    len: usize,
    qualities: Arc<Mutex<Vec<u8>>>,
) -> DeviceSession<MockTransport, FixedEncoder> {
    DeviceSession::with_options(
        mock,
        FixedEncoder { len, qualities },
        DeviceModel::Xl.geometry(),
        SessionOptions { quality: 55 },
    )
    .unwrap()
}

// === Feature reports ===

#[test]
fn test_brightness_report_layout() {
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = DeviceSession::with_transport(mock, DeviceModel::Xl.geometry()).unwrap();

    session.set_brightness(42).unwrap();
    let reports = probe.feature_reports();
    assert_eq!(reports.len(), 1);
    let r = &reports[0];
    assert_eq!(r.len(), 32);
    assert_eq!(&r[..6], &[0x03, 0x08, 42, 0x23, 0xB8, 0x01]);
    assert!(r[6..24].iter().all(|&b| b == 0));
    assert_eq!(&r[24..30], &[0xA5, 0x49, 0xCD, 0x02, 0xFE, 0x7F]);
    assert_eq!(&r[30..], &[0, 0]);
}

#[test]
fn test_brightness_is_clamped() {
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = DeviceSession::with_transport(mock, DeviceModel::Xl.geometry()).unwrap();

    session.set_brightness(250).unwrap();
    session.set_brightness(-3).unwrap();
    let reports = probe.feature_reports();
    assert_eq!(reports[0][2], 100);
    assert_eq!(reports[1][2], 0);
}

#[test]
fn test_screensaver_report() {
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = DeviceSession::with_transport(mock, DeviceModel::Xl.geometry()).unwrap();

    session.show_screensaver().unwrap();
    let reports = probe.feature_reports();
    assert_eq!(reports[0].len(), 32);
    assert_eq!(&reports[0][..2], &[0x03, 0x02]);
    assert!(reports[0][2..].iter().all(|&b| b == 0));
    assert_eq!(probe.write_count(), 0);
}

#[test]
fn test_feature_report_failure_is_reported() {
    let mock = MockTransport::new();
    mock.inject_error("stalled");
    let mut session =
        DeviceSession::with_transport(mock.clone(), DeviceModel::Xl.geometry()).unwrap();

    let err = session.set_brightness(10).unwrap_err();
    assert!(matches!(err, ScdkError::FeatureReport(ref m) if m.contains("stalled")));
    // The injected error is one-shot.
    session.show_screensaver().unwrap();
}

// === Input ===

#[test]
fn test_read_key_states() {
    let mock = MockTransport::new();
    mock.queue_pressed(32, &[0, 9, 31]);
    let mut session =
        DeviceSession::with_transport(mock.clone(), DeviceModel::Xl.geometry()).unwrap();

    let mut states = [false; 32];
    assert_eq!(session.read_key_states(&mut states, TIMEOUT).unwrap(), Some(32));
    let pressed: Vec<usize> = (0..32).filter(|&k| states[k]).collect();
    assert_eq!(pressed, vec![0, 9, 31]);
    assert_eq!(mock.read_count(), 1);
}

#[test]
fn test_read_without_input_returns_none() {
    let mock = MockTransport::new();
    let mut session = DeviceSession::with_transport(mock, DeviceModel::Xl.geometry()).unwrap();

    let mut states = [true; 32];
    assert_eq!(session.read_key_states(&mut states, TIMEOUT).unwrap(), None);
    assert!(states.iter().all(|&s| s));
}

#[test]
fn test_read_truncates_to_output_len() {
    let mock = MockTransport::new();
    mock.queue_pressed(32, &[2, 20]);
    let mut session =
        DeviceSession::with_transport(mock.clone(), DeviceModel::Xl.geometry()).unwrap();

    let mut states = [false; 8];
    assert_eq!(session.read_key_states(&mut states, TIMEOUT).unwrap(), Some(8));
    assert_eq!(states, [false, false, true, false, false, false, false, false]);
}

#[test]
fn test_read_error_is_reported() {
    let mock = MockTransportBuilder::new().disconnected().build();
    let mut session = DeviceSession::with_transport(mock, DeviceModel::Xl.geometry()).unwrap();

    let mut states = [false; 32];
    let err = session.read_key_states(&mut states, TIMEOUT).unwrap_err();
    assert!(matches!(err, ScdkError::InputRead(_)));
    assert!(err.is_transport_error());
}

// === Image updates ===

#[test]
fn test_report_count_follows_payload_size() {
    init_test_logging();
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = fixed_session(mock, 2500);

    let stats = session
        .set_panel_image(&keyed_panel(DeviceModel::Xl.geometry(), 1), PixelFormat::Rgb)
        .unwrap();
    assert_eq!(stats.sent, 32);
    assert_eq!(stats.reports, 32 * 3);
    assert_eq!(probe.write_count(), 96);
}

#[test]
fn test_failed_write_aborts_and_key_is_retried() {
    let g = DeviceModel::Xl.geometry();
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = fixed_session(mock, 2500);
    let panel = keyed_panel(g, 7);

    // Keys 0 and 1 take three reports each; key 2 fails on its second.
    probe.fail_after_writes(7);
    let err = session.set_panel_image(&panel, PixelFormat::Rgb).unwrap_err();
    assert!(matches!(err, ScdkError::ReportWrite { key: 2, chunk: 1, .. }));
    assert_eq!(probe.write_count(), 7);
    assert!(session.cache().get(0).is_some());
    assert!(session.cache().get(1).is_some());
    assert!(session.cache().get(2).is_none());
    assert!(session.cache().get(3).is_none());

    probe.reconnect();
    probe.clear_reports();
    let stats = session.set_panel_image(&panel, PixelFormat::Rgb).unwrap();
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.sent, 30);
    assert_eq!(probe.writes()[0][2], 2);
}

#[test]
fn test_short_write_keeps_key_dirty() {
    let g = DeviceModel::Xl.geometry();
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = fixed_session(mock, 10);
    let image = vec![9u8; 96 * 96 * 3];

    probe.truncate_writes(512);
    let err = session.set_key_image(2, 1, &image, PixelFormat::Rgb).unwrap_err();
    assert!(matches!(err, ScdkError::ReportWrite { key: 10, .. }));
    assert!(session.cache().get(10).is_none());

    probe.reconnect();
    let stats = session.set_key_image(2, 1, &image, PixelFormat::Rgb).unwrap();
    assert_eq!(stats.sent, 1);
    assert_eq!(g.key_index(2, 1).unwrap(), 10);
}

#[test]
fn test_encoder_failure_is_reported_per_key() {
    let mock = MockTransport::new();
    let mut session = DeviceSession::with_options(
        mock.clone(),
        FailingEncoder,
        DeviceModel::Xl.geometry(),
        SessionOptions::default(),
    )
    .unwrap();

    let err = session
        .set_panel_image(&keyed_panel(DeviceModel::Xl.geometry(), 0), PixelFormat::Rgb)
        .unwrap_err();
    assert!(matches!(err, ScdkError::Encode { key: 0, .. }));
    assert!(session.cache().get(0).is_none());
    assert_eq!(mock.write_count(), 0);
}

#[test]
fn test_quality_is_passed_to_encoder() {
    let qualities = Arc::new(Mutex::new(Vec::new()));
    let mut session = fixed_session_recording(MockTransport::new(), 10, Arc::clone(&qualities));
    assert_eq!(session.quality(), 55);

    session
        .set_key_image(0, 0, &vec![5u8; 96 * 96 * 3], PixelFormat::Rgb)
        .unwrap();
    session.set_quality(90);
    session
        .set_key_image(1, 0, &vec![5u8; 96 * 96 * 3], PixelFormat::Rgb)
        .unwrap();
    assert_eq!(session.quality(), 90);
    assert_eq!(*qualities.lock().unwrap(), vec![55, 90]);
}

#[test]
fn test_set_key_image_addresses_one_key() {
    let mock = MockTransport::new();
    let probe = mock.clone();
    let mut session = DeviceSession::with_transport(mock, DeviceModel::Xl.geometry()).unwrap();
    let image = vec![200u8; 96 * 96 * 3];

    let stats = session.set_key_image(6, 3, &image, PixelFormat::Rgb).unwrap();
    assert_eq!(stats.sent, 1);
    assert!(probe.writes().iter().all(|r| r[2] == 6 + 3 * 8));

    let stats = session.set_key_image(6, 3, &image, PixelFormat::Rgb).unwrap();
    assert_eq!(stats.skipped, 1);
}

#[test]
fn test_invalid_key_is_rejected_before_sending() {
    let mock = MockTransport::new();
    let mut session =
        DeviceSession::with_transport(mock.clone(), DeviceModel::Xl.geometry()).unwrap();
    let image = vec![0u8; 96 * 96 * 3];

    let err = session.set_key_image(8, 0, &image, PixelFormat::Rgb).unwrap_err();
    assert!(matches!(err, ScdkError::InvalidKeyIndex { column: 8, row: 0, .. }));
    let err = session.set_key_image(0, 4, &image, PixelFormat::Rgb).unwrap_err();
    assert!(matches!(err, ScdkError::InvalidKeyIndex { .. }));
    assert_eq!(mock.write_count(), 0);
}

#[test]
fn test_wrong_buffer_length_is_rejected() {
    let g = DeviceModel::Xl.geometry();
    let mock = MockTransport::new();
    let mut session = DeviceSession::with_transport(mock.clone(), g).unwrap();

    let short = vec![0u8; g.panel_width() * g.panel_height() * 3 - 1];
    let err = session.set_panel_image(&short, PixelFormat::Rgb).unwrap_err();
    assert!(matches!(err, ScdkError::BufferLength { .. }));

    // An RGB-sized buffer is too short for a 4-byte format.
    let rgb = vec![0u8; g.panel_width() * g.panel_height() * 3];
    let err = session.set_panel_image(&rgb, PixelFormat::Bgra).unwrap_err();
    assert!(matches!(err, ScdkError::BufferLength { .. }));
    assert_eq!(mock.write_count(), 0);
}

#[test]
fn test_every_pixel_format_updates_all_keys() {
    let g = DeviceModel::Xl.geometry();
    for format in PixelFormat::ALL {
        let mock = MockTransport::new();
        let mut session = fixed_session(mock, 100);
        let stats = session
            .set_panel_image(&gradient_panel(g, format), format)
            .unwrap();
        assert_eq!(stats.sent, 32, "{format}");
        assert_eq!(stats.reports, 32, "{format}");
    }
}

#[test]
fn test_real_encoder_handles_bgr_and_rgba() {
    let g = DeviceModel::Xl.geometry();
    for format in [PixelFormat::Bgr, PixelFormat::Rgba] {
        let mock = MockTransport::new();
        let mut session = DeviceSession::with_transport(mock, g).unwrap();
        let stats = session
            .set_panel_image(&gradient_panel(g, format), format)
            .unwrap();
        assert_eq!(stats.sent, 32, "{format}");
        assert!(stats.reports >= 32, "{format}");
    }
}

#[test]
fn test_invalidate_cache_resends_everything() {
    let g = DeviceModel::Xl.geometry();
    let mock = MockTransport::new();
    let mut session = fixed_session(mock, 10);
    let panel = keyed_panel(g, 3);

    session.set_panel_image(&panel, PixelFormat::Rgb).unwrap();
    session.invalidate_cache();
    let stats = session.set_panel_image(&panel, PixelFormat::Rgb).unwrap();
    assert_eq!(stats.sent, 32);
}

#[test]
fn test_serial_number_and_transport_handoff() {
    let mock = MockTransportBuilder::new().with_serial("CL42").build();
    let mut session = DeviceSession::with_transport(mock, DeviceModel::XlV2.geometry()).unwrap();
    assert_eq!(session.serial_number().unwrap(), "CL42");

    session.set_brightness(5).unwrap();
    let transport = session.into_transport();
    assert_eq!(transport.feature_reports().len(), 1);
}
