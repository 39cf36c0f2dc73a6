//! Mock transport for testing without hardware.
//!
//! Records every report written to it and supports scripted input
//! reports and failure injection.
//!
//! # Example
//!
//! ```rust,ignore
//! use scdk::device::mock::MockTransport;
//! use scdk::session::DeviceSession;
//!
//! let mock = MockTransport::new();
//! let probe = mock.clone();
//! let mut session = DeviceSession::with_transport(mock, DeviceModel::Xl.geometry())?;
//!
//! session.set_brightness(50)?;
//! assert_eq!(probe.feature_reports()[0][2], 50);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::trace;

use super::{Transport, TransportError, TransportResult};

#[derive(Debug, Default)]
struct MockState {
    writes: Vec<Vec<u8>>,
    feature_reports: Vec<Vec<u8>>,
    input_queue: VecDeque<Vec<u8>>,
    reads: usize,
    fail_after_writes: Option<usize>,
    write_limit: Option<usize>,
    injected: Option<TransportError>,
    connected: bool,
    serial: Option<String>,
}

/// Recording transport.
///
/// Clones share state, so a test can keep a probe while a session owns the
/// transport.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a connected mock with serial `MOCK-XL-001`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                connected: true,
                serial: Some("MOCK-XL-001".to_string()),
                ..MockState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    // === Failure injection ===

    /// Fail the next transport call with `message`.
    pub fn inject_error(&self, message: &str) {
        self.lock().injected = Some(TransportError::new(message));
    }

    /// Fail every write once `n` writes have succeeded.
    pub fn fail_after_writes(&self, n: usize) {
        self.lock().fail_after_writes = Some(n);
    }

    /// Accept at most `n` bytes of every later write.
    pub fn truncate_writes(&self, n: usize) {
        self.lock().write_limit = Some(n);
    }

    /// Set device as disconnected.
    pub fn disconnect(&self) {
        self.lock().connected = false;
    }

    /// Set device as connected and clear both write limits.
    pub fn reconnect(&self) {
        let mut state = self.lock();
        state.connected = true;
        state.fail_after_writes = None;
        state.write_limit = None;
    }

    // === Input simulation ===

    /// Queue a raw input report.
    pub fn queue_input(&self, report: Vec<u8>) {
        self.lock().input_queue.push_back(report);
    }

    /// Queue an input report with the given keys pressed.
    pub fn queue_pressed(&self, key_count: usize, pressed: &[u8]) {
        let mut report = vec![0u8; crate::report::INPUT_HEADER_LEN + key_count];
        report[0] = 0x01;
        for &key in pressed {
            report[crate::report::INPUT_HEADER_LEN + usize::from(key)] = 1;
        }
        self.queue_input(report);
    }

    // === Inspection ===

    /// All output reports written so far.
    #[must_use]
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// Number of output reports written so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// All feature reports sent so far.
    #[must_use]
    pub fn feature_reports(&self) -> Vec<Vec<u8>> {
        self.lock().feature_reports.clone()
    }

    /// Number of read calls made so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Forget recorded reports.
    pub fn clear_reports(&self) {
        let mut state = self.lock();
        state.writes.clear();
        state.feature_reports.clear();
    }

    fn check_error(state: &mut MockState) -> TransportResult<()> {
        if let Some(err) = state.injected.take() {
            return Err(err);
        }
        if !state.connected {
            return Err(TransportError::new("mock device disconnected"));
        }
        Ok(())
    }
}

impl Transport for MockTransport {
    fn write(&mut self, report: &[u8]) -> TransportResult<usize> {
        let mut state = self.lock();
        Self::check_error(&mut state)?;
        if state
            .fail_after_writes
            .is_some_and(|limit| state.writes.len() >= limit)
        {
            return Err(TransportError::new("mock failure after write limit"));
        }
        let written = state.write_limit.map_or(report.len(), |n| n.min(report.len()));
        trace!(len = report.len(), written, "Recording write");
        state.writes.push(report.to_vec());
        Ok(written)
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> TransportResult<usize> {
        let mut state = self.lock();
        state.reads += 1;
        Self::check_error(&mut state)?;
        let Some(report) = state.input_queue.pop_front() else {
            return Ok(0);
        };
        let len = report.len().min(buf.len());
        buf[..len].copy_from_slice(&report[..len]);
        Ok(len)
    }

    fn send_feature_report(&mut self, report: &[u8]) -> TransportResult<()> {
        let mut state = self.lock();
        Self::check_error(&mut state)?;
        state.feature_reports.push(report.to_vec());
        Ok(())
    }

    fn serial_number(&mut self) -> TransportResult<Option<String>> {
        let mut state = self.lock();
        Self::check_error(&mut state)?;
        Ok(state.serial.clone())
    }
}

/// Builder for creating a `MockTransport` with common configurations.
#[derive(Debug, Default)]
pub struct MockTransportBuilder {
    serial: Option<String>,
    fail_after_writes: Option<usize>,
    disconnected: bool,
}

impl MockTransportBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a custom serial number.
    #[must_use]
    pub fn with_serial(mut self, serial: &str) -> Self {
        self.serial = Some(serial.to_string());
        self
    }

    /// Fail writes after `n` successes.
    #[must_use]
    pub fn fail_after_writes(mut self, n: usize) -> Self {
        self.fail_after_writes = Some(n);
        self
    }

    /// Create the transport in disconnected state.
    #[must_use]
    pub fn disconnected(mut self) -> Self {
        self.disconnected = true;
        self
    }

    /// Build the mock transport.
    #[must_use]
    pub fn build(self) -> MockTransport {
        let mock = MockTransport::new();
        {
            let mut state = mock.lock();
            if self.serial.is_some() {
                state.serial = self.serial;
            }
            state.fail_after_writes = self.fail_after_writes;
            state.connected = !self.disconnected;
        }
        mock
    }
}
