//! Mutable in-memory stats source.

use stats_reporter::snapshot::{StatsSource, StreamStats};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Stats source whose maps a test can change between cycles.
///
/// Counts how often it was read, so tests can assert that a gated cycle
/// never touched the source.
#[derive(Debug, Default)]
pub struct MockStatsSource {
    receive: Mutex<HashMap<String, Vec<StreamStats>>>,
    send: Mutex<HashMap<String, Vec<StreamStats>>>,
    reads: AtomicUsize,
}

impl MockStatsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_receive(&self, endpoint_id: &str, streams: Vec<StreamStats>) {
        self.receive
            .lock()
            .unwrap()
            .insert(endpoint_id.to_string(), streams);
    }

    pub fn set_send(&self, endpoint_id: &str, streams: Vec<StreamStats>) {
        self.send
            .lock()
            .unwrap()
            .insert(endpoint_id.to_string(), streams);
    }

    pub fn remove_endpoint(&self, endpoint_id: &str) {
        self.receive.lock().unwrap().remove(endpoint_id);
        self.send.lock().unwrap().remove(endpoint_id);
    }

    pub fn clear(&self) {
        self.receive.lock().unwrap().clear();
        self.send.lock().unwrap().clear();
    }

    /// Number of map reads (receive and send counted separately).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl StatsSource for MockStatsSource {
    fn receive_stats_by_endpoint(&self) -> HashMap<String, Vec<StreamStats>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.receive.lock().unwrap().clone()
    }

    fn send_stats_by_endpoint(&self) -> HashMap<String, Vec<StreamStats>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.send.lock().unwrap().clone()
    }
}
