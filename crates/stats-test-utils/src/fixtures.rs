//! Stream statistics fixtures.

use stats_reporter::snapshot::{StreamKey, StreamStats};

/// Builder for [`StreamStats`] with plain defaults (1000 bytes, 10
/// packets, no loss, no jitter, no RTT).
#[derive(Debug, Clone)]
pub struct TestStream {
    stats: StreamStats,
}

impl TestStream {
    pub fn new(stream_id: impl Into<StreamKey>) -> Self {
        Self {
            stats: StreamStats {
                stream_id: stream_id.into(),
                bytes: 1000,
                packets: 10,
                packets_lost: 0,
                fractional_loss: 0.0,
                jitter_ms: None,
                rtt_ms: None,
            },
        }
    }

    pub fn bytes(mut self, bytes: u64) -> Self {
        self.stats.bytes = bytes;
        self
    }

    pub fn packets(mut self, packets: u64) -> Self {
        self.stats.packets = packets;
        self
    }

    pub fn packets_lost(mut self, lost: u64) -> Self {
        self.stats.packets_lost = lost;
        self
    }

    pub fn fractional_loss(mut self, loss: f64) -> Self {
        self.stats.fractional_loss = loss;
        self
    }

    pub fn jitter_ms(mut self, jitter: f64) -> Self {
        self.stats.jitter_ms = Some(jitter);
        self
    }

    pub fn rtt_ms(mut self, rtt: i32) -> Self {
        self.stats.rtt_ms = Some(rtt);
        self
    }

    pub fn build(self) -> StreamStats {
        self.stats
    }
}

/// Receive stream of the reference `ep1` scenario: stream 111, 1000 bytes,
/// 10 packets, 1 lost, 0.1 loss, 5 ms jitter, 40 ms RTT.
pub fn reference_receive_stream() -> StreamStats {
    TestStream::new(111_u64)
        .bytes(1000)
        .packets(10)
        .packets_lost(1)
        .fractional_loss(0.1)
        .jitter_ms(5.0)
        .rtt_ms(40)
        .build()
}
