#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub send_failures: u64,
    pub reconnects: u64,
}

impl NetworkStats {
    pub fn record_sent(&mut self, bytes: usize) {
        self.packets_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    pub fn record_received(&mut self, bytes: usize) {
        self.packets_received += 1;
        self.bytes_received += bytes as u64;
    }

    /// Share of received datagrams that failed to decode or matched no session.
    pub fn drop_percent(&self) -> f32 {
        if self.packets_received == 0 {
            return 0.0;
        }
        self.packets_dropped as f32 * 100.0 / self.packets_received as f32
    }
}
