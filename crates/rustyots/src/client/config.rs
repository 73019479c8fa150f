//! Client configuration

/// Configuration of an [`OtsClient`](super::OtsClient)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtsClientConfig {
    /// Read requests parked per connection while the stack is busy
    pub read_queue_size: usize,
    /// Write requests parked per connection while the stack is busy
    pub write_queue_size: usize,
    /// Largest characteristic value the client writes
    pub write_request_data_size: usize,
}

impl Default for OtsClientConfig {
    fn default() -> Self {
        Self {
            read_queue_size: 4,
            write_queue_size: 4,
            write_request_data_size: 64,
        }
    }
}
