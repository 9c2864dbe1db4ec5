/// Pending PCM bytes for one channel.
///
/// Bytes in `[read, data.len())` have been decoded but not read yet. New
/// bytes are appended after compacting that window to the front, so the
/// buffer only holds what the consumer has not caught up with.
#[derive(Debug, Default)]
pub struct ChannelBuffer {
    data: Vec<u8>,
    read: usize,
}

impl ChannelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes waiting to be read.
    pub fn pending(&self) -> usize {
        self.data.len() - self.read
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Appends freshly converted bytes behind the unread ones.
    pub fn push(&mut self, bytes: &[u8]) {
        if self.read > 0 {
            self.data.copy_within(self.read.., 0);
            self.data.truncate(self.data.len() - self.read);
            self.read = 0;
        }
        self.data.extend_from_slice(bytes);
    }

    /// Copies as many pending bytes as fit into `out`.
    pub fn read_into(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.pending());
        out[..n].copy_from_slice(&self.data[self.read..self.read + n]);
        self.read += n;
        n
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.read)?;
        self.read += 1;
        Some(byte)
    }
}
