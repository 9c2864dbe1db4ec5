use std::io::{self, Read};

use tracing::trace;

/// Growable holding area for compressed bytes the decoder has not consumed.
///
/// Valid bytes always live in `[0, cursor)`. Consuming shifts the remainder
/// to the front so the decoder sees a left-aligned window on every call.
/// The capacity only ever doubles.
#[derive(Debug)]
pub(crate) struct StagingBuffer {
    buf: Vec<u8>,
    cursor: usize,
}

impl StagingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_full(&self) -> bool {
        self.cursor == self.buf.len()
    }

    /// The window handed to the decoder.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.cursor]
    }

    /// Issues one read into the free tail.
    ///
    /// Returns `None` without touching the source when there is no free
    /// space, `Some(0)` when the source is exhausted.
    pub fn fill_from<R: Read>(&mut self, source: &mut R) -> io::Result<Option<usize>> {
        if self.is_full() {
            return Ok(None);
        }
        loop {
            match source.read(&mut self.buf[self.cursor..]) {
                Ok(n) => {
                    self.cursor += n;
                    return Ok(Some(n));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Drops the first `count` valid bytes and moves the rest to the front.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.cursor);
        self.buf.copy_within(count..self.cursor, 0);
        self.cursor -= count;
    }

    /// Doubles the capacity, keeping the valid bytes in place.
    pub fn grow(&mut self) {
        let capacity = self.buf.len() * 2;
        trace!(from = self.buf.len(), to = capacity, "growing staging buffer");
        self.buf.resize(capacity, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fill_consume_keeps_remainder_left_aligned() {
        let mut staging = StagingBuffer::with_capacity(8);
        let mut source = Cursor::new(b"abcdefghij".to_vec());

        assert_eq!(staging.fill_from(&mut source).unwrap(), Some(8));
        assert!(staging.is_full());
        assert_eq!(staging.fill_from(&mut source).unwrap(), None);

        staging.consume(3);
        assert_eq!(staging.filled(), b"defgh");
        assert_eq!(staging.fill_from(&mut source).unwrap(), Some(2));
        assert_eq!(staging.filled(), b"defghij");
        assert_eq!(staging.fill_from(&mut source).unwrap(), Some(0));
    }

    #[test]
    fn grow_doubles_and_preserves_bytes() {
        let mut staging = StagingBuffer::with_capacity(4);
        let mut source = Cursor::new(b"wxyz1234".to_vec());
        staging.fill_from(&mut source).unwrap();
        staging.grow();
        assert_eq!(staging.capacity(), 8);
        assert_eq!(staging.filled(), b"wxyz");
        staging.fill_from(&mut source).unwrap();
        assert_eq!(staging.filled(), b"wxyz1234");
    }

    #[test]
    fn zero_capacity_is_bumped() {
        let staging = StagingBuffer::with_capacity(0);
        assert_eq!(staging.capacity(), 1);
        assert_eq!(staging.len(), 0);
    }

    #[test]
    fn consume_everything() {
        let mut staging = StagingBuffer::with_capacity(4);
        staging.fill_from(&mut Cursor::new(vec![1, 2, 3])).unwrap();
        staging.consume(10);
        assert!(staging.filled().is_empty());
    }
}
