//! Delimiter-bounded sub-stream decoding.

use smallvec::SmallVec;

use crate::error::Result;
use crate::source::ByteSource;

/// A decoder that bounds an embedded sub-stream at a marker sequence.
///
/// With `repeat_count == 0` the data up to, but not including, the first
/// marker occurrence is passed through; the marker itself is consumed from
/// the source. With `repeat_count == n > 0` the data including the first
/// `n` occurrences is passed, then end-of-data latches. An empty marker
/// bounds the stream to exactly `repeat_count` bytes. Source EOF before
/// the count is exhausted simply ends the sub-stream.
pub struct SubFileDecoder<S> {
    source: S,
    marker: SmallVec<[u8; 16]>,
    count: u32,
    matched: usize,
    queue: SmallVec<[u8; 16]>,
    queue_pos: usize,
    end_of_data: bool,
    pushback: Option<u8>,
}

impl<S: ByteSource> SubFileDecoder<S> {
    pub fn new(source: S, repeat_count: u32, marker: &[u8]) -> Self {
        Self {
            source,
            marker: SmallVec::from_slice(marker),
            count: repeat_count,
            matched: 0,
            queue: SmallVec::new(),
            queue_pos: 0,
            end_of_data: false,
            pushback: None,
        }
    }

    fn refill(&mut self) -> Result<()> {
        self.queue.clear();
        self.queue_pos = 0;

        if self.marker.is_empty() {
            if self.count == 0 {
                self.end_of_data = true;
                return Ok(());
            }

            match self.source.getchar()? {
                Some(b) => {
                    self.queue.push(b);
                    self.count -= 1;
                }
                None => self.end_of_data = true,
            }

            return Ok(());
        }

        loop {
            let Some(b) = self.source.getchar()? else {
                // A partial marker match at EOF is ordinary data.
                let matched = self.matched;
                self.queue.extend_from_slice(&self.marker.clone()[..matched]);
                self.matched = 0;
                self.end_of_data = true;
                return Ok(());
            };

            if b == self.marker[self.matched] {
                self.matched += 1;

                if self.matched == self.marker.len() {
                    self.matched = 0;

                    if self.count == 0 {
                        self.end_of_data = true;
                    } else {
                        let marker = self.marker.clone();
                        self.queue.extend_from_slice(&marker);
                        self.count -= 1;
                        if self.count == 0 {
                            self.end_of_data = true;
                        }
                    }

                    return Ok(());
                }
            } else {
                self.shift(b);
                return Ok(());
            }
        }
    }

    /// The matched prefix plus `next` failed to extend the marker. Emit the
    /// shortest prefix so that the remainder can still start a match.
    fn shift(&mut self, next: u8) {
        let mut partial: SmallVec<[u8; 16]> = SmallVec::from_slice(&self.marker[..self.matched]);
        partial.push(next);

        let mut keep = partial.len() - 1;
        while partial[partial.len() - keep..] != self.marker[..keep] {
            keep -= 1;
        }

        self.queue.extend_from_slice(&partial[..partial.len() - keep]);
        self.matched = keep;
    }
}

impl<S: ByteSource> ByteSource for SubFileDecoder<S> {
    fn getchar(&mut self) -> Result<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }

        loop {
            if self.queue_pos < self.queue.len() {
                let b = self.queue[self.queue_pos];
                self.queue_pos += 1;
                return Ok(Some(b));
            }

            if self.end_of_data {
                return Ok(None);
            }

            self.refill()?;
        }
    }

    fn ungetchar(&mut self, byte: u8) {
        debug_assert!(self.pushback.is_none());
        self.pushback = Some(byte);
    }
}
