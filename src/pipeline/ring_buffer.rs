//! Per-source jitter-absorbing ring buffer.
//!
//! Each source owns one `AudioRingBuffer`. The network side appends
//! variable-rate PCM payloads; the mixer consumes fixed-size frames on the
//! frame cadence. Starvation and overflow are recorded as local state
//! transitions that the eligibility gate observes - neither is an error.

use tracing::warn;

/// Result of a write against the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Samples actually copied into the ring.
    pub samples_written: usize,
    /// True if the write would have crossed the read cursor: the ring was
    /// reset and the incoming audio dropped.
    pub overflowed: bool,
}

/// Bounded circular store of mono signed 16-bit PCM.
///
/// Capacity is `samples_per_frame * ring_frames` and fixed after
/// construction; [`resize`](Self::resize) reallocates and discards state.
/// Two cursors chase each other modulo capacity: `end_of_last_write` (where
/// the next write lands) and `next_output` (the next sample the mixer will
/// consume).
///
/// In `random_access` mode the buffer acts as a zero-padded, self-clearing
/// window: reads always return as many samples as requested once anything
/// has been written, and zero out the positions they visit.
#[derive(Debug)]
pub struct AudioRingBuffer {
    buffer: Vec<i16>,
    samples_per_frame: usize,
    ring_frames: usize,
    next_output: usize,
    end_of_last_write: usize,
    ever_written: bool,
    starved: bool,
    started: bool,
    random_access: bool,
}

impl AudioRingBuffer {
    /// Creates a ring holding `ring_frames` frames of `samples_per_frame`
    /// samples each.
    pub fn new(samples_per_frame: usize, ring_frames: usize, random_access: bool) -> Self {
        Self {
            buffer: vec![0; samples_per_frame * ring_frames],
            samples_per_frame,
            ring_frames,
            next_output: 0,
            end_of_last_write: 0,
            ever_written: false,
            starved: true,
            started: false,
            random_access,
        }
    }

    /// Total capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The frame size this ring was built for.
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /// Number of readable samples: distance from the read cursor to the
    /// write cursor, modulo capacity.
    pub fn available(&self) -> usize {
        (self.end_of_last_write + self.capacity() - self.next_output) % self.capacity()
    }

    /// True once any write (including silence) has landed.
    pub fn has_been_written(&self) -> bool {
        self.ever_written
    }

    /// True when the writer has not yet produced a usable lead over the
    /// reader. Set at construction, on [`reset`](Self::reset), and on
    /// overflow.
    pub fn is_starved(&self) -> bool {
        self.starved
    }

    /// True once the mixer has begun consuming this buffer.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Marks whether the mixer is consuming this buffer. The eligibility
    /// gate sets this when a source becomes eligible and clears it on
    /// starvation.
    pub fn set_started(&mut self, started: bool) {
        self.started = started;
    }

    /// True when not starved, or when at least `min_samples` are buffered.
    pub fn is_ready(&self, min_samples: usize) -> bool {
        if !self.starved {
            true
        } else {
            self.available() >= min_samples
        }
    }

    /// Appends samples, wrapping at the end. At most `capacity` samples are
    /// copied.
    ///
    /// If the write would cross `next_output` while the buffer is started,
    /// the ring is reset instead: both cursors return to the origin,
    /// `starved` is set, and the incoming audio is dropped.
    pub fn write_samples(&mut self, samples: &[i16]) -> WriteOutcome {
        let num_samples = samples.len().min(self.capacity());

        if self.started && num_samples >= self.free_space() {
            warn!(
                buffered = self.available(),
                incoming = num_samples,
                "ring buffer overflow, resetting"
            );
            self.reset();
            return WriteOutcome {
                samples_written: 0,
                overflowed: true,
            };
        }

        let capacity = self.capacity();
        let write_at = self.end_of_last_write;
        let until_end = capacity - write_at;
        if num_samples <= until_end {
            self.buffer[write_at..write_at + num_samples].copy_from_slice(&samples[..num_samples]);
        } else {
            self.buffer[write_at..].copy_from_slice(&samples[..until_end]);
            self.buffer[..num_samples - until_end]
                .copy_from_slice(&samples[until_end..num_samples]);
        }

        self.end_of_last_write = self.shifted_position(self.end_of_last_write, num_samples as i64);
        self.ever_written = true;

        WriteOutcome {
            samples_written: num_samples,
            overflowed: false,
        }
    }

    /// Appends little-endian i16 bytes. A trailing odd byte is dropped by
    /// byte-to-sample truncation.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> WriteOutcome {
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        self.write_samples(&samples)
    }

    /// Reads up to `dst.len()` samples into `dst`, advancing the read
    /// cursor. Returns the number of samples read.
    ///
    /// In normal mode this is `min(dst.len(), available)`. In random-access
    /// mode exactly `dst.len()` samples are returned once anything has been
    /// written (already-cleared positions yield zeros), and every position
    /// visited is zeroed after the copy.
    pub fn read_samples(&mut self, dst: &mut [i16]) -> usize {
        let num_samples = if self.random_access {
            if self.ever_written {
                dst.len().min(self.capacity())
            } else {
                0
            }
        } else {
            dst.len().min(self.available())
        };

        let capacity = self.capacity();
        let read_at = self.next_output;
        let until_end = capacity - read_at;
        if num_samples <= until_end {
            dst[..num_samples].copy_from_slice(&self.buffer[read_at..read_at + num_samples]);
            if self.random_access {
                self.buffer[read_at..read_at + num_samples].fill(0);
            }
        } else {
            dst[..until_end].copy_from_slice(&self.buffer[read_at..]);
            dst[until_end..num_samples].copy_from_slice(&self.buffer[..num_samples - until_end]);
            if self.random_access {
                self.buffer[read_at..].fill(0);
                self.buffer[..num_samples - until_end].fill(0);
            }
        }

        self.next_output = self.shifted_position(self.next_output, num_samples as i64);
        num_samples
    }

    /// Appends `n` zero samples, wrapping; advances the write cursor.
    /// Does not touch starvation state.
    pub fn add_silent(&mut self, n: usize) -> usize {
        let num_samples = n.min(self.capacity());

        let capacity = self.capacity();
        let write_at = self.end_of_last_write;
        let until_end = capacity - write_at;
        if num_samples <= until_end {
            self.buffer[write_at..write_at + num_samples].fill(0);
        } else {
            self.buffer[write_at..].fill(0);
            self.buffer[..num_samples - until_end].fill(0);
        }

        self.end_of_last_write = self.shifted_position(self.end_of_last_write, num_samples as i64);
        self.ever_written = true;
        num_samples
    }

    /// Returns both cursors to the origin and marks the buffer starved.
    /// `started` is untouched.
    pub fn reset(&mut self) {
        self.end_of_last_write = 0;
        self.next_output = 0;
        self.starved = true;
    }

    /// Reallocates for a new frame size, discarding all buffered audio.
    pub fn resize(&mut self, samples_per_frame: usize) {
        self.samples_per_frame = samples_per_frame;
        self.buffer = vec![0; samples_per_frame * self.ring_frames];
        self.next_output = 0;
        self.end_of_last_write = 0;
    }

    /// Advances the read cursor by `n` samples (negative wraps backward)
    /// without copying. Used after the mixer has consumed a frame through
    /// [`index`](Self::index).
    pub fn shift_read(&mut self, n: i64) {
        self.next_output = self.shifted_position(self.next_output, n);
    }

    /// Sample at offset `i` from the current read cursor, wrapping in both
    /// directions. Negative offsets reach the look-back window used for
    /// inter-aural delay.
    pub fn index(&self, i: i64) -> i16 {
        self.buffer[self.shifted_position(self.next_output, i)]
    }

    /// Free space before a write touches the read cursor.
    fn free_space(&self) -> usize {
        self.capacity() - self.available()
    }

    fn shifted_position(&self, position: usize, shift: i64) -> usize {
        let capacity = self.capacity() as i64;
        ((position as i64 + shift).rem_euclid(capacity)) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(samples_per_frame: usize, ring_frames: usize) -> AudioRingBuffer {
        AudioRingBuffer::new(samples_per_frame, ring_frames, false)
    }

    #[test]
    fn test_new_ring_is_empty_and_starved() {
        let buffer = ring(256, 10);
        assert_eq!(buffer.capacity(), 2560);
        assert_eq!(buffer.available(), 0);
        assert!(buffer.is_starved());
        assert!(!buffer.is_started());
        assert!(!buffer.has_been_written());
    }

    #[test]
    fn test_write_read_accounting() {
        let mut buffer = ring(8, 4);

        let outcome = buffer.write_samples(&[1, 2, 3, 4, 5]);
        assert_eq!(outcome.samples_written, 5);
        assert!(!outcome.overflowed);
        assert_eq!(buffer.available(), 5);

        let mut dst = [0i16; 3];
        assert_eq!(buffer.read_samples(&mut dst), 3);
        assert_eq!(dst, [1, 2, 3]);
        assert_eq!(buffer.available(), 2);

        buffer.write_samples(&[6, 7]);
        assert_eq!(buffer.available(), 4);

        let mut rest = [0i16; 8];
        assert_eq!(buffer.read_samples(&mut rest), 4);
        assert_eq!(&rest[..4], &[4, 5, 6, 7]);
        assert_eq!(buffer.available(), 0);
    }

    #[test]
    fn test_read_empty_returns_zero() {
        let mut buffer = ring(8, 4);
        let mut dst = [0i16; 4];
        assert_eq!(buffer.read_samples(&mut dst), 0);
    }

    #[test]
    fn test_copy_wraps_at_end() {
        let mut buffer = ring(4, 2);

        // Move both cursors near the end, then write across the boundary.
        buffer.write_samples(&[0; 6]);
        let mut skip = [0i16; 6];
        buffer.read_samples(&mut skip);

        buffer.write_samples(&[10, 11, 12, 13]);
        assert_eq!(buffer.available(), 4);

        let mut dst = [0i16; 4];
        assert_eq!(buffer.read_samples(&mut dst), 4);
        assert_eq!(dst, [10, 11, 12, 13]);
    }

    #[test]
    fn test_overflow_resets_and_drops() {
        // Capacity 512, as in a two-frame ring at 256 samples per frame.
        let mut buffer = ring(256, 2);
        buffer.set_started(true);

        let outcome = buffer.write_samples(&vec![1i16; 600]);
        assert!(outcome.overflowed);
        assert_eq!(outcome.samples_written, 0);
        assert_eq!(buffer.available(), 0);
        assert!(buffer.is_starved());
        assert_eq!(buffer.next_output, 0);
        assert_eq!(buffer.end_of_last_write, 0);
    }

    #[test]
    fn test_overflow_when_write_reaches_read_cursor() {
        let mut buffer = ring(4, 2);
        buffer.write_samples(&[1, 2, 3, 4, 5, 6]);
        buffer.set_started(true);

        // 2 free samples; writing 2 lands exactly on the read cursor.
        let outcome = buffer.write_samples(&[7, 8]);
        assert!(outcome.overflowed);
        assert!(buffer.is_starved());
        assert_eq!(buffer.available(), 0);
    }

    #[test]
    fn test_no_overflow_check_before_start() {
        let mut buffer = ring(4, 2);
        buffer.write_samples(&[1, 2, 3, 4]);
        let outcome = buffer.write_samples(&[5, 6, 7, 8]);
        assert!(!outcome.overflowed);
        assert_eq!(outcome.samples_written, 4);
    }

    #[test]
    fn test_write_clamped_to_capacity() {
        let mut buffer = ring(4, 2);
        let outcome = buffer.write_samples(&vec![9i16; 20]);
        assert_eq!(outcome.samples_written, 8);
    }

    #[test]
    fn test_write_bytes_truncates_odd_tail() {
        let mut buffer = ring(8, 4);
        // Two little-endian samples plus a stray byte.
        let outcome = buffer.write_bytes(&[0x34, 0x12, 0x78, 0x56, 0xff]);
        assert_eq!(outcome.samples_written, 2);

        let mut dst = [0i16; 2];
        buffer.read_samples(&mut dst);
        assert_eq!(dst, [0x1234, 0x5678]);
    }

    #[test]
    fn test_random_access_round_trip_and_clearing() {
        let mut buffer = AudioRingBuffer::new(8, 4, true);

        buffer.write_samples(&[5, 6, 7, 8]);
        let mut dst = [0i16; 4];
        assert_eq!(buffer.read_samples(&mut dst), 4);
        assert_eq!(dst, [5, 6, 7, 8]);

        // Visited positions were cleared; re-reading the same region (after
        // wrapping the cursor back) yields zeros.
        buffer.shift_read(-4);
        let mut again = [9i16; 4];
        assert_eq!(buffer.read_samples(&mut again), 4);
        assert_eq!(again, [0, 0, 0, 0]);
    }

    #[test]
    fn test_random_access_reads_exactly_requested() {
        let mut buffer = AudioRingBuffer::new(8, 4, true);

        // Nothing written yet: nothing to read.
        let mut dst = [1i16; 8];
        assert_eq!(buffer.read_samples(&mut dst), 0);

        // One small write makes the whole window readable, zero-padded.
        buffer.write_samples(&[3, 4]);
        assert_eq!(buffer.read_samples(&mut dst), 8);
        assert_eq!(&dst[..2], &[3, 4]);
        assert!(dst[2..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_shift_composition() {
        let mut a = ring(8, 4);
        let mut b = ring(8, 4);

        for (n1, n2) in [(3i64, 5i64), (-7, 2), (30, -30), (-32, 32), (17, 20)] {
            a.shift_read(n1);
            a.shift_read(n2);
            b.shift_read(n1 + n2);
            assert_eq!(a.next_output, b.next_output, "shift {n1} then {n2}");
        }
    }

    #[test]
    fn test_negative_shift_wraps_backward() {
        let mut buffer = ring(4, 2);
        buffer.shift_read(-3);
        assert_eq!(buffer.next_output, 5);
    }

    #[test]
    fn test_index_looks_back_through_origin() {
        let mut buffer = ring(4, 2);
        buffer.write_samples(&[1, 2, 3, 4, 5, 6, 7, 8]);
        // Read cursor at origin: index -1 wraps to the last slot.
        assert_eq!(buffer.index(0), 1);
        assert_eq!(buffer.index(-1), 8);
        assert_eq!(buffer.index(-8), 1);
    }

    #[test]
    fn test_add_silent() {
        let mut buffer = ring(8, 4);
        buffer.write_samples(&[1, 2]);
        let starved_before = buffer.is_starved();

        assert_eq!(buffer.add_silent(3), 3);
        assert_eq!(buffer.available(), 5);
        assert_eq!(buffer.is_starved(), starved_before);

        let mut dst = [9i16; 5];
        buffer.read_samples(&mut dst);
        assert_eq!(dst, [1, 2, 0, 0, 0]);
    }

    #[test]
    fn test_add_silent_counts_as_written() {
        let mut buffer = ring(8, 4);
        assert!(!buffer.has_been_written());
        buffer.add_silent(4);
        assert!(buffer.has_been_written());
    }

    #[test]
    fn test_reset_keeps_started() {
        let mut buffer = ring(8, 4);
        buffer.write_samples(&[1, 2, 3]);
        buffer.set_started(true);

        buffer.reset();
        assert_eq!(buffer.available(), 0);
        assert!(buffer.is_starved());
        assert!(buffer.is_started());
    }

    #[test]
    fn test_resize_discards_state() {
        let mut buffer = ring(8, 4);
        buffer.write_samples(&[1, 2, 3, 4]);

        buffer.resize(16);
        assert_eq!(buffer.capacity(), 64);
        assert_eq!(buffer.available(), 0);
        assert_eq!(buffer.samples_per_frame(), 16);
    }

    #[test]
    fn test_is_ready() {
        let mut buffer = ring(8, 4);
        assert!(!buffer.is_ready(4));

        buffer.write_samples(&[1, 2, 3, 4]);
        assert!(buffer.is_ready(4));
        assert!(!buffer.is_ready(5));
    }
}
