//! Blocking ring buffer for concurrent sample generation and playback.
//!
//! Unlike a lock-free ring buffer, this one blocks the caller (with an
//! optional timeout) when the buffer is full (write) or empty (read),
//! using a mutex and two condition variables. This matches the reference
//! implementation's behavior and keeps producer/consumer throughput in
//! lockstep rather than dropping or duplicating samples silently.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

struct Inner {
    buffer: Vec<f32>,
    capacity: usize,
    write_pos: usize,
    read_pos: usize,
    available: usize,
    underruns: u64,
    overruns: u64,
    total_written: u64,
    total_read: u64,
}

/// Snapshot of ring buffer statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct RingBufferStats {
    /// Number of reads that returned fewer samples than requested because
    /// the buffer ran dry.
    pub underruns: u64,
    /// Number of writes that wrote fewer samples than given because the
    /// buffer was full.
    pub overruns: u64,
    /// Total samples written over the buffer's lifetime.
    pub total_written: u64,
    /// Total samples read over the buffer's lifetime.
    pub total_read: u64,
}

/// A single-producer, single-consumer blocking ring buffer of `f32` samples.
pub struct RingBuffer {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl RingBuffer {
    /// Creates a ring buffer holding up to `capacity` samples.
    ///
    /// # Errors
    /// Returns [`crate::Ay8910Error::InvalidValue`] if `capacity` is zero.
    pub fn new(capacity: usize) -> crate::Result<Self> {
        if capacity == 0 {
            return Err(crate::Ay8910Error::InvalidValue {
                message: "ring buffer capacity must be nonzero".into(),
            });
        }
        Ok(Self {
            inner: Mutex::new(Inner {
                buffer: vec![0.0; capacity],
                capacity,
                write_pos: 0,
                read_pos: 0,
                available: 0,
                underruns: 0,
                overruns: 0,
                total_written: 0,
                total_read: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        })
    }

    /// Returns the buffer's fixed capacity.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// Returns the number of samples currently available to read.
    pub fn available_read(&self) -> usize {
        self.inner.lock().available
    }

    /// Returns the number of samples that can be written without blocking.
    pub fn available_write(&self) -> usize {
        let inner = self.inner.lock();
        inner.capacity - inner.available
    }

    /// Discards all buffered samples without resetting lifetime statistics.
    /// Wakes any writer blocked on not-full.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.available = 0;
        inner.read_pos = 0;
        inner.write_pos = 0;
        self.not_full.notify_all();
    }

    /// Returns a snapshot of the buffer's lifetime statistics.
    pub fn stats(&self) -> RingBufferStats {
        let inner = self.inner.lock();
        RingBufferStats {
            underruns: inner.underruns,
            overruns: inner.overruns,
            total_written: inner.total_written,
            total_read: inner.total_read,
        }
    }

    /// Writes as many of `samples` as fit, blocking until space is
    /// available (or `timeout` elapses). Returns the number of samples
    /// actually written; a short write counts as an overrun.
    ///
    /// Pass `timeout: None` to block indefinitely.
    pub fn write(&self, samples: &[f32], timeout: Option<Duration>) -> usize {
        if samples.is_empty() {
            return 0;
        }
        let mut inner = self.inner.lock();
        while inner.available >= inner.capacity {
            let timed_out = match timeout {
                Some(duration) => self.not_full.wait_for(&mut inner, duration).timed_out(),
                None => {
                    self.not_full.wait(&mut inner);
                    false
                }
            };
            if timed_out {
                return 0;
            }
        }

        let free_space = inner.capacity - inner.available;
        let write_count = samples.len().min(free_space);
        if write_count == 0 {
            return 0;
        }

        let capacity = inner.capacity;
        let start = inner.write_pos;
        let end = start + write_count;
        if end <= capacity {
            inner.buffer[start..end].copy_from_slice(&samples[..write_count]);
        } else {
            let first_part = capacity - start;
            inner.buffer[start..].copy_from_slice(&samples[..first_part]);
            inner.buffer[..write_count - first_part]
                .copy_from_slice(&samples[first_part..write_count]);
        }
        inner.write_pos = end % capacity;
        inner.available += write_count;
        inner.total_written += write_count as u64;
        if write_count < samples.len() {
            inner.overruns += 1;
        }

        self.not_empty.notify_one();
        write_count
    }

    /// Reads up to `output.len()` samples into `output`, blocking until at
    /// least one sample is available (or `timeout` elapses). Returns the
    /// number of samples actually read; a short read counts as an
    /// underrun.
    ///
    /// Pass `timeout: None` to block indefinitely.
    pub fn read(&self, output: &mut [f32], timeout: Option<Duration>) -> usize {
        if output.is_empty() {
            return 0;
        }
        let mut inner = self.inner.lock();
        while inner.available == 0 {
            let timed_out = match timeout {
                Some(duration) => self.not_empty.wait_for(&mut inner, duration).timed_out(),
                None => {
                    self.not_empty.wait(&mut inner);
                    false
                }
            };
            if timed_out {
                return 0;
            }
        }

        let read_count = output.len().min(inner.available);
        if read_count == 0 {
            return 0;
        }

        let capacity = inner.capacity;
        let start = inner.read_pos;
        let end = start + read_count;
        if end <= capacity {
            output[..read_count].copy_from_slice(&inner.buffer[start..end]);
        } else {
            let first_part = capacity - start;
            output[..first_part].copy_from_slice(&inner.buffer[start..]);
            output[first_part..read_count].copy_from_slice(&inner.buffer[..read_count - first_part]);
        }
        inner.read_pos = end % capacity;
        inner.available -= read_count;
        inner.total_read += read_count as u64;
        if read_count < output.len() {
            inner.underruns += 1;
        }

        self.not_full.notify_one();
        read_count
    }
}
