#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

//! The one piece of state shared by the ramp controller and the monitor.
//!
//! A single `parking_lot::Mutex` guards both the cells and the byte size.
//! Readers and the writer hold it for their whole pass over the buffer; no
//! slice of the cells ever outlives the guard it was borrowed from.

use anyhow::{Context, Result as AnyResult};
use parking_lot::{Mutex, MutexGuard};

use crate::domain::{CELL_SIZE, SENTINEL};

#[derive(Debug, Default)]
pub struct CellBuffer {
    cells: Vec<f32>,
    size_bytes: u64,
}

/// Result of one resize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resize {
    pub previous_bytes: u64,
    pub size_bytes: u64,
    pub initialized_cells: usize,
}

impl CellBuffer {
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Bytes covered by written cells; never above `size_bytes`.
    pub fn initialized_bytes(&self) -> u64 {
        self.cells.len() as u64 * CELL_SIZE
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.size_bytes == 0
    }

    /// Grows or shrinks to `size_bytes`, writing [`SENTINEL`] into every
    /// newly exposed cell. On allocation failure the buffer is unchanged.
    pub fn resize(&mut self, size_bytes: u64) -> AnyResult<Resize> {
        let previous_bytes = self.size_bytes;
        let want = usize::try_from(size_bytes / CELL_SIZE)
            .with_context(|| format!("{size_bytes} bytes exceed the address space"))?;
        let have = self.cells.len();
        let mut initialized_cells = 0;
        if want > have {
            self.cells
                .try_reserve_exact(want - have)
                .with_context(|| format!("allocate {size_bytes} bytes"))?;
            self.cells.resize(want, SENTINEL);
            initialized_cells = want - have;
        } else if want < have {
            self.cells.truncate(want);
            self.cells.shrink_to_fit();
        }
        self.size_bytes = size_bytes;
        Ok(Resize {
            previous_bytes,
            size_bytes,
            initialized_cells,
        })
    }
}

/// Read-only view handed to observers while the lock is held.
#[derive(Clone, Copy, Debug)]
pub struct BufferView<'a> {
    pub cells: &'a [f32],
    pub size_bytes: u64,
}

#[derive(Debug, Default)]
pub struct SharedBuffer {
    inner: Mutex<CellBuffer>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access for the writer. Keep the guard for the full
    /// resize-and-initialize step.
    pub fn lock(&self) -> MutexGuard<'_, CellBuffer> {
        self.inner.lock()
    }

    /// Runs `f` over a view of the buffer with the lock held throughout.
    pub fn with_view<R>(&self, f: impl FnOnce(BufferView<'_>) -> R) -> R {
        let guard = self.inner.lock();
        f(BufferView {
            cells: guard.cells(),
            size_bytes: guard.size_bytes(),
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.inner.lock().size_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_fills_sentinel() {
        let mut buf = CellBuffer::default();
        let r = buf.resize(64).expect("resize");
        assert_eq!(r.previous_bytes, 0);
        assert_eq!(r.initialized_cells, 16);
        assert!(buf.cells().iter().all(|&c| c == SENTINEL));
        assert_eq!(buf.initialized_bytes(), 64);
    }

    #[test]
    fn unaligned_size_keeps_tail_unread() {
        let mut buf = CellBuffer::default();
        buf.resize(10).expect("resize");
        assert_eq!(buf.size_bytes(), 10);
        assert_eq!(buf.cells().len(), 2);
        assert!(buf.initialized_bytes() <= buf.size_bytes());
    }

    #[test]
    fn shrink_then_regrow_reinitializes() {
        let mut buf = CellBuffer::default();
        buf.resize(400).expect("grow");
        buf.resize(40).expect("shrink");
        assert_eq!(buf.cells().len(), 10);
        let r = buf.resize(80).expect("regrow");
        assert_eq!(r.initialized_cells, 10);
        assert!(buf.cells().iter().all(|&c| c == SENTINEL));
    }

    #[test]
    fn failed_grow_leaves_buffer_untouched() {
        let mut buf = CellBuffer::default();
        buf.resize(4096).expect("grow");
        assert!(buf.resize(u64::MAX - 3).is_err());
        assert_eq!(buf.size_bytes(), 4096);
        assert_eq!(buf.cells().len(), 1024);
        assert!(buf.cells().iter().all(|&c| c == SENTINEL));
    }

    #[test]
    fn shrink_to_zero_is_empty() {
        let mut buf = CellBuffer::default();
        buf.resize(4096).expect("grow");
        buf.resize(0).expect("shrink");
        assert!(buf.is_empty());
        assert!(buf.cells().is_empty());
    }
}
