//! Bulk read: raw, length-bounded copy-out of the device record.

use crate::error::{NodeError, NodeResult};
use crate::state::{NodeContext, STATE_SIZE};

impl NodeContext {
    /// Copy out up to `requested` bytes of the record, capped by the
    /// configured exposed size and the record size. Returns the number of
    /// bytes produced.
    ///
    /// The snapshot is taken under the store lock, serialized against
    /// ticks and commands; the store is never mutated by a read. A
    /// destination smaller than the computed length is a `CopyFault` and
    /// copies nothing.
    pub fn bulk_read(&self, buf: &mut [u8], requested: usize) -> NodeResult<usize> {
        let inner = self.lock();

        let cap = inner.runtime.exposed_size as usize;
        let len = requested.min(cap).min(STATE_SIZE);

        if buf.len() < len {
            return Err(NodeError::CopyFault {
                needed: len,
                provided: buf.len(),
            });
        }

        buf[..len].copy_from_slice(&inner.backing.record_bytes()[..len]);
        Ok(len)
    }
}
