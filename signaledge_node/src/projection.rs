//! Shared-memory projection: the live, unsynchronized view.
//!
//! This is the one access path that does not participate in the store
//! lock, at attach time or on any later access. It exists so
//! high-frequency pollers can watch the record without copy overhead. The
//! cost is stated plainly: there is no atomicity or ordering guarantee
//! against an in-progress tick or command, and none between concurrent
//! projection users. Torn reads and torn writes are accepted behavior on
//! this path, not a defect — which is why it is a separate type with its
//! own accessor names instead of another method on the synchronized
//! surface.

use crate::error::{NodeError, NodeResult};
use crate::state::{DeviceState, NodeContext};
use memmap2::{MmapMut, MmapOptions};
use signaledge::consts::PAGE_SIZE;
use std::fs::OpenOptions;
use tracing::debug;

/// Live mapping of the device record's backing page.
#[derive(Debug)]
pub struct StateProjection {
    mmap: MmapMut,
    len: usize,
}

impl StateProjection {
    /// Map the backing memory into this caller's view.
    ///
    /// Mapping is page-granular: the whole backing page is mapped and the
    /// requested length selects the visible prefix. A request larger than
    /// one page is rejected with `InvalidArgument`; a missing backing
    /// allocation (startup not finished, or torn down) is
    /// `ResourceUnavailable`. The store lock is not consulted.
    pub fn attach(ctx: &NodeContext, len: usize) -> NodeResult<Self> {
        if len == 0 || len > PAGE_SIZE {
            return Err(NodeError::InvalidArgument {
                what: format!("mapping length {len} outside (0, {PAGE_SIZE}]"),
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(ctx.backing_path())
            .map_err(|_| NodeError::ResourceUnavailable {
                name: ctx.name().to_string(),
            })?;

        let mmap = unsafe { MmapOptions::new().len(PAGE_SIZE).map_mut(&file)? };

        debug!(segment = ctx.name(), len, "projection attached");
        Ok(Self { mmap, len })
    }

    /// Requested view length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the requested view is empty (never, by construction).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The live bytes of the view. Concurrent updates show through with
    /// no consistency guarantee.
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..self.len]
    }

    /// The live bytes, writable. Writes land in the backing page without
    /// the lock and race with the update engine.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mmap[..self.len]
    }

    /// Volatile copy of the whole record, taken without the lock.
    ///
    /// The copy may interleave with an in-progress update: fields can be
    /// mutually inconsistent (e.g. an alert flag from one tick next to a
    /// temperature from the next). Callers wanting a consistent record
    /// must use the control surface instead.
    pub fn snapshot_racy(&self) -> DeviceState {
        // Every field of the record tolerates arbitrary bytes, so a torn
        // copy is still a valid value.
        unsafe { std::ptr::read_volatile(self.mmap.as_ptr() as *const DeviceState) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::STATE_SIZE;
    use signaledge::config::NodeConfig;

    fn make_ctx(segment: &str) -> NodeContext {
        let mut config = NodeConfig::default();
        config.segment = format!("{segment}_{}", std::process::id());
        NodeContext::create(&config).unwrap()
    }

    #[test]
    fn oversized_mapping_is_rejected() {
        let ctx = make_ctx("proj_oversize");
        let err = StateProjection::attach(&ctx, PAGE_SIZE + 1).unwrap_err();
        assert!(matches!(err, NodeError::InvalidArgument { .. }));

        let err = StateProjection::attach(&ctx, 0).unwrap_err();
        assert!(matches!(err, NodeError::InvalidArgument { .. }));
    }

    #[test]
    fn full_page_mapping_succeeds() {
        let ctx = make_ctx("proj_page");
        let proj = StateProjection::attach(&ctx, PAGE_SIZE).unwrap();
        assert_eq!(proj.len(), PAGE_SIZE);
        assert_eq!(proj.snapshot_racy().temperature, 25);
    }

    #[test]
    fn missing_backing_is_resource_unavailable() {
        let ctx = make_ctx("proj_gone");
        // Simulate an external cleaner removing the segment.
        std::fs::remove_file(ctx.backing_path()).unwrap();

        let err = StateProjection::attach(&ctx, PAGE_SIZE).unwrap_err();
        assert!(matches!(err, NodeError::ResourceUnavailable { .. }));
    }

    #[test]
    fn projection_writes_land_in_the_store() {
        // Accepted hazard of this path: a projection user can scribble on
        // the live record with no lock. Verify the aliasing is real.
        let ctx = make_ctx("proj_scribble");
        let mut proj = StateProjection::attach(&ctx, PAGE_SIZE).unwrap();

        proj.as_bytes_mut()[0..4].copy_from_slice(&99i32.to_le_bytes());

        ctx.with_state(|state, _| assert_eq!(state.temperature, 99));
    }

    #[test]
    fn lock_mediated_writes_show_through_the_projection() {
        let ctx = make_ctx("proj_live");
        let proj = StateProjection::attach(&ctx, STATE_SIZE).unwrap();

        ctx.execute(crate::control::ControlRequest::SetThreshold(77))
            .unwrap();

        assert_eq!(proj.snapshot_racy().threshold, 77);
    }
}
