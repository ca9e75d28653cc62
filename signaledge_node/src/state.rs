//! Canonical device state and its shared-memory backing.
//!
//! The device record is a plain-old-data struct living at offset 0 of a
//! one-page mapping under `/dev/shm`. All lock-mediated paths (engine tick,
//! control surface, bulk read) go through [`NodeContext`], which guards the
//! record and the runtime tunables with a single mutex. The projection path
//! (`projection` module) attaches to the same backing file without the lock;
//! that is why every field of [`DeviceState`] is valid for any bit pattern —
//! a foreign writer may scribble on the page at any time.

use crate::error::{NodeError, NodeResult};
use crate::ring::HistoryRing;
use memmap2::MmapMut;
use nix::unistd::getpid;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use signaledge::config::NodeConfig;
use signaledge::consts::{PAGE_SIZE, SHM_PREFIX};
use static_assertions::const_assert;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// The canonical mutable device record.
///
/// Layout is fixed (`repr(C)`, 4-byte fields) because the raw bytes are
/// what bulk read copies out and what the projection maps. The alert flag
/// is an `i32` holding 0/1 rather than a `bool`: the record must tolerate
/// arbitrary bytes written through the projection.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DeviceState {
    /// Current simulated reading [°C], floored at `TEMP_FLOOR`.
    pub temperature: i32,
    /// Actuator setting, [0, 5].
    pub fan_speed: i32,
    /// Alert trigger point [°C].
    pub threshold: i32,
    /// 0/1; derived `temperature > threshold`, recomputed on tick.
    pub alert: i32,
    /// Most-recent temperature samples, oldest overwritten first.
    pub history: HistoryRing,
}

/// Size of the raw device record in bytes.
pub const STATE_SIZE: usize = std::mem::size_of::<DeviceState>();

const_assert!(STATE_SIZE <= PAGE_SIZE);
const_assert!(std::mem::align_of::<DeviceState>() == 4);

impl DeviceState {
    /// Fresh record with a derived alert flag and an empty history ring.
    pub fn new(temperature: i32, fan_speed: i32, threshold: i32) -> Self {
        Self {
            temperature,
            fan_speed,
            threshold,
            alert: (temperature > threshold) as i32,
            history: HistoryRing::new(),
        }
    }

    /// Alert flag as a boolean.
    pub fn alert_active(&self) -> bool {
        self.alert != 0
    }
}

/// Runtime tunables guarded by the same lock as the record, but not part
/// of the mapped page.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stored only; no behavioral effect.
    pub control_baud: i32,
    /// Stored only; no behavioral effect.
    pub link_mode: i32,
    /// Caps how many record bytes bulk read will release.
    /// Invariant: `0 < exposed_size <= STATE_SIZE`.
    pub exposed_size: i32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            control_baud: 0,
            link_mode: 0,
            exposed_size: STATE_SIZE as i32,
        }
    }
}

/// JSON sidecar describing a live backing segment, for discovery by
/// external pollers.
#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentMeta {
    /// Segment name
    pub name: String,
    /// PID of the owning node process
    pub writer_pid: u32,
    /// Mapped size in bytes
    pub size: usize,
    /// Creation time
    pub created_at: SystemTime,
}

/// One-page `/dev/shm` mapping holding the device record.
///
/// Created once at startup, removed once at teardown. Unsafe pointer casts
/// are confined to the accessors below.
pub struct StateBacking {
    name: String,
    path: PathBuf,
    meta_path: PathBuf,
    mmap: MmapMut,
}

impl StateBacking {
    /// Create the backing file, map it, and write the initial record.
    ///
    /// Fails with `AlreadyExists` if a segment of the same name is already
    /// live for this process name.
    pub fn create(name: &str, initial: DeviceState) -> NodeResult<Self> {
        let pid = getpid().as_raw() as u32;
        let path = PathBuf::from(format!("/dev/shm/{SHM_PREFIX}_{name}_{pid}"));
        let meta_path = PathBuf::from(format!("/dev/shm/{SHM_PREFIX}_{name}.meta"));

        if path.exists() {
            return Err(NodeError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .mode(0o600) // Owner read/write only
            .open(&path)?;
        file.set_len(PAGE_SIZE as u64)?;

        let mut mmap = unsafe { MmapMut::map_mut(&file)? };

        // The page arrives zero-filled; place the initial record at offset 0.
        unsafe {
            std::ptr::write(mmap.as_mut_ptr() as *mut DeviceState, initial);
        }

        Self::write_meta(&meta_path, name, pid)?;

        info!(segment = name, ?path, "backing segment created");

        Ok(Self {
            name: name.to_string(),
            path,
            meta_path,
            mmap,
        })
    }

    fn write_meta(meta_path: &Path, name: &str, pid: u32) -> NodeResult<()> {
        let meta = SegmentMeta {
            name: name.to_string(),
            writer_pid: pid,
            size: PAGE_SIZE,
            created_at: SystemTime::now(),
        };
        let json = serde_json::to_string_pretty(&meta).map_err(|e| NodeError::Io {
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .mode(0o600)
            .open(meta_path)?;
        std::io::Write::write_all(&mut file, json.as_bytes())?;
        Ok(())
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the mapped backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The device record.
    pub fn state(&self) -> &DeviceState {
        unsafe { &*(self.mmap.as_ptr() as *const DeviceState) }
    }

    /// The device record, mutable.
    pub fn state_mut(&mut self) -> &mut DeviceState {
        unsafe { &mut *(self.mmap.as_mut_ptr() as *mut DeviceState) }
    }

    /// Raw bytes of the record (not the whole page).
    pub fn record_bytes(&self) -> &[u8] {
        &self.mmap[..STATE_SIZE]
    }
}

impl Drop for StateBacking {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        let _ = std::fs::remove_file(&self.meta_path);
        debug!(segment = %self.name, "backing segment removed");
    }
}

pub(crate) struct NodeInner {
    pub(crate) backing: StateBacking,
    pub(crate) runtime: RuntimeConfig,
}

/// Shared context owning the device record and runtime tunables.
///
/// All lock-mediated operations acquire the single mutex exactly once and
/// run to completion; critical sections are O(1) and bounded. The backing
/// path is kept outside the lock so projections can attach without it.
pub struct NodeContext {
    name: String,
    backing_path: PathBuf,
    inner: Mutex<NodeInner>,
}

impl NodeContext {
    /// Build the context from a validated configuration.
    pub fn create(config: &NodeConfig) -> NodeResult<Self> {
        let initial = DeviceState::new(
            config.initial_temperature,
            config.initial_fan_speed,
            config.initial_threshold,
        );
        let backing = StateBacking::create(&config.segment, initial)?;
        let backing_path = backing.path().to_path_buf();

        Ok(Self {
            name: config.segment.clone(),
            backing_path,
            inner: Mutex::new(NodeInner {
                backing,
                runtime: RuntimeConfig::default(),
            }),
        })
    }

    /// Segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing file, readable without the lock.
    pub(crate) fn backing_path(&self) -> &Path {
        &self.backing_path
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, NodeInner> {
        self.inner.lock()
    }

    /// Run `f` with exclusive access to the record and tunables.
    ///
    /// Test and embedding hook; production paths use the named operations
    /// in `control`, `read`, and `engine`.
    pub fn with_state<R>(&self, f: impl FnOnce(&DeviceState, &RuntimeConfig) -> R) -> R {
        let inner = self.lock();
        f(inner.backing.state(), &inner.runtime)
    }
}
