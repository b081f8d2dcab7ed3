//! The fd record table: `FdState` storage, the UpdateList, the SpecList,
//! and the §4.1/§4.2 primitive operations that manipulate them. This crate
//! owns the table directly rather than consulting a separate fd allocator.

use std::os::unix::io::RawFd;

use crate::direction::Direction;
use crate::fd_state::{self, FdState};
use crate::selector::Selector;
use crate::IoCallback;

/// One fd's bookkeeping. `callback.is_some()` stands in for the distilled
/// spec's `owner` presence test, since this crate has no separate fd
/// allocator to consult.
pub(crate) struct FdRecord {
    pub(crate) state: FdState,
    pub(crate) updated: bool,
    pub(crate) new: bool,
    pub(crate) ev: u8,
    pub(crate) spec_index: Option<u32>,
    pub(crate) callback: Option<Box<dyn IoCallback>>,
}

impl FdRecord {
    fn empty() -> Self {
        FdRecord {
            state: FdState::zero(),
            updated: false,
            new: false,
            ev: 0,
            spec_index: None,
            callback: None,
        }
    }

    pub(crate) fn has_owner(&self) -> bool {
        self.callback.is_some()
    }
}

pub(crate) struct Table {
    records: Vec<FdRecord>,
    /// UpdateList (§3): ordered by insertion, deduplicated via `updated`.
    pub(crate) updates: Vec<usize>,
    /// SpecList (§3): dense, back-pointers held on the fd record.
    pub(crate) spec: Vec<usize>,
}

fn polled_mask(nibble: u8) -> u32 {
    let mut mask = 0u32;
    if (nibble >> Direction::Read.shift()) & fd_state::POLLED != 0 {
        mask |= libc::EPOLLIN as u32;
    }
    if (nibble >> Direction::Write.shift()) & fd_state::POLLED != 0 {
        mask |= libc::EPOLLOUT as u32;
    }
    mask
}

impl Table {
    pub(crate) fn with_capacity(maxsock: usize) -> Self {
        let mut records = Vec::with_capacity(maxsock);
        records.resize_with(maxsock, FdRecord::empty);
        Table {
            records,
            updates: Vec::new(),
            spec: Vec::new(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn get(&self, fd: RawFd) -> Option<&FdRecord> {
        self.records.get(fd as usize)
    }

    pub(crate) fn get_mut(&mut self, fd: RawFd) -> Option<&mut FdRecord> {
        self.records.get_mut(fd as usize)
    }

    pub(crate) fn has_owner(&self, fd: RawFd) -> bool {
        self.get(fd).is_some_and(FdRecord::has_owner)
    }

    /// §6 `updt_fd`: append fd to UpdateList iff not already enqueued.
    fn updt_fd(&mut self, fd: RawFd) {
        let idx = fd as usize;
        if !self.records[idx].updated {
            self.records[idx].updated = true;
            self.updates.push(idx);
        }
    }

    /// §6 `alloc_spec_entry`.
    fn alloc_spec_entry(&mut self, fd: RawFd) {
        let idx = fd as usize;
        if self.records[idx].spec_index.is_some() {
            return;
        }
        let spec_idx = self.spec.len() as u32;
        self.spec.push(idx);
        self.records[idx].spec_index = Some(spec_idx);
    }

    /// §6 `release_spec_entry`: O(1) swap-remove; fixes up the back-pointer
    /// of whichever fd gets swapped into the freed slot.
    fn release_spec_entry(&mut self, fd: RawFd) {
        let idx = fd as usize;
        let Some(spec_idx) = self.records[idx].spec_index.take() else {
            return;
        };
        let spec_idx = spec_idx as usize;
        self.spec.swap_remove(spec_idx);
        if let Some(&moved_fd) = self.spec.get(spec_idx) {
            self.records[moved_fd].spec_index = Some(spec_idx as u32);
        }
    }

    // ---- §4.1 primitive operations: O(1), never syscall. ----

    pub(crate) fn is_set(&self, fd: RawFd, dir: Direction) -> bool {
        self.get(fd).is_some_and(|r| r.state.is_set(dir))
    }

    pub(crate) fn set_active(&mut self, fd: RawFd, dir: Direction) {
        let idx = fd as usize;
        if idx >= self.records.len() {
            return;
        }
        let (state, enqueue) = self.records[idx].state.set_active(dir);
        self.records[idx].state = state;
        if enqueue {
            self.updt_fd(fd);
        }
    }

    pub(crate) fn set_polled(&mut self, fd: RawFd, dir: Direction) {
        let idx = fd as usize;
        if idx >= self.records.len() {
            return;
        }
        let (state, enqueue) = self.records[idx].state.set_polled(dir);
        self.records[idx].state = state;
        if enqueue {
            self.updt_fd(fd);
        }
    }

    pub(crate) fn clear(&mut self, fd: RawFd, dir: Direction) {
        let idx = fd as usize;
        if idx >= self.records.len() {
            return;
        }
        let (state, enqueue) = self.records[idx].state.clear(dir);
        self.records[idx].state = state;
        if enqueue {
            self.updt_fd(fd);
        }
    }

    pub(crate) fn remove(&mut self, fd: RawFd) {
        self.clear(fd, Direction::Read);
        self.clear(fd, Direction::Write);
    }

    /// §4.1 `close_notify`: release the SpecList entry and zero both
    /// nibbles. No UpdateList enqueue, no syscall — the OS already drops a
    /// closed fd from the interest set on its own.
    pub(crate) fn close_notify(&mut self, fd: RawFd) {
        let idx = fd as usize;
        if idx >= self.records.len() {
            return;
        }
        self.release_spec_entry(fd);
        self.records[idx].state = FdState::cleared();
    }

    /// §4.2: the start-of-tick UpdateList drain.
    pub(crate) fn drain_updates(&mut self, selector: &Selector) {
        let updates = std::mem::take(&mut self.updates);
        for idx in updates {
            let fd = idx as RawFd;
            let old = self.records[idx].state.previous();
            let new = self.records[idx].state.current();
            let has_owner = self.records[idx].has_owner();

            if has_owner && new != old {
                let old_polled = polled_mask(old);
                let new_polled = polled_mask(new);
                if old_polled != new_polled {
                    let result = if new_polled == 0 {
                        selector.del(fd)
                    } else if old_polled == 0 {
                        selector.add(fd, new_polled)
                    } else {
                        selector.modify(fd, new_polled)
                    };
                    if let Err(err) = result {
                        // §7 kind 2: logged and ignored, the fd may have
                        // been closed; next drain reconciles.
                        #[cfg(feature = "log")]
                        log::debug!("kernel interest-set sync for fd {fd} failed: {err}");
                        #[cfg(not(feature = "log"))]
                        let _ = err;
                    }
                }
                self.records[idx].state = self.records[idx].state.sync_previous();
            }

            let new_has_active = fd_state::nibble_has_active(new);
            let old_has_active = fd_state::nibble_has_active(old);
            if !new_has_active {
                if self.records[idx].spec_index.is_some() {
                    self.release_spec_entry(fd);
                }
            } else if !old_has_active {
                self.alloc_spec_entry(fd);
            }

            self.records[idx].updated = false;
            self.records[idx].new = false;
        }
    }
}
