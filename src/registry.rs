//! The poller plug-in registry (§4.7 `register`, §7 kind 5).
//!
//! Registration of *other* pollers is treated as an external collaborator
//! this crate only publishes into: a runtime, preference-ordered registry a
//! host process can query to pick the best available poller among several
//! implementations, kept as a small process-wide table.

use std::sync::Mutex;

/// Preference this crate's epoll-backed poller registers with. Higher wins;
/// a registry is free to prefer a different poller with a higher value.
pub const EPOLL_PREFERENCE: u16 = 400;

const REGISTRY_CAPACITY: usize = 8;

/// A published poller: just enough for a host process to pick among
/// several registered implementations.
#[derive(Copy, Clone, Debug)]
pub struct PollerDescriptor {
    pub name: &'static str,
    pub preference: u16,
}

static REGISTRY: Mutex<Vec<PollerDescriptor>> = Mutex::new(Vec::new());

/// §4.7 `register`: publish a poller into the global registry. A no-op, per
/// §7 kind 5, if the registry is already full.
pub(crate) fn register(name: &'static str, preference: u16) {
    let mut reg = REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
    if reg.len() >= REGISTRY_CAPACITY {
        #[cfg(feature = "log")]
        log::warn!("poller registry full; dropping registration of {name}");
        return;
    }
    if reg.iter().any(|d| d.name == name) {
        return;
    }
    reg.push(PollerDescriptor { name, preference });
}

/// Snapshot of all currently registered pollers, highest preference first.
pub fn registered_pollers() -> Vec<PollerDescriptor> {
    let reg = REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
    let mut out: Vec<PollerDescriptor> = reg.clone();
    out.sort_by(|a, b| b.preference.cmp(&a.preference));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent_by_name() {
        register("test-registry-dup", 100);
        register("test-registry-dup", 100);
        let count = registered_pollers()
            .iter()
            .filter(|d| d.name == "test-registry-dup")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn highest_preference_first() {
        register("test-registry-low", 1);
        register("test-registry-high", 999);
        let pollers = registered_pollers();
        let low = pollers.iter().position(|d| d.name == "test-registry-low").unwrap();
        let high = pollers.iter().position(|d| d.name == "test-registry-high").unwrap();
        assert!(high < low);
    }
}
