use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::error::MapError;
use crate::map_service::MapService;

// Map service shared by the exported functions. Rebuilds take the write
// lock, rendering and click lookups only read.
lazy_static! {
    static ref MODULE_STATE: RwLock<Option<MapService>> = RwLock::new(None);
}

pub struct ModuleState;

impl ModuleState {
    /// Install a freshly configured service, carrying over the ships of the
    /// previous one.
    pub fn configure(mut service: MapService) -> Result<(), MapError> {
        let mut guard = MODULE_STATE.write();
        if let Some(previous) = guard.as_ref() {
            service.load_entities(&previous.entities())?;
        }
        *guard = Some(service);
        Ok(())
    }

    pub fn with_mut<F, R>(f: F) -> Result<R, MapError>
    where
        F: FnOnce(&mut MapService) -> Result<R, MapError>,
    {
        let mut guard = MODULE_STATE.write();
        let service = guard.as_mut().ok_or(MapError::NotConfigured)?;
        f(service)
    }

    pub fn with<F, R>(f: F) -> Result<R, MapError>
    where
        F: FnOnce(&MapService) -> R,
    {
        let guard = MODULE_STATE.read();
        let service = guard.as_ref().ok_or(MapError::NotConfigured)?;
        Ok(f(service))
    }

    pub fn reset() {
        *MODULE_STATE.write() = None;
    }
}
