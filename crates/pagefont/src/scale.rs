//! Display scale query

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Integer UI scale factor, polled before every draw or measure call
pub trait ScaleSource: Send + Sync {
    fn ui_scale(&self) -> u32;
}

/// A scale that never changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedScale(pub u32);

impl Default for FixedScale {
    fn default() -> Self {
        Self(1)
    }
}

impl ScaleSource for FixedScale {
    fn ui_scale(&self) -> u32 {
        self.0
    }
}

/// A scale the host updates (e.g. from window scale-factor events)
#[derive(Debug, Clone)]
pub struct SharedScale(Arc<AtomicU32>);

impl SharedScale {
    pub fn new(scale: u32) -> Self {
        Self(Arc::new(AtomicU32::new(scale)))
    }

    pub fn set(&self, scale: u32) {
        self.0.store(scale, Ordering::Relaxed);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for SharedScale {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ScaleSource for SharedScale {
    fn ui_scale(&self) -> u32 {
        self.get()
    }
}
