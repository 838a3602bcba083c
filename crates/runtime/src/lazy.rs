use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot<T> {
    Unloaded,
    Loading,
    Ready(T),
}

/// Lazily-initialized singleton resource with an explicit lifecycle.
///
/// `Unloaded -> Loading -> Ready`, back to `Unloaded` on a failed load or on
/// [`LazyResource::teardown`]. The loader itself is run by the caller; this
/// type only tracks where the resource is in its lifecycle.
#[derive(Debug, Clone)]
pub struct LazyResource<T> {
    name: &'static str,
    slot: Slot<T>,
    last_error: Option<String>,
}

impl<T> LazyResource<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Slot::Unloaded,
            last_error: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.slot, Slot::Ready(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.slot, Slot::Loading)
    }

    pub fn get(&self) -> Option<&T> {
        match &self.slot {
            Slot::Ready(v) => Some(v),
            _ => None,
        }
    }

    /// Marks the resource as loading.
    ///
    /// Returns `true` when the caller has to run the loader, `false` when the
    /// resource is already available.
    pub fn begin_init(&mut self) -> bool {
        if self.is_ready() {
            return false;
        }
        debug!(resource = self.name, "lazy resource loading");
        self.slot = Slot::Loading;
        true
    }

    pub fn finish_init(&mut self, result: Result<T, String>) {
        match result {
            Ok(value) => {
                debug!(resource = self.name, "lazy resource ready");
                self.slot = Slot::Ready(value);
                self.last_error = None;
            }
            Err(reason) => {
                debug!(resource = self.name, %reason, "lazy resource failed");
                self.slot = Slot::Unloaded;
                self.last_error = Some(reason);
            }
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn teardown(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.slot, Slot::Unloaded) {
            Slot::Ready(v) => Some(v),
            _ => None,
        }
    }
}
