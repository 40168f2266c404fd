/// Named viewers and the current-viewer pointer.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::display::{DisplayBackend, DisplaySurface};
use crate::error::ZViewError;
use crate::image::ImageBuffer;

pub struct ViewerHandle {
    surface: Box<dyn DisplaySurface>,
}

impl ViewerHandle {
    pub fn name(&self) -> &str {
        self.surface.name()
    }

    pub fn surface(&self) -> &dyn DisplaySurface {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn DisplaySurface {
        self.surface.as_mut()
    }

    /// Name of the buffer currently shown, if any.
    pub fn buffer_name(&self) -> Option<&str> {
        self.surface.image().map(|img| img.name())
    }
}

#[derive(Default)]
pub struct ViewerRegistry {
    viewers: BTreeMap<String, ViewerHandle>,
    current: Option<String>,
}

impl ViewerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a viewer. It becomes current if none is.
    ///
    /// An existing viewer with the same name is closed and replaced; if it was
    /// current, the replacement is current.
    pub fn create(
        &mut self,
        backend: &mut dyn DisplayBackend,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<&mut ViewerHandle> {
        let surface = backend.make_surface(name, width, height)?;

        if let Some(old) = self.viewers.remove(name) {
            warn!("Viewer {} already exists; closing it", name);
            backend.close_surface(old.surface);
        }
        info!("Created viewer {} ({}x{})", name, width, height);

        if self.current.is_none() {
            self.current = Some(name.to_string());
        }
        Ok(self
            .viewers
            .entry(name.to_string())
            .or_insert(ViewerHandle { surface }))
    }

    /// Make `name` current. On failure the current viewer is unchanged.
    pub fn switch(&mut self, name: &str) -> Result<(), ZViewError> {
        if !self.viewers.contains_key(name) {
            return Err(ZViewError::NoSuchViewer(name.to_string()));
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    pub fn close(
        &mut self,
        backend: &mut dyn DisplayBackend,
        name: &str,
    ) -> Result<(), ZViewError> {
        let viewer = self
            .viewers
            .remove(name)
            .ok_or_else(|| ZViewError::NoSuchViewer(name.to_string()))?;
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        backend.close_surface(viewer.surface);
        info!("Closed viewer {}", name);
        Ok(())
    }

    pub fn current(&self) -> Option<&ViewerHandle> {
        self.current.as_ref().and_then(|n| self.viewers.get(n))
    }

    pub fn current_mut(&mut self) -> Option<&mut ViewerHandle> {
        match &self.current {
            Some(name) => self.viewers.get_mut(name),
            None => None,
        }
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn get(&self, name: &str) -> Result<&ViewerHandle, ZViewError> {
        self.viewers
            .get(name)
            .ok_or_else(|| ZViewError::NoSuchViewer(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ViewerHandle> {
        self.viewers.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.viewers.contains_key(name)
    }

    /// Point every viewer showing a buffer named like `image` at the new data.
    /// Returns how many were updated.
    pub fn refresh(&mut self, image: &Arc<ImageBuffer>) -> usize {
        let mut count = 0;
        for handle in self.viewers.values_mut() {
            if handle.buffer_name() == Some(image.name()) {
                handle.surface_mut().set_image(image.clone());
                count += 1;
            }
        }
        count
    }

    /// `(name, is_current)` sorted by name. Side-effect free.
    pub fn list(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.viewers
            .keys()
            .map(move |name| (name.as_str(), self.current.as_deref() == Some(name.as_str())))
    }

    pub fn len(&self) -> usize {
        self.viewers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }
}
