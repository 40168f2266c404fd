/// Named image buffers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ZViewError;
use crate::formats::ImageLoader;
use crate::image::ImageBuffer;

/// One row of `lsb` output.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferInfo {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub path: PathBuf,
}

#[derive(Default)]
pub struct BufferRegistry {
    buffers: BTreeMap<String, Arc<ImageBuffer>>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path` into buffer `name`.
    ///
    /// Returns `true` if an existing buffer was replaced. On failure the
    /// previous contents of `name` (if any) are left untouched.
    pub fn read(
        &mut self,
        name: &str,
        path: &Path,
        loader: &dyn ImageLoader,
    ) -> Result<bool, ZViewError> {
        let replacing = self.buffers.contains_key(name);
        if replacing {
            warn!("Buffer {} is in use; discarding the previous data", name);
        }

        debug!("Reading {} into buffer {}", path.display(), name);
        let (header, data) = loader.load(path).map_err(|e| {
            warn!("Failed to read {}: {:#}", path.display(), e);
            ZViewError::from_load_error(&e)
        })?;

        info!(
            "Buffer {}: {}x{} from {}",
            name,
            data.ncols(),
            data.nrows(),
            path.display()
        );
        self.insert(ImageBuffer::new(name, data, header, path));
        Ok(replacing)
    }

    /// Store an already-loaded image under its own name.
    pub fn insert(&mut self, image: ImageBuffer) -> Option<Arc<ImageBuffer>> {
        self.buffers
            .insert(image.name().to_string(), Arc::new(image))
    }

    pub fn get(&self, name: &str) -> Result<&Arc<ImageBuffer>, ZViewError> {
        self.buffers
            .get(name)
            .ok_or_else(|| ZViewError::NoSuchBuffer(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<Arc<ImageBuffer>, ZViewError> {
        self.buffers
            .remove(name)
            .ok_or_else(|| ZViewError::NoSuchBuffer(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    /// Buffers sorted by name. Lazy and side-effect free.
    pub fn list(&self) -> impl Iterator<Item = BufferInfo> + '_ {
        self.buffers.iter().map(|(name, image)| BufferInfo {
            name: name.clone(),
            width: image.width(),
            height: image.height(),
            path: image.path().to_path_buf(),
        })
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
