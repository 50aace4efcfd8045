//! Strongly-typed resource handles.
//!
//! Every persistent or transient GPU resource is referenced through a
//! [`ResourceId<T>`]: a plain integer tagged with a zero-sized kind marker.
//! Handles are created by the [`Renderer`](crate::renderer::Renderer) backend
//! and copied by value everywhere else.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker for a resource kind.
///
/// Implemented by the uninhabited kind types below; only used at the type level.
pub trait ResourceKind: 'static {
    /// Short name used in debug output.
    const NAME: &'static str;
}

macro_rules! resource_kinds {
    ($($(#[$meta:meta])* $kind:ident => $alias:ident, $name:literal;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug)]
            pub enum $kind {}

            impl ResourceKind for $kind {
                const NAME: &'static str = $name;
            }

            #[doc = concat!("Handle to a ", $name, " resource.")]
            pub type $alias = ResourceId<$kind>;
        )*
    };
}

resource_kinds! {
    /// Color image (render target or storage image).
    Image => ImageId, "image";
    /// Depth/stencil image.
    DepthImage => DepthImageId, "depth image";
    /// Sampled texture, usually loaded from disk.
    Texture => TextureId, "texture";
    /// GPU buffer (vertex, index, constant, storage).
    Buffer => BufferId, "buffer";
    /// Drawable model (vertex + index buffers).
    Model => ModelId, "model";
    /// Graphics or compute pipeline.
    Pipeline => PipelineId, "pipeline";
    /// Texture sampler.
    Sampler => SamplerId, "sampler";
    /// GPU-GPU synchronization semaphore.
    Semaphore => SemaphoreId, "semaphore";
}

/// Opaque, typed handle to a renderer-owned resource.
///
/// `ResourceId::INVALID` is reserved and never handed out by a backend.
pub struct ResourceId<T> {
    raw: u32,
    _kind: PhantomData<fn() -> T>,
}

impl<T> ResourceId<T> {
    /// The reserved "no resource" value.
    pub const INVALID: Self = Self::from_raw(u32::MAX);

    /// Wrap a raw backend index.
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    /// The raw backend index.
    pub const fn raw(self) -> u32 {
        self.raw
    }

    /// Whether this handle is anything but [`ResourceId::INVALID`].
    pub const fn is_valid(self) -> bool {
        self.raw != u32::MAX
    }
}

impl<T> Clone for ResourceId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ResourceId<T> {}

impl<T> PartialEq for ResourceId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for ResourceId<T> {}

impl<T> Hash for ResourceId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> Default for ResourceId<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<T: ResourceKind> fmt::Debug for ResourceId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}#{}", T::NAME, self.raw)
        } else {
            write!(f, "{}#invalid", T::NAME)
        }
    }
}

/// Monotonic allocator for one resource kind.
///
/// Backends use one allocator per kind so handles of different kinds may
/// share raw values without ever comparing equal (they are different types).
#[derive(Debug)]
pub struct HandleAllocator<T> {
    next: u32,
    _kind: PhantomData<fn() -> T>,
}

impl<T> HandleAllocator<T> {
    /// Create an allocator starting at zero.
    pub const fn new() -> Self {
        Self {
            next: 0,
            _kind: PhantomData,
        }
    }

    /// Hand out the next handle.
    ///
    /// # Panics
    ///
    /// Panics if the raw space is exhausted (the last value is the sentinel).
    pub fn allocate(&mut self) -> ResourceId<T> {
        assert!(self.next < u32::MAX, "resource handle space exhausted");
        let id = ResourceId::from_raw(self.next);
        self.next += 1;
        id
    }

    /// Number of handles handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }
}

impl<T> Default for HandleAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(ImageId: Send, Sync, Copy);
static_assertions::assert_impl_all!(SemaphoreId: Send, Sync, Copy);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sentinel() {
        assert!(!ImageId::INVALID.is_valid());
        assert_eq!(ImageId::default(), ImageId::INVALID);
        assert!(ImageId::from_raw(0).is_valid());
    }

    #[test]
    fn test_allocator_hands_out_distinct_ids() {
        let mut alloc = HandleAllocator::<Image>::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a, b);
        assert_eq!(alloc.allocated(), 2);
    }

    #[test]
    fn test_debug_names_kind() {
        assert_eq!(format!("{:?}", TextureId::from_raw(3)), "texture#3");
        assert_eq!(format!("{:?}", BufferId::INVALID), "buffer#invalid");
    }
}
