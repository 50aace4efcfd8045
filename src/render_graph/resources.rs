//! Per-frame resource table.
//!
//! Passes never hold concrete renderer IDs across the setup/execute split.
//! During setup they register a concrete ID and get back a pass handle (an
//! index into this table stamped with the frame generation). During execute
//! they resolve the handle back to the concrete ID.
//!
//! A concrete ID owns exactly one slot per frame: the first registration
//! appends a slot, every later read or write of the same ID returns a handle
//! to that slot. That is what lets independent passes share a transient.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use glam::Vec4;

use crate::handles::{
    DepthImage, DepthImageId, Image, ImageId, ResourceId, ResourceKind, Texture, TextureId,
};
use crate::types::{ClearValue, ColorTarget, DepthTarget, LoadMode, ShaderStage, WriteMode};

mod sealed {
    pub trait Sealed {}
}

/// Resource kinds tracked by [`RenderGraphResources`].
pub trait TrackedKind: ResourceKind + sealed::Sealed + Sized {
    #[doc(hidden)]
    fn slots(resources: &RenderGraphResources) -> &[ResourceSlot<Self>];
    #[doc(hidden)]
    fn slots_mut(resources: &mut RenderGraphResources) -> &mut Vec<ResourceSlot<Self>>;
}

macro_rules! tracked_kinds {
    ($($kind:ty => $field:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $kind {}

            impl TrackedKind for $kind {
                fn slots(resources: &RenderGraphResources) -> &[ResourceSlot<Self>] {
                    &resources.$field
                }

                fn slots_mut(resources: &mut RenderGraphResources) -> &mut Vec<ResourceSlot<Self>> {
                    &mut resources.$field
                }
            }
        )*
    };
}

tracked_kinds! {
    Image => images,
    DepthImage => depth_images,
    Texture => textures,
}

/// Common interface of the two pass handle types.
///
/// Sealed; handles can only be issued by a [`RenderGraphResources`] table.
///
/// ```compile_fail
/// use framegraph::handles::Image;
/// use framegraph::render_graph::GraphHandle;
///
/// #[derive(Clone, Copy)]
/// struct Forged;
///
/// impl GraphHandle for Forged {
///     type Kind = Image;
///
///     fn raw_parts(self) -> (u32, u32) {
///         (0, 0)
///     }
/// }
/// ```
pub trait GraphHandle: Copy + sealed::Sealed {
    type Kind: TrackedKind;

    #[doc(hidden)]
    fn raw_parts(self) -> (u32, u32);
}

macro_rules! pass_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        pub struct $name<T> {
            index: u32,
            generation: u32,
            _kind: PhantomData<fn() -> T>,
        }

        impl<T> $name<T> {
            pub(crate) const fn new(index: u32, generation: u32) -> Self {
                Self {
                    index,
                    generation,
                    _kind: PhantomData,
                }
            }

            /// Slot index in the frame's resource table.
            pub const fn index(self) -> u32 {
                self.index
            }

            /// Generation of the frame that issued the handle.
            pub const fn generation(self) -> u32 {
                self.generation
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.index == other.index && self.generation == other.generation
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> Hash for $name<T> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.index.hash(state);
                self.generation.hash(state);
            }
        }

        impl<T: ResourceKind> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "{}({} slot {}, gen {})",
                    $label,
                    T::NAME,
                    self.index,
                    self.generation
                )
            }
        }

        impl<T> sealed::Sealed for $name<T> {}

        impl<T: TrackedKind> GraphHandle for $name<T> {
            type Kind = T;

            fn raw_parts(self) -> (u32, u32) {
                (self.index, self.generation)
            }
        }
    };
}

pass_handle! {
    /// Read-only pass handle, returned by
    /// [`RenderGraphBuilder::read`](super::RenderGraphBuilder::read).
    RenderPassResource, "read"
}

pass_handle! {
    /// Read-write pass handle, returned by
    /// [`RenderGraphBuilder::write`](super::RenderGraphBuilder::write).
    RenderPassMutableResource, "write"
}

impl<T> From<RenderPassMutableResource<T>> for RenderPassResource<T> {
    fn from(handle: RenderPassMutableResource<T>) -> Self {
        Self::new(handle.index, handle.generation)
    }
}

pub type ImageResource = RenderPassResource<Image>;
pub type MutableImageResource = RenderPassMutableResource<Image>;
pub type DepthImageResource = RenderPassResource<DepthImage>;
pub type MutableDepthImageResource = RenderPassMutableResource<DepthImage>;
pub type TextureResource = RenderPassResource<Texture>;

/// One write registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWrite {
    /// Declaration index of the writing pass.
    pub pass: usize,
    pub mode: WriteMode,
    pub load: LoadMode,
}

/// Everything passes declared about one slot this frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotUsage {
    /// Union of the stages the slot is read from.
    pub read_stages: ShaderStage,
    /// Declaration indices of reading passes, in registration order.
    pub readers: Vec<usize>,
    pub writes: Vec<SlotWrite>,
    /// Created by a pass this frame rather than owned by the caller.
    pub transient: bool,
    pub clear: Option<ClearValue>,
}

impl SlotUsage {
    pub fn is_read(&self) -> bool {
        !self.readers.is_empty()
    }

    pub fn is_written(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Write mode of the most recent write registration.
    pub fn write_mode(&self) -> Option<WriteMode> {
        self.writes.last().map(|w| w.mode)
    }

    /// Load mode the given pass declared, [`LoadMode::Load`] if it didn't write.
    pub fn load_mode_for(&self, pass: usize) -> LoadMode {
        self.writes
            .iter()
            .rev()
            .find(|w| w.pass == pass)
            .map_or(LoadMode::Load, |w| w.load)
    }

    pub fn writers(&self) -> impl Iterator<Item = usize> + '_ {
        self.writes.iter().map(|w| w.pass)
    }
}

/// A tracked concrete ID and its usage.
pub struct ResourceSlot<T> {
    id: ResourceId<T>,
    usage: SlotUsage,
}

impl<T: ResourceKind> fmt::Debug for ResourceSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSlot")
            .field("id", &self.id)
            .field("usage", &self.usage)
            .finish()
    }
}

impl<T> ResourceSlot<T> {
    pub fn id(&self) -> ResourceId<T> {
        self.id
    }

    pub fn usage(&self) -> &SlotUsage {
        &self.usage
    }
}

/// Per-frame table mapping pass handles to concrete IDs.
#[derive(Debug)]
pub struct RenderGraphResources {
    generation: u32,
    images: Vec<ResourceSlot<Image>>,
    depth_images: Vec<ResourceSlot<DepthImage>>,
    textures: Vec<ResourceSlot<Texture>>,
    current_pass: Option<usize>,
}

impl RenderGraphResources {
    pub(crate) fn new(generation: u32) -> Self {
        Self {
            generation,
            images: Vec::new(),
            depth_images: Vec::new(),
            textures: Vec::new(),
            current_pass: None,
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Register a read of `id`, or return the existing slot's handle.
    pub fn get_resource<T: TrackedKind>(&mut self, id: ResourceId<T>) -> RenderPassResource<T> {
        RenderPassResource::new(self.slot_index(id), self.generation)
    }

    /// Register a write of `id`, or return the existing slot's handle.
    pub fn get_mutable_resource<T: TrackedKind>(
        &mut self,
        id: ResourceId<T>,
    ) -> RenderPassMutableResource<T> {
        RenderPassMutableResource::new(self.slot_index(id), self.generation)
    }

    /// Look up the slot of `id` without registering it.
    pub fn find_resource<T: TrackedKind>(&self, id: ResourceId<T>) -> Option<RenderPassResource<T>> {
        T::slots(self)
            .iter()
            .position(|slot| slot.id == id)
            .map(|index| RenderPassResource::new(index as u32, self.generation))
    }

    fn slot_index<T: TrackedKind>(&mut self, id: ResourceId<T>) -> u32 {
        let slots = T::slots_mut(self);
        if let Some(index) = slots.iter().position(|slot| slot.id == id) {
            return index as u32;
        }
        slots.push(ResourceSlot {
            id,
            usage: SlotUsage::default(),
        });
        log::trace!("RenderGraphResources: tracking {:?} in slot {}", id, slots.len() - 1);
        (slots.len() - 1) as u32
    }

    /// Track a freshly created transient. Never deduplicates.
    pub(crate) fn register_transient<T: TrackedKind>(
        &mut self,
        id: ResourceId<T>,
        clear: ClearValue,
    ) -> u32 {
        let slots = T::slots_mut(self);
        debug_assert!(slots.iter().all(|slot| slot.id != id || !id.is_valid()));
        slots.push(ResourceSlot {
            id,
            usage: SlotUsage {
                transient: true,
                clear: Some(clear),
                ..SlotUsage::default()
            },
        });
        (slots.len() - 1) as u32
    }

    pub(crate) fn usage_mut<T: TrackedKind>(&mut self, index: u32) -> &mut SlotUsage {
        &mut T::slots_mut(self)[index as usize].usage
    }

    pub(crate) fn set_current_pass(&mut self, pass: Option<usize>) {
        self.current_pass = pass;
    }

    /// # Panics
    ///
    /// Panics if the handle was issued for another frame or by another table.
    fn slot<H: GraphHandle>(&self, handle: H) -> &ResourceSlot<H::Kind> {
        let (index, generation) = handle.raw_parts();
        assert_eq!(
            generation, self.generation,
            "pass handle from frame generation {} resolved in generation {}",
            generation, self.generation
        );
        let slots = <H::Kind as TrackedKind>::slots(self);
        match slots.get(index as usize) {
            Some(slot) => slot,
            None => panic!(
                "{} slot {} was never registered this frame ({} tracked)",
                <H::Kind as ResourceKind>::NAME,
                index,
                slots.len()
            ),
        }
    }

    /// Concrete ID behind a pass handle.
    pub fn resolve<H: GraphHandle>(&self, handle: H) -> ResourceId<H::Kind> {
        self.slot(handle).id
    }

    pub fn usage<H: GraphHandle>(&self, handle: H) -> &SlotUsage {
        &self.slot(handle).usage
    }

    pub fn image(&self, handle: impl GraphHandle<Kind = Image>) -> ImageId {
        self.resolve(handle)
    }

    pub fn depth_image(&self, handle: impl GraphHandle<Kind = DepthImage>) -> DepthImageId {
        self.resolve(handle)
    }

    pub fn texture(&self, handle: impl GraphHandle<Kind = Texture>) -> TextureId {
        self.resolve(handle)
    }

    /// Resolve a written image to a render pass color attachment, using the
    /// load mode the executing pass declared.
    pub fn color_target(&self, handle: RenderPassMutableResource<Image>) -> ColorTarget {
        let slot = self.slot(handle);
        let clear_color = match slot.usage.clear {
            Some(ClearValue::Color(color)) => color,
            _ => Vec4::ZERO,
        };
        ColorTarget {
            image: slot.id,
            load: self.load_mode(&slot.usage),
            clear_color,
        }
    }

    /// Depth counterpart of [`color_target`](Self::color_target).
    pub fn depth_target(&self, handle: RenderPassMutableResource<DepthImage>) -> DepthTarget {
        let slot = self.slot(handle);
        let clear_depth = match slot.usage.clear {
            Some(ClearValue::Depth(depth)) => depth,
            _ => 1.0,
        };
        DepthTarget {
            image: slot.id,
            load: self.load_mode(&slot.usage),
            clear_depth,
        }
    }

    fn load_mode(&self, usage: &SlotUsage) -> LoadMode {
        match self.current_pass {
            Some(pass) => usage.load_mode_for(pass),
            None => usage.writes.first().map_or(LoadMode::Load, |w| w.load),
        }
    }

    /// Number of tracked slots of one kind.
    pub fn len<T: TrackedKind>(&self) -> usize {
        T::slots(self).len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.depth_images.is_empty() && self.textures.is_empty()
    }

    /// Transients created by passes this frame.
    pub fn transient_count(&self) -> usize {
        self.usages().filter(|(_, usage)| usage.transient).count()
    }

    /// Every tracked slot with a debug label, images first.
    pub(crate) fn usages(&self) -> impl Iterator<Item = (String, &SlotUsage)> + '_ {
        let images = self.images.iter().map(|s| (format!("{:?}", s.id), &s.usage));
        let depth = self.depth_images.iter().map(|s| (format!("{:?}", s.id), &s.usage));
        let textures = self.textures.iter().map(|s| (format!("{:?}", s.id), &s.usage));
        images.chain(depth).chain(textures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_registration_is_idempotent() {
        let mut resources = RenderGraphResources::new(0);
        let image = ImageId::from_raw(7);

        let first = resources.get_resource(image);
        let second = resources.get_resource(image);
        let mutable = resources.get_mutable_resource(image);

        assert_eq!(first, second);
        assert_eq!(RenderPassResource::from(mutable), first);
        assert_eq!(resources.len::<Image>(), 1);
        assert_eq!(resources.resolve(first), image);
    }

    #[test]
    fn test_kinds_use_separate_tables() {
        let mut resources = RenderGraphResources::new(0);
        let image = resources.get_resource(ImageId::from_raw(0));
        let texture = resources.get_resource(TextureId::from_raw(0));
        assert_eq!(image.index(), 0);
        assert_eq!(texture.index(), 0);
        assert_eq!(resources.texture(texture), TextureId::from_raw(0));
    }

    #[test]
    fn test_find_does_not_register() {
        let resources = RenderGraphResources::new(0);
        assert!(resources.find_resource(ImageId::from_raw(1)).is_none());
        assert!(resources.is_empty());
    }

    #[test]
    fn test_transients_are_never_merged() {
        let mut resources = RenderGraphResources::new(0);
        let a = resources.register_transient(ImageId::from_raw(1), ClearValue::Color(Vec4::ONE));
        let b = resources.register_transient(ImageId::from_raw(2), ClearValue::Color(Vec4::ONE));
        assert_ne!(a, b);
        assert_eq!(resources.transient_count(), 2);
    }

    #[test]
    fn test_color_target_uses_current_pass_load_mode() {
        let mut resources = RenderGraphResources::new(0);
        let index = resources.register_transient(
            ImageId::from_raw(3),
            ClearValue::Color(Vec4::new(0.0, 0.0, 1.0, 1.0)),
        );
        let usage = resources.usage_mut::<Image>(index);
        usage.writes.push(SlotWrite {
            pass: 0,
            mode: WriteMode::RenderTarget,
            load: LoadMode::Clear,
        });
        usage.writes.push(SlotWrite {
            pass: 1,
            mode: WriteMode::RenderTarget,
            load: LoadMode::Load,
        });
        let handle = RenderPassMutableResource::<Image>::new(index, 0);

        resources.set_current_pass(Some(0));
        let target = resources.color_target(handle);
        assert_eq!(target.load, LoadMode::Clear);
        assert_eq!(target.clear_color, Vec4::new(0.0, 0.0, 1.0, 1.0));

        resources.set_current_pass(Some(1));
        assert_eq!(resources.color_target(handle).load, LoadMode::Load);
    }

    #[test]
    #[should_panic(expected = "resolved in generation")]
    fn test_stale_generation_panics() {
        let mut old = RenderGraphResources::new(1);
        let handle = old.get_resource(ImageId::from_raw(0));

        let mut current = RenderGraphResources::new(2);
        current.get_resource(ImageId::from_raw(0));
        current.resolve(handle);
    }

    #[test]
    #[should_panic(expected = "never registered")]
    fn test_unregistered_slot_panics() {
        let resources = RenderGraphResources::new(0);
        resources.resolve(RenderPassResource::<Image>::new(4, 0));
    }
}
