//! Allocator ownership and diagnostics tree
//!
//! The registry records which allocator was created from which, for
//! attribution only: a child is not carved out of its parent's memory. It
//! never sits on an allocation path, so removing it changes nothing but the
//! availability of the debug view.
//!
//! Allocators created through the registry are placed in memory obtained from
//! the registry's own allocator and destroyed, in creation order, when the
//! registry drops. References handed out by [`AllocatorRegistry::create`]
//! borrow the registry, so none can outlive that teardown.

use core::alloc::Layout;
use core::cell::RefCell;
use core::fmt;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::debug;

use super::{Allocator, AllocatorKind, MemoryUsage, is_same_allocator};
use crate::error::{MemoryError, MemoryResult};

/// Index of the root node seeded by [`AllocatorRegistry::new`]
pub const ROOT_NODE: usize = 0;

enum Handle<'r> {
    Borrowed(&'r dyn Allocator),
    Owned(NonNull<dyn Allocator + 'r>),
}

struct Node<'r> {
    handle: Handle<'r>,
    children: Vec<usize>,
}

impl<'r> Node<'r> {
    fn allocator(&self) -> &(dyn Allocator + 'r) {
        match self.handle {
            Handle::Borrowed(allocator) => allocator,
            // SAFETY: owned allocators stay initialized until the registry
            // drops, and this borrow cannot outlive the registry.
            Handle::Owned(ptr) => unsafe { ptr.as_ref() },
        }
    }

    fn owns(&self) -> bool {
        matches!(self.handle, Handle::Owned(_))
    }
}

/// Snapshot of one registry node for a debug view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorNodeInfo {
    /// Allocator name
    pub name: String,
    /// Allocator strategy
    pub kind: AllocatorKind,
    /// Bytes currently handed out
    pub bytes_used: usize,
    /// Capacity in bytes, `0` for unbounded
    pub bytes_total: usize,
    /// Whether the registry destroys this allocator
    pub owns: bool,
    /// Indices of child nodes in the same snapshot
    pub children: Vec<usize>,
}

/// Tree of allocators with creation-time parent/child attribution
///
/// Node indices never change once assigned.
///
/// # Example
///
/// ```rust
/// use nebula_alloc::allocator::{AllocatorRegistry, HeapAllocator, LinearAllocator};
///
/// let heap = HeapAllocator::new("engine");
/// let registry = AllocatorRegistry::new(&heap);
///
/// let frame = registry.create(LinearAllocator::with_parent("frame", 4096, &heap)?)?;
/// let nodes = registry.nodes();
///
/// assert_eq!(nodes.len(), 2);
/// assert_eq!(nodes[0].children, vec![1]);
/// assert_eq!(nodes[1].name, "frame");
/// # let _ = frame;
/// # Ok::<(), nebula_alloc::MemoryError>(())
/// ```
pub struct AllocatorRegistry<'r> {
    allocator: &'r dyn Allocator,
    nodes: RefCell<Vec<Node<'r>>>,
}

impl<'r> AllocatorRegistry<'r> {
    /// Creates a registry seeded with `root` as its only node
    ///
    /// `root` also provides the memory for allocators created through the
    /// registry.
    pub fn new(root: &'r dyn Allocator) -> Self {
        #[cfg(feature = "logging")]
        debug!(root = root.name(), "initialized allocator registry");

        Self {
            allocator: root,
            nodes: RefCell::new(vec![Node {
                handle: Handle::Borrowed(root),
                children: Vec::new(),
            }]),
        }
    }

    /// Returns the root allocator
    pub fn root(&self) -> &'r dyn Allocator {
        self.allocator
    }

    /// Number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Always `false`: the root node exists from construction
    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Takes ownership of `allocator` and attaches it under the root
    ///
    /// # Errors
    /// Returns error if the registry's allocator cannot hold the object.
    pub fn create<T: Allocator + 'r>(&self, allocator: T) -> MemoryResult<&T> {
        self.adopt(ROOT_NODE, allocator)
    }

    /// Takes ownership of `allocator` and attaches it under `parent`
    ///
    /// `parent` is looked up by identity first, then by name.
    ///
    /// # Errors
    /// - Returns error if `parent` is not in the registry
    /// - Returns error if the registry's allocator cannot hold the object
    pub fn create_from_parent<T: Allocator + 'r>(
        &self,
        parent: &dyn Allocator,
        allocator: T,
    ) -> MemoryResult<&T> {
        let parent = self.find(parent)?;
        self.adopt(parent, allocator)
    }

    /// Records an allocator the registry does not own under `parent`
    ///
    /// Returns the new node index.
    ///
    /// # Errors
    /// Returns error if `parent` is not in the registry.
    pub fn register(
        &self,
        parent: &dyn Allocator,
        allocator: &'r dyn Allocator,
    ) -> MemoryResult<usize> {
        let parent = self.find(parent)?;
        Ok(self.attach(parent, Handle::Borrowed(allocator)))
    }

    /// Index of the node holding `allocator`, if registered
    pub fn index_of(&self, allocator: &dyn Allocator) -> Option<usize> {
        let nodes = self.nodes.borrow();
        nodes
            .iter()
            .position(|node| is_same_allocator(node.allocator(), allocator))
            .or_else(|| {
                nodes
                    .iter()
                    .position(|node| node.allocator().name() == allocator.name())
            })
    }

    /// Snapshot of every node, in index order
    pub fn nodes(&self) -> Vec<AllocatorNodeInfo> {
        self.nodes
            .borrow()
            .iter()
            .map(|node| {
                let allocator = node.allocator();
                AllocatorNodeInfo {
                    name: allocator.name().to_string(),
                    kind: allocator.kind(),
                    bytes_used: allocator.allocated_bytes(),
                    bytes_total: allocator.capacity(),
                    owns: node.owns(),
                    children: node.children.clone(),
                }
            })
            .collect()
    }

    fn find(&self, parent: &dyn Allocator) -> MemoryResult<usize> {
        self.index_of(parent)
            .ok_or_else(|| MemoryError::parent_not_found(parent.name()))
    }

    fn adopt<T: Allocator + 'r>(&self, parent: usize, allocator: T) -> MemoryResult<&T> {
        let slot = self.allocator.allocate(Layout::new::<T>())?.cast::<T>();
        // SAFETY: `slot` is fresh, sized and aligned for `T`.
        unsafe { slot.as_ptr().write(allocator) };

        let erased: NonNull<dyn Allocator + 'r> = slot;
        self.attach(parent, Handle::Owned(erased));

        // SAFETY: the value is initialized and is only destroyed in `Drop`,
        // which cannot run while this shared borrow of `self` is alive.
        Ok(unsafe { slot.as_ref() })
    }

    fn attach(&self, parent: usize, handle: Handle<'r>) -> usize {
        let mut nodes = self.nodes.borrow_mut();
        let index = nodes.len();

        #[cfg(feature = "logging")]
        {
            let child = match handle {
                Handle::Borrowed(allocator) => allocator.name().to_string(),
                // SAFETY: initialized just before attach is called.
                Handle::Owned(ptr) => unsafe { ptr.as_ref() }.name().to_string(),
            };
            debug!(
                parent = nodes[parent].allocator().name(),
                child = %child,
                index,
                "registered allocator"
            );
        }

        nodes.push(Node {
            handle,
            children: Vec::new(),
        });
        nodes[parent].children.push(index);
        index
    }

    fn write_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        nodes: &[Node<'r>],
        index: usize,
        depth: usize,
    ) -> fmt::Result {
        let node = &nodes[index];
        let allocator = node.allocator();
        write!(
            f,
            "{:indent$}{} [{}] {}",
            "",
            allocator.name(),
            allocator.kind(),
            allocator.memory_usage(),
            indent = depth * 2
        )?;
        if node.owns() {
            write!(f, " (owned)")?;
        }
        writeln!(f)?;

        for &child in &node.children {
            self.write_node(f, nodes, child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for AllocatorRegistry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes = self.nodes.borrow();
        self.write_node(f, &nodes, ROOT_NODE, 0)
    }
}

impl fmt::Debug for AllocatorRegistry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocatorRegistry")
            .field("root", &self.allocator.name())
            .field("nodes", &self.len())
            .finish()
    }
}

impl Drop for AllocatorRegistry<'_> {
    fn drop(&mut self) {
        let nodes = core::mem::take(self.nodes.get_mut());

        for node in nodes {
            if let Handle::Owned(ptr) = node.handle {
                // SAFETY: each owned node was written once in `adopt` and is
                // visited exactly once here; no outstanding borrows remain.
                unsafe {
                    core::ptr::drop_in_place(ptr.as_ptr());
                    self.allocator.deallocate(ptr.cast::<u8>());
                }
            }
        }

        #[cfg(feature = "logging")]
        debug!(root = self.allocator.name(), "tore down allocator registry");
    }
}
