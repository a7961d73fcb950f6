use crate::raster::Fragment;

/// Bump arena for the fragments built up while sampling shapes, reset once
/// per frame by the frame loop. Marks and slices are only valid until the
/// next `reset`; anything kept longer must be copied out.
pub struct FragmentArena {
    fragments: Vec<Fragment>,
}

impl FragmentArena {
    pub fn new() -> Self {
        FragmentArena {
            fragments: Vec::with_capacity(1024),
        }
    }

    pub fn mark(&self) -> usize {
        self.fragments.len()
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    pub fn slice(&self, mark: usize) -> &[Fragment] {
        &self.fragments[mark..]
    }

    /// Drops every fragment while keeping the backing storage.
    pub fn reset(&mut self) {
        self.fragments.clear();
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

impl Default for FragmentArena {
    fn default() -> Self {
        FragmentArena::new()
    }
}

/// Fixed-capacity pool of scratch values handed out by a monotonically
/// advancing cursor. Acquired slots hold caller-undefined prior contents and
/// are silently reused once the cursor wraps; callers needing a value past
/// the current frame must copy it out.
pub struct RingPool<T> {
    slots: Vec<T>,
    cursor: usize,
}

impl<T: Copy + Default> RingPool<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring pool capacity must be positive");
        RingPool {
            slots: vec![T::default(); capacity],
            cursor: 0,
        }
    }

    pub fn acquire(&mut self) -> &mut T {
        let index = self.cursor % self.slots.len();
        self.cursor += 1;
        &mut self.slots[index]
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
