use bytemuck::Pod;

/// Monotonic change counter for one attribute array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Records one modification.
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Write access to tracked data. Dropping the guard records one change.
pub struct MutGuard<'a, T> {
    data: &'a mut T,
    tracker: &'a mut ChangeTracker,
}

impl<'a, T> MutGuard<'a, T> {
    pub fn new(data: &'a mut T, tracker: &'a mut ChangeTracker) -> Self {
        Self { data, tracker }
    }
}

impl<T> std::ops::Deref for MutGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<T> std::ops::DerefMut for MutGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data
    }
}

impl<T> Drop for MutGuard<'_, T> {
    fn drop(&mut self) {
        self.tracker.changed();
    }
}

/// A per-vertex array owned by one consumer and versioned on every write.
///
/// Downstream readers (the renderer) compare [`TrackedArray::version`] with the
/// version they last uploaded to decide whether the contents must be re-read.
#[derive(Debug, Clone, Default)]
pub struct TrackedArray<T> {
    data: Vec<T>,
    tracker: ChangeTracker,
}

impl<T> TrackedArray<T> {
    #[must_use]
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            tracker: ChangeTracker::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.tracker.version()
    }

    /// Opens a write scope. The version is bumped once when the guard drops,
    /// regardless of how many elements were touched.
    pub fn write(&mut self) -> MutGuard<'_, Vec<T>> {
        MutGuard::new(&mut self.data, &mut self.tracker)
    }
}

impl<T: Pod> TrackedArray<T> {
    /// Raw bytes, laid out for a vertex buffer upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}
