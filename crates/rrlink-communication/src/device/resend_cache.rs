//! Bounded history of framed, numbered lines.
//!
//! A ring indexed by `line % capacity`: writing line `n` overwrites line
//! `n - capacity`, so the most recent `capacity` lines stay retrievable.

/// A framed line as it was handed to the write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedBlock<T> {
    /// Line number the block was framed with
    pub line: u64,
    /// Exact framed bytes, terminator included
    pub bytes: Vec<u8>,
    /// Caller tag, `None` for engine-generated blocks
    pub tag: Option<T>,
    /// Set once the send callback has fired for this line
    pub acknowledged: bool,
}

/// Resend cache keyed by line number.
#[derive(Debug)]
pub struct ResendCache<T> {
    slots: Vec<Option<CachedBlock<T>>>,
}

impl<T> ResendCache<T> {
    /// Create a cache holding `capacity` lines. Zero is allowed.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    /// Number of lines the cache can hold
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Check if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    fn slot(&self, line: u64) -> Option<usize> {
        match self.slots.len() {
            0 => None,
            cap => Some((line % cap as u64) as usize),
        }
    }

    /// Record `bytes` as line `line`, evicting whatever shared its slot.
    pub fn put(&mut self, line: u64, bytes: Vec<u8>, tag: Option<T>) {
        if let Some(i) = self.slot(line) {
            self.slots[i] = Some(CachedBlock {
                line,
                bytes,
                tag,
                acknowledged: false,
            });
        }
    }

    /// Look up line `line`.
    pub fn get(&self, line: u64) -> Option<&CachedBlock<T>> {
        let i = self.slot(line)?;
        self.slots[i].as_ref().filter(|entry| entry.line == line)
    }

    /// Mutable lookup of line `line`.
    pub fn get_mut(&mut self, line: u64) -> Option<&mut CachedBlock<T>> {
        let i = self.slot(line)?;
        self.slots[i].as_mut().filter(|entry| entry.line == line)
    }

    /// Forget every cached line.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }
}
