use std::sync::Arc;
use vigil_core::GeneratedOutput;

/// Approximate in-memory size of a cached value.
pub trait Weighted {
    /// Size in bytes charged against the cache bound.
    fn size_bytes(&self) -> usize;
}

impl Weighted for GeneratedOutput {
    fn size_bytes(&self) -> usize {
        GeneratedOutput::size_bytes(self)
    }
}

impl Weighted for String {
    fn size_bytes(&self) -> usize {
        self.len()
    }
}

impl Weighted for Vec<u8> {
    fn size_bytes(&self) -> usize {
        self.len()
    }
}

impl<T: Weighted + ?Sized> Weighted for Arc<T> {
    fn size_bytes(&self) -> usize {
        (**self).size_bytes()
    }
}
