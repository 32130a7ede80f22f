//! Allocation error type for pool operations
//!
//! A single error type covers every fallible pool operation. The pool never
//! recovers internally: host-allocator refusal surfaces unchanged to the
//! caller and all other misuse is the caller's responsibility.

use core::alloc::Layout;
use core::fmt;

/// Result type for allocation operations.
pub type AllocResult<T> = Result<T, AllocError>;

/// Categorization of allocation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocErrorKind {
    /// The host allocator refused a block allocation.
    OutOfMemory,
    /// A requested layout does not fit the pool's slot layout.
    InvalidLayout,
}

impl AllocErrorKind {
    /// Returns a static string describing the error.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AllocErrorKind::OutOfMemory => "out of memory",
            AllocErrorKind::InvalidLayout => "invalid layout",
        }
    }
}

impl fmt::Display for AllocErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by fallible pool operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocError {
    kind: AllocErrorKind,
    layout: Option<Layout>,
    message: Option<&'static str>,
}

impl AllocError {
    /// Creates an out-of-memory error for the given block layout.
    #[inline]
    pub const fn out_of_memory(layout: Layout) -> Self {
        Self {
            kind: AllocErrorKind::OutOfMemory,
            layout: Some(layout),
            message: None,
        }
    }

    /// Creates an invalid-layout error with a static context message.
    #[inline]
    pub const fn invalid_layout(message: &'static str, layout: Layout) -> Self {
        Self {
            kind: AllocErrorKind::InvalidLayout,
            layout: Some(layout),
            message: Some(message),
        }
    }

    /// Returns the specific error kind.
    #[inline]
    pub const fn kind(&self) -> AllocErrorKind {
        self.kind
    }

    /// Returns the layout associated with this error, if any.
    #[inline]
    pub const fn layout(&self) -> Option<Layout> {
        self.layout
    }

    /// Checks if this is an out-of-memory error.
    #[inline]
    pub const fn is_out_of_memory(&self) -> bool {
        matches!(self.kind, AllocErrorKind::OutOfMemory)
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.layout {
            Some(layout) => write!(
                f,
                "memory allocation failed ({}): {} bytes with alignment {}",
                self.kind,
                layout.size(),
                layout.align()
            )?,
            None => write!(f, "memory allocation failed ({})", self.kind)?,
        }
        if let Some(message) = self.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {}
