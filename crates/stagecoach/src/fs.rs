//! File system abstractions and implementations

pub mod filesystem;
pub mod real;

pub use filesystem::{FileSystem, FileSystemError};
pub use real::RealFileSystem;

#[cfg(any(test, feature = "with_mocks"))]
pub use filesystem::MockFileSystem;
