// tests/common/mod.rs

#![allow(dead_code, unused_imports)]

pub use nightshift_test_utils::{builders, fakes, init_tracing, local, with_timeout};

use std::sync::Arc;

use nightshift::fs::mock::MockFileSystem;
use nightshift::fs::FileSystem;

/// A mock filesystem plus the trait-object handle the code under test takes.
pub fn mock_fs() -> (MockFileSystem, Arc<dyn FileSystem>) {
    let fs = MockFileSystem::new();
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
    (fs, shared)
}
