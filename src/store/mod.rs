pub mod disk;
pub mod memory;

pub use disk::DiskYieldStore;
pub use memory::MemoryYieldStore;
