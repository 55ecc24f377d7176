//! Data module: compact row storage and global numbering

pub mod compact_list;
pub mod global_index;

pub use compact_list::CompactListList;
pub use global_index::GlobalIndex;
