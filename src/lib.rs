//! Generates file trees through a scratch area: every entry is staged first and
//! only moved into the output once the whole tree staged cleanly.

pub mod api;
pub mod config;
mod disk;
mod entry;
mod errors;
mod generator;
mod memory;
pub mod preview;
pub mod prompt;
pub mod template;
mod transactions;
mod utils;
mod vfs;

pub use disk::DiskBackend;
pub use entry::{
    modify_marshalled, modify_toml, Children, EntriesFn, Entry, InlineTemplate, ModifyFn,
    Template, TeraTemplate,
};
pub use errors::{BoxError, FileOperation, GenerateError, IoError};
pub use generator::{CancellationToken, Generator, GeneratorOptions};
pub use memory::MemoryBackend;
pub use transactions::GenerationReport;
pub use vfs::{Backend, EntryKind, OpenFlags, ScratchArea};
