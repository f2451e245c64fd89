//! js2ts-rs: converts prototype-based factory modules into class-based
//! TypeScript modules
//!
//! The pipeline has no grammar and no syntax tree. A [`partition()`] pass
//! folds nested constructs into opaque placeholders, a [`Transcoder`] walks
//! the flat result with a small statement grammar, and [`expand()`] turns the
//! rewritten placeholders back into text. A [`FactoryDriver`] wraps one
//! factory registration per file around that core.

pub mod blocks;
pub mod cli;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod expand;
pub mod options;
pub mod partition;
pub mod transcode;

pub use blocks::{Block, BlockId, BlockKind, BlockTable};
pub use driver::FactoryDriver;
pub use error::{Error as ConvertError, Result as ConvertResult};
pub use expand::expand;
pub use options::{ConvertOptions, DriverFlavor};
pub use partition::{partition, Partition};
pub use transcode::Transcoder;
