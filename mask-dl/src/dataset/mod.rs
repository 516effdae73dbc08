//! Annotation-backed mask dataset toolkit.

mod collate;
mod materialize;
mod memory;
mod record;
mod source;
mod streaming;

pub use collate::*;
pub use materialize::*;
pub use memory::*;
pub use record::*;
pub use source::*;
pub use streaming::*;
