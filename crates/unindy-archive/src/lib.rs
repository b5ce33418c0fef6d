//! Rewrites the class entries of a JAR while copying everything else verbatim.

#![forbid(unsafe_code)]

mod error;
mod rewrite;

pub use crate::error::{ArchiveError, BoxError};
pub use crate::rewrite::{
    rewrite_archive, ArchiveOptions, ClassTransform, Compression, DesugarTransform,
    RewriteSummary, CLASS_MAGIC,
};
