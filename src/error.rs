//! Crate-level error types.
//!
//! Most fallible functions return `anyhow::Result`; the graphics wrapper
//! reports its own failures through [`GfxError`] so callers can downcast
//! and react to, say, a shader compile failure specifically.

use std::fmt;

use crate::context::{StageKind, UniformKind};

/// Errors produced by the graphics object wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum GfxError {
    /// The context refused to create an object (buffer, shader, texture...).
    Create { what: &'static str, reason: String },
    /// A shader stage did not compile.
    Compile { stage: StageKind, log: String },
    /// The attached stages did not link into a program.
    Link { log: String },
    /// A uniform was set that the linked program does not expose.
    UnknownUniform { name: String },
    /// A uniform was set with a value of the wrong shape.
    UniformKind {
        name: String,
        declared: UniformKind,
        written: UniformKind,
    },
    /// A raw pixel buffer does not match the declared image size.
    PixelData { expected: usize, found: usize },
}

impl fmt::Display for GfxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { what, reason } => write!(f, "failed to create {what}: {reason}"),
            Self::Compile { stage, log } => {
                write!(f, "{stage:?} stage failed to compile: {log}")
            }
            Self::Link { log } => write!(f, "program failed to link: {log}"),
            Self::UnknownUniform { name } => write!(f, "no active uniform named `{name}`"),
            Self::UniformKind {
                name,
                declared,
                written,
            } => write!(
                f,
                "uniform `{name}` is declared as {declared:?} but was set as {written:?}"
            ),
            Self::PixelData { expected, found } => write!(
                f,
                "pixel buffer holds {found} bytes, the image needs {expected}"
            ),
        }
    }
}

impl std::error::Error for GfxError {}
