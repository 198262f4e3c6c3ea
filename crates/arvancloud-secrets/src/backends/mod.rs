//! Secret backend implementations

#[cfg(feature = "file")]
pub mod file;

#[cfg(feature = "kube")]
pub mod kube;

pub mod memory;
