//! Foundation types for verso, the versioned site host.
//!
//! Every other verso crate depends on `verso-types`.
//!
//! # Key Types
//!
//! - [`BlobId`]: Store-assigned, time-ordered identifier of one saved blob
//! - [`ContentDigest`]: BLAKE3 digest of a blob's bytes
//! - [`SiteId`]: Validated site name
//! - [`Capability`] / [`CapabilitySet`]: Feature flags gating history access
//! - [`SaveKind`]: Why a version was saved (manual, autosave, restore, ...)

pub mod blob;
pub mod capability;
pub mod error;
pub mod save;
pub mod site;

pub use blob::{BlobId, ContentDigest};
pub use capability::{Capability, CapabilitySet};
pub use error::TypeError;
pub use save::SaveKind;
pub use site::SiteId;
