//! Persisted format versions.

/// Version stamped into every saved chunk document.
///
/// Version 1 carried only the tile diff; version 2 added the optional object
/// list. Bumps are additive, so readers accept every version up to this one.
pub const CHUNK_FORMAT_VERSION: u32 = 2;

/// Oldest chunk document version still readable.
pub const MIN_READABLE_CHUNK_VERSION: u32 = 1;

/// Checks whether a chunk document of `version` can be read.
#[must_use]
pub const fn can_read_chunk_version(version: u32) -> bool {
    version >= MIN_READABLE_CHUNK_VERSION && version <= CHUNK_FORMAT_VERSION
}
