/// ASCII signature embedded in every loader image, followed by one
/// version byte encoded as `major * 100 + minor`.
pub const LOADER_SIGNATURE: &[u8] = b"]|<=--LOADER.FDS--=>|[";

/// Candidate match positions are limited to this bound, the size of one
/// FDS disk side. Smaller than a flash slot on purpose; the signature sits
/// near the front of any real loader image.
pub const LOADER_SCAN_BOUND: usize = 65_500;

/// Result of a successful loader signature scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderInfo {
    /// Offset of the signature within the scanned buffer.
    pub offset: usize,
    pub major: u8,
    pub minor: u8,
}

impl std::fmt::Display for LoaderInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.major, self.minor)
    }
}

/// Scan `buf` for the loader signature and decode the trailing version
/// byte. Pure predicate, no I/O.
///
/// Every comparison is bounded by the buffer's real length, so a
/// signature truncated by the end of the buffer (or by the scan bound)
/// never matches and never reads out of bounds.
pub fn detect_loader(buf: &[u8]) -> Option<LoaderInfo> {
    let bound = buf.len().min(LOADER_SCAN_BOUND);
    for offset in 0..bound {
        // Needs the full signature plus the version byte to fit.
        if offset + LOADER_SIGNATURE.len() + 1 > buf.len() {
            break;
        }
        if &buf[offset..offset + LOADER_SIGNATURE.len()] == LOADER_SIGNATURE {
            let version = buf[offset + LOADER_SIGNATURE.len()];
            return Some(LoaderInfo {
                offset,
                major: version / 100,
                minor: version % 100,
            });
        }
    }
    None
}
