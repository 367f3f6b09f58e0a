//! Hard-link seam shared by the resource cache and the frame expander.
//!
//! Both avoid duplicating large files by hard-linking them. Routing the call
//! through [`FileLinker`] lets tests simulate a filesystem with a tiny
//! per-inode link ceiling.

use std::io;
use std::path::Path;

/// Creates hard links.
pub trait FileLinker: Send + Sync {
    /// Create `dst` as a new hard link to `src`.
    fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// The real filesystem linker.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardLinker;

impl FileLinker for HardLinker {
    fn hard_link(&self, src: &Path, dst: &Path) -> io::Result<()> {
        std::fs::hard_link(src, dst)
    }
}

/// Whether `err` reports that the source inode reached its link-count limit.
///
/// Older btrfs releases capped an inode at a few hundred links, which a long
/// talk easily exceeds when every second of a slide is linked.
pub fn is_too_many_links(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        err.raw_os_error() == Some(libc::EMLINK)
    }
    #[cfg(not(unix))]
    {
        let _ = err;
        false
    }
}
