//! Error types for treedex.

use crate::common::config::MAX_ORDER;
use crate::common::PageId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in treedex.
///
/// One error type across the crate keeps handling uniform: index
/// operations, the page store and the disk layer all return
/// [`Result`]. `KeyExists` and `KeyNotFound` are recoverable and leave
/// the tree unchanged; the remaining variants are fatal to the
/// operation that hit them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure from the underlying page file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index file does not exist on open or destroy.
    #[error("index file not found: {0}")]
    FileNotFound(String),

    /// Requested page does not exist on disk.
    #[error("page {0} not found")]
    PageNotFound(PageId),

    /// Page store has no free frames and every loaded page is pinned.
    #[error("no free frames available in the page store")]
    NoFreeFrames,

    /// A page failed to decode.
    #[error("page {page} is corrupt: {detail}")]
    CorruptPage {
        page: PageId,
        detail: &'static str,
    },

    /// Insert of a key that is already present.
    #[error("key {0} already exists")]
    KeyExists(i32),

    /// Find/delete of a key that is not present.
    #[error("key {0} not found")]
    KeyNotFound(i32),

    /// Tree order outside `2..=MAX_ORDER`.
    #[error("invalid order {0}, supported range is 2..={MAX_ORDER}")]
    InvalidOrder(u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(PageId::new(42));
        assert_eq!(format!("{}", err), "page Page(42) not found");

        let err = Error::KeyExists(17);
        assert_eq!(format!("{}", err), "key 17 already exists");

        let err = Error::CorruptPage {
            page: PageId::new(3),
            detail: "checksum mismatch",
        };
        assert_eq!(format!("{}", err), "page Page(3) is corrupt: checksum mismatch");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_result_type_alias() {
        fn might_fail() -> Result<u32> {
            Ok(42)
        }

        assert_eq!(might_fail().unwrap(), 42);
    }
}
