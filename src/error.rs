use core::fmt;

/// Error returned by insert-if-absent operations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertError {
    /// An equal key was already present. The stored entry is untouched and
    /// the rejected key and value have been passed to the map's
    /// destructors.
    DuplicateKey,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::DuplicateKey => f.write_str("key already present in map"),
        }
    }
}

impl std::error::Error for InsertError {}
