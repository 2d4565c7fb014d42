use std::fmt;

/// Version token assigned by the server on every mutation of a document.
/// Two equal values for the same key mean the document has not changed in
/// between; values from different keys are not comparable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cas(u64);

impl Cas {
    /// The zero CAS means "no token": storage requests carrying it do not
    /// assert anything about the current document version.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Cas {
    fn from(raw: u64) -> Self {
        Cas(raw)
    }
}

impl From<Cas> for u64 {
    fn from(cas: Cas) -> Self {
        cas.0
    }
}

impl fmt::Display for Cas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}
