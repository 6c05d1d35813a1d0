use std::fmt;

/// A variable id local to one translation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileVarReference {
    pub fid: usize,
    pub vid: i64,
}

impl FileVarReference {
    pub fn new(fid: usize, vid: i64) -> Self {
        Self { fid, vid }
    }
}

impl fmt::Display for FileVarReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(fid:{},vid:{})", self.fid, self.vid)
    }
}

/// A struct/union key local to one translation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileKeyReference {
    pub fid: usize,
    pub ckey: i64,
}

impl FileKeyReference {
    pub fn new(fid: usize, ckey: i64) -> Self {
        Self { fid, ckey }
    }
}

impl fmt::Display for FileKeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(fid:{},ckey:{})", self.fid, self.ckey)
    }
}
