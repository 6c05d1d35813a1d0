//! Program-wide identity of global variables and struct keys
//!
//! Every translation unit numbers its global variables (vids) and its
//! structs and unions (ckeys) locally. The [`IndexManager`] maps each local
//! id to a global id (gvid, gckey) and back, so that a whole-program pass can
//! tell whether two local ids from different files denote the same entity.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use cdict_core::Element;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::config::XrefConfig;
use crate::error::Result;
use crate::reference::{FileKeyReference, FileVarReference};
use crate::unit::TranslationUnit;
use crate::xrefs::FileXrefs;

/// Initial ceiling for vids created by the analysis in a file, kept well
/// above any vid assigned by the front end
pub const FIDVIDMAX_INITIAL_VALUE: i64 = 1_000_000;

/// Forward (per file) and reverse (per global id) maps, kept in lockstep
#[derive(Debug, Clone, Default)]
struct Bimap {
    forward: HashMap<usize, BTreeMap<i64, i64>>,
    reverse: HashMap<i64, IndexMap<usize, i64>>,
}

impl Bimap {
    /// Map `local` in file `fid` to `global`; returns the global id it was
    /// mapped to before, if different
    fn insert(&mut self, fid: usize, local: i64, global: i64) -> Option<i64> {
        let previous = self.forward.entry(fid).or_default().insert(local, global);
        let replaced = previous.filter(|&old| old != global);
        if let Some(old) = replaced {
            remove_reverse(&mut self.reverse, old, fid, local);
        }
        if let Some(stale) = self.reverse.entry(global).or_default().insert(fid, local) {
            if stale != local {
                warn!(fid, stale, local, global, "replaced local id of global id");
                if let Some(locals) = self.forward.get_mut(&fid) {
                    locals.remove(&stale);
                }
            }
        }
        replaced
    }

    fn global(&self, fid: usize, local: i64) -> Option<i64> {
        self.forward.get(&fid)?.get(&local).copied()
    }

    fn local(&self, global: i64, fid: usize) -> Option<i64> {
        self.reverse.get(&global)?.get(&fid).copied()
    }

    fn references(&self, global: i64) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.reverse
            .get(&global)
            .into_iter()
            .flat_map(|files| files.iter().map(|(&fid, &local)| (fid, local)))
    }
}

fn remove_reverse(
    reverse: &mut HashMap<i64, IndexMap<usize, i64>>,
    global: i64,
    fid: usize,
    local: i64,
) {
    if let Some(files) = reverse.get_mut(&global) {
        if files.get(&fid) == Some(&local) {
            files.shift_remove(&fid);
        }
        if files.is_empty() {
            reverse.remove(&global);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexManager {
    single_file: bool,
    config: Option<XrefConfig>,
    vids: Bimap,
    ckeys: Bimap,
    /// gvid -> file that defines the variable or function
    gviddefs: HashMap<i64, usize>,
    fidvidmax: HashMap<usize, i64>,
}

impl IndexManager {
    pub fn new(single_file: bool) -> Self {
        Self {
            single_file,
            ..Self::default()
        }
    }

    /// Manager that locates persisted xref documents through `config`
    pub fn from_config(config: &XrefConfig) -> Self {
        Self {
            single_file: config.single_file,
            config: Some(config.clone()),
            ..Self::default()
        }
    }

    pub fn is_single_file(&self) -> bool {
        self.single_file
    }

    pub fn config(&self) -> Option<&XrefConfig> {
        self.config.as_ref()
    }

    // ------------------------------ Registration ------------------------------

    /// Register a local vid with a global vid
    pub fn add_vid2gvid(&mut self, filevar: FileVarReference, gvid: i64) {
        if let Some(old) = self.vids.insert(filevar.fid, filevar.vid, gvid) {
            warn!(%filevar, old, new = gvid, "replaced global vid mapping");
        }
    }

    /// Register a local struct key with a global struct key
    pub fn add_ckey2gckey(&mut self, filekey: FileKeyReference, gckey: i64) {
        if let Some(old) = self.ckeys.insert(filekey.fid, filekey.ckey, gckey) {
            warn!(%filekey, old, new = gckey, "replaced global ckey mapping");
        }
    }

    /// Bring a translation unit into the run.
    ///
    /// Outside single-file mode this loads the file's persisted xref document,
    /// when the manager has a configuration and the document exists, and
    /// records which globals the file defines.
    pub fn add_file<U: TranslationUnit + ?Sized>(&mut self, unit: &U) -> Result<()> {
        let fid = unit.index();
        if !self.single_file {
            let xref_path = self
                .config
                .as_ref()
                .map(|config| config.xref_path(unit.path(), unit.name()));
            match xref_path {
                Some(path) if path.is_file() => {
                    self.load_xrefs(fid, &path)?;
                }
                Some(path) => {
                    debug!(fid, path = %path.display(), "no xref document for file");
                }
                None => {}
            }
            self.add_global_definitions(unit);
        }
        self.fidvidmax.insert(fid, FIDVIDMAX_INITIAL_VALUE);
        Ok(())
    }

    fn add_global_definitions<U: TranslationUnit + ?Sized>(&mut self, unit: &U) {
        let fid = unit.index();
        for vid in unit.variable_definitions() {
            if let Some(gvid) = self.get_gvid(FileVarReference::new(fid, vid)) {
                self.gviddefs.insert(gvid, fid);
            }
        }
        for (name, vid) in unit.function_definitions() {
            if let Some(gvid) = self.get_gvid(FileVarReference::new(fid, vid)) {
                info!(function = name, gvid, fid, "set function definition");
                self.gviddefs.insert(gvid, fid);
            }
        }
    }

    // -------------------------------- Queries ---------------------------------

    /// Global vid of a file variable; the local vid itself in single-file mode
    pub fn get_gvid(&self, filevar: FileVarReference) -> Option<i64> {
        if self.single_file {
            return Some(filevar.vid);
        }
        self.vids.global(filevar.fid, filevar.vid)
    }

    /// Local vid of `gvid` in file `fid`
    pub fn get_vid(&self, fid: usize, gvid: i64) -> Option<i64> {
        if self.single_file {
            return Some(gvid);
        }
        self.vids.local(gvid, fid)
    }

    pub fn has_gvid_reference(&self, gvid: i64, fid: usize) -> bool {
        self.vids.local(gvid, fid).is_some()
    }

    pub fn get_gvid_reference(&self, gvid: i64, fid: usize) -> Option<i64> {
        self.vids.local(gvid, fid)
    }

    /// Every file variable registered against `gvid`, in registration order
    pub fn get_gvid_references(&self, gvid: i64) -> Vec<FileVarReference> {
        self.vids
            .references(gvid)
            .map(|(fid, vid)| FileVarReference::new(fid, vid))
            .collect()
    }

    /// File variables in other files that denote the same global variable
    /// as `filevar`
    pub fn get_vid_references(&self, filevar: FileVarReference) -> Vec<FileVarReference> {
        if self.single_file {
            return Vec::new();
        }
        match self.vids.global(filevar.fid, filevar.vid) {
            Some(gvid) => self
                .vids
                .references(gvid)
                .filter(|&(fid, _)| fid != filevar.fid)
                .map(|(fid, vid)| FileVarReference::new(fid, vid))
                .collect(),
            None => Vec::new(),
        }
    }

    /// The vid of `varref`'s variable in file `target`
    pub fn convert_vid(&self, varref: FileVarReference, target: usize) -> Option<i64> {
        if varref.fid == target {
            return Some(varref.vid);
        }
        let gvid = self.get_gvid(varref)?;
        let vid = self.vids.local(gvid, target);
        if vid.is_none() {
            warn!(%varref, target, gvid, "failed to convert vid");
        }
        vid
    }

    /// Global struct key of a file struct key; the local key itself in
    /// single-file mode
    pub fn get_gckey(&self, filekey: FileKeyReference) -> Option<i64> {
        if self.single_file {
            return Some(filekey.ckey);
        }
        let gckey = self.ckeys.global(filekey.fid, filekey.ckey);
        if gckey.is_none() {
            warn!(%filekey, "no global key found for file key");
        }
        gckey
    }

    /// The struct key of `filekey`'s struct in file `target`
    pub fn convert_ckey(&self, filekey: FileKeyReference, target: usize) -> Option<i64> {
        if filekey.fid == target {
            return Some(filekey.ckey);
        }
        let gckey = self.get_gckey(filekey)?;
        let ckey = self.ckeys.local(gckey, target);
        if ckey.is_none() {
            warn!(%filekey, target, gckey, "target file not found for global key");
        }
        ckey
    }

    /// File that defines the global variable or function `gvid`
    pub fn get_gvid_definition(&self, gvid: i64) -> Option<usize> {
        self.gviddefs.get(&gvid).copied()
    }

    /// Ceiling for vids created by the analysis in file `fid`
    pub fn fidvidmax(&self, fid: usize) -> Option<i64> {
        self.fidvidmax.get(&fid).copied()
    }

    // ------------------------------ Persistence -------------------------------

    /// Mappings registered for file `fid`
    pub fn file_xrefs(&self, fid: usize) -> FileXrefs {
        FileXrefs {
            ckeys: self.ckeys.forward.get(&fid).cloned().unwrap_or_default(),
            vids: self.vids.forward.get(&fid).cloned().unwrap_or_default(),
        }
    }

    /// Install the mappings of file `fid` persisted under `node`.
    ///
    /// Nothing is installed if any entry is malformed.
    pub fn add_xrefs(&mut self, fid: usize, node: &Element) -> Result<()> {
        let xrefs = FileXrefs::from_xml(node)?;
        self.add_file_xrefs(fid, &xrefs);
        Ok(())
    }

    pub fn add_file_xrefs(&mut self, fid: usize, xrefs: &FileXrefs) {
        self.ckeys.forward.entry(fid).or_default();
        for (&ckey, &gckey) in &xrefs.ckeys {
            self.add_ckey2gckey(FileKeyReference::new(fid, ckey), gckey);
        }
        self.vids.forward.entry(fid).or_default();
        for (&vid, &gvid) in &xrefs.vids {
            self.add_vid2gvid(FileVarReference::new(fid, vid), gvid);
        }
        debug!(
            fid,
            ckeys = xrefs.ckeys.len(),
            vids = xrefs.vids.len(),
            "added file xrefs"
        );
    }

    /// Read the document at `path` and install its mappings for file `fid`
    pub fn load_xrefs(&mut self, fid: usize, path: impl AsRef<Path>) -> Result<()> {
        let xrefs = FileXrefs::read(path)?;
        self.add_file_xrefs(fid, &xrefs);
        Ok(())
    }

    /// Write the mappings of file `fid` to `path`
    pub fn save_xrefs(&self, fid: usize, path: impl AsRef<Path>) -> Result<()> {
        self.file_xrefs(fid).write(path)
    }

    /// Write the mappings of `unit` to its configured location
    pub fn save_unit_xrefs<U: TranslationUnit + ?Sized>(&self, unit: &U) -> Result<bool> {
        match &self.config {
            Some(config) => {
                self.save_xrefs(unit.index(), config.xref_path(unit.path(), unit.name()))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const A: usize = 0;
    const B: usize = 1;

    fn two_files() -> IndexManager {
        let mut manager = IndexManager::new(false);
        manager.add_vid2gvid(FileVarReference::new(A, 7), 42);
        manager.add_vid2gvid(FileVarReference::new(B, 3), 42);
        manager
    }

    #[test]
    fn test_convert_between_files() {
        let manager = two_files();

        assert_eq!(manager.convert_vid(FileVarReference::new(A, 7), B), Some(3));
        assert_eq!(manager.convert_vid(FileVarReference::new(B, 3), A), Some(7));
        assert_eq!(
            manager.get_gvid_references(42),
            vec![FileVarReference::new(A, 7), FileVarReference::new(B, 3)]
        );
    }

    #[test]
    fn test_convert_within_same_file() {
        let manager = IndexManager::new(false);
        assert_eq!(manager.convert_vid(FileVarReference::new(A, 11), A), Some(11));
    }

    #[test]
    fn test_convert_to_unregistered_file() {
        let manager = two_files();
        assert_eq!(manager.convert_vid(FileVarReference::new(A, 7), 5), None);
        assert_eq!(manager.convert_vid(FileVarReference::new(A, 8), B), None);
    }

    #[test]
    fn test_single_file_identity() {
        let manager = IndexManager::new(true);
        assert_eq!(manager.get_gvid(FileVarReference::new(0, 17)), Some(17));
        assert_eq!(manager.get_vid(0, 17), Some(17));
        assert_eq!(manager.get_gckey(FileKeyReference::new(0, 4)), Some(4));
        assert!(manager.get_vid_references(FileVarReference::new(0, 17)).is_empty());
    }

    #[test]
    fn test_unknown_file_is_not_an_error() {
        let manager = two_files();
        assert_eq!(manager.get_gvid(FileVarReference::new(9, 7)), None);
        assert_eq!(manager.get_vid(9, 42), None);
        assert!(manager.get_gvid_references(1000).is_empty());
    }

    #[test]
    fn test_vid_references_exclude_self() {
        let mut manager = two_files();
        manager.add_vid2gvid(FileVarReference::new(2, 5), 42);

        assert_eq!(
            manager.get_vid_references(FileVarReference::new(B, 3)),
            vec![FileVarReference::new(A, 7), FileVarReference::new(2, 5)]
        );
    }

    #[test]
    fn test_gvid_reference_lookup() {
        let manager = two_files();
        assert!(manager.has_gvid_reference(42, A));
        assert!(!manager.has_gvid_reference(42, 2));
        assert!(!manager.has_gvid_reference(41, A));
        assert_eq!(manager.get_gvid_reference(42, B), Some(3));
    }

    #[test]
    fn test_overwrite_keeps_maps_in_lockstep() {
        let mut manager = two_files();
        manager.add_vid2gvid(FileVarReference::new(A, 7), 50);

        assert_eq!(manager.get_gvid(FileVarReference::new(A, 7)), Some(50));
        assert_eq!(
            manager.get_gvid_references(42),
            vec![FileVarReference::new(B, 3)]
        );
        assert_eq!(
            manager.get_gvid_references(50),
            vec![FileVarReference::new(A, 7)]
        );
    }

    #[test]
    fn test_second_local_for_same_global_replaces_first() {
        let mut manager = two_files();
        manager.add_vid2gvid(FileVarReference::new(A, 8), 42);

        assert_eq!(manager.get_gvid(FileVarReference::new(A, 8)), Some(42));
        assert_eq!(manager.get_gvid(FileVarReference::new(A, 7)), None);
        assert_eq!(manager.get_vid(A, 42), Some(8));
    }

    #[test]
    fn test_ckey_conversion() {
        let mut manager = IndexManager::new(false);
        manager.add_ckey2gckey(FileKeyReference::new(A, 2), 10);
        manager.add_ckey2gckey(FileKeyReference::new(B, 6), 10);

        assert_eq!(manager.get_gckey(FileKeyReference::new(B, 6)), Some(10));
        assert_eq!(manager.convert_ckey(FileKeyReference::new(A, 2), B), Some(6));
        assert_eq!(manager.convert_ckey(FileKeyReference::new(A, 2), 3), None);
        assert_eq!(manager.convert_ckey(FileKeyReference::new(A, 9), B), None);
    }

    #[test]
    fn test_file_xrefs_are_sorted() {
        let mut manager = IndexManager::new(false);
        manager.add_vid2gvid(FileVarReference::new(A, 9), 1);
        manager.add_vid2gvid(FileVarReference::new(A, 2), 2);
        manager.add_ckey2gckey(FileKeyReference::new(A, 5), 3);

        let xrefs = manager.file_xrefs(A);
        assert_eq!(xrefs.vids.keys().copied().collect::<Vec<_>>(), vec![2, 9]);
        assert_eq!(xrefs.ckeys.get(&5), Some(&3));
        assert!(manager.file_xrefs(B).is_empty());
    }
}
