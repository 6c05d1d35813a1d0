//! Test fixtures for the dictionary and cross-reference crates
//!
//! Provides small persisted documents and temporary analysis directories

use std::fs;
use std::path::{Path, PathBuf};

/// A dictionary with every table section present.
///
/// - typ 0: `void`, typ 1: `int`, typ 2: `int *` with `aligned(4)`,
///   typ 3: `int[10]`, typ 4: `int (int x)`, typ 5: struct with ckey 12
/// - attrparam 1 is a self-referential `astar`
pub const SAMPLE_DICTIONARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<c-dictionary>
  <attrparam-table>
    <n t="aint" a="4" ix="0"/>
    <n t="astar" a="1" ix="1"/>
  </attrparam-table>
  <attribute-table>
    <n t="aligned" a="0" ix="0"/>
  </attribute-table>
  <attributes-table>
    <n ix="0"/>
    <n a="0" ix="1"/>
  </attributes-table>
  <constant-table>
    <n t="int,10,iint" ix="0"/>
  </constant-table>
  <exp-table>
    <n t="const" a="0" ix="0"/>
  </exp-table>
  <funarg-table>
    <n t="x" a="1,0" ix="0"/>
  </funarg-table>
  <funargs-table>
    <n a="0" ix="0"/>
  </funargs-table>
  <typ-table>
    <n t="tvoid" a="0" ix="0"/>
    <n t="tint,iint" a="0" ix="1"/>
    <n t="tptr" a="1,1" ix="2"/>
    <n t="tarray" a="1,0,0" ix="3"/>
    <n t="tfun" a="1,0,0,0" ix="4"/>
    <n t="tcomp" a="12,0" ix="5"/>
  </typ-table>
</c-dictionary>
"#;

/// A dictionary without its `exp-table` section
pub const DICTIONARY_MISSING_TABLE: &str = r#"<c-dictionary>
  <attrparam-table/>
  <attribute-table/>
  <attributes-table/>
  <constant-table/>
  <funarg-table/>
  <funargs-table/>
  <typ-table>
    <n t="tvoid" a="0" ix="0"/>
  </typ-table>
</c-dictionary>
"#;

/// A dictionary whose `typ-table` holds a tag no family registers
pub const DICTIONARY_UNKNOWN_TAG: &str = r#"<c-dictionary>
  <attrparam-table/>
  <attribute-table/>
  <attributes-table>
    <n ix="0"/>
  </attributes-table>
  <constant-table/>
  <exp-table/>
  <funarg-table/>
  <funargs-table/>
  <typ-table>
    <n t="tvoid" a="0" ix="0"/>
    <n t="tquantum" a="0" ix="1"/>
  </typ-table>
</c-dictionary>
"#;

/// Xrefs of a file that maps local vid 7 to global vid 42 and ckey 2 to 10
pub const XREFS_FILE_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<global-xrefs>
  <compinfo-xrefs>
    <cxref ckey="2" gckey="10"/>
  </compinfo-xrefs>
  <varinfo-xrefs>
    <vxref vid="7" gvid="42"/>
    <vxref vid="8" gvid="43"/>
  </varinfo-xrefs>
</global-xrefs>
"#;

/// Xrefs of a file that maps local vid 3 to global vid 42 and ckey 6 to 10
pub const XREFS_FILE_B: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<global-xrefs>
  <compinfo-xrefs>
    <cxref ckey="6" gckey="10"/>
  </compinfo-xrefs>
  <varinfo-xrefs>
    <vxref vid="3" gvid="42"/>
  </varinfo-xrefs>
</global-xrefs>
"#;

/// Xrefs with a variable entry lacking its `gvid` attribute
pub const XREFS_MISSING_GVID: &str = r#"<global-xrefs>
  <compinfo-xrefs/>
  <varinfo-xrefs>
    <vxref vid="1" gvid="5"/>
    <vxref vid="2"/>
  </varinfo-xrefs>
</global-xrefs>
"#;

/// Name of the project used by [`FixtureType::TwoFileProject`]
pub const PROJECT_NAME: &str = "demo";

/// Test fixture categories
pub enum FixtureType {
    /// Empty analysis directory
    EmptyProject,
    /// `src/a` and `b`, both with persisted xrefs, plus `cdict.toml`
    TwoFileProject,
    /// A single file whose xref document is malformed
    MalformedXrefs,
}

/// Main test fixtures provider
pub struct TestFixtures {
    temp_dir: Option<tempfile::TempDir>,
}

impl Default for TestFixtures {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixtures {
    pub fn new() -> Self {
        Self { temp_dir: None }
    }

    /// Create a temporary target directory laid out for `fixture_type`
    pub fn setup(&mut self, fixture_type: FixtureType) -> PathBuf {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        match fixture_type {
            FixtureType::EmptyProject => self.setup_empty(&path),
            FixtureType::TwoFileProject => self.setup_two_files(&path),
            FixtureType::MalformedXrefs => self.setup_malformed(&path),
        }

        self.temp_dir = Some(dir);
        path
    }

    /// `<base>/<project>.cch/a`
    pub fn analysis_dir(base: &Path) -> PathBuf {
        base.join(format!("{}.cch", PROJECT_NAME)).join("a")
    }

    /// TOML configuration pointing at `base`
    pub fn config_toml(base: &Path, single_file: bool) -> String {
        format!(
            "single_file = {}\ntarget_path = '{}'\nproject_name = '{}'\n",
            single_file,
            base.display(),
            PROJECT_NAME
        )
    }

    fn setup_empty(&self, base: &Path) {
        fs::create_dir_all(Self::analysis_dir(base)).unwrap();
    }

    fn setup_two_files(&self, base: &Path) {
        let analysis = Self::analysis_dir(base);
        fs::create_dir_all(analysis.join("src")).unwrap();

        fs::write(analysis.join("src").join("a_gxrefs.xml"), XREFS_FILE_A).unwrap();
        fs::write(analysis.join("b_gxrefs.xml"), XREFS_FILE_B).unwrap();
        fs::write(base.join("cdict.toml"), Self::config_toml(base, false)).unwrap();
    }

    fn setup_malformed(&self, base: &Path) {
        let analysis = Self::analysis_dir(base);
        fs::create_dir_all(&analysis).unwrap();

        fs::write(analysis.join("bad_gxrefs.xml"), XREFS_MISSING_GVID).unwrap();
        fs::write(base.join("cdict.toml"), Self::config_toml(base, false)).unwrap();
    }
}
