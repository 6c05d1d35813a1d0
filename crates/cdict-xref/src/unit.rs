//! Translation units as seen by the index manager

/// The parts of an analyzed source file the index manager needs when the
/// file joins a whole-program run
pub trait TranslationUnit {
    /// Index of the file within the run
    fn index(&self) -> usize;

    /// Directory of the file relative to the project root, if any
    fn path(&self) -> Option<&str>;

    /// File name without extension
    fn name(&self) -> &str;

    /// Local vids of the global variables defined in the file
    fn variable_definitions(&self) -> Vec<i64>;

    /// Names and local vids of the functions defined in the file
    fn function_definitions(&self) -> Vec<(&str, i64)>;
}

/// Plain description of a translation unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFile {
    pub index: usize,
    pub path: Option<String>,
    pub name: String,
    pub variable_definitions: Vec<i64>,
    pub function_definitions: Vec<(String, i64)>,
}

impl SourceFile {
    pub fn new(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_variable(mut self, vid: i64) -> Self {
        self.variable_definitions.push(vid);
        self
    }

    pub fn with_function(mut self, name: impl Into<String>, vid: i64) -> Self {
        self.function_definitions.push((name.into(), vid));
        self
    }
}

impl TranslationUnit for SourceFile {
    fn index(&self) -> usize {
        self.index
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn variable_definitions(&self) -> Vec<i64> {
        self.variable_definitions.clone()
    }

    fn function_definitions(&self) -> Vec<(&str, i64)> {
        self.function_definitions
            .iter()
            .map(|(name, vid)| (name.as_str(), *vid))
            .collect()
    }
}
