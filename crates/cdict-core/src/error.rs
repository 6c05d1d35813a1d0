use thiserror::Error;

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Unable to retrieve item {index} from table {table} (size {size})")]
    MissingIndex {
        table: String,
        index: usize,
        size: usize,
    },

    #[error("Unknown {family} variant: {tag:?}")]
    UnknownVariant { family: &'static str, tag: String },

    #[error("Dictionary table {0} not found")]
    MissingTable(String),

    #[error(
        "Dictionary record mismatch for {tag} in {name}: Expected {expected_tags} tags and \
         {expected_args} args, but found {found_tags} tags and {found_args}"
    )]
    ValueMismatch {
        tag: String,
        name: String,
        expected_tags: usize,
        expected_args: usize,
        found_tags: usize,
        found_args: usize,
    },

    #[error("Tag {tag:?} is already registered for {family}")]
    DuplicateTag { family: &'static str, tag: String },

    #[error("Checkpoint at {next} in table {table} is no longer active")]
    StaleCheckpoint { table: String, next: usize },

    #[error("Cannot bulk load table {0} while a checkpoint is active")]
    CheckpointActive(String),

    #[error("Reserved index {index} in table {table} cannot hold a different record")]
    ReservedIndexConflict { table: String, index: usize },

    #[error("Malformed entry in table {table}: {reason}")]
    MalformedEntry { table: String, reason: String },

    #[error("Record {index} in {table} has invalid reference argument {arg} at position {position}")]
    InvalidReference {
        table: String,
        index: usize,
        position: usize,
        arg: i64,
    },

    #[error("Tag {tag:?} in table {table} cannot be encoded in a comma-joined list")]
    UnencodableTag { table: String, tag: String },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = DictionaryError> = std::result::Result<T, E>;
