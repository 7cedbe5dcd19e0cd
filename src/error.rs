use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogError {
    /// The score still contains unexpanded repeats; the engine only accepts
    /// fully expanded songs.
    #[error("Score '{song}' is not expandable and cannot be converted")]
    NotExpandable { song: String },

    /// The key oracle broke its contract: it must return exactly one
    /// estimate per measure.
    #[error("Estimated key sequence has {keys} entries for {measures} measures")]
    KeyMeasureMismatch { keys: usize, measures: usize },

    /// The song document could not be deserialized.
    #[error("Invalid score document: {0}")]
    InvalidScore(#[from] serde_yaml::Error),
}
