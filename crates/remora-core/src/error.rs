pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A `@>` declaration carried a style payload that is not valid JSON. This aborts the
    /// whole parse; style payloads are never half-applied.
    #[error("invalid line-style JSON ({source_key} @> {target_key}): {message}")]
    StyleParse {
        source_key: String,
        target_key: String,
        message: String,
    },
}
