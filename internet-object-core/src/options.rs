/// Knobs threaded through the whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// In strict mode the tokenizer raises on the first lexical error
    /// instead of emitting an ERROR token and carrying on.
    pub strict: bool,
    /// How deep `$name` schema references may resolve while processing a
    /// single row before the processor declares the schema circular.
    pub max_schema_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            strict: false,
            max_schema_depth: 64,
        }
    }
}
