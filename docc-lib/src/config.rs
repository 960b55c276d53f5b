use im::HashMap;

/// Settings shared by every stage of the pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// how often a parser may decline the same symbol before the rest of
    /// the file is given up on
    pub retry_limit: usize,
    /// emit position comments into generated assembly
    pub annotate: bool,
    pub max_include_depth: usize,
    /// function ids the assembler resolves `invoke` operands to
    pub functions: HashMap<String, u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_limit: 1024,
            annotate: false,
            max_include_depth: 16,
            functions: HashMap::new(),
        }
    }
}
