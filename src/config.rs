//! Engine configuration.

/// Tunables for a [`StyleEngine`](crate::engine::StyleEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Skip `@`-prefixed keys (`@keyframes`, `@font-face`, ...) when building
    /// sheets instead of reporting them as malformed selectors.
    pub skip_reserved_blocks: bool,
    /// Emit `property: ""` for properties that dropped out of a node's cascade.
    pub emit_property_resets: bool,
    /// Reuse the compiled sheet when an identical declaration map is
    /// registered again.
    pub memoize_sheets: bool,
    /// Selectors with more simple tokens than this are rejected.
    pub max_chain_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skip_reserved_blocks: true,
            emit_property_resets: true,
            memoize_sheets: true,
            max_chain_len: 32,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_reserved_blocks(mut self, skip: bool) -> Self {
        self.skip_reserved_blocks = skip;
        self
    }

    pub fn with_property_resets(mut self, emit: bool) -> Self {
        self.emit_property_resets = emit;
        self
    }

    pub fn with_sheet_memo(mut self, memoize: bool) -> Self {
        self.memoize_sheets = memoize;
        self
    }

    pub fn with_max_chain_len(mut self, len: usize) -> Self {
        self.max_chain_len = len;
        self
    }
}
