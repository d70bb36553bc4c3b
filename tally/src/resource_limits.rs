/// Resource limits to keep evaluation predictable
///
/// Templates are authored by players, so formulas and object chains may be
/// malformed or accidentally cyclic. These limits are generous enough for
/// every real template while bounding the work a single evaluation can do.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Maximum formula length in bytes
    /// Real usage: ~50 bytes, Limit: 4KB
    pub max_formula_length: usize,

    /// Maximum parenthesis nesting depth inside a formula
    /// Real usage: ~3 levels, Limit: 64
    pub max_expression_depth: usize,

    /// Maximum chain length when an object's ownership or active window
    /// refers to another object
    /// Real usage: 1-2 hops, Limit: 16
    pub max_reference_depth: usize,

    /// Maximum nesting depth of the category forest
    /// Real usage: 2 levels, Limit: 32
    pub max_category_depth: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ResourceLimits {
    pub const DEFAULT: ResourceLimits = ResourceLimits {
        max_formula_length: 4 * 1024, // 4 KB
        max_expression_depth: 64,
        max_reference_depth: 16,
        max_category_depth: 32,
    };

    /// Create a new ResourceLimits with default values
    pub fn new() -> Self {
        Self::default()
    }
}
