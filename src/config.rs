/// Settings for a [`Context`](crate::Context).
///
/// # Examples
///
/// ```
/// use loglang::{Config, Context};
///
/// let config = Config::default().with_max_cascade_depth(Some(32)).with_builtins(false);
/// let ctx = Context::with_config(config);
/// assert!(!ctx.has_function("sum"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// How many program runs may nest inside one cascade before further runs
    /// are refused. The default stays well inside a 2 MB thread stack.
    /// `None` disables the limit, so assignment cycles between ordinary
    /// symbols recurse until the stack overflows.
    pub max_cascade_depth: Option<usize>,

    /// Register `sum`, `print`, `round`, `debug` and `to_int` on creation.
    pub builtins: bool,
}

impl Config {
    pub const DEFAULT_MAX_CASCADE_DEPTH: usize = 64;

    pub fn with_max_cascade_depth(mut self, depth: Option<usize>) -> Self {
        self.max_cascade_depth = depth;
        self
    }

    pub fn with_builtins(mut self, builtins: bool) -> Self {
        self.builtins = builtins;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_cascade_depth: Some(Self::DEFAULT_MAX_CASCADE_DEPTH),
            builtins: true,
        }
    }
}
