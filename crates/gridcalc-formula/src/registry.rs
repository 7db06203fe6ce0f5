//! Function definitions and the registry that holds them

use crate::invoke::FunctionImpl;
use ahash::AHashMap;
use bitflags::bitflags;
use once_cell::sync::Lazy;

bitflags! {
    /// Behavioral traits of a function
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u8 {
        /// Produces an array on its own (TRANSPOSE, SEQUENCE)
        const ARRAY_RETURNING = 1 << 0;
        /// Has effects beyond its return value
        const SIDE_EFFECT = 1 << 1;
        /// Recalculates on every evaluation (RAND, TODAY)
        const VOLATILE = 1 << 2;
        /// Stored with the `_xlfn.` prefix in files
        const FUTURE = 1 << 3;
    }
}

/// How a function's parameters treat ranges, before any marked set is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeClass {
    None,
    Except,
    Only,
    All,
}

/// A set of 0-based parameter positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamSet([u64; 4]);

impl ParamSet {
    /// Positions beyond 255 are ignored
    pub fn of(positions: &[usize]) -> Self {
        let mut bits = [0u64; 4];
        for &p in positions.iter().filter(|&&p| p < 256) {
            bits[p / 64] |= 1 << (p % 64);
        }
        Self(bits)
    }

    pub fn contains(&self, position: usize) -> bool {
        position < 256 && self.0[position / 64] & (1 << (position % 64)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&w| w == 0)
    }
}

/// Which parameters accept a reference as-is
///
/// Parameters that do not accept ranges are implicitly intersected in
/// scalar invocation and broadcast element-wise in array invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeParams {
    /// No parameter accepts a range
    #[default]
    None,
    /// Every parameter is intersected except the marked ones, which accept ranges
    Except(ParamSet),
    /// Exactly the marked parameters are intersected
    Only(ParamSet),
    /// Every parameter accepts ranges
    All,
}

impl RangeParams {
    /// Combine a class with its marked positions
    ///
    /// # Panics
    ///
    /// If marked positions are given for `None` or `All`.
    pub fn from_parts(class: RangeClass, marked: ParamSet) -> Self {
        match class {
            RangeClass::None => {
                assert!(marked.is_empty(), "RangeClass::None cannot mark parameters");
                RangeParams::None
            }
            RangeClass::All => {
                assert!(marked.is_empty(), "RangeClass::All cannot mark parameters");
                RangeParams::All
            }
            RangeClass::Except => RangeParams::Except(marked),
            RangeClass::Only => RangeParams::Only(marked),
        }
    }

    pub fn except(positions: &[usize]) -> Self {
        RangeParams::Except(ParamSet::of(positions))
    }

    pub fn only(positions: &[usize]) -> Self {
        RangeParams::Only(ParamSet::of(positions))
    }

    /// Whether the parameter at `position` receives references unchanged
    pub fn accepts_range(&self, position: usize) -> bool {
        match self {
            RangeParams::None => false,
            RangeParams::All => true,
            RangeParams::Except(marked) => marked.contains(position),
            RangeParams::Only(marked) => !marked.contains(position),
        }
    }

    pub fn class(&self) -> RangeClass {
        match self {
            RangeParams::None => RangeClass::None,
            RangeParams::Except(_) => RangeClass::Except,
            RangeParams::Only(_) => RangeClass::Only,
            RangeParams::All => RangeClass::All,
        }
    }
}

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    pub flags: FunctionFlags,
    pub ranges: RangeParams,
    /// Body; a definition without one evaluates to `#NAME?`
    pub implementation: Option<FunctionImpl>,
}

impl FunctionDef {
    /// Whether `count` arguments are within the arity bounds
    pub fn accepts_arg_count(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    pub fn is_volatile(&self) -> bool {
        self.flags.contains(FunctionFlags::VOLATILE)
    }

    pub fn is_future(&self) -> bool {
        self.flags.contains(FunctionFlags::FUTURE)
    }

    pub fn is_array_returning(&self) -> bool {
        self.flags.contains(FunctionFlags::ARRAY_RETURNING)
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("flags", &self.flags)
            .field("ranges", &self.ranges)
            .field("has_body", &self.implementation.is_some())
            .finish()
    }
}

static BUILTIN: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::with_builtins);

/// Function registry
///
/// Built completely before use and then only read, so a registry can be
/// shared between threads.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_statistical_functions();
        registry.register_lookup_functions();
        registry.register_date_functions();
        registry
    }

    /// The shared built-in registry
    pub fn builtin() -> &'static FunctionRegistry {
        &BUILTIN
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function, replacing any previous definition of the name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Names of all registered functions, unordered
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.functions.values().map(|def| def.name)
    }
}
