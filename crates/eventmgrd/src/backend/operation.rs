//! Typed parameter slots passed to an invocation.

/// Number of parameter slots in every [`Operation`].
pub const PARAM_COUNT: usize = 4;

/// One invocation parameter. The variant fixes the direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Param {
    /// Unused slot.
    #[default]
    None,
    /// Pair of integers, readable and writable by the module.
    Value {
        /// First integer.
        a: u32,
        /// Second integer.
        b: u32,
    },
    /// Buffer read by the module.
    Input(Vec<u8>),
    /// Buffer of fixed capacity written by the module.
    Output(Vec<u8>),
    /// Buffer read and rewritten by the module.
    InOut(Vec<u8>),
}

impl Param {
    /// Bytes of a buffer parameter.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Input(bytes) | Self::Output(bytes) | Self::InOut(bytes) => Some(bytes),
            Self::None | Self::Value { .. } => None,
        }
    }

    /// Writable bytes of an output or in/out parameter.
    pub fn writable(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            Self::Output(bytes) | Self::InOut(bytes) => Some(bytes),
            Self::None | Self::Value { .. } | Self::Input(_) => None,
        }
    }

    /// Integers of a value parameter.
    #[must_use]
    pub const fn value(&self) -> Option<(u32, u32)> {
        match self {
            Self::Value { a, b } => Some((*a, *b)),
            _ => None,
        }
    }
}

/// Parameters of a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operation {
    params: [Param; PARAM_COUNT],
}

impl Operation {
    /// Builds an operation from its four slots.
    #[must_use]
    pub const fn new(params: [Param; PARAM_COUNT]) -> Self {
        Self { params }
    }

    /// Slot at `index`, if in range.
    #[must_use]
    pub fn param(&self, index: usize) -> Option<&Param> {
        self.params.get(index)
    }

    /// Mutable slot at `index`, if in range.
    pub fn param_mut(&mut self, index: usize) -> Option<&mut Param> {
        self.params.get_mut(index)
    }

    /// All slots in order.
    #[must_use]
    pub const fn params(&self) -> &[Param; PARAM_COUNT] {
        &self.params
    }

    /// Consumes the operation, returning its slots.
    #[must_use]
    pub fn into_params(self) -> [Param; PARAM_COUNT] {
        self.params
    }
}
