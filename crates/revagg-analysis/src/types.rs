/// A two-message chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// The top-level JSON shape the caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Object,
    Array,
}

impl ResponseShape {
    /// Opening delimiter of a value of this shape.
    #[must_use]
    pub fn opening(self) -> char {
        match self {
            ResponseShape::Object => '{',
            ResponseShape::Array => '[',
        }
    }
}
