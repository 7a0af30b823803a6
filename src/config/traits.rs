use crate::error::Result;

/// A named, self-validating section of the application configuration.
pub trait ConfigSection {
    fn section_name() -> &'static str;

    /// Checks internal consistency; called before any section is used.
    fn validate(&self) -> Result<()>;
}
