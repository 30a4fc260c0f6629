use std::fmt::Display;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NameError {
    #[error("Project name must not be empty")]
    Empty,
    #[error(
        "Project name '{0}' must start with a letter and contain only letters, numbers, hyphens, and underscores"
    )]
    Invalid(String),
}

/// A validated project identifier: an ASCII letter followed by ASCII letters,
/// digits, hyphens or underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(name: &str) -> Result<Self, NameError> {
        let mut chars = name.chars();
        let first = chars.next().ok_or(NameError::Empty)?;

        if !first.is_ascii_alphabetic() {
            return Err(NameError::Invalid(name.to_string()));
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(NameError::Invalid(name.to_string()));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name with its first letter upper-cased and the rest untouched.
    pub fn capitalized(&self) -> String {
        capitalize(&self.0)
    }

    pub fn upper(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

impl FromStr for ProjectName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl Display for ProjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
