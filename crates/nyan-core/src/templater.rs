use std::ffi::OsStr;
use std::path::Path;
use regex::{NoExpand, Regex, RegexBuilder};
use tracing::debug;

use crate::name::{capitalize, ProjectName};

/// Placeholder marker used in template names and contents.
pub const TOKEN: &str = "template";

/// Extensions whose contents get token substitution, lower-case and without the dot.
pub const TEXT_EXTENSIONS: [&str; 7] = ["py", "json", "md", "txt", "html", "js", "css"];

pub fn is_text_extension(ext: &str) -> bool {
    TEXT_EXTENSIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(ext))
}

pub fn has_text_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map_or(false, is_text_extension)
}

pub fn try_decode_as_text(bytes: Vec<u8>) -> Option<String> {
    String::from_utf8(bytes).ok()
}

/// Replaces every case-insensitive occurrence of the token in a path
/// component with the project name exactly as given.
pub struct PathRenamer {
    token_pattern: Regex,
    replacement: String,
}

/// Rewrites `template`, `Template` and `TEMPLATE` in file contents with the
/// matching case variant of the project name, in that order.
pub struct ContentRewriter {
    replacements: [(String, String); 3],
}

impl PathRenamer {
    pub fn new(name: &ProjectName) -> Result<Self, regex::Error> {
        let token_pattern = RegexBuilder::new(&regex::escape(TOKEN))
            .case_insensitive(true)
            .build()?;

        Ok(Self {
            token_pattern,
            replacement: name.as_str().to_string(),
        })
    }

    pub fn rename(&self, name: &str) -> String {
        self.token_pattern
            .replace_all(name, NoExpand(&self.replacement))
            .into_owned()
    }

    pub fn process_path_component(&self, path: &Path) -> Option<String> {
        let name_str = path.file_name()?.to_str()?;
        if self.token_pattern.is_match(name_str) {
            let new_name = self.rename(name_str);
            debug!("Path replacement: '{}' -> '{}'", name_str, new_name);
            Some(new_name)
        } else {
            None
        }
    }
}

impl ContentRewriter {
    pub fn new(name: &ProjectName) -> Self {
        Self {
            replacements: [
                (TOKEN.to_string(), name.as_str().to_string()),
                (capitalize(TOKEN), name.capitalized()),
                (TOKEN.to_ascii_uppercase(), name.upper()),
            ],
        }
    }

    pub fn process_content(&self, content: &str) -> Option<String> {
        let mut modified_content = content.to_string();

        for (token, replacement) in &self.replacements {
            if modified_content.contains(token.as_str()) {
                debug!(
                    "Content replacement: '{}' -> '{}' ({} occurrences)",
                    token,
                    replacement,
                    modified_content.matches(token.as_str()).count()
                );
                modified_content = modified_content.replace(token.as_str(), replacement);
            }
        }

        if modified_content != content {
            Some(modified_content)
        } else {
            None
        }
    }
}
