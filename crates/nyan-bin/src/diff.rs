use anyhow::Result;
use inquire::Confirm;
use similar::{ChangeTag, TextDiff};
use std::fmt::Write;

/// Colored line diff with three lines of context around each change, or
/// `None` when the two texts are identical.
pub fn render_diff(old_content: &str, new_content: &str) -> Result<Option<String>> {
    let diff = TextDiff::from_lines(old_content, new_content);
    let mut output = String::new();
    let mut has_changes = false;

    for (i, group) in diff.grouped_ops(3).iter().enumerate() {
        if i > 0 {
            writeln!(output, "{:-^1$}", "", 40)?;
        }
        for op in group {
            for change in diff.iter_changes(op) {
                let (sign, style) = match change.tag() {
                    ChangeTag::Delete => ("- ", "\x1b[31m"), // Red
                    ChangeTag::Insert => ("+ ", "\x1b[32m"), // Green
                    ChangeTag::Equal => ("  ", "\x1b[0m"),   // Default
                };
                write!(output, "{}{}{}\x1b[0m", style, sign, change.value())?;
                if change.missing_newline() {
                    writeln!(output)?;
                }
                if change.tag() != ChangeTag::Equal {
                    has_changes = true;
                }
            }
        }
    }

    Ok(has_changes.then_some(output))
}

pub fn show_content_change(
    file_path: &std::path::Path,
    old_content: &str,
    new_content: &str,
) -> Result<()> {
    if let Some(rendered) = render_diff(old_content, new_content)? {
        println!("\n📝 Content change: {}", file_path.display());
        print!("{}", rendered);
    }
    Ok(())
}

pub fn show_path_mapping(old_path: &std::path::Path, new_path: &std::path::Path, kind: &str) {
    println!("📁 {}:", kind);
    println!("  \x1b[31m- {}\x1b[0m", old_path.display());
    println!("  \x1b[32m+ {}\x1b[0m", new_path.display());
}

pub fn confirm(prompt: &str) -> Result<bool> {
    let answer = Confirm::new(prompt).with_default(true).prompt()?;
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_detection() {
        let rendered = render_diff("name: template\nversion: 1\n", "name: nyan\nversion: 1\n")
            .unwrap()
            .unwrap();

        assert!(rendered.contains("- name: template"));
        assert!(rendered.contains("+ name: nyan"));
        assert!(rendered.contains("  version: 1"));
    }

    #[test]
    fn test_no_diff_detection() {
        let content = "This is the same content\nwith multiple lines";

        assert!(render_diff(content, content).unwrap().is_none());
    }

    #[test]
    fn test_diff_without_trailing_newline() {
        let rendered = render_diff("TEMPLATE README", "NYAN README").unwrap().unwrap();

        assert!(rendered.ends_with("\x1b[0m\n"));
        assert_eq!(rendered.lines().count(), 2);
    }
}
