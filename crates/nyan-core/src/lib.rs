use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod name;
pub mod templater;
pub mod toe;
pub mod toolchain;

pub use name::{NameError, ProjectName};
pub use templater::{ContentRewriter, PathRenamer, is_text_extension, try_decode_as_text};

#[derive(thiserror::Error, Debug)]
pub enum ScaffoldError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Name(#[from] NameError),
    #[error("Template folder not found: {}", .0.display())]
    TemplateMissing(PathBuf),
    #[error("Template path is not a directory: {}", .0.display())]
    TemplateNotDirectory(PathBuf),
    #[error("Project already exists at {}", .0.display())]
    DestinationExists(PathBuf),
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T, E = ScaffoldError> = std::result::Result<T, E>;

/// Summary of a freshly instantiated project tree.
#[derive(Debug)]
pub struct DestinationTree {
    pub root: PathBuf,
    pub directories_created: usize,
    pub files_copied: usize,
    pub files_rewritten: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One entry of a dry run: where it comes from, where it would land, and
/// the content change it would receive.
#[derive(Debug)]
pub struct PlannedEntry {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: EntryKind,
    pub rewrite: Option<PlannedRewrite>,
}

#[derive(Debug)]
pub struct PlannedRewrite {
    pub original: String,
    pub rewritten: String,
}

#[derive(Debug, PartialEq, Eq)]
pub struct TreeLine {
    pub depth: usize,
    pub name: String,
    pub is_dir: bool,
}

struct Rules {
    renamer: PathRenamer,
    rewriter: ContentRewriter,
}

impl Rules {
    fn new(project_name: &ProjectName) -> Result<Self> {
        Ok(Self {
            renamer: PathRenamer::new(project_name)?,
            rewriter: ContentRewriter::new(project_name),
        })
    }

    fn destination_for(&self, source: &Path, dest_dir: &Path) -> PathBuf {
        match self.renamer.process_path_component(source) {
            Some(new_name) => dest_dir.join(new_name),
            None => dest_dir.join(source.file_name().unwrap_or_default()),
        }
    }
}

pub fn check_preconditions(template_root: &Path, dest_root: &Path) -> Result<()> {
    if !template_root.exists() {
        return Err(ScaffoldError::TemplateMissing(template_root.to_path_buf()));
    }
    if !template_root.is_dir() {
        return Err(ScaffoldError::TemplateNotDirectory(template_root.to_path_buf()));
    }
    if dest_root.exists() {
        return Err(ScaffoldError::DestinationExists(dest_root.to_path_buf()));
    }
    Ok(())
}

/// Copies `template_root` into a new `dest_root`, renaming token-bearing
/// paths and rewriting the token inside text files.
///
/// Fails before touching the filesystem when the template is missing or the
/// destination already exists. A copy failure mid-way aborts the run and
/// leaves whatever was already written in place.
pub fn instantiate(
    template_root: &Path,
    dest_root: &Path,
    project_name: &ProjectName,
) -> Result<DestinationTree> {
    check_preconditions(template_root, dest_root)?;
    let rules = Rules::new(project_name)?;

    info!("Instantiating {:?} -> {:?}", template_root, dest_root);

    let mut tree = DestinationTree {
        root: dest_root.to_path_buf(),
        directories_created: 0,
        files_copied: 0,
        files_rewritten: 0,
    };

    copy_directory_recursive(template_root, dest_root, &rules, &mut tree)?;

    info!(
        "Instantiation complete: {} directories created, {} files copied, {} files rewritten",
        tree.directories_created, tree.files_copied, tree.files_rewritten
    );

    Ok(tree)
}

fn copy_directory_recursive(
    src: &Path,
    dest: &Path,
    rules: &Rules,
    tree: &mut DestinationTree,
) -> Result<()> {
    debug!("Copying directory: {:?} -> {:?}", src, dest);
    fs::create_dir_all(dest)?;
    tree.directories_created += 1;

    for entry in fs::read_dir(src)? {
        let path = entry?.path();
        let dest_path = rules.destination_for(&path, dest);

        if path.is_dir() {
            copy_directory_recursive(&path, &dest_path, rules, tree)?;
        } else {
            copy_file(&path, &dest_path, rules, tree)?;
        }
    }

    Ok(())
}

fn copy_file(src: &Path, dest: &Path, rules: &Rules, tree: &mut DestinationTree) -> Result<()> {
    debug!("Copying file: {:?} -> {:?}", src, dest);
    fs::copy(src, dest)?;
    tree.files_copied += 1;

    if templater::has_text_extension(src) && rewrite_in_place(dest, &rules.rewriter) {
        tree.files_rewritten += 1;
    }

    Ok(())
}

/// Best-effort: any failure leaves the plain copy as it is.
fn rewrite_in_place(file_path: &Path, rewriter: &ContentRewriter) -> bool {
    let Some(content) = fs::read(file_path).ok().and_then(try_decode_as_text) else {
        debug!("Skipping undecodable file: {:?}", file_path);
        return false;
    };

    match rewriter.process_content(&content) {
        Some(new_content) => match fs::write(file_path, new_content) {
            Ok(()) => {
                debug!("Rewrote contents of: {:?}", file_path);
                true
            }
            Err(e) => {
                debug!("Could not rewrite {:?}: {}", file_path, e);
                false
            }
        },
        None => false,
    }
}

/// Walks the template exactly as [`instantiate`] would and reports what it
/// would create, without writing anything.
pub fn preview(
    template_root: &Path,
    dest_root: &Path,
    project_name: &ProjectName,
) -> Result<Vec<PlannedEntry>> {
    check_preconditions(template_root, dest_root)?;
    let rules = Rules::new(project_name)?;

    info!("Previewing {:?} -> {:?}", template_root, dest_root);

    let mut plan = Vec::new();
    preview_directory_recursive(template_root, dest_root, &rules, &mut plan)?;
    Ok(plan)
}

fn preview_directory_recursive(
    src: &Path,
    dest: &Path,
    rules: &Rules,
    plan: &mut Vec<PlannedEntry>,
) -> Result<()> {
    for entry in fs::read_dir(src)? {
        let path = entry?.path();
        let dest_path = rules.destination_for(&path, dest);

        if path.is_dir() {
            plan.push(PlannedEntry {
                source: path.clone(),
                destination: dest_path.clone(),
                kind: EntryKind::Directory,
                rewrite: None,
            });
            preview_directory_recursive(&path, &dest_path, rules, plan)?;
        } else {
            let rewrite = if templater::has_text_extension(&path) {
                fs::read(&path)
                    .ok()
                    .and_then(try_decode_as_text)
                    .and_then(|original| {
                        rules
                            .rewriter
                            .process_content(&original)
                            .map(|rewritten| PlannedRewrite { original, rewritten })
                    })
            } else {
                None
            };

            plan.push(PlannedEntry {
                source: path,
                destination: dest_path,
                kind: EntryKind::File,
                rewrite,
            });
        }
    }

    Ok(())
}

/// Lists `root` recursively, sorted by name within each directory.
pub fn list_tree(root: &Path) -> Result<Vec<TreeLine>> {
    let mut lines = Vec::new();
    list_tree_recursive(root, 0, &mut lines)?;
    Ok(lines)
}

fn list_tree_recursive(dir: &Path, depth: usize, lines: &mut Vec<TreeLine>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let is_dir = path.is_dir();
        lines.push(TreeLine {
            depth,
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
        });
        if is_dir {
            list_tree_recursive(&path, depth + 1, lines)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn name(s: &str) -> ProjectName {
        ProjectName::parse(s).unwrap()
    }

    #[test]
    fn test_instantiate_renames_and_rewrites() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("template");
        write(&template, "template.toe", b"\x00\x01binary template\xff");
        write(&template, "src/template_main.py", b"print('template Template TEMPLATE')");
        write(&template, "notes.TXT", b"Template notes");

        let dest = temp.path().join("td").join("foo");
        let tree = instantiate(&template, &dest, &name("foo")).unwrap();

        assert_eq!(tree.root, dest);
        assert_eq!(tree.files_copied, 3);
        assert_eq!(tree.files_rewritten, 2);
        assert_eq!(tree.directories_created, 2);

        assert_eq!(
            fs::read(dest.join("foo.toe")).unwrap(),
            b"\x00\x01binary template\xff"
        );
        assert_eq!(
            fs::read_to_string(dest.join("src/foo_main.py")).unwrap(),
            "print('foo Foo FOO')"
        );
        assert_eq!(fs::read_to_string(dest.join("notes.TXT")).unwrap(), "Foo notes");
    }

    #[test]
    fn test_instantiate_leaves_undecodable_text_file_untouched() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("template");
        let bytes: &[u8] = b"template \xc3\x28 Template";
        write(&template, "broken.md", bytes);

        let dest = temp.path().join("out");
        let tree = instantiate(&template, &dest, &name("foo")).unwrap();

        assert_eq!(tree.files_rewritten, 0);
        assert_eq!(fs::read(dest.join("broken.md")).unwrap(), bytes);
    }

    #[test]
    fn test_instantiate_rejects_existing_destination() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("template");
        write(&template, "template.md", b"template");

        let dest = temp.path().join("foo");
        fs::create_dir(&dest).unwrap();

        let result = instantiate(&template, &dest, &name("foo"));
        assert!(matches!(result, Err(ScaffoldError::DestinationExists(_))));
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
    }

    #[test]
    fn test_instantiate_rejects_missing_template() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("foo");

        let result = instantiate(&temp.path().join("nope"), &dest, &name("foo"));
        assert!(matches!(result, Err(ScaffoldError::TemplateMissing(_))));
        assert!(!dest.exists());
    }

    #[test]
    fn test_instantiate_rejects_template_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "template", b"not a dir");
        let dest = temp.path().join("foo");

        let result = instantiate(&temp.path().join("template"), &dest, &name("foo"));
        assert!(matches!(result, Err(ScaffoldError::TemplateNotDirectory(_))));
        assert!(!dest.exists());
    }

    #[test]
    fn test_preview_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("template");
        write(&template, "Template/readme.md", b"TEMPLATE README");
        write(&template, "image.png", b"template");

        let dest = temp.path().join("bar");
        let mut plan = preview(&template, &dest, &name("bar")).unwrap();
        plan.sort_by(|a, b| a.destination.cmp(&b.destination));

        assert!(!dest.exists());
        assert_eq!(plan.len(), 3);

        assert_eq!(plan[0].destination, dest.join("bar"));
        assert_eq!(plan[0].kind, EntryKind::Directory);

        assert_eq!(plan[1].destination, dest.join("bar").join("readme.md"));
        let rewrite = plan[1].rewrite.as_ref().unwrap();
        assert_eq!(rewrite.original, "TEMPLATE README");
        assert_eq!(rewrite.rewritten, "BAR README");

        assert_eq!(plan[2].destination, dest.join("image.png"));
        assert!(plan[2].rewrite.is_none());
    }

    #[test]
    fn test_list_tree_sorted_with_depth() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b.txt", b"");
        write(temp.path(), "a/inner.py", b"");

        let lines = list_tree(temp.path()).unwrap();
        assert_eq!(
            lines,
            vec![
                TreeLine { depth: 0, name: "a".into(), is_dir: true },
                TreeLine { depth: 1, name: "inner.py".into(), is_dir: false },
                TreeLine { depth: 0, name: "b.txt".into(), is_dir: false },
            ]
        );
    }
}
