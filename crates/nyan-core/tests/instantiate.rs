use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use nyan_core::{instantiate, list_tree, ProjectName, ScaffoldError};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn relative_paths(root: &Path) -> BTreeSet<PathBuf> {
    fn walk(dir: &Path, root: &Path, out: &mut BTreeSet<PathBuf>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            out.insert(path.strip_prefix(root).unwrap().to_path_buf());
            if path.is_dir() {
                walk(&path, root, out);
            }
        }
    }
    let mut out = BTreeSet::new();
    walk(root, root, &mut out);
    out
}

#[test]
fn scaffolds_nyan_project_from_template() {
    let temp = TempDir::new().unwrap();
    let template = temp.path().join("template");
    write(
        &template,
        "template-config.json",
        br#"{"name": "template", "Name": "Template"}"#,
    );
    write(&template, "template/assets/readme.md", b"TEMPLATE README");

    let dest = temp.path().join("td").join("nyan");
    let name = ProjectName::parse("nyan").unwrap();
    let tree = instantiate(&template, &dest, &name).unwrap();

    assert_eq!(tree.files_copied, 2);
    assert_eq!(tree.files_rewritten, 2);
    assert_eq!(
        fs::read_to_string(dest.join("nyan-config.json")).unwrap(),
        r#"{"name": "nyan", "Name": "Nyan"}"#
    );
    assert_eq!(
        fs::read_to_string(dest.join("nyan").join("assets").join("readme.md")).unwrap(),
        "NYAN README"
    );
    assert!(!dest.join("template").exists());

    let listing: Vec<String> = list_tree(&dest)
        .unwrap()
        .into_iter()
        .map(|line| format!("{}{}{}", "  ".repeat(line.depth), line.name, if line.is_dir { "/" } else { "" }))
        .collect();
    assert_eq!(
        listing,
        vec!["nyan/", "  assets/", "    readme.md", "nyan-config.json"]
    );
}

#[test]
fn destination_paths_mirror_source_with_token_renamed() {
    let temp = TempDir::new().unwrap();
    let template = temp.path().join("template");
    write(&template, "Template.toe", b"\x00\x01\x02");
    write(&template, "src/utils/td_helpers.py", b"# helpers for template");
    write(&template, "src/TEMPLATE_ext/template_ext.py", b"class TemplateExt: pass");
    write(&template, "docs/templateTemplate.md", b"# Template");
    fs::create_dir_all(template.join("empty_template_dir")).unwrap();

    let dest = temp.path().join("out");
    let name = ProjectName::parse("my-proj_1").unwrap();
    instantiate(&template, &dest, &name).unwrap();

    let expected: BTreeSet<PathBuf> = relative_paths(&template)
        .into_iter()
        .map(|rel| {
            rel.components()
                .map(|c| {
                    let segment = c.as_os_str().to_str().unwrap();
                    segment
                        .to_lowercase()
                        .match_indices("template")
                        .map(|(i, _)| i)
                        .collect::<Vec<_>>()
                        .into_iter()
                        .rev()
                        .fold(segment.to_string(), |mut s, i| {
                            s.replace_range(i..i + "template".len(), "my-proj_1");
                            s
                        })
                })
                .collect::<PathBuf>()
        })
        .collect();

    assert_eq!(relative_paths(&dest), expected);
    assert!(dest.join("my-proj_1.toe").is_file());
    assert!(dest.join("empty_my-proj_1_dir").is_dir());
    assert_eq!(
        fs::read_to_string(dest.join("src/my-proj_1_ext/my-proj_1_ext.py")).unwrap(),
        "class My-proj_1Ext: pass"
    );
    assert_eq!(
        fs::read_to_string(dest.join("docs/my-proj_1my-proj_1.md")).unwrap(),
        "# My-proj_1"
    );
}

#[test]
fn binary_file_with_text_extension_is_copied_byte_identical() {
    let temp = TempDir::new().unwrap();
    let template = temp.path().join("template");
    let bytes: &[u8] = b"template\xff\xfeTEMPLATE\x80";
    write(&template, "data.json", bytes);

    let dest = temp.path().join("out");
    let name = ProjectName::parse("foo").unwrap();
    let tree = instantiate(&template, &dest, &name).unwrap();

    assert_eq!(tree.files_rewritten, 0);
    assert_eq!(fs::read(dest.join("data.json")).unwrap(), bytes);
}

#[test]
fn existing_destination_is_left_untouched() {
    let temp = TempDir::new().unwrap();
    let template = temp.path().join("template");
    write(&template, "template.md", b"template");

    let dest = temp.path().join("foo");
    write(&dest, "keep.txt", b"mine");

    let name = ProjectName::parse("foo").unwrap();
    let err = instantiate(&template, &dest, &name).unwrap_err();

    assert!(matches!(err, ScaffoldError::DestinationExists(_)));
    assert_eq!(relative_paths(&dest), BTreeSet::from([PathBuf::from("keep.txt")]));
    assert_eq!(fs::read_to_string(dest.join("keep.txt")).unwrap(), "mine");
}

#[cfg(unix)]
#[test]
fn copy_failure_aborts_and_keeps_partial_tree() {
    let temp = TempDir::new().unwrap();
    let template = temp.path().join("template");
    write(&template, "a.md", b"template");
    fs::create_dir_all(template.join("nested")).unwrap();
    std::os::unix::fs::symlink(
        template.join("does-not-exist.md"),
        template.join("nested").join("dangling.md"),
    )
    .unwrap();

    let dest = temp.path().join("out");
    let name = ProjectName::parse("foo").unwrap();
    let err = instantiate(&template, &dest, &name).unwrap_err();

    assert!(matches!(err, ScaffoldError::Io(_)));
    assert!(dest.is_dir());
    assert!(dest.join("nested").is_dir());
    assert!(!dest.join("nested").join("dangling.md").exists());
}

#[test]
fn read_only_template_file_still_scaffolds() {
    let temp = TempDir::new().unwrap();
    let template = temp.path().join("template");
    write(&template, "template.md", b"# template");

    let file = template.join("template.md");
    let mut permissions = fs::metadata(&file).unwrap().permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&file, permissions).unwrap();

    let dest = temp.path().join("out");
    let name = ProjectName::parse("foo").unwrap();
    let tree = instantiate(&template, &dest, &name).unwrap();

    assert_eq!(tree.files_copied, 1);
    let copied = fs::read_to_string(dest.join("foo.md")).unwrap();
    assert!(copied == "# foo" || copied == "# template", "unexpected content: {}", copied);
}
