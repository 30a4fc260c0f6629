//! Checks for an expanded TouchDesigner project (`project.toe.dir`) before it
//! is collapsed back into a `.toe`. TouchDesigner tends to fail silently on
//! malformed node, parameter and script files, so problems are caught here.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tree_sitter::{Node, Parser};

pub const VALID_FAMILIES: [&str; 7] = ["TOP", "CHOP", "SOP", "DAT", "COMP", "MAT", "POP"];

/// Operator types that normally start a chain and are not expected to be
/// fed by another node.
pub const SOURCE_TYPES: [&str; 6] = [
    "noise",
    "constant",
    "moviefilein",
    "audiodevicein",
    "midiin",
    "oscin",
];

pub const CHOPEXEC_CALLBACKS: [&str; 4] = ["onOffToOn", "onOnToOff", "onValueChange", "whileOn"];

/// Size of the binary header in front of a `.text` script.
pub const TEXT_HEADER_LEN: usize = 27;
const TEXT_MARKER: &[u8] = b"2\n*";

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ValidationReport {
    pub fn add_error(&mut self, file: &str, line: Option<usize>, msg: impl AsRef<str>) {
        let location = match line {
            Some(line) => format!("{}:{}", file, line),
            None => file.to_string(),
        };
        self.errors.push(format!("{} - {}", location, msg.as_ref()));
    }

    pub fn add_warning(&mut self, file: &str, msg: impl AsRef<str>) {
        self.warnings.push(format!("{} - {}", file, msg.as_ref()));
    }

    pub fn add_info(&mut self, msg: impl Into<String>) {
        self.info.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// 2 when there are errors, 1 for warnings only, 0 when clean.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            2
        } else if self.has_warnings() {
            1
        } else {
            0
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub name: String,
    pub family: String,
    pub op_type: String,
    pub inputs: BTreeMap<u32, String>,
    pub path: PathBuf,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn split_lines(content: &str) -> Vec<&str> {
    content.trim().split('\n').collect()
}

pub fn validate_node_file(path: &Path, report: &mut ValidationReport) -> Option<NodeInfo> {
    let file = display_name(path);
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            report.add_error(&file, None, format!("Cannot read file: {}", e));
            return None;
        }
    };

    if content.trim().is_empty() {
        report.add_error(&file, None, "Empty file");
        return None;
    }
    let lines = split_lines(&content);

    let first_line = lines[0].trim();
    let Some((family, op_type)) = first_line.split_once(':') else {
        report.add_error(
            &file,
            Some(1),
            format!("Invalid format, expected FAMILY:type, got: {}", first_line),
        );
        return None;
    };
    if !VALID_FAMILIES.contains(&family) {
        report.add_error(
            &file,
            Some(1),
            format!(
                "Invalid family '{}', must be one of: {}",
                family,
                VALID_FAMILIES.join(", ")
            ),
        );
        return None;
    }

    if lines[lines.len() - 1].trim() != "end" {
        report.add_error(&file, Some(lines.len()), "File must end with 'end'");
    }

    let has_line = |prefix: &str| lines.iter().any(|line| line.trim().starts_with(prefix));
    if !has_line("tile ") {
        report.add_warning(&file, "Missing 'tile' definition");
    }
    if !has_line("flags =") {
        report.add_warning(&file, "Missing 'flags' definition");
    }
    if !has_line("color ") {
        report.add_warning(&file, "Missing 'color' definition");
    }

    let mut inputs = BTreeMap::new();
    let mut in_inputs_block = false;
    for (i, line) in lines.iter().enumerate() {
        let line_no = i + 1;
        let stripped = line.trim();

        if stripped == "inputs" {
            in_inputs_block = true;
            continue;
        }
        if !in_inputs_block || stripped == "{" {
            continue;
        }
        if stripped == "}" {
            in_inputs_block = false;
            continue;
        }

        if !line.contains('\t') && !stripped.is_empty() {
            report.add_error(
                &file,
                Some(line_no),
                format!("inputs entry uses SPACES, must use TAB: '{}'", stripped),
            );
            continue;
        }

        let parts: Vec<&str> = stripped.split('\t').collect();
        if parts.len() >= 2 {
            match parts[0].trim().parse::<u32>() {
                Ok(index) => {
                    inputs.insert(index, parts[1].trim().to_string());
                }
                Err(_) => report.add_error(
                    &file,
                    Some(line_no),
                    format!("Invalid input index: {}", parts[0]),
                ),
            }
        }
    }

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    Some(NodeInfo {
        name,
        family: family.to_string(),
        op_type: op_type.to_string(),
        inputs,
        path: path.to_path_buf(),
    })
}

pub fn validate_parm_file(path: &Path, report: &mut ValidationReport) {
    let file = display_name(path);
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            report.add_error(&file, None, format!("Cannot read file: {}", e));
            return;
        }
    };

    if content.trim().is_empty() {
        report.add_warning(&file, "Empty parameter file");
        return;
    }
    let lines = split_lines(&content);

    if lines[0].trim() != "?" {
        report.add_error(&file, Some(1), "Parameter file must start with '?'");
    }
    if lines[lines.len() - 1].trim() != "?" {
        report.add_error(&file, Some(lines.len()), "Parameter file must end with '?'");
    }

    if lines.len() < 3 {
        return;
    }
    for (offset, line) in lines[1..lines.len() - 1].iter().enumerate() {
        let line_no = offset + 2;
        let mut parts = line.split_whitespace();
        let (Some(_name), Some(flags)) = (parts.next(), parts.next()) else {
            if !line.trim().is_empty() {
                report.add_warning(
                    &file,
                    format!("Line {}: Invalid format, expected 'name flags value'", line_no),
                );
            }
            continue;
        };

        match flags.parse::<i64>() {
            Ok(0) | Ok(17) => {}
            Ok(other) => report.add_warning(
                &file,
                format!("Line {}: Unusual flags value {} (typically 0 or 17)", line_no, other),
            ),
            Err(_) => report.add_error(
                &file,
                Some(line_no),
                format!("Invalid flags value: {}", flags),
            ),
        }
    }
}

pub fn validate_text_file(path: &Path, report: &mut ValidationReport) {
    let file = display_name(path);
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) => {
            report.add_error(&file, None, format!("Cannot read file: {}", e));
            return;
        }
    };

    if content.len() < TEXT_HEADER_LEN {
        report.add_error(
            &file,
            None,
            format!(
                "File too short ({} bytes), missing binary header (need {}+ bytes)",
                content.len(),
                TEXT_HEADER_LEN
            ),
        );
        return;
    }

    if !content.starts_with(TEXT_MARKER) {
        report.add_error(
            &file,
            None,
            "Missing binary header - file appears to be plain text, not TD format",
        );
        report.add_info("  Hint: write .text files with the binary header TouchDesigner expects");
        return;
    }

    let script = match std::str::from_utf8(&content[TEXT_HEADER_LEN..]) {
        Ok(script) => script,
        Err(e) => {
            report.add_error(&file, None, format!("Cannot decode script content: {}", e));
            return;
        }
    };

    if let Some((line, msg)) = python_syntax_error(script) {
        report.add_error(&file, Some(line), format!("Python SyntaxError: {}", msg));
    }

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if stem.contains("chopexec") || stem.contains("chop_exec") {
        for callback in CHOPEXEC_CALLBACKS {
            if !script.contains(callback) {
                report.add_warning(&file, format!("ChopExec missing callback: {}", callback));
            }
        }
    }
}

/// First syntax error in a Python script as a 1-based line and a message.
pub fn python_syntax_error(script: &str) -> Option<(usize, String)> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .ok()?;
    let tree = parser.parse(script, None)?;
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }

    let node = first_error_node(root).unwrap_or(root);
    let line = node.start_position().row + 1;
    let msg = if node.is_missing() {
        format!("expected '{}'", node.kind())
    } else {
        "invalid syntax".to_string()
    };
    Some((line, msg))
}

fn first_error_node(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_node)
}

fn relative_key(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
    )
}

pub fn validate_toc(toc_path: &Path, dir: &Path, report: &mut ValidationReport) {
    let content = match fs::read_to_string(toc_path) {
        Ok(content) => content,
        Err(e) => {
            report.add_error(".toc", None, format!("Cannot read file: {}", e));
            return;
        }
    };

    let entries: BTreeSet<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    for entry in &entries {
        if !dir.join(entry).exists() {
            report.add_error(".toc", None, format!("Listed file does not exist: {}", entry));
        }
    }

    let files = match collect_files(dir) {
        Ok(files) => files,
        Err(e) => {
            report.add_error(&dir.display().to_string(), None, format!("Cannot list directory: {}", e));
            return;
        }
    };
    for file in files {
        let Some(rel) = relative_key(&file, dir) else {
            continue;
        };
        if rel.starts_with('.') {
            continue;
        }
        if !entries.contains(rel.as_str()) {
            report.add_warning(".toc", format!("File not listed in .toc: {}", rel));
        }
    }
}

pub fn validate_wiring(nodes: &BTreeMap<String, NodeInfo>, report: &mut ValidationReport) {
    for node in nodes.values() {
        let node_path = node.path.display().to_string();
        for (index, source) in &node.inputs {
            if nodes.contains_key(source) {
                continue;
            }
            let close_match = nodes
                .keys()
                .find(|name| name.eq_ignore_ascii_case(source));
            match close_match {
                Some(suggestion) => report.add_error(
                    &node_path,
                    None,
                    format!(
                        "Input {} references '{}' (not found). Did you mean '{}'?",
                        index, source, suggestion
                    ),
                ),
                None => report.add_error(
                    &node_path,
                    None,
                    format!("Input {} references non-existent node: '{}'", index, source),
                ),
            }
        }
    }

    let referenced: BTreeSet<&str> = nodes
        .values()
        .flat_map(|node| node.inputs.values().map(String::as_str))
        .collect();

    for (name, node) in nodes {
        if referenced.contains(name.as_str()) || SOURCE_TYPES.contains(&node.op_type.as_str()) {
            continue;
        }
        report.add_warning(
            &node.path.display().to_string(),
            "No incoming connections (orphan source)",
        );
    }
}

fn collect_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files_recursive(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().map_or(false, |e| e == ext)
}

fn find_toc(dir: &Path) -> Option<PathBuf> {
    let inner = dir.join(".toc");
    if inner.exists() {
        return Some(inner);
    }
    let name = dir.file_name()?.to_string_lossy().replace(".dir", ".toc");
    let sibling = dir.parent()?.join(name);
    sibling.exists().then_some(sibling)
}

/// Validates an expanded `.toe.dir` project.
pub fn validate_project(dir: &Path) -> ValidationReport {
    let mut report = ValidationReport::default();
    let dir_name = dir.display().to_string();

    if !dir.exists() {
        report.add_error(&dir_name, None, "Directory does not exist");
        return report;
    }
    if !dir.is_dir() {
        report.add_error(&dir_name, None, "Path is not a directory");
        return report;
    }

    let files = match collect_files(dir) {
        Ok(files) => files,
        Err(e) => {
            report.add_error(&dir_name, None, format!("Cannot list directory: {}", e));
            return report;
        }
    };
    debug!("Validating {} files under {:?}", files.len(), dir);

    let mut nodes = BTreeMap::new();
    let node_files: Vec<_> = files.iter().filter(|f| has_extension(f, "n")).collect();
    for file in &node_files {
        if let Some(node) = validate_node_file(file, &mut report) {
            nodes.insert(node.name.clone(), node);
        }
    }

    let parm_files: Vec<_> = files.iter().filter(|f| has_extension(f, "parm")).collect();
    for file in &parm_files {
        validate_parm_file(file, &mut report);
    }

    let text_files: Vec<_> = files.iter().filter(|f| has_extension(f, "text")).collect();
    for file in &text_files {
        validate_text_file(file, &mut report);
    }

    match find_toc(dir) {
        Some(toc) => validate_toc(&toc, dir, &mut report),
        None => report.add_warning(".toc", "No .toc file found"),
    }

    validate_wiring(&nodes, &mut report);

    report.add_info(format!(
        "Checked: {} .n files, {} .parm files, {} .text files",
        node_files.len(),
        parm_files.len(),
        text_files.len()
    ));

    report
}
