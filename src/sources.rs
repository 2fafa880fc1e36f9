//! Solidity source tree walking and contract declaration scanning.

use anyhow::{Context, Result};
use regex::Regex;
use std::{
    collections::VecDeque,
    fmt, fs,
    ops::Range,
    path::{Path, PathBuf},
    sync::OnceLock,
};

pub const PRODUCTION_FACET_MARKER: &str = "// @production-facet";

/// A contract declared in a source file, addressed the way `forge inspect`
/// expects it: `<file>:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractRef {
    pub file: PathBuf,
    pub name: String,
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.name)
    }
}

/// Which declarations a scan keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclFilter {
    Any,
    /// Only contracts directly below a `// @production-facet` line.
    ProductionFacet,
}

fn contract_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bcontract\s+([A-Za-z0-9_]+)\b").expect("contract declaration pattern")
    })
}

/// Every `.sol` file below `root`, breadth first in the order the filesystem
/// lists entries. Directories are expanded when reached, so a directory's
/// children come after all entries already queued.
pub fn solidity_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut queue: VecDeque<PathBuf> = list_dir(root)?.into();
    let mut files = Vec::new();

    while let Some(path) = queue.pop_front() {
        let meta = fs::metadata(&path)
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        if meta.is_dir() {
            queue.extend(list_dir(&path)?);
            continue;
        }
        if path.extension().is_some_and(|ext| ext == "sol") {
            files.push(path);
        }
    }

    Ok(files)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read dir {}", dir.display()))?;
    entries
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to list {}", dir.display()))
}

/// Reads `file` and returns the contracts it declares under `filter`.
pub fn contracts_in_file(file: &Path, filter: DeclFilter) -> Result<Vec<ContractRef>> {
    let src = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(contract_names(&src, filter)
        .into_iter()
        .map(|name| ContractRef {
            file: file.to_path_buf(),
            name,
        })
        .collect())
}

/// Names of the contracts declared in `src`, in source order.
///
/// A declaration counts when the rest of its line reaches an opening brace
/// before any `//` or `/*`, and the `contract` keyword itself is not inside a
/// comment or string literal. One declaration is taken per line segment.
pub fn contract_names(src: &str, filter: DeclFilter) -> Vec<String> {
    let skipped = non_code_spans(src);
    let mut names = Vec::new();
    let mut consumed_until = 0;

    for caps in contract_decl().captures_iter(src) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() < consumed_until {
            continue;
        }
        if skipped.iter().any(|span| span.contains(&whole.start())) {
            continue;
        }
        let Some(brace) = opening_brace(src, name.end()) else {
            continue;
        };
        if filter == DeclFilter::ProductionFacet && !has_marker_above(src, whole.start()) {
            continue;
        }
        consumed_until = brace + 1;
        names.push(name.as_str().to_string());
    }

    names
}

/// Position of the last `{` on the line starting at `from` that precedes any
/// comment opener.
fn opening_brace(src: &str, from: usize) -> Option<usize> {
    let rest = &src[from..];
    let line = &rest[..rest.find('\n').unwrap_or(rest.len())];
    let limit = [line.find("//"), line.find("/*")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(line.len());
    line[..limit].rfind('{').map(|idx| from + idx)
}

fn has_marker_above(src: &str, decl_start: usize) -> bool {
    let Some(before) = src[..decl_start].strip_suffix('\n') else {
        return false;
    };
    before.trim_end().ends_with(PRODUCTION_FACET_MARKER)
}

/// Byte ranges covered by comments and string literals.
fn non_code_spans(src: &str) -> Vec<Range<usize>> {
    let bytes = src.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = src[i..].find('\n').map_or(bytes.len(), |n| i + n);
                spans.push(i..end);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = src[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
                spans.push(i..end);
                i = end;
            }
            quote @ (b'"' | b'\'') => {
                let start = i;
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                spans.push(start..i);
            }
            _ => i += 1,
        }
    }

    spans
}
