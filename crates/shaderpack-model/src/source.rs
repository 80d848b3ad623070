//! Pragma parsing and dependency resolution for annotated shader sources.
//!
//! A source file declares its compilation profile and its option axes with
//! `#pragma` lines the underlying shader compiler does not understand:
//!
//! ```text
//! #pragma target cs_5_0
//! #pragma entry main
//! #pragma namespace MyApp.Shaders
//! #pragma option bool FAST
//! #pragma option enum Mode { A, B, C }
//! #pragma option uint Samples { 1..8 }
//! ```
//!
//! Unrecognised pragmas are left for the compiler. `#include "..."` lines
//! are chased breadth-first to compute the transitive dependency closure and
//! the newest input timestamp for up-to-date checks.

use std::collections::{HashSet, VecDeque};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use regex::Regex;

use crate::error::{Result, SourceError};
use crate::option::ShaderOption;

/// A parsed, immutable shader source description.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub path: PathBuf,
    /// Compilation profile, e.g. `cs_5_0`. Empty when the source omits the
    /// pragma; the compiler will reject such a job with its own diagnostics.
    pub target: String,
    pub entry: String,
    pub namespace: Option<String>,
    pub options: Vec<ShaderOption>,
    /// Transitive `#include` closure, normalised, root first.
    pub dependencies: Vec<PathBuf>,
    /// Newest modification time across the dependency closure.
    pub input_timestamp: SystemTime,
}

const DEFAULT_ENTRY: &str = "main";

fn pragma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#pragma\s+(target|entry|namespace|option)\s+(.*)$").unwrap())
}

fn include_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^#include\s+"([^"]+)""#).unwrap())
}

fn bool_option_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^bool\s+(\w+)$").unwrap())
}

fn enum_option_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^enum\s+(\w+)\s*\{\s*((?:\w+\s*,\s*)*\w+)\s*\}$").unwrap())
}

fn int_option_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^u?int\s+(\w+)\s*\{\s*(\d+)\s*\.\.\s*(\d+)\s*\}$").unwrap())
}

impl ShaderSource {
    /// Parses `path` and resolves its include closure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = normalize_path(path.as_ref());
        let text = read_source(&path)?;

        let mut source = Self {
            path: path.clone(),
            target: String::new(),
            entry: DEFAULT_ENTRY.to_string(),
            namespace: None,
            options: Vec::new(),
            dependencies: Vec::new(),
            input_timestamp: SystemTime::UNIX_EPOCH,
        };
        source.parse_pragmas(&text)?;
        source.resolve_dependencies(&text)?;
        Ok(source)
    }

    fn parse_pragmas(&mut self, text: &str) -> Result<()> {
        for (line_index, line) in text.lines().enumerate() {
            let Some(captures) = pragma_regex().captures(line.trim()) else {
                continue;
            };
            let rest = captures[2].trim().to_string();
            match &captures[1] {
                "target" => self.target = rest,
                "entry" => self.entry = rest,
                "namespace" => self.namespace = Some(rest),
                "option" => {
                    let option = parse_option(&rest).map_err(|message| {
                        SourceError::MalformedOption {
                            path: self.path.clone(),
                            line: line_index + 1,
                            message,
                        }
                    })?;
                    self.options.push(option);
                }
                _ => unreachable!("pragma regex only matches known keywords"),
            }
        }

        let total_bits = crate::option::total_key_bits(&self.options);
        if total_bits > u64::BITS {
            return Err(SourceError::MalformedOption {
                path: self.path.clone(),
                line: 0,
                message: format!("options require {total_bits} key bits, more than the 64 available"),
            });
        }
        Ok(())
    }

    /// Breadth-first walk over quoted includes, de-duplicating by
    /// normalised path. Fills `dependencies` and `input_timestamp`.
    fn resolve_dependencies(&mut self, root_text: &str) -> Result<()> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut pending: VecDeque<(PathBuf, Option<String>)> = VecDeque::new();

        seen.insert(self.path.clone());
        pending.push_back((self.path.clone(), Some(root_text.to_string())));

        while let Some((path, text)) = pending.pop_front() {
            let text = match text {
                Some(text) => text,
                None => read_source(&path)?,
            };

            self.dependencies.push(path.clone());
            self.input_timestamp = self.input_timestamp.max(modification_time(&path)?);

            let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
            for line in text.lines() {
                let Some(captures) = include_regex().captures(line.trim()) else {
                    continue;
                };
                let included = normalize_path(&parent.join(&captures[1]));
                if seen.insert(included.clone()) {
                    pending.push_back((included, None));
                }
            }
        }
        Ok(())
    }
}

fn parse_option(text: &str) -> std::result::Result<ShaderOption, String> {
    if let Some(captures) = bool_option_regex().captures(text) {
        return Ok(ShaderOption::Boolean {
            name: captures[1].to_string(),
        });
    }

    if let Some(captures) = enum_option_regex().captures(text) {
        let values: Vec<String> = captures[2]
            .split(',')
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();
        if values.is_empty() {
            return Err("enum options must declare at least one value".to_string());
        }
        return Ok(ShaderOption::Enumeration {
            name: captures[1].to_string(),
            values,
        });
    }

    if let Some(captures) = int_option_regex().captures(text) {
        let min: i64 = captures[2]
            .parse()
            .map_err(|_| format!("integer option minimum `{}` is out of range", &captures[2]))?;
        let max: i64 = captures[3]
            .parse()
            .map_err(|_| format!("integer option maximum `{}` is out of range", &captures[3]))?;
        if min > max {
            return Err(format!(
                "integer option range is inverted: {min}..{max}"
            ));
        }
        return Ok(ShaderOption::IntegerRange {
            name: captures[1].to_string(),
            min,
            max,
        });
    }

    Err(format!("unrecognised option declaration `{text}`"))
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| SourceError::NotFound {
        path: path.to_path_buf(),
        source,
    })
}

fn modification_time(path: &Path) -> Result<SystemTime> {
    let map_err = |source| SourceError::NotFound {
        path: path.to_path_buf(),
        source,
    };
    std::fs::metadata(path)
        .map_err(map_err)?
        .modified()
        .map_err(map_err)
}

/// Lexical dot-segment removal; does not touch the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dir");
        }
        std::fs::write(&path, contents).expect("write fixture");
        path
    }

    #[test]
    fn parses_all_pragma_kinds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            dir.path(),
            "shader.hlsl",
            "#pragma target cs_5_0\n\
             #pragma entry run\n\
             #pragma namespace MyApp.Shaders\n\
             #pragma option bool FAST\n\
             #pragma option enum Mode { A, B, C }\n\
             #pragma option uint Samples { 1..8 }\n\
             #pragma pack_matrix(row_major)\n\
             float4 run() { return 0; }\n",
        );

        let source = ShaderSource::from_file(&path).expect("parse");
        assert_eq!(source.target, "cs_5_0");
        assert_eq!(source.entry, "run");
        assert_eq!(source.namespace.as_deref(), Some("MyApp.Shaders"));
        assert_eq!(source.options.len(), 3);
        assert_eq!(source.options[0].name(), "FAST");
        assert_eq!(source.options[1].value_count(), 3);
        assert_eq!(source.options[2].value_count(), 8);
        assert_eq!(source.dependencies, vec![normalize_path(&path)]);
    }

    #[test]
    fn entry_defaults_to_main() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "s.hlsl", "#pragma target ps_5_0\n");
        let source = ShaderSource::from_file(&path).expect("parse");
        assert_eq!(source.entry, "main");
        assert!(source.namespace.is_none());
        assert!(source.options.is_empty());
    }

    #[test]
    fn malformed_option_is_rejected_with_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(
            dir.path(),
            "s.hlsl",
            "#pragma target ps_5_0\n#pragma option enum Broken { }\n",
        );
        let err = ShaderSource::from_file(&path).expect_err("expected parse failure");
        match err {
            SourceError::MalformedOption { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn inverted_integer_range_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(dir.path(), "s.hlsl", "#pragma option int N { 5..2 }\n");
        let err = ShaderSource::from_file(&path).expect_err("expected parse failure");
        assert!(matches!(err, SourceError::MalformedOption { .. }));
    }

    #[test]
    fn includes_resolve_transitively_and_deduplicate() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "common/types.hlsli", "// leaf\n");
        write(
            dir.path(),
            "common/util.hlsli",
            "#include \"types.hlsli\"\n",
        );
        let root = write(
            dir.path(),
            "shader.hlsl",
            "#include \"common/util.hlsli\"\n\
             #include \"common/types.hlsli\"\n\
             #pragma target cs_5_0\n",
        );

        let source = ShaderSource::from_file(&root).expect("parse");
        assert_eq!(source.dependencies.len(), 3);
        assert_eq!(source.dependencies[0], normalize_path(&root));
        assert!(source
            .dependencies
            .iter()
            .any(|p| p.ends_with("common/util.hlsli")));
    }

    #[test]
    fn missing_include_is_a_not_found_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = write(dir.path(), "s.hlsl", "#include \"gone.hlsli\"\n");
        let err = ShaderSource::from_file(&root).expect_err("expected missing include");
        match err {
            SourceError::NotFound { path, .. } => assert!(path.ends_with("gone.hlsli")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn input_timestamp_is_the_newest_of_the_closure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dep = write(dir.path(), "dep.hlsli", "// dep\n");
        let root = write(dir.path(), "s.hlsl", "#include \"dep.hlsli\"\n");

        let newer = SystemTime::now() + std::time::Duration::from_secs(3600);
        let file = std::fs::File::options()
            .write(true)
            .open(&dep)
            .expect("open dep");
        file.set_modified(newer).expect("bump dep mtime");

        let source = ShaderSource::from_file(&root).expect("parse");
        let root_mtime = std::fs::metadata(&root)
            .and_then(|m| m.modified())
            .expect("root mtime");
        assert!(source.input_timestamp > root_mtime);
    }

    #[test]
    fn normalize_removes_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d.hlsli")),
            PathBuf::from("/a/c/d.hlsli")
        );
    }
}
