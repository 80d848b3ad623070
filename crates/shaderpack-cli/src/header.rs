//! Generated C++ header: one integer-backed flags enumeration per shader
//! group, so client code can request a variant by composing option bits.

use std::path::Path;

use anyhow::{Context, Result};
use shaderpack_model::{key_offsets, ShaderOption};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    Written,
    Unchanged,
}

/// Renders the flags header for a shader group.
///
/// `type_stem` is the source file's stem; the enumeration is named
/// `<stem>Flags`. Dots in `namespace` become C++ scope separators. Each
/// option-value selection contributes one entry whose value is its local
/// index shifted to the option's key offset; boolean index 0 has no entry.
pub fn generate_header(type_stem: &str, namespace: &str, options: &[ShaderOption]) -> String {
    let namespace = namespace.replace('.', "::");
    let offsets = key_offsets(options);

    let mut out = String::new();
    out.push_str("#pragma once\n");
    out.push_str("#include <cstdint>\n\n");
    out.push_str(&format!("namespace {namespace}\n"));
    out.push_str("{\n");
    out.push_str(&format!("  enum class {type_stem}Flags : uint64_t\n"));
    out.push_str("  {\n");
    out.push_str("    Default = 0,\n");
    for (option, offset) in options.iter().zip(offsets) {
        for index in 0..option.value_count() {
            let Some(name) = option.selection_name(index) else {
                continue;
            };
            out.push_str(&format!("    {name} = {},\n", index << offset));
        }
    }
    out.push_str("  };\n");
    out.push_str("}\n");
    out
}

/// Writes `text` to `path` only when the contents differ, creating parent
/// directories as needed. Re-running the builder against an unchanged
/// source therefore leaves the header byte-identical and untouched.
pub fn write_if_changed(path: &Path, text: &str) -> Result<HeaderStatus> {
    if let Ok(existing) = std::fs::read_to_string(path) {
        if existing == text {
            return Ok(HeaderStatus::Unchanged);
        }
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create header directory {}", parent.display()))?;
    }
    std::fs::write(path, text)
        .with_context(|| format!("failed to write header {}", path.display()))?;
    Ok(HeaderStatus::Written)
}
