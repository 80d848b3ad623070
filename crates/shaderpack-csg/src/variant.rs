//! The compiled output for a single permutation.

/// One compiled shader permutation, keyed by its bit-packed option indices.
///
/// Produced by the compilation driver and consumed by the container writer.
/// The debug-symbol fields are populated only when symbols are stripped into
/// the sidecar; they never travel inside the container itself, and records
/// loaded back from a container leave them empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledVariant {
    pub key: u64,
    pub bytecode: Vec<u8>,
    /// Debug-symbol file name as reported by the compiler.
    pub pdb_name: Option<String>,
    pub pdb_bytes: Option<Vec<u8>>,
}

impl CompiledVariant {
    /// A variant with bytecode only, the common case.
    pub fn new(key: u64, bytecode: Vec<u8>) -> Self {
        Self {
            key,
            bytecode,
            pdb_name: None,
            pdb_bytes: None,
        }
    }

    /// Whether this variant carries sidecar debug-symbol material.
    pub fn has_debug_symbols(&self) -> bool {
        match (&self.pdb_name, &self.pdb_bytes) {
            (Some(name), Some(bytes)) => !name.is_empty() && !bytes.is_empty(),
            _ => false,
        }
    }
}
