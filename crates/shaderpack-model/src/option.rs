//! Shader build options and their key-space arithmetic.
//!
//! Every option contributes a fixed-width bit-field to the 64-bit permutation
//! key. The field widths and the macro emission rules here are the single
//! source of truth shared by the compilation driver, the container layout,
//! and the generated client header.

/// One orthogonal build axis declared by a `#pragma option` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderOption {
    /// Two values. Index 0 emits no macro; index 1 defines `name` as `1`.
    Boolean { name: String },
    /// One value per entry. Index `i` defines both `name<values[i]>` as `1`
    /// and `name` as `values[i]`.
    Enumeration { name: String, values: Vec<String> },
    /// `max - min + 1` values. Index `i` defines both `name<min + i>` as `1`
    /// and `name` as `min + i`. Invariant: `min <= max`.
    IntegerRange { name: String, min: i64, max: i64 },
}

impl ShaderOption {
    pub fn name(&self) -> &str {
        match self {
            Self::Boolean { name }
            | Self::Enumeration { name, .. }
            | Self::IntegerRange { name, .. } => name,
        }
    }

    /// Number of selectable values for this option.
    pub fn value_count(&self) -> u64 {
        match self {
            Self::Boolean { .. } => 2,
            Self::Enumeration { values, .. } => values.len() as u64,
            Self::IntegerRange { min, max, .. } => max.abs_diff(*min) + 1,
        }
    }

    /// Width of this option's key bit-field: `ceil(log2(value_count))`,
    /// zero for single-valued options.
    pub fn key_length(&self) -> u32 {
        let count = self.value_count();
        if count <= 1 {
            0
        } else {
            u64::BITS - (count - 1).leading_zeros()
        }
    }

    /// Whether selections emit an explicit value macro in addition to the
    /// per-value flag macro. Booleans are implicit: only the flag exists.
    pub fn is_value_explicit(&self) -> bool {
        !matches!(self, Self::Boolean { .. })
    }

    /// The value the shader sees for selection `index`, or `None` when the
    /// selection defines nothing (boolean index 0) or is out of range.
    pub fn defined_value(&self, index: u64) -> Option<String> {
        if index >= self.value_count() {
            return None;
        }
        match self {
            Self::Boolean { .. } => (index == 1).then(|| "1".to_string()),
            Self::Enumeration { values, .. } => Some(values[index as usize].clone()),
            Self::IntegerRange { min, .. } => Some((min + index as i64).to_string()),
        }
    }

    /// The name a selection contributes to the generated client header, or
    /// `None` for selections with no entry (boolean index 0).
    pub fn selection_name(&self, index: u64) -> Option<String> {
        if index >= self.value_count() {
            return None;
        }
        match self {
            Self::Boolean { name } => (index == 1).then(|| name.clone()),
            Self::Enumeration { name, values } => Some(format!("{name}{}", values[index as usize])),
            Self::IntegerRange { name, min, .. } => Some(format!("{name}{}", min + index as i64)),
        }
    }

    /// Appends the preprocessor macros for selection `index` to `defines`.
    pub fn append_defines(&self, index: u64, defines: &mut Vec<(String, String)>) {
        match self {
            Self::Boolean { name } => {
                if index == 1 {
                    defines.push((name.clone(), "1".to_string()));
                }
            }
            Self::Enumeration { .. } | Self::IntegerRange { .. } => {
                let Some(value) = self.defined_value(index) else {
                    return;
                };
                defines.push((format!("{}{}", self.name(), value), "1".to_string()));
                defines.push((self.name().to_string(), value));
            }
        }
    }
}

/// Total number of key bits used by `options`, i.e. the sum of the
/// individual field widths.
pub fn total_key_bits(options: &[ShaderOption]) -> u32 {
    options.iter().map(ShaderOption::key_length).sum()
}
