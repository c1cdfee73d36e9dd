//! Card name normalization
//!
//! OCR and vision models render mechanic suffixes inconsistently
//! ("Pikachu ex", "Pikachu-EX", "PIKACHU EX"), and card catalogs have
//! their own conventions on top. Given one raw name this module
//! produces an ordered set of plausible spellings to query with: the
//! original first, styled suffix renderings next, the bare base name
//! last.

/// Suffix tokens recognized at the end of a card name (case-insensitive)
const KNOWN_SUFFIXES: [&str; 5] = ["ex", "gx", "v", "vmax", "vstar"];

/// Ordered, deduplicated set of name spellings for one raw name.
///
/// Insertion order is priority order: most specific first, bare base
/// name last. Recomputed per extraction, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameVariantSet {
    variants: Vec<String>,
}

impl NameVariantSet {
    /// Build the variant set for a raw extracted name.
    pub fn derive(raw_name: &str) -> Self {
        let original = raw_name.trim();
        let mut set = Self {
            variants: Vec::new(),
        };
        set.push(original.to_string());

        if let Some(base) = strip_known_suffix(original) {
            // One variant per suffix rendering seen in catalog naming
            for styled in [
                format!("{base} ex"),
                format!("{base}-EX"),
                format!("{base} EX"),
                format!("{base}-GX"),
                format!("{base} GX"),
                format!("{base} V"),
                format!("{base} VMAX"),
                format!("{base} VSTAR"),
            ] {
                set.push(styled);
            }
            set.push(base.to_string());
        }

        set
    }

    fn push(&mut self, variant: String) {
        if !self.variants.iter().any(|v| *v == variant) {
            self.variants.push(variant);
        }
    }

    /// The original (trimmed) name, always present
    pub fn original(&self) -> &str {
        &self.variants[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Strip a known mechanic suffix from the end of a name.
///
/// Returns the trimmed base name, or `None` when the name carries no
/// recognized suffix (or is nothing but a suffix token).
pub fn strip_known_suffix(name: &str) -> Option<&str> {
    let trimmed = name.trim();
    let last_sep = trimmed
        .rfind(|c: char| c == ' ' || c == '-')
        .filter(|&i| i > 0)?;
    let (base, tail) = trimmed.split_at(last_sep);
    let tail = tail[1..].trim();
    let is_known = KNOWN_SUFFIXES
        .iter()
        .any(|suffix| tail.eq_ignore_ascii_case(suffix));
    if is_known {
        let base = base.trim();
        (!base.is_empty()).then_some(base)
    } else {
        None
    }
}
