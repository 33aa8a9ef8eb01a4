use serde::{Deserialize, Serialize};

/// Ways a person may be referred to in free text: first name, full name, aliases.
///
/// Blank entries are dropped and duplicates collapse to their first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Option<String>>", into = "Vec<String>")]
pub struct NameVariantSet {
    variants: Vec<String>,
}

impl NameVariantSet {
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut variants: Vec<String> = Vec::new();
        for value in raw {
            let trimmed = value.as_ref().trim();
            if trimmed.is_empty() || variants.iter().any(|known| known == trimmed) {
                continue;
            }
            variants.push(trimmed.to_string());
        }
        Self { variants }
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn original_order(&self) -> &[String] {
        &self.variants
    }

    /// Longest first; ties keep their input order.
    pub fn by_length_desc(&self) -> Vec<&str> {
        let mut sorted: Vec<&str> = self.variants.iter().map(String::as_str).collect();
        sorted.sort_by(|left, right| right.chars().count().cmp(&left.chars().count()));
        sorted
    }

    pub fn with(&self, extra: &str) -> Self {
        Self::new(self.variants.iter().map(String::as_str).chain([extra]))
    }
}

impl From<Vec<Option<String>>> for NameVariantSet {
    fn from(raw: Vec<Option<String>>) -> Self {
        Self::new(raw.into_iter().flatten())
    }
}

impl From<NameVariantSet> for Vec<String> {
    fn from(set: NameVariantSet) -> Self {
        set.variants
    }
}

impl<'a> FromIterator<&'a str> for NameVariantSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self::new(iter)
    }
}
