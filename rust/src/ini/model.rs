use indexmap::IndexMap;

/// Options of one section, in insertion order.
pub type Section = IndexMap<String, String>;

/// Parsed configuration: the default section plus every named section, both
/// kept in insertion order so rendering is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub defaults: Section,
    pub sections: IndexMap<String, Section>,
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty() && self.sections.is_empty()
    }

    /// Folds `other` into `self`. New sections are appended, existing options
    /// are overwritten in place so their position does not move.
    pub fn merge(&mut self, other: Sections) {
        self.defaults.extend(other.defaults);
        for (name, options) in other.sections {
            self.sections.entry(name).or_default().extend(options);
        }
    }
}
