use std::fmt;
use sweep_storage::ObjectKind;

/// One object that could not be disposed of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// `None` for entries that were neither a file, directory nor symlink.
    pub kind: Option<ObjectKind>,
    pub name: String,
}
impl Failure {
    pub fn kind_label(&self) -> &'static str {
        self.kind.map_or("other", |k| k.as_str())
    }
}
impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind_label(), self.name)
    }
}

/// Append-only list of failed objects, in the order they failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Failures(Vec<Failure>);
impl Failures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: Option<ObjectKind>, name: impl Into<String>) {
        self.0.push(Failure { kind, name: name.into() });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Failure> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// An empty list means the run was fully successful.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl<'a> IntoIterator for &'a Failures {
    type Item = &'a Failure;
    type IntoIter = std::slice::Iter<'a, Failure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
