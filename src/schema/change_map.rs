use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recipient commander → donor voice assignment.
///
/// Keys are unique recipient identities; many recipients may share a donor.
/// Iteration is always in ascending recipient order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeMap(BTreeMap<String, String>);

impl ChangeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, recipient: impl Into<String>, donor: impl Into<String>) {
        self.0.insert(recipient.into(), donor.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn donor_of(&self, recipient: &str) -> Option<&str> {
        self.0.get(recipient).map(String::as_str)
    }

    /// The distinct donor voices referenced by any recipient.
    pub fn donor_voices(&self) -> FxHashSet<&str> {
        self.0.values().map(String::as_str).collect()
    }

    /// Every recipient assigned to `donor`, in ascending order.
    pub fn recipients_of<'a>(&'a self, donor: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(_, d)| d.as_str() == donor)
            .map(|(r, _)| r.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(r, d)| (r.as_str(), d.as_str()))
    }
}

impl<R: Into<String>, D: Into<String>> FromIterator<(R, D)> for ChangeMap {
    fn from_iter<I: IntoIterator<Item = (R, D)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(r, d)| (r.into(), d.into()))
                .collect(),
        )
    }
}
