//! Output positions inside a materialized result.

use core::fmt;

use compact_str::CompactString;
use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// A named member of an object
    Field(CompactString),
    /// A positional constructor argument or array element
    Arg(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => f.write_str(name),
            Segment::Arg(index) => write!(f, "#{index}"),
        }
    }
}

/// Path from a level's element to one of its values. Empty means "the
/// element itself".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TargetPath(SmallVec<[Segment; 4]>);

impl TargetPath {
    #[inline]
    pub fn root() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `segment` followed by `self`
    pub fn prefixed(mut self, segment: Segment) -> Self {
        self.0.insert(0, segment);
        self
    }

    pub fn starts_with(&self, prefix: &TargetPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn strip_prefix(&self, prefix: &TargetPath) -> Option<TargetPath> {
        self.0
            .strip_prefix(prefix.0.as_slice())
            .map(|rest| TargetPath(rest.iter().cloned().collect()))
    }

    /// Drops a leading `segment`, if present.
    pub fn strip_segment(&self, segment: &Segment) -> Option<TargetPath> {
        match self.0.split_first() {
            Some((first, rest)) if first == segment => {
                Some(TargetPath(rest.iter().cloned().collect()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<Segment> for TargetPath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        TargetPath(iter.into_iter().collect())
    }
}
