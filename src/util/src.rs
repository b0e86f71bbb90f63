use std::fmt;

/// A character offset into a piece of source text.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SrcLoc(usize);

impl SrcLoc {
    pub fn start() -> Self {
        Self(0)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Zero-based (line, column) of this location within `code`.
    pub fn in_context(&self, code: &str) -> (usize, usize) {
        let mut pos = self.0;
        for (i, line) in code.lines().enumerate() {
            let len = line.chars().count();
            if pos < len + 1 {
                return (i, pos);
            }
            pos -= len + 1;
        }
        (code.lines().count(), 0)
    }
}

impl fmt::Debug for SrcLoc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<usize> for SrcLoc {
    fn from(pos: usize) -> Self {
        Self(pos)
    }
}

/// A half-open span of source, `from..until`.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum SrcRegion {
    None,
    Range(SrcLoc, SrcLoc),
}

impl SrcRegion {
    pub fn none() -> Self {
        SrcRegion::None
    }

    pub fn single(loc: SrcLoc) -> Self {
        SrcRegion::Range(loc, loc.next())
    }

    pub fn range(from: SrcLoc, until: SrcLoc) -> SrcRegion {
        if from < until {
            SrcRegion::Range(from, until)
        } else {
            SrcRegion::None
        }
    }

    pub fn union(self, other: Self) -> Self {
        match (self, other) {
            (SrcRegion::None, other) => other,
            (this, SrcRegion::None) => this,
            (SrcRegion::Range(from_a, until_a), SrcRegion::Range(from_b, until_b)) =>
                SrcRegion::Range(from_a.min(from_b), until_a.max(until_b)),
        }
    }

    pub fn in_context(&self, code: &str) -> Option<((usize, usize), (usize, usize))> {
        match self {
            SrcRegion::Range(from, until) => Some((from.in_context(code), until.in_context(code))),
            SrcRegion::None => None,
        }
    }
}

impl fmt::Debug for SrcRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SrcRegion::None => write!(f, "<none>"),
            SrcRegion::Range(from, to) => write!(f, "{:?}:{:?}", from, to),
        }
    }
}

impl From<usize> for SrcRegion {
    fn from(pos: usize) -> Self {
        SrcRegion::Range(SrcLoc::from(pos), SrcLoc::from(pos + 1))
    }
}

impl From<(usize, usize)> for SrcRegion {
    fn from((from, to): (usize, usize)) -> Self {
        SrcRegion::Range(SrcLoc::from(from), SrcLoc::from(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn locations_map_to_lines_and_columns() {
        let code = "def id = (\\x.x)\n{id 5}";
        assert_eq!(SrcLoc::from(0).in_context(code), (0, 0));
        assert_eq!(SrcLoc::from(4).in_context(code), (0, 4));
        assert_eq!(SrcLoc::from(16).in_context(code), (1, 0));
        assert_eq!(SrcLoc::from(19).in_context(code), (1, 3));
    }

    #[test]
    fn union_ignores_empty_regions() {
        let a = SrcRegion::from((2, 4));
        let b = SrcRegion::from((6, 9));
        assert_eq!(a.union(b), SrcRegion::from((2, 9)));
        assert_eq!(a.union(SrcRegion::none()), a);
        assert_eq!(SrcRegion::none().union(b), b);
    }
}
