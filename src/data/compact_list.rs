//! Compact list-of-lists: one offsets array plus one values array.
//!
//! Rows are stored back to back in `values`; row `i` is
//! `values[offsets[i]..offsets[i + 1]]`. This is the CSR layout expected by
//! graph partitioners (`xadj` / `adjncy`).

use crate::decomp_error::DecompositionError;

#[derive(Debug, Clone, PartialEq)]
pub struct CompactListList<T> {
    offsets: Vec<usize>,
    values: Vec<T>,
}

impl<T> Default for CompactListList<T> {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            values: Vec::new(),
        }
    }
}

impl<T: Clone + Default> CompactListList<T> {
    /// Allocate rows of the given sizes, filled with `T::default()`.
    pub fn with_row_sizes(sizes: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0);
        let mut total = 0usize;
        for &s in sizes {
            total += s;
            offsets.push(total);
        }
        Self {
            offsets,
            values: vec![T::default(); total],
        }
    }
}

impl<T> CompactListList<T> {
    /// Build from raw CSR parts, validating the offsets.
    pub fn from_parts(offsets: Vec<usize>, values: Vec<T>) -> Result<Self, DecompositionError> {
        if offsets.first() != Some(&0) {
            return Err(DecompositionError::InvalidConfig(
                "offsets must start at 0".into(),
            ));
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(DecompositionError::InvalidConfig(
                "offsets must be non-decreasing".into(),
            ));
        }
        let last = *offsets.last().unwrap_or(&0);
        if last != values.len() {
            return Err(DecompositionError::SizeMismatch {
                what: "compact list values",
                expected: last,
                found: values.len(),
            });
        }
        Ok(Self { offsets, values })
    }

    /// Build from nested rows.
    pub fn from_rows<R>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = T>,
    {
        let mut out = Self::default();
        for row in rows {
            out.values.extend(row);
            out.offsets.push(out.values.len());
        }
        out
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of stored values.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        &self.values[self.offsets[i]..self.offsets[i + 1]]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        &mut self.values[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.len()).map(move |i| self.row(i))
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Raw mutable access for in-place fill and compaction.
    pub(crate) fn parts_mut(&mut self) -> (&mut [usize], &mut Vec<T>) {
        (&mut self.offsets, &mut self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_follow_sizes() {
        let mut l = CompactListList::<usize>::with_row_sizes(&[2, 0, 1]);
        assert_eq!(l.len(), 3);
        assert_eq!(l.total_len(), 3);
        l.row_mut(0).copy_from_slice(&[4, 5]);
        l.row_mut(2)[0] = 9;
        assert_eq!(l.row(0), &[4, 5]);
        assert!(l.row(1).is_empty());
        assert_eq!(l.row(2), &[9]);
    }

    #[test]
    fn from_parts_rejects_bad_offsets() {
        assert!(CompactListList::from_parts(vec![0, 2, 1], vec![1, 2]).is_err());
        assert!(CompactListList::from_parts(vec![0, 3], vec![1, 2]).is_err());
        assert!(CompactListList::from_parts(vec![0, 2], vec![1, 2]).is_ok());
    }

    #[test]
    fn from_rows_matches_nested() {
        let l = CompactListList::from_rows(vec![vec![1, 2], vec![], vec![3]]);
        assert_eq!(l.offsets(), &[0, 2, 2, 3]);
        assert_eq!(l.rows().map(|r| r.len()).collect::<Vec<_>>(), vec![2, 0, 1]);
    }
}
