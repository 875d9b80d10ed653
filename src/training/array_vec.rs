use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};

/// Growable arena for fixed-width numeric records. Storage is pre-allocated
/// and extends by a fixed block of rows when full, so downstream batched
/// math always sees one contiguous block instead of scattered records.
#[derive(Debug, Clone)]
pub struct ArrayVec {
    storage: Array2<f64>,
    extend_capacity: usize,
    len: usize,
}

impl ArrayVec {
    /// Create storage for `width`-element records with room for
    /// `initial_capacity` of them.
    pub fn new(width: usize, initial_capacity: usize, extend_capacity: usize) -> Self {
        ArrayVec {
            storage: Array2::zeros((initial_capacity, width)),
            extend_capacity,
            len: 0,
        }
    }

    /// Append one record. Amortized O(1): when the arena is full it grows
    /// by `extend_capacity` rows, not per insertion.
    ///
    /// # Panics
    ///
    /// Panics if the record width does not match the arena width.
    pub fn push(&mut self, record: ArrayView1<f64>) {
        assert_eq!(
            record.len(),
            self.storage.ncols(),
            "record width does not match arena width"
        );
        if self.len == self.storage.nrows() {
            let block = Array2::zeros((self.extend_capacity, self.storage.ncols()));
            self.storage
                .append(Axis(0), block.view())
                .expect("extension block has matching width");
        }
        self.storage.row_mut(self.len).assign(&record);
        self.len += 1;
    }

    /// Reset the logical length, keeping the allocated storage for reuse.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated row capacity.
    pub fn capacity(&self) -> usize {
        self.storage.nrows()
    }

    /// Indexed record access.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn get(&self, index: usize) -> ArrayView1<'_, f64> {
        assert!(index < self.len, "index {index} out of bounds ({})", self.len);
        self.storage.row(index)
    }

    /// Contiguous read-only window over `[start, end)`, clamped to the
    /// logical length. `start >= len` yields an empty window.
    pub fn view(&self, start: usize, end: usize) -> ArrayView2<'_, f64> {
        if start >= self.len {
            return self.storage.slice(s![0..0, ..]);
        }
        let end = end.min(self.len);
        self.storage.slice(s![start..end, ..])
    }

    /// Full window over every stored record.
    pub fn as_view(&self) -> ArrayView2<'_, f64> {
        self.storage.slice(s![..self.len, ..])
    }
}
