//! Padded root-to-node path tables.

/// Padding for the class path table.
pub const CLASS_PATH_PAD: isize = -1;

/// Padding for the annotation path table. Distinct from `CLASS_PATH_PAD` so
/// padding in one table never equals padding in the other.
pub const ANNOTATION_PATH_PAD: isize = -2;

/// Fixed-width table of root-to-node id paths, one row per node.
#[derive(Debug, Clone)]
pub struct PathTable {
    /// Row-major entries, `width` per row.
    entries: Vec<isize>,
    /// Maximum path length (max depth + 1).
    width: usize,
    /// Value used after the end of a path.
    pad: isize,
}

impl PathTable {
    /// Create a table of `rows` rows filled with `pad`.
    pub fn new(rows: usize, width: usize, pad: isize) -> Self {
        Self {
            entries: vec![pad; rows * width],
            width,
            pad,
        }
    }

    /// Write `path` at the start of `row`; the rest stays padded.
    pub fn set_row(&mut self, row: usize, path: &[usize]) {
        let start = row * self.width;
        for (slot, &id) in self.entries[start..start + path.len()]
            .iter_mut()
            .zip(path)
        {
            *slot = id as isize;
        }
    }

    /// Raw row, padding included.
    pub fn row(&self, row: usize) -> &[isize] {
        let start = row * self.width;
        &self.entries[start..start + self.width]
    }

    /// The id at `pos` in `row`, or `None` at padding.
    pub fn get(&self, row: usize, pos: usize) -> Option<usize> {
        if pos >= self.width {
            return None;
        }
        let value = self.entries[row * self.width + pos];
        if value < 0 {
            None
        } else {
            Some(value as usize)
        }
    }

    /// Number of defined entries in `row` (the node's level + 1).
    pub fn depth(&self, row: usize) -> usize {
        self.row(row).iter().take_while(|&&v| v >= 0).count()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.entries.len() / self.width
        }
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The padding value.
    pub fn pad(&self) -> isize {
        self.pad
    }
}
