//! Purpose: In-place conversion between column-major and row-major storage.
//! Exports: `col_major_to_row_major`, `row_major_to_col_major`.
//! Role: Shared by every path that flips storage order (binary reads and writes, table export).
//! Invariants: O(1) extra space; each cycle of the index permutation is rotated exactly once.
//! Invariants: Works for any shape, including single rows and columns.

/// Index in column-major storage that holds the element belonging at row-major index `i`.
#[inline]
fn predecessor(i: usize, rows: usize, cols: usize) -> usize {
    rows * (i % cols) + i / cols
}

/// Rewrites a `rows` x `cols` matrix stored column-major into row-major order.
///
/// Follows the cycles of the transposition permutation: a cycle is rotated only
/// from its smallest index, which is detected by walking predecessors until one
/// is not greater than the candidate. Indices 0 and `rows * cols - 1` are fixed
/// points and never visited.
///
/// # Panics
///
/// Panics if `data.len() != rows * cols`.
pub fn col_major_to_row_major<T>(data: &mut [T], rows: usize, cols: usize) {
    assert_eq!(
        Some(data.len()),
        rows.checked_mul(cols),
        "buffer length does not match {rows}x{cols}",
    );
    let len = data.len();

    for i in 1..len.saturating_sub(1) {
        let mut x = predecessor(i, rows, cols);
        if x <= i {
            continue;
        }
        while x > i {
            x = predecessor(x, rows, cols);
        }
        if x < i {
            continue;
        }

        // `data[i]` rides along the swaps and lands in the last slot of the cycle.
        let mut slot = i;
        let mut x = predecessor(i, rows, cols);
        while x != i {
            data.swap(slot, x);
            slot = x;
            x = predecessor(x, rows, cols);
        }
    }
}

/// Rewrites a `rows` x `cols` matrix stored row-major into column-major order.
///
/// # Panics
///
/// Panics if `data.len() != rows * cols`.
pub fn row_major_to_col_major<T>(data: &mut [T], rows: usize, cols: usize) {
    // Row-major `rows x cols` is the column-major layout of the `cols x rows` transpose.
    col_major_to_row_major(data, cols, rows);
}

#[cfg(test)]
mod tests {
    use super::{col_major_to_row_major, row_major_to_col_major};

    #[test]
    fn two_by_three_column_major_becomes_row_major() {
        // [[1, 2, 3], [4, 5, 6]] stored by columns
        let mut data = vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        col_major_to_row_major(&mut data, 2, 3);
        assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn row_major_to_col_major_inverts() {
        let mut data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        row_major_to_col_major(&mut data, 2, 3);
        assert_eq!(data, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        col_major_to_row_major(&mut data, 2, 3);
        assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn vectors_and_tiny_shapes_are_untouched() {
        let mut row = vec![1, 2, 3, 4];
        col_major_to_row_major(&mut row, 1, 4);
        assert_eq!(row, vec![1, 2, 3, 4]);

        let mut col = vec![1, 2, 3, 4];
        col_major_to_row_major(&mut col, 4, 1);
        assert_eq!(col, vec![1, 2, 3, 4]);

        let mut empty: Vec<f64> = Vec::new();
        col_major_to_row_major(&mut empty, 0, 5);
        assert!(empty.is_empty());

        let mut single = vec![7];
        col_major_to_row_major(&mut single, 1, 1);
        assert_eq!(single, vec![7]);
    }

    #[test]
    fn square_matrix_swaps_off_diagonal() {
        let mut data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9];
        col_major_to_row_major(&mut data, 3, 3);
        assert_eq!(data, vec![1, 4, 7, 2, 5, 8, 3, 6, 9]);
    }

    #[test]
    fn non_copy_elements_are_moved() {
        let mut data: Vec<String> = ["a", "c", "b", "d"].iter().map(|s| s.to_string()).collect();
        col_major_to_row_major(&mut data, 2, 2);
        assert_eq!(data, vec!["a", "b", "c", "d"]);
    }

    #[test]
    #[should_panic(expected = "buffer length does not match")]
    fn length_mismatch_panics() {
        let mut data = vec![0.0; 5];
        col_major_to_row_major(&mut data, 2, 3);
    }
}
