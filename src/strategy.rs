//! Move selection for Connect Four.
//!
//! The bot does not search the game tree. It drops its piece into the
//! lowest-indexed column that still has room.

/// Number of columns on a Connect Four board.
pub const COLUMNS: usize = 7;

/// Number of cells in each column.
pub const ROWS: usize = 6;

/// One board column as sent by the server: the occupied cells, bottom first.
/// Only the length matters for move selection, so cell contents are kept opaque.
pub type Column = Vec<serde_json::Value>;

/// Returns the index of the first column (scanning `0..COLUMNS`) with fewer
/// than [`ROWS`] occupied cells, or `None` if the board is full.
///
/// Columns missing from a short board are treated as unavailable.
///
/// ```
/// use arena_bot::strategy::first_open_column;
///
/// let mut board = vec![Vec::new(); 7];
/// assert_eq!(first_open_column(&board), Some(0));
///
/// board[0] = vec![serde_json::json!(1); 6];
/// assert_eq!(first_open_column(&board), Some(1));
/// ```
pub fn first_open_column(board: &[Column]) -> Option<u8> {
    board
        .iter()
        .take(COLUMNS)
        .position(|column| column.len() < ROWS)
        .and_then(|col| u8::try_from(col).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full() -> Column {
        vec![json!(1); ROWS]
    }

    fn empty_board() -> Vec<Column> {
        vec![Vec::new(); COLUMNS]
    }

    #[test]
    fn empty_board_plays_column_zero() {
        assert_eq!(first_open_column(&empty_board()), Some(0));
    }

    #[test]
    fn skips_full_columns() {
        let mut board = empty_board();
        board[0] = full();
        board[1] = full();
        assert_eq!(first_open_column(&board), Some(2));
    }

    #[test]
    fn partially_filled_column_is_open() {
        let mut board = empty_board();
        board[0] = vec![json!(1); ROWS - 1];
        assert_eq!(first_open_column(&board), Some(0));
    }

    #[test]
    fn last_column_is_reachable() {
        let mut board = vec![full(); COLUMNS];
        board[COLUMNS - 1] = vec![json!(2)];
        assert_eq!(first_open_column(&board), Some(6));
    }

    #[test]
    fn full_board_has_no_move() {
        assert_eq!(first_open_column(&vec![full(); COLUMNS]), None);
    }

    #[test]
    fn columns_past_seven_are_ignored() {
        let mut board = vec![full(); COLUMNS];
        board.push(Vec::new());
        assert_eq!(first_open_column(&board), None);
    }

    #[test]
    fn short_board_scans_what_is_present() {
        assert_eq!(first_open_column(&[full(), Vec::new()]), Some(1));
        assert_eq!(first_open_column(&[]), None);
    }
}
