/// World size of one grid cell (poster plus gutter).
pub const CELL_WIDTH: f64 = 220.0;
pub const CELL_HEIGHT: f64 = 320.0;
/// Drawn poster size; the remainder of the cell is gutter.
pub const POSTER_WIDTH: f64 = 200.0;
pub const POSTER_HEIGHT: f64 = 300.0;

/// A cell in the unbounded lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoordinate {
    pub col: i32,
    pub row: i32,
}

impl GridCoordinate {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Top-left corner of this cell in world units.
    pub fn world_origin(self, cell: CellSize) -> (f64, f64) {
        (
            f64::from(self.col) * cell.width,
            f64::from(self.row) * cell.height,
        )
    }
}

impl std::fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f64,
    pub height: f64,
    pub content_width: f64,
    pub content_height: f64,
}

impl Default for CellSize {
    fn default() -> Self {
        Self {
            width: CELL_WIDTH,
            height: CELL_HEIGHT,
            content_width: POSTER_WIDTH,
            content_height: POSTER_HEIGHT,
        }
    }
}

impl CellSize {
    /// Cell containing a world point, regardless of gutters.
    pub fn cell_at(&self, wx: f64, wy: f64) -> GridCoordinate {
        GridCoordinate::new(
            (wx / self.width).floor() as i32,
            (wy / self.height).floor() as i32,
        )
    }

    /// Cell whose drawn content covers a world point. Points in the gutter hit nothing.
    pub fn coordinate_at(&self, wx: f64, wy: f64) -> Option<GridCoordinate> {
        let coord = self.cell_at(wx, wy);
        let (ox, oy) = coord.world_origin(*self);
        let inside = wx - ox < self.content_width && wy - oy < self.content_height;
        inside.then_some(coord)
    }
}

/// Inclusive rectangle of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRange {
    pub min_col: i32,
    pub max_col: i32,
    pub min_row: i32,
    pub max_row: i32,
}

impl GridRange {
    pub fn contains(&self, coord: GridCoordinate) -> bool {
        coord.col >= self.min_col
            && coord.col <= self.max_col
            && coord.row >= self.min_row
            && coord.row <= self.max_row
    }

    /// Grow the range by `cells` on every side.
    pub fn expand(&self, cells: i32) -> Self {
        Self {
            min_col: self.min_col.saturating_sub(cells),
            max_col: self.max_col.saturating_add(cells),
            min_row: self.min_row.saturating_sub(cells),
            max_row: self.max_row.saturating_add(cells),
        }
    }

    pub fn len(&self) -> usize {
        let cols = (i64::from(self.max_col) - i64::from(self.min_col) + 1).max(0);
        let rows = (i64::from(self.max_row) - i64::from(self.min_row) + 1).max(0);
        (cols * rows) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major iteration.
    pub fn iter(&self) -> impl Iterator<Item = GridCoordinate> + use<> {
        let (min_col, max_col) = (self.min_col, self.max_col);
        (self.min_row..=self.max_row)
            .flat_map(move |row| (min_col..=max_col).map(move |col| GridCoordinate::new(col, row)))
    }
}
