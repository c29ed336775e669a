//! Surface-local geometry: rectangles, the terminal search surface and the
//! hint direction indicator.

/// Side of the square logical canvas every collage layout is expressed in.
pub const BASE_SIZE: f64 = 600.0;

/// Approximate pixel size of one terminal cell, so distances on the search
/// surface stay comparable to the browser version.
pub const CELL_WIDTH: f64 = 8.0;
pub const CELL_HEIGHT: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Point-in-rect for a rectangle rotated by `degrees` about its centre.
    pub fn contains_rotated(&self, p: Point, degrees: f64) -> bool {
        let c = self.center();
        let (sin, cos) = (-degrees).to_radians().sin_cos();
        let (dx, dy) = (p.x - c.x, p.y - c.y);
        let lx = dx * cos - dy * sin;
        let ly = dx * sin + dy * cos;
        lx.abs() <= self.w / 2.0 && ly.abs() <= self.h / 2.0
    }

    /// Axis-aligned box around the rectangle rotated about its centre.
    pub fn rotated_bounds(&self, degrees: f64) -> Rect {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let bw = self.w * cos.abs() + self.h * sin.abs();
        let bh = self.w * sin.abs() + self.h * cos.abs();
        let c = self.center();
        Rect::new(c.x - bw / 2.0, c.y - bh / 2.0, bw, bh)
    }

    /// Maps a rect from the logical canvas onto a surface of `size`.
    pub fn scale_from_canvas(&self, size: (f64, f64)) -> Rect {
        let (sx, sy) = (size.0 / BASE_SIZE, size.1 / BASE_SIZE);
        Rect::new(self.x * sx, self.y * sy, self.w * sx, self.h * sy)
    }
}

/// Terminal area that hosts the collage, in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub left: u16,
    pub top: u16,
    pub cols: u16,
    pub rows: u16,
}

impl Surface {
    pub const MIN_COLS: u16 = 24;
    pub const MIN_ROWS: u16 = 12;

    /// Largest square (in pixel units) surface centred in the given cell area.
    /// `None` when the area cannot host a playable surface.
    pub fn fit(left: u16, top: u16, width: u16, height: u16) -> Option<Surface> {
        let ratio = CELL_HEIGHT / CELL_WIDTH;
        let cols_by_height = (height as f64 * ratio).floor() as u16;
        let cols = width.min(cols_by_height);
        let rows = (cols as f64 / ratio).floor() as u16;

        if cols < Self::MIN_COLS || rows < Self::MIN_ROWS {
            return None;
        }

        Some(Surface {
            left: left + (width - cols) / 2,
            top: top + (height - rows) / 2,
            cols,
            rows,
        })
    }

    /// Surface size in local (pixel) units.
    pub fn size(&self) -> (f64, f64) {
        (
            self.cols as f64 * CELL_WIDTH,
            self.rows as f64 * CELL_HEIGHT,
        )
    }

    /// Centre of a terminal cell in surface-local units, if it lies on the
    /// surface.
    pub fn cell_to_local(&self, col: u16, row: u16) -> Option<Point> {
        if col < self.left
            || row < self.top
            || col >= self.left + self.cols
            || row >= self.top + self.rows
        {
            return None;
        }
        Some(Point::new(
            ((col - self.left) as f64 + 0.5) * CELL_WIDTH,
            ((row - self.top) as f64 + 0.5) * CELL_HEIGHT,
        ))
    }

    /// Terminal cell containing a surface-local point, clamped to the surface.
    pub fn local_to_cell(&self, p: Point) -> (u16, u16) {
        let col = (p.x / CELL_WIDTH).floor().clamp(0.0, (self.cols - 1) as f64) as u16;
        let row = (p.y / CELL_HEIGHT).floor().clamp(0.0, (self.rows - 1) as f64) as u16;
        (self.left + col, self.top + row)
    }
}

/// Direction indicator drawn from the surface centre towards the target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HintArrow {
    pub origin: Point,
    pub distance: f64,
    pub angle_degrees: f64,
    pub length: f64,
}

impl HintArrow {
    pub fn tip(&self) -> Point {
        let (sin, cos) = self.angle_degrees.to_radians().sin_cos();
        Point::new(
            self.origin.x + cos * self.length,
            self.origin.y + sin * self.length,
        )
    }
}

/// Arrow from the surface centre towards the target centre, both expressed
/// in the surface's local space. The length stops short of the target by 50
/// units, never drops below 40 and never exceeds 80% of the larger surface
/// side.
pub fn hint_arrow(surface: Rect, target: Rect) -> HintArrow {
    let origin = Point::new(surface.w / 2.0, surface.h / 2.0);
    let tc = target.center();
    let t = Point::new(tc.x - surface.x, tc.y - surface.y);

    let (dx, dy) = (t.x - origin.x, t.y - origin.y);
    let distance = (dx * dx + dy * dy).sqrt();
    let angle_degrees = dy.atan2(dx).to_degrees();

    let max_length = surface.w.max(surface.h) * 0.8;
    let length = (distance - 50.0).max(40.0).min(max_length);

    HintArrow {
        origin,
        distance,
        angle_degrees,
        length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn arrow_points_right_and_shrinks_by_fifty() {
        let surface = Rect::new(0.0, 0.0, 600.0, 600.0);
        let target = Rect::new(480.0, 280.0, 40.0, 40.0);

        let arrow = hint_arrow(surface, target);

        assert!((arrow.distance - 200.0).abs() < EPS);
        assert!(arrow.angle_degrees.abs() < EPS);
        assert!((arrow.length - 150.0).abs() < EPS);
    }

    #[test]
    fn arrow_never_shorter_than_forty() {
        let surface = Rect::new(0.0, 0.0, 600.0, 600.0);
        let target = Rect::new(290.0, 330.0, 20.0, 20.0);

        let arrow = hint_arrow(surface, target);

        assert!((arrow.angle_degrees - 90.0).abs() < EPS);
        assert!((arrow.length - 40.0).abs() < EPS);
    }

    #[test]
    fn arrow_capped_at_eighty_percent_of_larger_side() {
        let surface = Rect::new(0.0, 0.0, 200.0, 100.0);
        let target = Rect::new(-2000.0, 40.0, 20.0, 20.0);

        let arrow = hint_arrow(surface, target);

        assert!((arrow.length - 160.0).abs() < EPS);
        assert!((arrow.angle_degrees.abs() - 180.0).abs() < EPS);
    }

    #[test]
    fn arrow_uses_surface_local_space() {
        let at_origin = hint_arrow(
            Rect::new(0.0, 0.0, 400.0, 400.0),
            Rect::new(0.0, 0.0, 10.0, 10.0),
        );
        let shifted = hint_arrow(
            Rect::new(100.0, 50.0, 400.0, 400.0),
            Rect::new(100.0, 50.0, 10.0, 10.0),
        );
        assert_eq!(at_origin, shifted);
        assert!((at_origin.angle_degrees + 135.0).abs() < EPS);
    }

    #[test]
    fn rotated_containment() {
        let r = Rect::new(0.0, 0.0, 100.0, 20.0);
        let corner_region = Point::new(95.0, 2.0);
        assert!(r.contains_rotated(corner_region, 0.0));
        assert!(!r.contains_rotated(corner_region, 90.0));
        assert!(r.contains_rotated(Point::new(50.0, 55.0), 90.0));
    }

    #[test]
    fn rotated_bounds_of_quarter_turn_swaps_sides() {
        let b = Rect::new(0.0, 0.0, 100.0, 20.0).rotated_bounds(90.0);
        assert!((b.w - 20.0).abs() < 1e-6);
        assert!((b.h - 100.0).abs() < 1e-6);
        assert!((b.center().x - 50.0).abs() < 1e-6);
    }

    #[test]
    fn surface_fit_is_square_in_pixels() {
        let s = Surface::fit(0, 0, 100, 30).unwrap();
        assert_eq!((s.cols, s.rows), (60, 30));
        assert_eq!(s.left, 20);
        let (w, h) = s.size();
        assert_eq!(w, h);
    }

    #[test]
    fn surface_fit_rejects_tiny_areas() {
        assert_eq!(Surface::fit(0, 0, 20, 40), None);
        assert_eq!(Surface::fit(0, 0, 200, 8), None);
    }

    #[test]
    fn cell_mapping_roundtrips_inside_surface() {
        let s = Surface::fit(2, 1, 80, 40).unwrap();
        let p = s.cell_to_local(s.left + 3, s.top + 4).unwrap();
        assert_eq!(p, Point::new(3.5 * CELL_WIDTH, 4.5 * CELL_HEIGHT));
        assert_eq!(s.local_to_cell(p), (s.left + 3, s.top + 4));
        assert_eq!(s.cell_to_local(0, 0), None);
    }

    #[test]
    fn canvas_scaling() {
        let r = Rect::new(300.0, 150.0, 60.0, 30.0).scale_from_canvas((300.0, 600.0));
        assert_eq!(r, Rect::new(150.0, 150.0, 30.0, 30.0));
    }
}
