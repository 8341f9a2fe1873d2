//! Line segment grouping and rectangle math.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (x, y of the top-left corner, width, height).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Create a box from position and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Create a box from two corners.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Area of the box.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Area shared with another box.
    pub fn intersection_area(&self, other: &BoundingBox) -> f32 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
    }

    /// Intersection area divided by the smaller of the two areas.
    ///
    /// Returns 0.0 when either box is degenerate.
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f32 {
        let min_area = self.area().min(other.area());
        if min_area <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / min_area
    }

    /// Grow the box by `margin` on every side, clipped to `(0, 0, max_w, max_h)`.
    pub fn expand(&self, margin: f32, max_w: f32, max_h: f32) -> BoundingBox {
        let x1 = (self.x - margin).max(0.0);
        let y1 = (self.y - margin).max(0.0);
        let x2 = (self.right() + margin).min(max_w);
        let y2 = (self.bottom() + margin).min(max_h);
        BoundingBox::from_corners(x1, y1, x2, y2)
    }

    /// Shift the box by an offset.
    pub fn translate(&self, dx: f32, dy: f32) -> BoundingBox {
        BoundingBox::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Orientation of a line segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Straight segment from (x1, y1) to (x2, y2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl LineSegment {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Position used for grouping: mid y for horizontal lines, mid x for vertical ones.
    pub fn coordinate(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => (self.y1 + self.y2) / 2.0,
            Axis::Vertical => (self.x1 + self.x2) / 2.0,
        }
    }

    /// Extent along the line direction as (start, end).
    pub fn span(&self, axis: Axis) -> (f32, f32) {
        match axis {
            Axis::Horizontal => (self.x1.min(self.x2), self.x1.max(self.x2)),
            Axis::Vertical => (self.y1.min(self.y2), self.y1.max(self.y2)),
        }
    }

    /// Segment length.
    pub fn length(&self) -> f32 {
        ((self.x2 - self.x1).powi(2) + (self.y2 - self.y1).powi(2)).sqrt()
    }

    /// Orientation from slope, or `None` for diagonal segments.
    ///
    /// `tolerance_deg` is the allowed deviation from the axis.
    pub fn orientation(&self, tolerance_deg: f32) -> Option<Axis> {
        let dx = (self.x2 - self.x1).abs();
        let dy = (self.y2 - self.y1).abs();
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        let angle = dy.atan2(dx).to_degrees();
        if angle <= tolerance_deg {
            Some(Axis::Horizontal)
        } else if angle >= 90.0 - tolerance_deg {
            Some(Axis::Vertical)
        } else {
            None
        }
    }
}

/// Near-collinear segments grouped along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    pub axis: Axis,
    pub members: Vec<LineSegment>,
}

impl LineGroup {
    /// Coordinate-wise average of the member segments.
    pub fn representative(&self) -> LineSegment {
        let n = self.members.len().max(1) as f32;
        let sum = self.members.iter().fold([0.0f32; 4], |mut acc, s| {
            acc[0] += s.x1;
            acc[1] += s.y1;
            acc[2] += s.x2;
            acc[3] += s.y2;
            acc
        });
        LineSegment::new(sum[0] / n, sum[1] / n, sum[2] / n, sum[3] / n)
    }

    /// Average position of the members along the grouping axis.
    pub fn position(&self) -> f32 {
        let n = self.members.len().max(1) as f32;
        self.members.iter().map(|s| s.coordinate(self.axis)).sum::<f32>() / n
    }

    /// Union of the member spans along the line direction.
    pub fn span(&self) -> (f32, f32) {
        self.members.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), s| {
            let (a, b) = s.span(self.axis);
            (lo.min(a), hi.max(b))
        })
    }
}

/// Group segments whose coordinate along `axis` lies within `threshold` of
/// the previous segment in sorted order.
pub fn group_lines(lines: &[LineSegment], axis: Axis, threshold: f32) -> Vec<Vec<LineSegment>> {
    let mut sorted: Vec<LineSegment> = lines.to_vec();
    sorted.sort_by(|a, b| a.coordinate(axis).total_cmp(&b.coordinate(axis)));

    let mut groups: Vec<Vec<LineSegment>> = Vec::new();
    let mut previous: Option<f32> = None;

    for segment in sorted {
        let coord = segment.coordinate(axis);
        match (previous, groups.last_mut()) {
            (Some(prev), Some(group)) if coord - prev <= threshold => group.push(segment),
            _ => groups.push(vec![segment]),
        }
        previous = Some(coord);
    }

    groups
}

/// Same as [`group_lines`], wrapped into [`LineGroup`]s.
pub fn line_groups(lines: &[LineSegment], axis: Axis, threshold: f32) -> Vec<LineGroup> {
    group_lines(lines, axis, threshold)
        .into_iter()
        .map(|members| LineGroup { axis, members })
        .collect()
}

/// Group plain scalar positions with the same gap rule as [`group_lines`].
///
/// Returns the indices of the input values per group.
pub fn group_positions(values: &[f32], threshold: f32) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut previous: Option<f32> = None;
    for idx in order {
        let v = values[idx];
        match (previous, groups.last_mut()) {
            (Some(prev), Some(group)) if v - prev <= threshold => group.push(idx),
            _ => groups.push(vec![idx]),
        }
        previous = Some(v);
    }
    groups
}

/// Polygon area by the shoelace formula.
pub fn polygon_area(points: &[(f32, f32)]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0f32;
    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        sum += x1 * y2 - x2 * y1;
    }
    sum.abs() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal(y: f32) -> LineSegment {
        LineSegment::new(0.0, y, 100.0, y)
    }

    #[test]
    fn test_group_lines_by_gap() {
        let lines: Vec<LineSegment> = [10.0, 12.0, 11.0, 50.0, 52.0]
            .iter()
            .map(|&y| horizontal(y))
            .collect();

        let groups = group_lines(&lines, Axis::Horizontal, 5.0);
        assert_eq!(groups.len(), 2);

        let first: Vec<f32> = groups[0].iter().map(|s| s.y1).collect();
        let second: Vec<f32> = groups[1].iter().map(|s| s.y1).collect();
        assert_eq!(first, vec![10.0, 11.0, 12.0]);
        assert_eq!(second, vec![50.0, 52.0]);
    }

    #[test]
    fn test_group_lines_empty_and_single() {
        assert!(group_lines(&[], Axis::Vertical, 5.0).is_empty());

        let single = [LineSegment::new(7.0, 0.0, 7.0, 30.0)];
        let groups = line_groups(&single, Axis::Vertical, 5.0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].representative(), single[0]);
    }

    #[test]
    fn test_representative_is_average() {
        let group = LineGroup {
            axis: Axis::Horizontal,
            members: vec![LineSegment::new(0.0, 10.0, 100.0, 10.0), LineSegment::new(10.0, 14.0, 90.0, 14.0)],
        };
        assert_eq!(group.representative(), LineSegment::new(5.0, 12.0, 95.0, 12.0));
        assert_eq!(group.position(), 12.0);
        assert_eq!(group.span(), (0.0, 100.0));
    }

    #[test]
    fn test_orientation() {
        assert_eq!(LineSegment::new(0.0, 0.0, 100.0, 1.0).orientation(2.0), Some(Axis::Horizontal));
        assert_eq!(LineSegment::new(5.0, 0.0, 5.0, 80.0).orientation(2.0), Some(Axis::Vertical));
        assert_eq!(LineSegment::new(0.0, 0.0, 50.0, 50.0).orientation(2.0), None);
    }

    #[test]
    fn test_overlap_ratio_uses_smaller_area() {
        let big = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let small = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        assert_eq!(big.overlap_ratio(&small), 1.0);

        let apart = BoundingBox::new(200.0, 200.0, 10.0, 10.0);
        assert_eq!(big.overlap_ratio(&apart), 0.0);

        let half = BoundingBox::new(50.0, 0.0, 100.0, 100.0);
        assert_eq!(big.overlap_ratio(&half), 0.5);
    }

    #[test]
    fn test_group_positions() {
        let groups = group_positions(&[30.0, 1.0, 3.0, 31.0], 4.0);
        assert_eq!(groups, vec![vec![1, 2], vec![0, 3]]);
    }

    #[test]
    fn test_polygon_area() {
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert_eq!(polygon_area(&square), 100.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }
}
