//! Hough line based table detection.

use image::GrayImage;
use imageproc::hough::{detect_lines, LineDetectionOptions, PolarLine};
use tracing::{debug, trace};

use super::preprocessing::dilated_edges;
use super::DetectedRegion;
use crate::geometry::{line_groups, Axis, BoundingBox, LineGroup, LineSegment};
use crate::models::config::DetectionConfig;
use crate::models::table::TableMethod;

/// Parameters for turning Hough lines into axis-aligned segments.
#[derive(Debug, Clone, Copy)]
pub struct HoughParams {
    pub vote_threshold: u32,
    pub suppression_radius: u32,
    pub angle_tolerance_deg: f32,
    pub segment_gap: u32,
}

/// Detect near-horizontal and near-vertical lines on an edge map and clip
/// each one to the longest run of edge pixels it passes through.
pub fn axis_segments(edges: &GrayImage, params: &HoughParams) -> Vec<(Axis, LineSegment)> {
    let options = LineDetectionOptions {
        vote_threshold: params.vote_threshold.max(1),
        suppression_radius: params.suppression_radius,
    };
    let lines = detect_lines(edges, options);
    trace!("Hough returned {} lines", lines.len());

    lines
        .iter()
        .filter_map(|line| {
            let axis = polar_axis(line, params.angle_tolerance_deg)?;
            let segment = clip_to_edges(edges, line, axis, params.segment_gap)?;
            Some((axis, segment))
        })
        .collect()
}

/// Angle 90 is horizontal, 0 (or 180) is vertical.
fn polar_axis(line: &PolarLine, tolerance_deg: f32) -> Option<Axis> {
    let angle = line.angle_in_degrees as f32;
    if (angle - 90.0).abs() <= tolerance_deg {
        Some(Axis::Horizontal)
    } else if angle <= tolerance_deg || angle >= 180.0 - tolerance_deg {
        Some(Axis::Vertical)
    } else {
        None
    }
}

/// Walk along the polar line and keep the longest run of edge hits.
fn clip_to_edges(edges: &GrayImage, line: &PolarLine, axis: Axis, gap: u32) -> Option<LineSegment> {
    let (width, height) = edges.dimensions();
    let theta = (line.angle_in_degrees as f32).to_radians();
    let (sin, cos) = theta.sin_cos();

    // Position across the line for a given position along it.
    let across = |along: f32| -> f32 {
        match axis {
            Axis::Horizontal => (line.r - along * cos) / sin,
            Axis::Vertical => (line.r - along * sin) / cos,
        }
    };

    let is_edge = |x: i64, y: i64| -> bool {
        x >= 0
            && y >= 0
            && (x as u32) < width
            && (y as u32) < height
            && edges.get_pixel(x as u32, y as u32)[0] > 0
    };

    let length = match axis {
        Axis::Horizontal => width,
        Axis::Vertical => height,
    };

    let hits = (0..length).map(|along| {
        let center = across(along as f32).round() as i64;
        (center - 1..=center + 1).any(|c| match axis {
            Axis::Horizontal => is_edge(along as i64, c),
            Axis::Vertical => is_edge(c, along as i64),
        })
    });

    let (start, end) = longest_run(hits, gap)?;
    let (start, end) = (start as f32, end as f32);

    Some(match axis {
        Axis::Horizontal => LineSegment::new(start, across(start), end, across(end)),
        Axis::Vertical => LineSegment::new(across(start), start, across(end), end),
    })
}

/// Longest stretch of `true` values, tolerating up to `gap` misses in a row.
fn longest_run(hits: impl Iterator<Item = bool>, gap: u32) -> Option<(usize, usize)> {
    fn keep_longer(run: (usize, usize), best: &mut Option<(usize, usize)>) {
        if best.is_none_or(|(s, e)| run.1 - run.0 > e - s) {
            *best = Some(run);
        }
    }

    let mut best: Option<(usize, usize)> = None;
    let mut current: Option<(usize, usize)> = None;

    for (i, hit) in hits.enumerate() {
        if !hit {
            continue;
        }
        current = match current {
            Some((start, last)) if i - last <= gap as usize + 1 => Some((start, i)),
            Some(run) => {
                keep_longer(run, &mut best);
                Some((i, i))
            }
            None => Some((i, i)),
        };
    }
    if let Some(run) = current {
        keep_longer(run, &mut best);
    }

    best
}

/// Disjoint-set forest over line indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Whether a horizontal and a vertical group cross, with some slack.
fn crosses(h: &LineGroup, v: &LineGroup, tolerance: f32) -> bool {
    let (hx0, hx1) = h.span();
    let (vy0, vy1) = v.span();
    let x = v.position();
    let y = h.position();
    x >= hx0 - tolerance && x <= hx1 + tolerance && y >= vy0 - tolerance && y <= vy1 + tolerance
}

/// Bounding rectangles of connected horizontal/vertical line networks.
///
/// A network becomes a candidate when it has at least two lines per axis.
pub fn grid_components(
    horizontal: &[LineGroup],
    vertical: &[LineGroup],
    tolerance: f32,
) -> Vec<BoundingBox> {
    let nh = horizontal.len();
    let mut sets = DisjointSet::new(nh + vertical.len());

    for (i, h) in horizontal.iter().enumerate() {
        for (j, v) in vertical.iter().enumerate() {
            if crosses(h, v, tolerance) {
                sets.union(i, nh + j);
            }
        }
    }

    let mut components: Vec<(usize, Vec<usize>)> = Vec::new();
    for idx in 0..nh + vertical.len() {
        let root = sets.find(idx);
        match components.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(idx),
            None => components.push((root, vec![idx])),
        }
    }

    components
        .into_iter()
        .filter_map(|(_, members)| {
            let (hs, vs): (Vec<usize>, Vec<usize>) = members.into_iter().partition(|&i| i < nh);
            if hs.len() < 2 || vs.len() < 2 {
                return None;
            }

            let mut x0 = f32::INFINITY;
            let mut x1 = f32::NEG_INFINITY;
            let mut y0 = f32::INFINITY;
            let mut y1 = f32::NEG_INFINITY;
            for &i in &hs {
                let (a, b) = horizontal[i].span();
                x0 = x0.min(a);
                x1 = x1.max(b);
                y0 = y0.min(horizontal[i].position());
                y1 = y1.max(horizontal[i].position());
            }
            for &j in &vs {
                let v = &vertical[j - nh];
                let (a, b) = v.span();
                y0 = y0.min(a);
                y1 = y1.max(b);
                x0 = x0.min(v.position());
                x1 = x1.max(v.position());
            }
            Some(BoundingBox::from_corners(x0, y0, x1, y1))
        })
        .collect()
}

/// Split segments by axis and group each axis.
pub fn group_by_axis(
    segments: &[(Axis, LineSegment)],
    threshold: f32,
) -> (Vec<LineGroup>, Vec<LineGroup>) {
    let horizontal: Vec<LineSegment> = segments
        .iter()
        .filter(|(axis, _)| *axis == Axis::Horizontal)
        .map(|(_, s)| *s)
        .collect();
    let vertical: Vec<LineSegment> = segments
        .iter()
        .filter(|(axis, _)| *axis == Axis::Vertical)
        .map(|(_, s)| *s)
        .collect();

    (
        line_groups(&horizontal, Axis::Horizontal, threshold),
        line_groups(&vertical, Axis::Vertical, threshold),
    )
}

/// Line based detector: edges, dilation, Hough, grouping, intersection networks.
pub fn detect_line_tables(image: &GrayImage, config: &DetectionConfig) -> Vec<DetectedRegion> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let edges = dilated_edges(image, config.canny_low, config.canny_high);
    let params = HoughParams {
        vote_threshold: (width.min(height) as f32 * config.hough_vote_fraction) as u32,
        suppression_radius: config.hough_suppression_radius,
        angle_tolerance_deg: config.angle_tolerance_deg,
        segment_gap: config.segment_gap,
    };

    let segments: Vec<(Axis, LineSegment)> = axis_segments(&edges, &params)
        .into_iter()
        .filter(|(_, s)| s.length() >= config.min_line_length)
        .collect();

    let (horizontal, vertical) = group_by_axis(&segments, config.line_group_threshold);
    debug!(
        "Line detector: {} segments, {} horizontal / {} vertical groups",
        segments.len(),
        horizontal.len(),
        vertical.len()
    );

    grid_components(&horizontal, &vertical, config.line_intersection_tolerance)
        .into_iter()
        .filter(|bbox| {
            bbox.width >= config.min_line_table_width && bbox.height >= config.min_line_table_height
        })
        .map(|bbox| DetectedRegion {
            bbox,
            method: TableMethod::LineDetection,
            confidence: config.line_confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn group(axis: Axis, segments: &[LineSegment]) -> LineGroup {
        LineGroup {
            axis,
            members: segments.to_vec(),
        }
    }

    #[test]
    fn test_longest_run_with_gaps() {
        let hits = [true, true, false, true, false, false, false, true, true, true, true];
        assert_eq!(longest_run(hits.iter().copied(), 1), Some((0, 3)));
        assert_eq!(longest_run(hits.iter().copied(), 3), Some((0, 10)));
        assert_eq!(longest_run([false, false].iter().copied(), 2), None);
    }

    #[test]
    fn test_grid_components_requires_two_lines_per_axis() {
        let h = vec![
            group(Axis::Horizontal, &[LineSegment::new(0.0, 0.0, 200.0, 0.0)]),
            group(Axis::Horizontal, &[LineSegment::new(0.0, 80.0, 200.0, 80.0)]),
        ];
        let v = vec![
            group(Axis::Vertical, &[LineSegment::new(0.0, 0.0, 0.0, 80.0)]),
            group(Axis::Vertical, &[LineSegment::new(200.0, 0.0, 200.0, 80.0)]),
        ];

        let boxes = grid_components(&h, &v, 5.0);
        assert_eq!(boxes, vec![BoundingBox::new(0.0, 0.0, 200.0, 80.0)]);

        // A lone cross does not form a table.
        assert!(grid_components(&h[..1], &v[..1], 5.0).is_empty());
    }

    #[test]
    fn test_detects_ruled_box() {
        let mut img = GrayImage::from_pixel(400, 300, Luma([255]));
        for x in 50..350 {
            for t in 0..2 {
                img.put_pixel(x, 50 + t, Luma([0]));
                img.put_pixel(x, 150 + t, Luma([0]));
                img.put_pixel(x, 250 + t, Luma([0]));
            }
        }
        for y in 50..252 {
            for t in 0..2 {
                img.put_pixel(50 + t, y, Luma([0]));
                img.put_pixel(200 + t, y, Luma([0]));
                img.put_pixel(348 + t, y, Luma([0]));
            }
        }

        let regions = detect_line_tables(&img, &DetectionConfig::default());
        assert_eq!(regions.len(), 1);
        let bbox = regions[0].bbox;
        assert!((bbox.x - 50.0).abs() < 6.0, "x = {}", bbox.x);
        assert!((bbox.width - 300.0).abs() < 12.0, "width = {}", bbox.width);
        assert!((bbox.height - 200.0).abs() < 12.0, "height = {}", bbox.height);
        assert_eq!(regions[0].method, TableMethod::LineDetection);
    }

    #[test]
    fn test_blank_page_has_no_lines() {
        let img = GrayImage::from_pixel(300, 200, Luma([255]));
        assert!(detect_line_tables(&img, &DetectionConfig::default()).is_empty());
    }
}
