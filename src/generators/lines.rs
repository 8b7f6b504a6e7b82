use geo::{BoundingRect, Coord, MultiPolygon, Point, Rotate};
use ordered_float::OrderedFloat;

use crate::geometry::{mm_to_micron, Point2};

///Fill an area (mm) with parallel lines at the given angle, one line
///every `spacing` mm. Returns two-point polylines in microns, scan rows
///alternating direction so consecutive lines zigzag.
///
///The area is rotated so the lines become horizontal, swept with an
///even-odd scanline, and the segments are rotated back.
pub fn spaced_line_fill(
    area: &MultiPolygon<f64>,
    angle_degrees: f64,
    spacing: f64,
) -> Vec<Vec<Point2>> {
    if spacing <= f64::EPSILON {
        return Vec::new();
    }

    let origin = Point::new(0.0, 0.0);
    let rotated = area.rotate_around_point(-angle_degrees, origin);

    let Some(bounds) = rotated.bounding_rect() else {
        return Vec::new();
    };

    let mut lines: Vec<Vec<Point2>> = Vec::new();
    let mut row_y = (bounds.min().y / spacing).ceil() * spacing;
    let mut forwards = true;

    while row_y <= bounds.max().y {
        let mut crossings: Vec<f64> = Vec::new();
        for polygon in &rotated {
            for ring in
                std::iter::once(polygon.exterior()).chain(polygon.interiors().iter())
            {
                for edge in ring.0.windows(2) {
                    let (a, b) = (edge[0], edge[1]);
                    if (a.y > row_y) != (b.y > row_y) {
                        crossings.push(a.x + (row_y - a.y) * (b.x - a.x) / (b.y - a.y));
                    }
                }
            }
        }

        crossings.sort_by_key(|crossing| OrderedFloat(*crossing));

        for span in crossings.chunks_exact(2) {
            let (x_enter, x_exit) = if forwards {
                (span[0], span[1])
            } else {
                (span[1], span[0])
            };

            let segment: Vec<Point2> = [
                Coord { x: x_enter, y: row_y },
                Coord { x: x_exit, y: row_y },
            ]
            .iter()
            .map(|coord| {
                let back = Point::new(coord.x, coord.y).rotate_around_point(angle_degrees, origin);
                Point2::new(mm_to_micron(back.x()), mm_to_micron(back.y()))
            })
            .collect();

            // Degenerate slivers collapse to a point once rounded.
            if segment[0] != segment[1] {
                lines.push(segment);
            }
        }

        forwards = !forwards;
        row_y += spacing;
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn unit_square() -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ]])
    }

    #[test]
    fn horizontal_fill_covers_the_square() {
        let lines = spaced_line_fill(&unit_square(), 0.0, 2.0);
        // Rows at y = 0, 2, ..., 10 minus the ones grazing the border.
        assert!(lines.len() >= 4);
        for line in &lines {
            assert_eq!(line[0].y, line[1].y);
            assert_eq!((line[0].x - line[1].x).abs(), 10_000);
        }
    }

    #[test]
    fn rows_alternate_direction() {
        let lines = spaced_line_fill(&unit_square(), 0.0, 2.0);
        for pair in lines.windows(2) {
            let first_forwards = pair[0][0].x < pair[0][1].x;
            let second_forwards = pair[1][0].x < pair[1][1].x;
            assert_ne!(first_forwards, second_forwards);
        }
    }

    #[test]
    fn angled_fill_rotates_back() {
        let lines = spaced_line_fill(&unit_square(), 90.0, 2.0);
        for line in &lines {
            // Vertical lines after the 90° rotation.
            assert_eq!(line[0].x, line[1].x);
        }
    }

    #[test]
    fn hole_splits_the_rows() {
        let with_hole = MultiPolygon(vec![geo::Polygon::new(
            geo::LineString::from(vec![
                (0.0, 0.0),
                (10.0, 0.0),
                (10.0, 10.0),
                (0.0, 10.0),
                (0.0, 0.0),
            ]),
            vec![geo::LineString::from(vec![
                (4.0, 4.0),
                (6.0, 4.0),
                (6.0, 6.0),
                (4.0, 6.0),
                (4.0, 4.0),
            ])],
        )]);
        let lines = spaced_line_fill(&with_hole, 0.0, 1.0);
        let row_through_hole: Vec<_> = lines
            .iter()
            .filter(|line| line[0].y == 5_000)
            .collect();
        assert_eq!(row_through_hole.len(), 2);
    }
}
