use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use glam::DVec2;

use crate::geometry::{AngleRadians, Micron, Point2};

///Endpoints closer than this are treated as the same point when chaining
///polylines into strings, and when reclassifying a polyline as a loop.
const COINCIDENT_POINT_DISTANCE: Micron = 10;

///Cell size of the endpoint bucket grid.
const BUCKET_GRID_SIZE: Micron = 2_000;

///Projections are rounded at this precision when bucketing starting
///lines, so that truly collinear lines share a bucket.
const PROJECTION_PRECISION: f64 = 10.0;

///A path handed to, and ordered by, the monotonic orderer.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderedPath {
    pub points: Vec<Point2>,
    pub is_closed: bool,
    ///Index of the vertex to start printing from; `None` while undecided.
    pub start_vertex: Option<usize>,
    ///Whether the path is to be traversed back-to-front.
    pub backwards: bool,
}

impl OrderedPath {
    pub fn polyline(points: Vec<Point2>) -> Self {
        Self {
            points,
            is_closed: false,
            start_vertex: None,
            backwards: false,
        }
    }

    pub fn polygon(points: Vec<Point2>) -> Self {
        Self {
            points,
            is_closed: true,
            start_vertex: Some(0),
            backwards: false,
        }
    }

    fn front(&self) -> Point2 {
        self.points[0]
    }

    fn back(&self) -> Point2 {
        self.points[self.points.len() - 1]
    }

    ///The endpoint printing starts from, once decided.
    pub fn start_point(&self) -> Point2 {
        match self.start_vertex {
            Some(vertex) => self.points[vertex],
            None => self.front(),
        }
    }

    ///The endpoint opposite the chosen start.
    pub fn end_point(&self) -> Point2 {
        match self.start_vertex {
            Some(vertex) => self.points[self.points.len() - 1 - vertex],
            None => self.back(),
        }
    }
}

///Bucket grid over polyline endpoints, for quick nearby-endpoint lookup.
struct EndpointGrid {
    cells: HashMap<(i64, i64), Vec<(usize, Point2)>>,
}

impl EndpointGrid {
    fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    fn cell_of(point: Point2) -> (i64, i64) {
        (
            point.x.div_euclid(BUCKET_GRID_SIZE),
            point.y.div_euclid(BUCKET_GRID_SIZE),
        )
    }

    fn insert(&mut self, point: Point2, path_index: usize) {
        self.cells
            .entry(Self::cell_of(point))
            .or_default()
            .push((path_index, point));
    }

    fn nearby(&self, point: Point2, distance: Micron) -> Vec<(usize, Point2)> {
        let min_cell = Self::cell_of(point - Point2::new(distance, distance));
        let max_cell = Self::cell_of(point + Point2::new(distance, distance));
        let mut found = Vec::new();
        for cell_x in min_cell.0..=max_cell.0 {
            for cell_y in min_cell.1..=max_cell.1 {
                if let Some(entries) = self.cells.get(&(cell_x, cell_y)) {
                    found.extend(entries.iter().copied());
                }
            }
        }
        found
    }
}

///Orders paths so that adjacent lines print in a consistent major
///direction. Strings of endpoint-incident polylines are swept as one run;
///lines overlapping each other perpendicular to the direction are forced
///to print earlier-projection first; everything else is ordered by its
///projection on the monotonic vector.
///
///Polygons are not ordered monotonically; they are printed first, as
///given.
pub struct MonotonicOrder {
    monotonic_vector: DVec2,
    max_adjacent_distance: Micron,
    start_point: Point2,
    pub paths: Vec<OrderedPath>,
}

impl MonotonicOrder {
    pub fn new(
        monotonic_direction: AngleRadians,
        max_adjacent_distance: Micron,
        start_point: Point2,
    ) -> Self {
        Self {
            // Rotates clockwise rather than counter-clockwise, matching
            // the direction infill patterns are generated in.
            monotonic_vector: DVec2::new(
                -monotonic_direction.0.cos(),
                monotonic_direction.0.sin(),
            ),
            max_adjacent_distance,
            start_point,
            paths: Vec::new(),
        }
    }

    pub fn add_polyline(&mut self, points: Vec<Point2>) {
        if !points.is_empty() {
            self.paths.push(OrderedPath::polyline(points));
        }
    }

    pub fn add_polygon(&mut self, points: Vec<Point2>) {
        if !points.is_empty() {
            self.paths.push(OrderedPath::polygon(points));
        }
    }

    fn project(&self, point: Point2) -> f64 {
        self.monotonic_vector
            .dot(DVec2::new(point.x as f64, point.y as f64))
    }

    fn project_on(vector: DVec2, point: Point2) -> f64 {
        vector.dot(DVec2::new(point.x as f64, point.y as f64))
    }

    ///The projection of a path is the projection of its earlier endpoint.
    fn path_projection(&self, path: &OrderedPath) -> f64 {
        self.project(path.front()).min(self.project(path.back()))
    }

    ///Open polylines whose endpoints coincide are actually loops.
    fn detect_loops(&mut self) {
        for path in &mut self.paths {
            if !path.is_closed
                && path.points.len() > 2
                && (path.front() - path.back()).vsize2()
                    < COINCIDENT_POINT_DISTANCE * COINCIDENT_POINT_DISTANCE
            {
                path.is_closed = true;
                path.start_vertex = Some(0);
            }
        }
    }

    pub fn optimize(&mut self) {
        if self.paths.is_empty() {
            return;
        }

        self.detect_loops();

        let mut reordered: Vec<OrderedPath> = Vec::with_capacity(self.paths.len());

        // Print loops first; the monotonic order is meant for polylines.
        let mut polylines: Vec<usize> = Vec::new();
        for (index, path) in self.paths.iter().enumerate() {
            if path.is_closed || path.points.len() <= 1 {
                reordered.push(path.clone());
            } else {
                polylines.push(index);
            }
        }

        // Sorting by projection makes adjacent lines near in the list.
        polylines.sort_by(|a, b| {
            let a_projection = self.path_projection(&self.paths[*a]);
            let b_projection = self.path_projection(&self.paths[*b]);
            a_projection.total_cmp(&b_projection)
        });

        let mut endpoint_grid = EndpointGrid::new();
        for polyline in &polylines {
            endpoint_grid.insert(self.paths[*polyline].front(), *polyline);
            endpoint_grid.insert(self.paths[*polyline].back(), *polyline);
        }

        // Build the sequences that must print as one monotonic run. Each
        // entry of `starting_lines` opens a sequence; `connections` links
        // every line to the one printed right after it within a sequence.
        let mut connected_lines: BTreeSet<usize> = BTreeSet::new();
        let mut starting_lines: BTreeSet<usize> = BTreeSet::new();
        let mut connections: BTreeMap<usize, usize> = BTreeMap::new();

        for (sorted_position, polyline) in polylines.iter().copied().enumerate() {
            if connections.contains_key(&polyline) {
                // Already linked up through a string of polylines.
                continue;
            }

            let string = self.find_polyline_string(polyline, &endpoint_grid);

            if string.len() > 1 {
                starting_lines.insert(string[0]);
                for string_position in 0..string.len() - 1 {
                    connections.insert(string[string_position], string[string_position + 1]);
                    connected_lines.insert(string[string_position + 1]);

                    // A string may interweave with other lines; where it
                    // touches them, their order must still be guaranteed,
                    // so the contact points become junctions to restart
                    // from.
                    let string_sorted_position = polylines
                        .iter()
                        .position(|index| *index == string[string_position])
                        .expect("string member is a polyline");
                    for overlapping in
                        self.overlapping_lines(string_sorted_position, &polylines)
                    {
                        if !string.contains(&overlapping) {
                            starting_lines.insert(overlapping);
                            starting_lines.insert(string[string_position + 1]);
                        }
                    }
                }
            } else {
                if !connected_lines.contains(&polyline) {
                    starting_lines.insert(polyline);
                }
                let overlapping = self.overlapping_lines(sorted_position, &polylines);
                if overlapping.len() == 1 {
                    connections.insert(polyline, overlapping[0]);
                    if connected_lines.contains(&overlapping[0]) {
                        // Several lines lead here; it must be startable.
                        starting_lines.insert(overlapping[0]);
                    } else {
                        connected_lines.insert(overlapping[0]);
                    }
                } else {
                    for overlapping_line in overlapping {
                        starting_lines.insert(overlapping_line);
                    }
                }
            }
        }

        // Bucket the starting lines by rounded projection span, so truly
        // collinear lines share a bucket and are processed in one row.
        let mut pre_ordered: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
        for starting_line in &starting_lines {
            let path = &self.paths[*starting_line];
            let start_projection =
                (self.project(path.front()) / PROJECTION_PRECISION).round() as i64;
            let end_projection =
                (self.project(path.back()) / PROJECTION_PRECISION).round() as i64;
            let key = (
                start_projection.min(end_projection),
                start_projection.max(end_projection),
            );
            pre_ordered.entry(key).or_default().push(*starting_line);
        }

        // Greedy emission: take the lowest-projection bucket, pick the
        // start whose endpoint is closest to the nozzle, then walk its
        // connection chain until it ends, hits another starting point or
        // would revisit a line.
        let mut current_position = self.start_point;
        let mut emitted: HashSet<usize> = HashSet::new();

        while let Some(&bucket_key) = pre_ordered.keys().next() {
            let bucket = pre_ordered
                .get_mut(&bucket_key)
                .expect("bucket key was just observed");

            let mut closest_distance = i64::MAX;
            let mut closest_position_in_bucket = 0;
            let mut closest_backwards = false;
            for (position_in_bucket, candidate) in bucket.iter().enumerate() {
                let path = &self.paths[*candidate];
                let distance_start = (current_position - path.front()).vsize2();
                let distance_end = (current_position - path.back()).vsize2();
                if distance_start < closest_distance {
                    closest_distance = distance_start;
                    closest_position_in_bucket = position_in_bucket;
                    closest_backwards = false;
                }
                if distance_end < closest_distance {
                    closest_distance = distance_end;
                    closest_position_in_bucket = position_in_bucket;
                    closest_backwards = true;
                }
            }

            let closest = bucket.remove(closest_position_in_bucket);
            if bucket.is_empty() {
                pre_ordered.remove(&bucket_key);
            }

            set_start_vertex(&mut self.paths[closest], closest_backwards);
            current_position = self.paths[closest].end_point();
            let mut sweep_direction = traversal_direction(&self.paths[closest]);
            reordered.push(self.paths[closest].clone());
            emitted.insert(closest);

            // Visited lines of this chain; a set, so that connection
            // cycles of any length terminate.
            let mut visited: HashSet<usize> = HashSet::new();
            visited.insert(closest);

            let mut connection = connections.get(&closest).copied();
            while let Some(line) = connection {
                if starting_lines.contains(&line)
                    || visited.contains(&line)
                    || emitted.contains(&line)
                {
                    break;
                }
                visited.insert(line);

                let path = &mut self.paths[line];
                if path.start_vertex.is_none() {
                    // Adjacent chained lines sweep the same way as their
                    // predecessor, so the whole cluster lays down in one
                    // consistent direction.
                    let forwards = DVec2::new(
                        (path.back().x - path.front().x) as f64,
                        (path.back().y - path.front().y) as f64,
                    );
                    set_start_vertex(path, forwards.dot(sweep_direction) < 0.0);
                }
                current_position = path.end_point();
                if traversal_direction(path).length_squared() > 0.0 {
                    sweep_direction = traversal_direction(path);
                }
                reordered.push(path.clone());
                emitted.insert(line);

                connection = connections.get(&line).copied();
            }
        }

        self.paths = reordered;
    }

    ///Find the string of endpoint-incident polylines containing the given
    ///one, oriented so that the string is traversed from the endpoint that
    ///is monotonically earliest. Start vertices of all members are set;
    ///if the polyline stands alone, its start vertex is reset to unknown.
    fn find_polyline_string(
        &mut self,
        polyline: usize,
        endpoint_grid: &EndpointGrid,
    ) -> VecDeque<usize> {
        let mut result = VecDeque::new();
        result.push_back(polyline);
        self.paths[polyline].start_vertex = Some(0);

        let mut first_endpoint = self.paths[polyline].front();
        let mut last_endpoint = self.paths[polyline].back();

        // Extend backwards from the front endpoint.
        while let Some((found, found_point)) =
            self.find_connectable(first_endpoint, endpoint_grid)
        {
            result.push_front(found);
            let farthest_vertex = self.farthest_endpoint(found, found_point);
            let path = &mut self.paths[found];
            path.start_vertex = Some(farthest_vertex);
            path.backwards = farthest_vertex != 0;
            first_endpoint = path.points[farthest_vertex];
        }

        // Extend forwards from the back endpoint.
        while let Some((found, found_point)) = self.find_connectable(last_endpoint, endpoint_grid)
        {
            result.push_back(found);
            let farthest_vertex = self.farthest_endpoint(found, found_point);
            let path = &mut self.paths[found];
            path.start_vertex = Some(if farthest_vertex == 0 {
                path.points.len() - 1
            } else {
                0
            });
            path.backwards = farthest_vertex != 0;
            last_endpoint = path.points[farthest_vertex];
        }

        // Start the string from the monotonically earlier of its two ends.
        if self.project(last_endpoint) < self.project(first_endpoint) {
            let contiguous = result.make_contiguous();
            contiguous.reverse();
            for member in result.iter() {
                let path = &mut self.paths[*member];
                path.start_vertex = Some(match path.start_vertex {
                    Some(0) | None => path.points.len() - 1,
                    Some(_) => 0,
                });
                path.backwards = !path.backwards;
            }
        }

        if result.len() == 1 {
            self.paths[result[0]].start_vertex = None;
        }

        result
    }

    ///A nearby polyline endpoint this string can connect to: close enough
    ///and not already part of a string.
    fn find_connectable(
        &self,
        nearby_endpoint: Point2,
        endpoint_grid: &EndpointGrid,
    ) -> Option<(usize, Point2)> {
        endpoint_grid
            .nearby(nearby_endpoint, COINCIDENT_POINT_DISTANCE)
            .into_iter()
            .find(|(candidate, endpoint)| {
                self.paths[*candidate].start_vertex.is_none()
                    && (*endpoint - nearby_endpoint).vsize2()
                        < COINCIDENT_POINT_DISTANCE * COINCIDENT_POINT_DISTANCE
            })
    }

    ///The vertex index of the polyline endpoint farthest from `point`.
    fn farthest_endpoint(&self, polyline: usize, point: Point2) -> usize {
        let path = &self.paths[polyline];
        let front_distance = (path.front() - point).vsize2();
        let back_distance = (path.back() - point).vsize2();
        if front_distance < back_distance {
            path.points.len() - 1
        } else {
            0
        }
    }

    ///All lines after `sorted_position` that overlap the given line: within
    ///`max_adjacent_distance` along the monotonic direction and overlapping
    ///in the perpendicular direction.
    fn overlapping_lines(&self, sorted_position: usize, polylines: &[usize]) -> Vec<usize> {
        let perpendicular = self.monotonic_vector.perp();
        let path = &self.paths[polylines[sorted_position]];

        let start_monotonic = self.project(path.front());
        let end_monotonic = self.project(path.back());
        let my_farthest_monotonic_padded =
            start_monotonic.max(end_monotonic) + self.max_adjacent_distance as f64;
        let my_closest_monotonic_padded =
            start_monotonic.min(end_monotonic) - self.max_adjacent_distance as f64;

        let my_start = Self::project_on(perpendicular, path.front());
        let my_end = Self::project_on(perpendicular, path.back());
        let my_farthest_padded = my_start.max(my_end) + self.max_adjacent_distance as f64;
        let my_closest_padded = my_start.min(my_end) - self.max_adjacent_distance as f64;

        let mut overlapping = Vec::new();
        for other in &polylines[sorted_position + 1..] {
            let other_path = &self.paths[*other];
            let their_start_projection = self.project(other_path.front());
            let their_end_projection = self.project(other_path.back());
            let their_farthest = their_start_projection.max(their_end_projection);
            let their_closest = their_start_projection.min(their_end_projection);
            if their_closest > my_farthest_monotonic_padded
                || my_closest_monotonic_padded > their_farthest
            {
                // Sorted by projection, so every later line is beyond
                // adjacency too.
                break;
            }

            let their_start = Self::project_on(perpendicular, other_path.front());
            let their_end = Self::project_on(perpendicular, other_path.back());
            let their_perp_farthest = their_start.max(their_end);
            let their_perp_closest = their_start.min(their_end);

            // Overlap cases: one end of ours inside theirs, or theirs
            // entirely inside ours; equal spans fall out of the last case.
            if (my_closest_padded >= their_perp_closest && my_closest_padded <= their_perp_farthest)
                || (my_farthest_padded >= their_perp_closest
                    && my_farthest_padded <= their_perp_farthest)
                || (their_perp_closest >= my_closest_padded
                    && their_perp_farthest <= my_farthest_padded)
            {
                overlapping.push(*other);
            }
        }

        overlapping
    }
}

///The direction a path is traversed in, from chosen start to end.
fn traversal_direction(path: &OrderedPath) -> DVec2 {
    let start = path.start_point();
    let end = path.end_point();
    DVec2::new((end.x - start.x) as f64, (end.y - start.y) as f64)
}

fn set_start_vertex(path: &mut OrderedPath, backwards: bool) {
    if backwards {
        path.start_vertex = Some(path.points.len() - 1);
        path.backwards = true;
    } else {
        path.start_vertex = Some(0);
        path.backwards = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(x0: Micron, y0: Micron, x1: Micron, y1: Micron) -> Vec<Point2> {
        vec![Point2::new(x0, y0), Point2::new(x1, y1)]
    }

    ///Two adjacent parallel skin lines at 45°: the one with the smaller
    ///axial projection prints first and both run the same way.
    #[test]
    fn adjacent_lines_print_in_projection_order() {
        let mut order = MonotonicOrder::new(
            AngleRadians(std::f64::consts::FRAC_PI_4),
            440,
            Point2::new(0, 0),
        );
        order.add_polyline(line(0, 0, 10_000, 0));
        order.add_polyline(line(0, 380, 10_000, 380));
        order.optimize();

        assert_eq!(order.paths.len(), 2);
        let first = &order.paths[0];
        let second = &order.paths[1];

        let direction = DVec2::new(
            -(std::f64::consts::FRAC_PI_4).cos(),
            (std::f64::consts::FRAC_PI_4).sin(),
        );
        let projection = |p: Point2| direction.dot(DVec2::new(p.x as f64, p.y as f64));
        let earlier = |path: &OrderedPath| projection(path.front()).min(projection(path.back()));
        assert!(earlier(first) <= earlier(second));

        // Both lines are swept in the same x-direction.
        assert_eq!(first.backwards, second.backwards);
    }

    #[test]
    fn non_adjacent_lines_are_ordered_by_projection() {
        let mut order = MonotonicOrder::new(AngleRadians(0.0), 440, Point2::new(0, 0));
        // Direction vector is (-1, 0): larger x projects earlier.
        order.add_polyline(line(0, 0, 0, 10_000));
        order.add_polyline(line(50_000, 0, 50_000, 10_000));
        order.optimize();

        assert_eq!(order.paths[0].front().x, 50_000);
        assert_eq!(order.paths[1].front().x, 0);
    }

    #[test]
    fn coincident_endpoints_make_a_loop() {
        let mut order = MonotonicOrder::new(AngleRadians(0.0), 440, Point2::new(0, 0));
        order.add_polyline(vec![
            Point2::new(0, 0),
            Point2::new(10_000, 0),
            Point2::new(10_000, 10_000),
            Point2::new(5, 5),
        ]);
        order.optimize();
        assert!(order.paths[0].is_closed);
    }

    #[test]
    fn polyline_string_is_swept_as_one_run() {
        let mut order = MonotonicOrder::new(AngleRadians(0.0), 440, Point2::new(0, 0));
        // Three segments joined end to end, far enough apart not to be
        // "adjacent", given out of order.
        order.add_polyline(line(0, 10_000, 0, 20_000));
        order.add_polyline(line(0, 0, 0, 10_000));
        order.add_polyline(line(0, 20_000, 0, 30_000));
        order.optimize();

        // The string is emitted contiguously, endpoints chaining.
        assert_eq!(order.paths.len(), 3);
        for window in order.paths.windows(2) {
            let end = window[0].end_point();
            let start = window[1].start_point();
            assert!((end - start).vsize2() < 100);
        }
    }

    #[test]
    fn chained_cycle_terminates() {
        // Three mutually adjacent short lines can produce a connection
        // cycle; ordering must terminate and emit each line exactly once.
        let mut order = MonotonicOrder::new(AngleRadians(0.0), 1_000, Point2::new(0, 0));
        order.add_polyline(line(0, 0, 0, 500));
        order.add_polyline(line(100, 100, 100, 600));
        order.add_polyline(line(200, 0, 200, 500));
        order.optimize();
        assert_eq!(order.paths.len(), 3);
    }

    #[test]
    fn polygons_are_emitted_first_untouched() {
        let mut order = MonotonicOrder::new(AngleRadians(0.0), 440, Point2::new(0, 0));
        order.add_polyline(line(0, 0, 10_000, 0));
        order.add_polygon(vec![
            Point2::new(0, 0),
            Point2::new(1_000, 0),
            Point2::new(1_000, 1_000),
        ]);
        order.optimize();
        assert!(order.paths[0].is_closed);
        assert!(!order.paths[1].is_closed);
    }
}
