use foundation::bounds::{Aabb2, Bbox};
use foundation::geo::LngLat;
use foundation::math::mercator::{lat_y, lng_x, x_lng, y_lat};
use tracing::debug;

use crate::bvh::{Item, PointBvh};
use crate::error::IndexError;
use crate::feature::{Cluster, ClusterId, Rendered};
use crate::options::ClusterOptions;

/// Zoom marker for nodes not yet consumed by a coarser level.
const UNVISITED: i32 = i32::MAX;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Source {
    Point(u32),
    Cluster(u64),
}

#[derive(Debug, Copy, Clone)]
struct Node {
    /// Unit-mercator position (count-weighted centroid for clusters).
    x: f64,
    y: f64,
    /// Coarsest zoom that has already absorbed this node.
    zoom: i32,
    source: Source,
    parent: Option<u64>,
    num_points: u32,
}

#[derive(Debug, Clone)]
struct Level {
    nodes: Vec<Node>,
    tree: PointBvh,
}

impl Level {
    fn new(nodes: Vec<Node>) -> Self {
        let items = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| Item {
                id: i as u32,
                pos: [n.x, n.y],
            })
            .collect();
        Self {
            tree: PointBvh::build(items),
            nodes,
        }
    }
}

/// Hierarchical greedy point clustering, one level per integer zoom.
///
/// Level `max_zoom + 1` holds the raw points. Each coarser level `z` is built
/// by merging nodes of level `z + 1` that fall within `radius_at(z)` of an
/// unvisited seed, in seed order. Every level keeps its own [`PointBvh`].
///
/// Cluster ids encode `(seed index, seed level)` and are stamped with `build`;
/// ids from any other build are rejected with [`IndexError::StaleCluster`].
#[derive(Debug, Clone)]
pub struct ClusterIndex {
    options: ClusterOptions,
    build: u32,
    positions: Vec<LngLat>,
    indexed: usize,
    levels: Vec<Option<Level>>,
}

impl ClusterIndex {
    /// Build the full hierarchy over `positions`.
    ///
    /// Positions that are not finite WGS84 coordinates are skipped; the
    /// remaining points keep their index into `positions`.
    pub fn build(
        options: ClusterOptions,
        build: u32,
        positions: &[LngLat],
    ) -> Result<Self, IndexError> {
        options.validate()?;

        let nodes: Vec<Node> = positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_valid())
            .map(|(i, p)| Node {
                x: lng_x(p.lng),
                y: lat_y(p.lat),
                zoom: UNVISITED,
                source: Source::Point(i as u32),
                parent: None,
                num_points: 1,
            })
            .collect();
        let indexed = nodes.len();

        let min = options.min_zoom as usize;
        let max = options.max_zoom as usize;
        let mut levels: Vec<Option<Level>> = (0..=max + 1).map(|_| None).collect();
        levels[max + 1] = Some(Level::new(nodes));

        let mut index = Self {
            options,
            build,
            positions: positions.to_vec(),
            indexed,
            levels,
        };
        for z in (min..=max).rev() {
            let next = index.cluster_level(z as i32);
            index.levels[z] = Some(Level::new(next));
        }

        debug!(
            build,
            points = indexed,
            rejected = positions.len() - indexed,
            "cluster index built"
        );
        Ok(index)
    }

    pub fn build_stamp(&self) -> u32 {
        self.build
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Number of points that made it into the index.
    pub fn len(&self) -> usize {
        self.indexed
    }

    pub fn is_empty(&self) -> bool {
        self.indexed == 0
    }

    /// Renderable units whose position falls inside `bbox` at `zoom`.
    ///
    /// `zoom` is clamped to `[min_zoom, max_zoom + 1]`; at `max_zoom + 1` and
    /// above only raw points are returned. Boxes crossing the antimeridian are
    /// split in two.
    pub fn clusters(&self, bbox: Bbox, zoom: i32) -> Vec<Rendered> {
        if !bbox.is_finite() {
            return Vec::new();
        }

        let mut min_lng = wrap_lng(bbox.west);
        let min_lat = bbox.south.clamp(-90.0, 90.0);
        let mut max_lng = if bbox.east == 180.0 {
            180.0
        } else {
            wrap_lng(bbox.east)
        };
        let max_lat = bbox.north.clamp(-90.0, 90.0);

        if bbox.east - bbox.west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            let mut eastern = self.clusters(Bbox::new(min_lng, min_lat, 180.0, max_lat), zoom);
            let western = self.clusters(Bbox::new(-180.0, min_lat, max_lng, max_lat), zoom);
            eastern.extend(western);
            return eastern;
        }

        let Some(level) = self.level(self.limit_zoom(zoom)) else {
            return Vec::new();
        };
        // Mercator y grows southwards, so the north edge is the minimum.
        let query = Aabb2::new(
            [lng_x(min_lng), lat_y(max_lat)],
            [lng_x(max_lng), lat_y(min_lat)],
        );
        level
            .tree
            .range(&query)
            .into_iter()
            .map(|id| self.render(&level.nodes[id as usize]))
            .collect()
    }

    /// Units one level finer that were merged into `id`.
    pub fn children(&self, id: ClusterId) -> Result<Vec<Rendered>, IndexError> {
        let (origin_idx, origin_zoom) = self.decode(id)?;
        let level = self
            .level(origin_zoom)
            .ok_or(IndexError::UnknownCluster(id))?;
        let origin = level
            .nodes
            .get(origin_idx)
            .ok_or(IndexError::UnknownCluster(id))?;

        let r = self.options.radius_at(origin_zoom as i32 - 1);
        let children: Vec<Rendered> = level
            .tree
            .within([origin.x, origin.y], r)
            .into_iter()
            .map(|k| &level.nodes[k as usize])
            .filter(|n| n.parent == Some(id.raw))
            .map(|n| self.render(n))
            .collect();

        if children.is_empty() {
            return Err(IndexError::NoChildren(id));
        }
        Ok(children)
    }

    /// Indices of the raw points inside `id`, paginated depth-first.
    pub fn leaves(
        &self,
        id: ClusterId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<usize>, IndexError> {
        let mut out = Vec::new();
        if limit == 0 {
            return Ok(out);
        }
        self.append_leaves(&mut out, id, limit, offset, 0)?;
        Ok(out)
    }

    /// Lowest zoom at which `id` no longer renders as a single cluster.
    pub fn expansion_zoom(&self, id: ClusterId) -> Result<i32, IndexError> {
        let (_, origin_zoom) = self.decode(id)?;
        let mut expansion = origin_zoom as i32 - 1;
        let mut current = id;
        while expansion <= self.options.max_zoom as i32 {
            let children = self.children(current)?;
            expansion += 1;
            if children.len() != 1 {
                break;
            }
            match children[0] {
                Rendered::Cluster(c) => current = c.id,
                Rendered::Point { .. } => break,
            }
        }
        Ok(expansion)
    }

    fn append_leaves(
        &self,
        out: &mut Vec<usize>,
        id: ClusterId,
        limit: usize,
        offset: usize,
        mut skipped: usize,
    ) -> Result<usize, IndexError> {
        for child in self.children(id)? {
            match child {
                Rendered::Cluster(c) => {
                    let count = c.count as usize;
                    if skipped + count <= offset {
                        skipped += count;
                    } else {
                        skipped = self.append_leaves(out, c.id, limit, offset, skipped)?;
                    }
                }
                Rendered::Point { index, .. } => {
                    if skipped < offset {
                        skipped += 1;
                    } else {
                        out.push(index);
                    }
                }
            }
            if out.len() >= limit {
                break;
            }
        }
        Ok(skipped)
    }

    fn cluster_level(&mut self, zoom: i32) -> Vec<Node> {
        let r = self.options.radius_at(zoom);
        let min_points = self.options.min_points;
        let id_base = self.positions.len() as u64;
        let Some(Some(Level { nodes, tree })) = self.levels.get_mut(zoom as usize + 1) else {
            return Vec::new();
        };

        let mut next = Vec::new();
        for i in 0..nodes.len() {
            if nodes[i].zoom <= zoom {
                continue;
            }
            nodes[i].zoom = zoom;
            let origin = nodes[i];
            let neighbors = tree.within([origin.x, origin.y], r);

            let mut num_points = origin.num_points;
            for &k in &neighbors {
                let nb = &nodes[k as usize];
                if nb.zoom > zoom {
                    num_points += nb.num_points;
                }
            }

            if num_points > origin.num_points && num_points >= min_points {
                let raw = ((i as u64) << 5) + (zoom as u64 + 1) + id_base;
                let mut wx = origin.x * origin.num_points as f64;
                let mut wy = origin.y * origin.num_points as f64;
                for &k in &neighbors {
                    let nb = &mut nodes[k as usize];
                    if nb.zoom <= zoom {
                        continue;
                    }
                    nb.zoom = zoom;
                    wx += nb.x * nb.num_points as f64;
                    wy += nb.y * nb.num_points as f64;
                    nb.parent = Some(raw);
                }
                nodes[i].parent = Some(raw);
                next.push(Node {
                    x: wx / num_points as f64,
                    y: wy / num_points as f64,
                    zoom: UNVISITED,
                    source: Source::Cluster(raw),
                    parent: None,
                    num_points,
                });
            } else {
                next.push(Node {
                    zoom: UNVISITED,
                    parent: None,
                    ..origin
                });
                if num_points > 1 {
                    // Too few neighbours to cluster: carry them over unmerged.
                    for &k in &neighbors {
                        let nb = &mut nodes[k as usize];
                        if nb.zoom <= zoom {
                            continue;
                        }
                        nb.zoom = zoom;
                        next.push(Node {
                            zoom: UNVISITED,
                            parent: None,
                            ..*nb
                        });
                    }
                }
            }
        }
        next
    }

    fn decode(&self, id: ClusterId) -> Result<(usize, usize), IndexError> {
        if id.build != self.build {
            return Err(IndexError::StaleCluster {
                cluster: id,
                current_build: self.build,
            });
        }
        let rel = id
            .raw
            .checked_sub(self.positions.len() as u64)
            .ok_or(IndexError::UnknownCluster(id))?;
        let zoom = (rel % 32) as usize;
        if zoom == 0 || zoom > self.options.max_zoom as usize + 1 {
            return Err(IndexError::UnknownCluster(id));
        }
        Ok(((rel >> 5) as usize, zoom))
    }

    fn limit_zoom(&self, zoom: i32) -> usize {
        zoom.clamp(
            self.options.min_zoom as i32,
            self.options.max_zoom as i32 + 1,
        ) as usize
    }

    fn level(&self, zoom: usize) -> Option<&Level> {
        self.levels.get(zoom).and_then(|l| l.as_ref())
    }

    fn render(&self, node: &Node) -> Rendered {
        match node.source {
            Source::Point(i) => Rendered::Point {
                index: i as usize,
                at: self.positions[i as usize],
            },
            Source::Cluster(raw) => Rendered::Cluster(Cluster {
                id: ClusterId {
                    build: self.build,
                    raw,
                },
                at: LngLat::new(x_lng(node.x), y_lat(node.y)),
                count: node.num_points,
            }),
        }
    }
}

fn wrap_lng(lng: f64) -> f64 {
    ((lng + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}
