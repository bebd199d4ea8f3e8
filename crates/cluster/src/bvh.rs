use foundation::bounds::Aabb2;
use foundation::math::precision::stable_total_cmp_f64;

/// A deterministic bounding volume hierarchy over 2D points.
///
/// Ordering contract:
/// - `range` and `within` return item ids in ascending order.
///
/// The tree is static: it is built once per point set and never mutated, which
/// is all the cluster index needs (each zoom level gets its own tree).
#[derive(Debug, Clone, Default)]
pub struct PointBvh {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Aabb2,
        items: Vec<Item>,
    },
    Internal {
        bounds: Aabb2,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Item {
    pub id: u32,
    pub pos: [f64; 2],
}

impl PointBvh {
    pub fn build(items: Vec<Item>) -> Self {
        let mut nodes = Vec::new();
        let mut items = items;
        if !items.is_empty() {
            let _root = build_node(&mut nodes, &mut items);
        }
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of items inside `query` (inclusive edges), ascending.
    pub fn range(&self, query: &Aabb2) -> Vec<u32> {
        self.collect(
            |bounds| bounds.intersects(query),
            |pos| query.contains_point(pos),
        )
    }

    /// Ids of items within euclidean distance `r` of `center`, ascending.
    pub fn within(&self, center: [f64; 2], r: f64) -> Vec<u32> {
        let r2 = r * r;
        self.collect(
            |bounds| bounds.distance2_to(center) <= r2,
            |pos| {
                let dx = pos[0] - center[0];
                let dy = pos[1] - center[1];
                dx * dx + dy * dy <= r2
            },
        )
    }

    fn collect<B, P>(&self, visit: B, accept: P) -> Vec<u32>
    where
        B: Fn(&Aabb2) -> bool,
        P: Fn([f64; 2]) -> bool,
    {
        if self.nodes.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<u32> = Vec::new();
        let mut stack: Vec<usize> = vec![0];

        while let Some(idx) = stack.pop() {
            match &self.nodes[idx] {
                Node::Leaf { bounds, items } => {
                    if !visit(bounds) {
                        continue;
                    }
                    for item in items {
                        if accept(item.pos) {
                            hits.push(item.id);
                        }
                    }
                }
                Node::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    if !visit(bounds) {
                        continue;
                    }
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }
}

const LEAF_MAX: usize = 16;

fn build_node(nodes: &mut Vec<Node>, items: &mut [Item]) -> usize {
    let bounds = bounds_for_items(items);
    if items.len() <= LEAF_MAX {
        let idx = nodes.len();
        nodes.push(Node::Leaf {
            bounds,
            items: items.to_vec(),
        });
        return idx;
    }

    let axis = split_axis(&bounds);
    items.sort_by(|a, b| {
        stable_total_cmp_f64(a.pos[axis], b.pos[axis]).then_with(|| a.id.cmp(&b.id))
    });

    let mid = items.len() / 2;
    let (left_items, right_items) = items.split_at_mut(mid);

    let idx = nodes.len();
    // Placeholder; patched once both children exist.
    nodes.push(Node::Leaf {
        bounds,
        items: Vec::new(),
    });

    let left = build_node(nodes, left_items);
    let right = build_node(nodes, right_items);

    nodes[idx] = Node::Internal {
        bounds,
        left,
        right,
    };
    idx
}

fn split_axis(bounds: &Aabb2) -> usize {
    let ex = bounds.max[0] - bounds.min[0];
    let ey = bounds.max[1] - bounds.min[1];
    // Deterministic tie-break: prefer X.
    if ex >= ey { 0 } else { 1 }
}

fn bounds_for_items(items: &[Item]) -> Aabb2 {
    let mut b = Aabb2::from_point(items[0].pos);
    for item in &items[1..] {
        b = b.union(&Aabb2::from_point(item.pos));
    }
    b
}
