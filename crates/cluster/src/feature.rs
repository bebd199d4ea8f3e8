use foundation::geo::LngLat;

/// Identifier of a synthetic cluster.
///
/// Only meaningful against the index build that produced it; `build` is the
/// stamp the index checks before resolving `raw`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId {
    pub build: u32,
    pub raw: u64,
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.raw, self.build)
    }
}

impl std::str::FromStr for ClusterId {
    type Err = String;

    /// Parses the `raw@build` form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (raw, build) = s
            .split_once('@')
            .ok_or_else(|| format!("cluster id {s:?} is not of the form raw@build"))?;
        Ok(Self {
            raw: raw.trim().parse().map_err(|e| format!("cluster id raw part: {e}"))?,
            build: build
                .trim()
                .parse()
                .map_err(|e| format!("cluster id build part: {e}"))?,
        })
    }
}

/// An ephemeral aggregate returned by a query.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Count-weighted centroid of the members.
    pub at: LngLat,
    pub count: u32,
}

/// One renderable unit: a raw point or a cluster.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Rendered {
    Point {
        /// Position of the point in the slice the index was built from.
        index: usize,
        at: LngLat,
    },
    Cluster(Cluster),
}

impl Rendered {
    pub fn at(&self) -> LngLat {
        match self {
            Rendered::Point { at, .. } => *at,
            Rendered::Cluster(c) => c.at,
        }
    }

    /// Number of indexed points this unit stands for.
    pub fn count(&self) -> u32 {
        match self {
            Rendered::Point { .. } => 1,
            Rendered::Cluster(c) => c.count,
        }
    }

    pub fn as_cluster(&self) -> Option<&Cluster> {
        match self {
            Rendered::Cluster(c) => Some(c),
            Rendered::Point { .. } => None,
        }
    }

    pub fn point_index(&self) -> Option<usize> {
        match self {
            Rendered::Point { index, .. } => Some(*index),
            Rendered::Cluster(_) => None,
        }
    }
}
