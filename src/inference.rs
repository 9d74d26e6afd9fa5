//! Structural inference from raw coordinates.
//!
//! Aisles are density clusters of traversable locations along one axis.
//! Racks are density clusters of pick locations along x, paired across an
//! aisle when their mean x values sit one aisle-width apart. Inference never
//! touches coordinates; it returns annotations alongside the input records.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::{Location, LocationKind};

/// Tolerances for aisle detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AisleConfig {
    /// Clustering radius on x, for vertical aisles.
    pub x_tolerance: f64,
    /// Clustering radius on y, for horizontal aisles.
    pub y_tolerance: f64,
    /// Smallest cluster that counts as an aisle.
    pub min_aisle_size: usize,
}

impl Default for AisleConfig {
    fn default() -> Self {
        Self {
            x_tolerance: 5.0,
            y_tolerance: 5.0,
            min_aisle_size: 3,
        }
    }
}

/// Tolerances for rack detection and pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RackConfig {
    /// Clustering radius on x for pick locations in one rack column.
    pub tolerance: f64,
    /// Smallest cluster that counts as a rack.
    pub min_rack_size: usize,
    /// Inclusive band of mean-x gaps that pair two racks across an aisle.
    pub pair_gap_min: f64,
    pub pair_gap_max: f64,
}

impl Default for RackConfig {
    fn default() -> Self {
        Self {
            tolerance: 5.0,
            min_rack_size: 2,
            pair_gap_min: 10.0,
            pair_gap_max: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub aisles: AisleConfig,
    pub racks: RackConfig,
}

/// Aisle membership. `None` means not in an aisle along that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AisleAnnotation {
    pub vertical: Option<usize>,
    pub horizontal: Option<usize>,
}

impl AisleAnnotation {
    /// Member of both a vertical and a horizontal aisle.
    pub fn is_intersection(&self) -> bool {
        self.vertical.is_some() && self.horizontal.is_some()
    }

    /// Member of neither axis.
    pub fn is_isolated(&self) -> bool {
        self.vertical.is_none() && self.horizontal.is_none()
    }

    /// Shares a vertical or a horizontal aisle with `other`.
    pub fn shares_aisle(&self, other: &AisleAnnotation) -> bool {
        (self.vertical.is_some() && self.vertical == other.vertical)
            || (self.horizontal.is_some() && self.horizontal == other.horizontal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RackSide {
    Left,
    Right,
    #[default]
    None,
}

/// Rack membership and pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RackAnnotation {
    pub rack: Option<usize>,
    pub side: RackSide,
    /// Rack on the other side of the aisle, if paired.
    pub partner: Option<usize>,
}

impl RackAnnotation {
    /// Both annotations sit on opposite faces of one rack pair.
    pub fn faces(&self, other: &RackAnnotation) -> bool {
        match (self.rack, other.partner) {
            (Some(rack), Some(partner)) => rack == partner && self.side != other.side,
            _ => false,
        }
    }
}

/// A location plus everything inference learned about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedLocation {
    pub location: Location,
    pub aisle: AisleAnnotation,
    pub rack: RackAnnotation,
}

/// Density clustering on a single coordinate.
///
/// A point is core when at least `min_samples` values (itself included) lie
/// within `eps`. Clusters grow from core points in index order and are
/// numbered as they are discovered. Non-core points join the first cluster
/// that reaches them; the rest are noise.
pub fn cluster_1d(values: &[f64], eps: f64, min_samples: usize) -> Vec<Option<usize>> {
    let n = values.len();
    let mut labels: Vec<Option<usize>> = vec![None; n];

    let neighbours: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| (values[i] - values[j]).abs() <= eps)
                .collect()
        })
        .collect();
    let core: Vec<bool> = neighbours.iter().map(|nb| nb.len() >= min_samples.max(1)).collect();

    let mut next_label = 0;
    for seed in 0..n {
        if labels[seed].is_some() || !core[seed] {
            continue;
        }

        labels[seed] = Some(next_label);
        let mut stack = vec![seed];
        while let Some(i) = stack.pop() {
            if !core[i] {
                continue;
            }
            for &j in &neighbours[i] {
                if labels[j].is_none() {
                    labels[j] = Some(next_label);
                    stack.push(j);
                }
            }
        }

        next_label += 1;
    }

    labels
}

/// Assign vertical and horizontal aisle ids to traversable locations.
pub fn detect_aisles(locations: &[Location], config: &AisleConfig) -> Vec<AisleAnnotation> {
    let mut annotations = vec![AisleAnnotation::default(); locations.len()];

    let traversable: Vec<usize> = (0..locations.len())
        .filter(|&i| locations[i].traversable)
        .collect();
    if traversable.is_empty() {
        return annotations;
    }

    let xs: Vec<f64> = traversable.iter().map(|&i| locations[i].x).collect();
    let ys: Vec<f64> = traversable.iter().map(|&i| locations[i].y).collect();
    let vertical = cluster_1d(&xs, config.x_tolerance, config.min_aisle_size);
    let horizontal = cluster_1d(&ys, config.y_tolerance, config.min_aisle_size);

    for (k, &i) in traversable.iter().enumerate() {
        annotations[i] = AisleAnnotation {
            vertical: vertical[k],
            horizontal: horizontal[k],
        };
    }

    debug!(
        vertical = count_clusters(&vertical),
        horizontal = count_clusters(&horizontal),
        "Detected aisles"
    );

    annotations
}

/// Group pick locations into racks and pair racks facing across an aisle.
pub fn infer_racks(locations: &[Location], config: &RackConfig) -> Vec<RackAnnotation> {
    let mut annotations = vec![RackAnnotation::default(); locations.len()];

    let bins: Vec<usize> = (0..locations.len())
        .filter(|&i| locations[i].kind == LocationKind::Pick)
        .collect();
    if bins.is_empty() {
        return annotations;
    }

    let xs: Vec<f64> = bins.iter().map(|&i| locations[i].x).collect();
    let labels = cluster_1d(&xs, config.tolerance, config.min_rack_size);
    let rack_count = count_clusters(&labels);

    let mut sums = vec![0.0; rack_count];
    let mut counts = vec![0usize; rack_count];
    for (k, label) in labels.iter().enumerate() {
        if let Some(rack) = label {
            sums[*rack] += xs[k];
            counts[*rack] += 1;
        }
    }
    let centers: Vec<f64> = sums.iter().zip(&counts).map(|(s, &c)| s / c as f64).collect();

    let mut sides = vec![RackSide::None; rack_count];
    let mut partners: Vec<Option<usize>> = vec![None; rack_count];

    for a in 0..rack_count {
        if partners[a].is_some() {
            continue;
        }
        for b in a + 1..rack_count {
            if partners[b].is_some() {
                continue;
            }

            let gap = (centers[a] - centers[b]).abs();
            if gap >= config.pair_gap_min && gap <= config.pair_gap_max {
                let (left, right) = if centers[a] < centers[b] { (a, b) } else { (b, a) };
                sides[left] = RackSide::Left;
                sides[right] = RackSide::Right;
                partners[a] = Some(b);
                partners[b] = Some(a);
                break;
            }
        }
    }

    for (k, &i) in bins.iter().enumerate() {
        if let Some(rack) = labels[k] {
            annotations[i] = RackAnnotation {
                rack: Some(rack),
                side: sides[rack],
                partner: partners[rack],
            };
        }
    }

    debug!(
        racks = rack_count,
        pairs = partners.iter().filter(|p| p.is_some()).count() / 2,
        "Inferred racks"
    );

    annotations
}

/// Run aisle and rack inference and pair the results with their records.
pub fn annotate(locations: &[Location], config: &InferenceConfig) -> Vec<AnnotatedLocation> {
    let racks = infer_racks(locations, &config.racks);
    let aisles = detect_aisles(locations, &config.aisles);

    locations
        .iter()
        .zip(aisles)
        .zip(racks)
        .map(|((location, aisle), rack)| AnnotatedLocation {
            location: location.clone(),
            aisle,
            rack,
        })
        .collect()
}

fn count_clusters(labels: &[Option<usize>]) -> usize {
    labels.iter().flatten().max().map_or(0, |max| max + 1)
}
