use std::collections::{BTreeSet, HashMap};

use bevy::asset::RenderAssetUsages;
use bevy::math::DVec2;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use thiserror::Error;
use voronator::delaunator::Point;
use voronator::VoronoiDiagram;

/// Corners closer than this are merged into one vertex.
const VERTEX_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Site {
    pub x: f64,
    pub y: f64,
}

impl Site {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned clip rectangle for the diagram.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: DVec2,
    pub max: DVec2,
}

impl BoundingBox {
    /// `[0, width] x [0, height]`.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self {
            min: DVec2::ZERO,
            max: DVec2::new(width, height),
        }
    }

    fn is_usable(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.max.cmpgt(self.min).all()
    }
}

/// Cell corners and the undirected sides between them.
#[derive(Debug, Default, PartialEq)]
pub struct Diagram {
    pub vertices: Vec<DVec2>,
    /// Index pairs into `vertices`, smaller index first, sorted.
    pub edges: Vec<(u32, u32)>,
}

#[derive(Debug, Error, PartialEq)]
pub enum DiagramError {
    #[error("no sites to build a diagram from")]
    NoSites,
    #[error("bounding box {min:?}..{max:?} is empty or not finite")]
    BadBounds { min: DVec2, max: DVec2 },
    #[error("sites do not span a diagram")]
    Degenerate,
}

pub fn compute_diagram(sites: &[Site], bbox: BoundingBox) -> Result<Diagram, DiagramError> {
    if sites.is_empty() {
        return Err(DiagramError::NoSites);
    }
    if !bbox.is_usable() {
        return Err(DiagramError::BadBounds {
            min: bbox.min,
            max: bbox.max,
        });
    }

    let points: Vec<(f64, f64)> = sites.iter().map(|s| (s.x, s.y)).collect();
    let voronoi = VoronoiDiagram::<Point>::from_tuple(
        &(bbox.min.x, bbox.min.y),
        &(bbox.max.x, bbox.max.y),
        &points,
    )
    .ok_or(DiagramError::Degenerate)?;

    let mut builder = DiagramBuilder::default();
    for cell in voronoi.cells() {
        let corners: Vec<u32> = cell
            .points()
            .iter()
            .map(|p| builder.vertex(DVec2::new(p.x, p.y)))
            .collect();
        for (i, &a) in corners.iter().enumerate() {
            let b = corners[(i + 1) % corners.len()];
            builder.edge(a, b);
        }
    }

    let diagram = builder.finish();
    if diagram.edges.is_empty() {
        return Err(DiagramError::Degenerate);
    }
    Ok(diagram)
}

#[derive(Default)]
struct DiagramBuilder {
    vertices: Vec<DVec2>,
    index: HashMap<(i64, i64), u32>,
    edges: BTreeSet<(u32, u32)>,
}

impl DiagramBuilder {
    fn vertex(&mut self, p: DVec2) -> u32 {
        let key = (
            (p.x / VERTEX_EPSILON).round() as i64,
            (p.y / VERTEX_EPSILON).round() as i64,
        );
        *self.index.entry(key).or_insert_with(|| {
            self.vertices.push(p);
            (self.vertices.len() - 1) as u32
        })
    }

    fn edge(&mut self, a: u32, b: u32) {
        if a != b {
            self.edges.insert((a.min(b), a.max(b)));
        }
    }

    fn finish(self) -> Diagram {
        Diagram {
            vertices: self.vertices,
            edges: self.edges.into_iter().collect(),
        }
    }
}

/// Line list over the diagram, drawn in the z = 0 plane.
pub fn line_mesh(diagram: &Diagram) -> Mesh {
    let positions: Vec<[f32; 3]> = diagram
        .vertices
        .iter()
        .map(|v| [v.x as f32, v.y as f32, 0.0])
        .collect();
    let indices: Vec<u32> = diagram.edges.iter().flat_map(|&(a, b)| [a, b]).collect();

    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_indices(Indices::U32(indices))
}
