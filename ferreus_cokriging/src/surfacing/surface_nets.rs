/////////////////////////////////////////////////////////////////////////////////////////////
//
// Extracts isosurfaces of a potential field sampled on a regular grid with Surface Nets.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::error::{KrigingError, KrigingResult};
use faer::{Mat, MatRef};
use std::collections::HashMap;

type Ijk = (i32, i32, i32);
type Vertex = [f64; 3];

const CUBE_CORNERS: [[i32; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

const CUBE_EDGES: [(usize, usize, usize); 12] = [
    (0, 1, 0),
    (2, 3, 0),
    (4, 5, 0),
    (6, 7, 0),
    (0, 2, 1),
    (1, 3, 1),
    (4, 6, 1),
    (5, 7, 1),
    (0, 4, 2),
    (1, 5, 2),
    (2, 6, 2),
    (3, 7, 2),
];

/// Regular 3D lattice of sampled potentials in `ij` node order.
struct SampledGrid<'a> {
    values: MatRef<'a, f64>,
    min_corner: [f64; 3],
    step: [f64; 3],
    counts: [usize; 3],
}

impl SampledGrid<'_> {
    #[inline]
    fn value(&self, ijk: Ijk) -> f64 {
        let (i, j, k) = (ijk.0 as usize, ijk.1 as usize, ijk.2 as usize);
        self.values[((i * self.counts[1] + j) * self.counts[2] + k, 0)]
    }

    #[inline]
    fn world_from_ijk(&self, ijk: Ijk) -> Vertex {
        [
            self.min_corner[0] + ijk.0 as f64 * self.step[0],
            self.min_corner[1] + ijk.1 as f64 * self.step[1],
            self.min_corner[2] + ijk.2 as f64 * self.step[2],
        ]
    }

    fn num_cells(&self) -> [i32; 3] {
        self.counts.map(|n| n.saturating_sub(1) as i32)
    }
}

fn get_cell_corners(ijk: Ijk) -> [Ijk; 8] {
    let (i, j, k) = ijk;
    CUBE_CORNERS.map(|[dx, dy, dz]| (i + dx, j + dy, k + dz))
}

/// Places one vertex in every cell crossed by the isosurface, at the mean of the
/// edge crossings of the cell.
fn get_cell_vertices(grid: &SampledGrid, isovalue: f64) -> HashMap<Ijk, Vertex> {
    let [cx, cy, cz] = grid.num_cells();
    let mut cell_vertices = HashMap::new();

    for i in 0..cx {
        for j in 0..cy {
            for k in 0..cz {
                let corners = get_cell_corners((i, j, k));
                let vals = corners.map(|c| grid.value(c));

                let mut sum = [0.0; 3];
                let mut count = 0usize;
                for &(i1, i2, axis) in &CUBE_EDGES {
                    let (v1, v2) = (vals[i1], vals[i2]);
                    if (v1 > isovalue) != (v2 > isovalue) {
                        let mut pt = grid.world_from_ijk(corners[i1]);
                        let t = (isovalue - v1) / (v2 - v1);
                        pt[axis] += t * grid.step[axis];
                        for d in 0..3 {
                            sum[d] += pt[d];
                        }
                        count += 1;
                    }
                }

                if count > 0 {
                    cell_vertices.insert((i, j, k), sum.map(|s| s / count as f64));
                }
            }
        }
    }

    cell_vertices
}

#[inline]
fn sub(a: &Vertex, b: &Vertex) -> Vertex {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn cross(a: &Vertex, b: &Vertex) -> Vertex {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn dot(a: &Vertex, b: &Vertex) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn face_normal(v0: &Vertex, v1: &Vertex, v2: &Vertex) -> Vertex {
    cross(&sub(v1, v0), &sub(v2, v0))
}

/// Area weighted normal of a possibly non-planar quad, from its diagonals.
#[inline]
fn quad_normal(q: &[Vertex; 4]) -> Vertex {
    cross(&sub(&q[2], &q[0]), &sub(&q[3], &q[1]))
}

/// Connects the four cells around every crossed grid edge into a quad, wound so
/// its normal points towards increasing potential.
fn get_quads(
    grid: &SampledGrid,
    isovalue: f64,
    cell_vertices: &HashMap<Ijk, Vertex>,
) -> (Vec<Vertex>, Vec<[usize; 4]>) {
    // Sort cells so vertex numbering is stable between runs.
    let mut cells: Vec<Ijk> = cell_vertices.keys().copied().collect();
    cells.sort_unstable();
    let vertex_indices: HashMap<Ijk, usize> =
        cells.iter().enumerate().map(|(idx, ijk)| (*ijk, idx)).collect();

    let counts = grid.counts.map(|n| n as i32);
    let mut quads: Vec<[usize; 4]> = Vec::new();

    for axis in 0..3 {
        for i in 0..counts[0] {
            for j in 0..counts[1] {
                for k in 0..counts[2] {
                    let c1 = (i, j, k);
                    let c2 = match axis {
                        0 => (i + 1, j, k),
                        1 => (i, j + 1, k),
                        _ => (i, j, k + 1),
                    };
                    if c2.0 >= counts[0] || c2.1 >= counts[1] || c2.2 >= counts[2] {
                        continue;
                    }
                    let (v1, v2) = (grid.value(c1), grid.value(c2));
                    if (v1 > isovalue) == (v2 > isovalue) {
                        continue;
                    }

                    let (ijk0, ijk1, ijk2, ijk3) = match axis {
                        0 => ((i, j - 1, k - 1), (i, j, k - 1), (i, j, k), (i, j - 1, k)),
                        1 => ((i - 1, j, k - 1), (i, j, k - 1), (i, j, k), (i - 1, j, k)),
                        _ => ((i - 1, j - 1, k), (i, j - 1, k), (i, j, k), (i - 1, j, k)),
                    };
                    let ring = [ijk0, ijk1, ijk2, ijk3];
                    if !ring.iter().all(|ijk| vertex_indices.contains_key(ijk)) {
                        continue;
                    }

                    let mut quad = ring.map(|ijk| vertex_indices[&ijk]);
                    let normal = quad_normal(&ring.map(|ijk| cell_vertices[&ijk]));
                    let increasing = v2 > v1;
                    if (normal[axis] > 0.0) != increasing {
                        quad = [quad[0], quad[3], quad[2], quad[1]];
                    }
                    quads.push(quad);
                }
            }
        }
    }

    let vertices = cells.iter().map(|ijk| cell_vertices[ijk]).collect();
    (vertices, quads)
}

/// Splits each quad along the diagonal that keeps both triangles best aligned
/// with the quad normal. Triangles with no area along that normal are dropped.
fn quads_to_faces(quads: &[[usize; 4]], vertices: &[Vertex]) -> Mat<usize> {
    const SPLITS: [[[usize; 3]; 2]; 2] = [[[0, 1, 2], [2, 3, 0]], [[0, 1, 3], [1, 2, 3]]];

    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(2 * quads.len());
    for quad in quads {
        let corners = quad.map(|v| vertices[v]);
        let normal = quad_normal(&corners);
        let tolerance = 1e-9 * dot(&normal, &normal);
        if !(tolerance > 0.0) {
            continue;
        }

        let alignment = |tri: &[usize; 3]| {
            let n = face_normal(&corners[tri[0]], &corners[tri[1]], &corners[tri[2]]);
            dot(&n, &normal)
        };
        let score = |split: &[[usize; 3]; 2]| alignment(&split[0]).min(alignment(&split[1]));
        let split = match score(&SPLITS[1]) > score(&SPLITS[0]) {
            true => SPLITS[1],
            false => SPLITS[0],
        };

        for tri in &split {
            if alignment(tri) > tolerance {
                faces.push(tri.map(|c| quad[c]));
            }
        }
    }

    Mat::from_fn(faces.len(), 3, |i, j| faces[i][j])
}

/// Extracts the `isovalue` surface of potentials sampled on a regular 3D grid.
///
/// `values` holds one potential per node in `ij` order over `extent`
/// (`[mins..., maxs...]`) with `resolution` nodes per axis. Returns the vertex
/// positions (`V × 3`) and triangles (`F × 3`, 0-based). Faces are wound so
/// their normals point towards increasing potential.
///
/// ### Errors
/// [`KrigingError::Shape`] if the grid is not 3D or the number of values does not
/// match the resolution.
pub fn surface_nets(
    values: MatRef<f64>,
    extent: &[f64],
    resolution: &[usize],
    isovalue: f64,
) -> KrigingResult<(Mat<f64>, Mat<usize>)> {
    if resolution.len() != 3 || extent.len() != 6 {
        return Err(KrigingError::Shape(
            "isosurfaces can only be extracted from 3D grids".to_string(),
        ));
    }
    let num_nodes: usize = resolution.iter().product();
    if values.nrows() != num_nodes || values.ncols() != 1 {
        return Err(KrigingError::Shape(format!(
            "expected {num_nodes} sampled values, got {:?}",
            values.shape()
        )));
    }

    let counts = [resolution[0], resolution[1], resolution[2]];
    let step = [0, 1, 2].map(|d| match counts[d] > 1 {
        true => (extent[d + 3] - extent[d]) / (counts[d] - 1) as f64,
        false => 0.0,
    });
    let grid = SampledGrid {
        values,
        min_corner: [extent[0], extent[1], extent[2]],
        step,
        counts,
    };

    let cell_vertices = get_cell_vertices(&grid, isovalue);
    let (vertices, quads) = get_quads(&grid, isovalue, &cell_vertices);
    let faces = quads_to_faces(&quads, &vertices);

    Ok((
        Mat::from_fn(vertices.len(), 3, |i, j| vertices[i][j]),
        faces,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::create_regular_grid;
    use equator::assert;

    fn sample<F: Fn(f64, f64, f64) -> f64>(extent: &[f64], counts: &[usize], f: F) -> Mat<f64> {
        let nodes = create_regular_grid(extent, counts).unwrap();
        Mat::from_fn(nodes.nrows(), 1, |i, _| {
            f(nodes[(i, 0)], nodes[(i, 1)], nodes[(i, 2)])
        })
    }

    fn corner(verts: &Mat<f64>, faces: &Mat<usize>, face: usize, c: usize) -> Vertex {
        let v = faces[(face, c)];
        [verts[(v, 0)], verts[(v, 1)], verts[(v, 2)]]
    }

    #[test]
    fn horizontal_plane_is_flat_and_faces_up() {
        let extent = [0.0, 0.0, 0.0, 3.0, 3.0, 3.0];
        let counts = [4, 4, 4];
        let values = sample(&extent, &counts, |_, _, z| z);

        let (verts, faces) = surface_nets(values.as_ref(), &extent, &counts, 1.5).unwrap();

        assert!(verts.nrows() == 9);
        assert!(faces.nrows() == 8);
        for v in 0..verts.nrows() {
            assert!((verts[(v, 2)] - 1.5).abs() < 1e-12);
        }
        for f in 0..faces.nrows() {
            let n = face_normal(
                &corner(&verts, &faces, f, 0),
                &corner(&verts, &faces, f, 1),
                &corner(&verts, &faces, f, 2),
            );
            assert!(n[2] > 0.0);
        }
    }

    #[test]
    fn sphere_vertices_lie_near_radius_with_outward_normals() {
        let extent = [-2.0, -2.0, -2.0, 2.0, 2.0, 2.0];
        let counts = [21, 21, 21];
        let values = sample(&extent, &counts, |x, y, z| (x * x + y * y + z * z).sqrt());

        let (verts, faces) = surface_nets(values.as_ref(), &extent, &counts, 1.0).unwrap();
        assert!(verts.nrows() > 0);
        assert!(faces.nrows() > 0);

        let step = 0.2;
        for v in 0..verts.nrows() {
            let r = (0..3).map(|d| verts[(v, d)].powi(2)).sum::<f64>().sqrt();
            assert!((r - 1.0).abs() < step);
        }

        for f in 0..faces.nrows() {
            for c in 0..3 {
                assert!(faces[(f, c)] < verts.nrows());
            }
            let (a, b, c) = (
                corner(&verts, &faces, f, 0),
                corner(&verts, &faces, f, 1),
                corner(&verts, &faces, f, 2),
            );
            let n = face_normal(&a, &b, &c);
            let centroid = [0, 1, 2].map(|d| (a[d] + b[d] + c[d]) / 3.0);
            assert!(dot(&n, &centroid) > 0.0);
        }
    }

    #[test]
    fn quad_split_avoids_collinear_corners() {
        // Corners 0, 1 and 2 are collinear, so only the 1-3 diagonal gives two triangles
        let vertices = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
        ];
        let faces = quads_to_faces(&[[0, 1, 2, 3]], &vertices);

        assert!(faces.nrows() == 2);
        assert!([faces[(0, 0)], faces[(0, 1)], faces[(0, 2)]] == [0, 1, 3]);
        assert!([faces[(1, 0)], faces[(1, 1)], faces[(1, 2)]] == [1, 2, 3]);
        for f in 0..2 {
            let n = face_normal(
                &vertices[faces[(f, 0)]],
                &vertices[faces[(f, 1)]],
                &vertices[faces[(f, 2)]],
            );
            assert!(n[2] > 0.0);
        }
    }

    #[test]
    fn flat_quads_are_dropped() {
        let vertices = [
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [3.0, 0.0, 0.0],
        ];
        let faces = quads_to_faces(&[[0, 1, 2, 3]], &vertices);
        assert!(faces.nrows() == 0);
    }

    #[test]
    fn isovalue_outside_range_gives_empty_mesh() {
        let extent = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let counts = [3, 3, 3];
        let values = sample(&extent, &counts, |x, _, _| x);

        let (verts, faces) = surface_nets(values.as_ref(), &extent, &counts, 5.0).unwrap();
        assert!(verts.nrows() == 0);
        assert!(faces.nrows() == 0);
    }

    #[test]
    fn two_dimensional_grids_are_rejected() {
        let values = Mat::<f64>::zeros(4, 1);
        let err = surface_nets(values.as_ref(), &[0.0, 0.0, 1.0, 1.0], &[2, 2], 0.0).unwrap_err();
        assert!(matches!(err, KrigingError::Shape(_)));
    }
}
