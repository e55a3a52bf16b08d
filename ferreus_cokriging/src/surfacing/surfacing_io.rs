/////////////////////////////////////////////////////////////////////////////////////////////
//
// Writes extracted potential field isosurfaces to Wavefront OBJ files.
//
// Created on: 15 Nov 2025     Author: Daniel Owen
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::{Mat, MatRef};
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Result, Write};
use std::path::Path;

fn check_mesh(verts: MatRef<f64>, faces: MatRef<usize>) -> Result<()> {
    if verts.ncols() != 3 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("vertices must be (V x 3), got (V x {})", verts.ncols()),
        ));
    }
    if faces.ncols() != 3 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("faces must be triangles (F x 3), got (F x {})", faces.ncols()),
        ));
    }

    let nv = verts.nrows();
    for (r, face) in faces.row_iter().enumerate() {
        if face.iter().any(|&idx| idx >= nv) {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("face {r}: index out of bounds (nv = {nv})"),
            ));
        }
    }
    Ok(())
}

/// Writes one object, offsetting face indices by the vertices already written.
fn write_object<W: Write>(
    w: &mut W,
    name: &str,
    verts: MatRef<f64>,
    faces: MatRef<usize>,
    vertex_offset: usize,
) -> Result<()> {
    writeln!(w, "o {name}")?;
    for v in verts.row_iter() {
        writeln!(w, "v {} {} {}", v[0], v[1], v[2])?;
    }
    // OBJ is 1-based
    for f in faces.row_iter() {
        let base = vertex_offset + 1;
        writeln!(w, "f {} {} {}", f[0] + base, f[1] + base, f[2] + base)?;
    }
    Ok(())
}

/// Write an isosurface to an OBJ file.
///
/// - `name`: object name to write as `o <name>`
/// - `verts`: (V × 3) positions
/// - `faces`: (F × 3) triangle indices (**0-based**)
///
/// # Errors
/// - `InvalidInput` if `verts.ncols() != 3`, `faces.ncols() != 3` or the mesh is empty.
/// - `InvalidData` if any face index is out of range (`>= V`).
pub fn save_obj<P: AsRef<Path>>(
    path: P,
    name: &str,
    verts: MatRef<f64>,
    faces: MatRef<usize>,
) -> Result<()> {
    check_mesh(verts, faces)?;
    if verts.nrows() == 0 || faces.nrows() == 0 {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "mesh is empty (no verts or faces)",
        ));
    }

    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "# potential field isosurface (triangles)")?;
    write_object(&mut w, name, verts, faces, 0)?;
    w.flush()
}

/// Writes several isosurfaces to a single OBJ file, one object per isovalue named
/// `isovalue_<value>`.
///
/// Empty meshes are skipped. Errors as [`save_obj`], except that `InvalidInput` is
/// returned for empty meshes only when every mesh is empty.
pub fn save_isosurfaces_obj<P: AsRef<Path>>(
    path: P,
    isovalues: &[f64],
    verts: &[Mat<f64>],
    faces: &[Mat<usize>],
) -> Result<()> {
    if isovalues.len() != verts.len() || verts.len() != faces.len() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "got {} isovalues, {} vertex sets and {} face sets",
                isovalues.len(),
                verts.len(),
                faces.len()
            ),
        ));
    }
    for (v, f) in verts.iter().zip(faces) {
        check_mesh(v.as_ref(), f.as_ref())?;
    }
    if faces.iter().all(|f| f.nrows() == 0) {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "all meshes are empty (no faces)",
        ));
    }

    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "# potential field isosurfaces (triangles)")?;

    let mut offset = 0;
    for ((isovalue, v), f) in isovalues.iter().zip(verts).zip(faces) {
        if f.nrows() == 0 {
            continue;
        }
        write_object(&mut w, &format!("isovalue_{isovalue}"), v.as_ref(), f.as_ref(), offset)?;
        offset += v.nrows();
    }
    w.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use equator::assert;
    use faer::mat;

    fn triangle() -> (Mat<f64>, Mat<usize>) {
        (
            mat![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            Mat::from_fn(1, 3, |_, j| j),
        )
    }

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ferreus_cokriging_{name}_{}.obj", std::process::id()))
    }

    #[test]
    fn writes_one_based_faces() {
        let (verts, faces) = triangle();
        let path = scratch("single");
        save_obj(&path, "horizon", verts.as_ref(), faces.as_ref()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(text.contains("o horizon"));
        assert!(text.lines().filter(|l| l.starts_with("v ")).count() == 3);
        assert!(text.contains("f 1 2 3"));
    }

    #[test]
    fn offsets_faces_of_later_objects() {
        let (verts, faces) = triangle();
        let path = scratch("multi");
        let empty_v = Mat::<f64>::zeros(0, 3);
        let empty_f = Mat::<usize>::from_fn(0, 3, |_, _| 0);
        save_isosurfaces_obj(
            &path,
            &[0.0, 0.5, 1.0],
            &[verts.clone(), empty_v, verts],
            &[faces.clone(), empty_f, faces],
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(text.contains("o isovalue_0"));
        assert!(!text.contains("o isovalue_0.5"));
        assert!(text.contains("o isovalue_1"));
        assert!(text.contains("f 4 5 6"));
    }

    #[test]
    fn rejects_out_of_range_faces() {
        let (verts, _) = triangle();
        let faces = Mat::from_fn(1, 3, |_, j| j + 1);
        let err = save_obj(scratch("bad"), "bad", verts.as_ref(), faces.as_ref()).unwrap_err();
        assert!(err.kind() == ErrorKind::InvalidData);
    }
}
