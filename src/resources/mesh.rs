use std::io::{BufReader, Cursor};

use super::load_string;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/**
 * Geometry buffers draw unindexed triangle lists, so every index of every model is
 * expanded into its own `[position(3), tex_coords(2), normal(3)]` vertex.
 * Missing texture coordinates and normals are filled with zeros.
 */
pub fn interleave(models: &[tobj::Model]) -> Vec<f32> {
    let floats: usize = models.iter().map(|m| m.mesh.indices.len() * 8).sum();
    let mut vertices = Vec::with_capacity(floats);
    for m in models {
        let mesh = &m.mesh;
        for &index in &mesh.indices {
            let i = index as usize;
            vertices.extend_from_slice(&[
                mesh.positions[i * 3],
                mesh.positions[i * 3 + 1],
                mesh.positions[i * 3 + 2],
                mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| 1.0 - *f),
                mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ]);
        }
    }
    vertices
}

/// Parses OBJ text that is already in memory. Material libraries are ignored.
pub fn parse_obj(obj_text: &str) -> anyhow::Result<Vec<tobj::Model>> {
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));
    let (models, _) = tobj::load_obj_buf(&mut obj_reader, &load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })?;
    Ok(models)
}

/// Fetches and parses an OBJ file.
pub async fn load_obj(file_name: &str) -> anyhow::Result<Vec<tobj::Model>> {
    let obj_text = load_string(file_name).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));
    let (models, _) = tobj::load_obj_buf_async(&mut obj_reader, &load_options(), |p| async move {
        match load_string(&p).await {
            Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
            Err(e) => {
                log::debug!("material library {p} not loaded: {e}");
                Err(tobj::LoadError::OpenFileFailed)
            }
        }
    })
    .await?;
    Ok(models)
}
