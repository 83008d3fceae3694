//! Initial contents of uniform buffers and push constants.
//!
//! Every 4x4 float matrix whose name ends with `view`, `proj`/`projection`
//! or `model` is seeded with a matching camera matrix. Everything else is zero.

use nalgebra::{Matrix4, Perspective3, Projective3, Translation3};
use prism_shader::{reflect::BaseKind, SpvType};

use crate::config::ViewContext;

/// Camera matrices seeded into uniform data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// World to view space.
    pub view: Matrix4<f32>,
    /// View to clip space.
    pub proj: Matrix4<f32>,
}

impl Camera {
    /// Camera on +Z looking at the origin.
    pub fn new(context: &ViewContext) -> Self {
        let view = Projective3::identity() * Translation3::new(0.0, 0.0, context.distance);
        Camera {
            view: view.inverse().to_homogeneous(),
            proj: Perspective3::new(context.aspect_ratio, context.fov_y, context.near, context.far)
                .to_homogeneous(),
        }
    }

    fn matrix(&self, name: &str) -> Option<Matrix4<f32>> {
        let leaf = name.rsplit('.').next().unwrap_or(name).to_ascii_lowercase();
        if leaf.ends_with("view") {
            Some(self.view)
        } else if leaf.ends_with("proj") || leaf.ends_with("projection") {
            Some(self.proj)
        } else if leaf.ends_with("model") {
            Some(Matrix4::identity())
        } else {
            None
        }
    }
}

fn is_mat4(ty: &SpvType) -> bool {
    match ty {
        SpvType::Matrix(m) => m.base == BaseKind::Float && m.rows == 4 && m.columns == 4,
        _ => false,
    }
}

/// Bytes of a value of `ty` with camera matrices seeded.
/// Returns `None` if nothing was seeded.
pub fn default_data(ty: &SpvType, camera: &Camera) -> Option<Vec<u8>> {
    let mut data = vec![0u8; ty.size() as usize];
    let mut seeded = false;

    ty.walk("", 0, &mut |name, offset, leaf| {
        if !is_mat4(leaf) {
            return;
        }
        let matrix = match camera.matrix(name) {
            Some(matrix) => matrix,
            None => return,
        };

        // Column-major, one column per `size / 4` bytes.
        let stride = (leaf.size() / 4) as usize;
        for (column, values) in matrix.column_iter().enumerate() {
            let start = offset as usize + column * stride;
            for (row, value) in values.iter().enumerate() {
                let at = start + row * 4;
                if let Some(slot) = data.get_mut(at..at + 4) {
                    slot.copy_from_slice(&value.to_ne_bytes());
                }
            }
        }
        log::trace!("Seeded '{}' at offset {}", name, offset);
        seeded = true;
    });

    if seeded {
        Some(data)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use prism_shader::reflect::{MatrixType, StructMember, StructType, VectorType};

    fn mat4() -> SpvType {
        SpvType::Matrix(MatrixType {
            base: BaseKind::Float,
            rows: 4,
            columns: 4,
            size: 64,
        })
    }

    fn read_f32(data: &[u8], at: usize) -> f32 {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&data[at..at + 4]);
        f32::from_ne_bytes(bytes)
    }

    #[test]
    fn seeds_matrices_by_name() {
        let ty = SpvType::Struct(StructType {
            members: vec![
                StructMember {
                    ty: SpvType::Vector(VectorType {
                        base: BaseKind::Float,
                        length: 4,
                        size: 16,
                    }),
                    name: "tint".into(),
                    offset: 0,
                },
                StructMember {
                    ty: mat4(),
                    name: "u_proj".into(),
                    offset: 16,
                },
                StructMember {
                    ty: mat4(),
                    name: "view".into(),
                    offset: 80,
                },
            ],
            size: 144,
        });
        let camera = Camera::new(&ViewContext::default());
        let data = default_data(&ty, &camera).unwrap();

        assert_eq!(data.len(), 144);
        assert!(data[..16].iter().all(|&b| b == 0));
        assert_eq!(read_f32(&data, 16), camera.proj[(0, 0)]);
        assert_eq!(read_f32(&data, 16 + 4 * 11), camera.proj[(3, 2)]);
        // Translation lives in the last column.
        assert_eq!(read_f32(&data, 80 + 4 * 14), -10.0);
        assert_eq!(read_f32(&data, 80 + 4 * 15), 1.0);
    }

    #[test]
    fn nothing_to_seed() {
        let ty = SpvType::Struct(StructType {
            members: vec![StructMember {
                ty: mat4(),
                name: "bones".into(),
                offset: 0,
            }],
            size: 64,
        });
        assert!(default_data(&ty, &Camera::new(&ViewContext::default())).is_none());
    }
}
