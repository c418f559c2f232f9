//! Drawing a render list with one pass type

use std::sync::Arc;

use super::backend::GpuBackend;
use super::camera::Camera;
use super::material::{MaterialPass, PassType};
use super::mesh::MeshId;
use super::render_item::RenderItem;

/// Draw `items` with the `pass_type` pass of their materials
///
/// Items whose material lacks the pass are skipped. Pass state is bound once
/// per run of items sharing a pass, and mesh buffers once per run of items
/// sharing a mesh. Blending is reset afterwards. Returns the number of draws.
pub fn render_pass<'a>(
    gpu: &mut dyn GpuBackend,
    camera: &Camera,
    pass_type: PassType,
    items: impl IntoIterator<Item = &'a RenderItem>,
) -> usize {
    let mut active_pass: Option<&Arc<dyn MaterialPass>> = None;
    let mut last_mesh: Option<MeshId> = None;
    let mut draws = 0;

    for item in items {
        let Some(pass) = item.material.pass(pass_type) else {
            continue;
        };

        if !active_pass.is_some_and(|active| Arc::ptr_eq(active, pass)) {
            gpu.set_blend_state(item.material.blend_state());
            pass.update_pass_render_state(camera, gpu);
            active_pass = Some(pass);
            last_mesh = None;
        }

        pass.update_instance_render_state(camera, item, gpu);

        let mesh_id = item.mesh.id();
        if last_mesh != Some(mesh_id) {
            gpu.bind_mesh(&item.mesh, pass_type);
            last_mesh = Some(mesh_id);
        }

        gpu.draw(&item.mesh);
        draws += 1;
    }

    gpu.set_blend_state(None);
    draws
}
