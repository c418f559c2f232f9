//! Recording GPU fake for render and shadow tests

use std::sync::{Arc, Mutex};

use crate::foundation::math::Vec4;

use super::backend::{
    DepthBufferId, GpuBackend, Rect, RenderTargetId, TextureDataType, TextureDesc, TextureId,
};
use super::camera::Camera;
use super::material::{BlendState, MaterialPass, PassType};
use super::mesh::{Mesh, MeshId};
use super::render_item::RenderItem;
use super::{RenderError, RenderResult};

/// One recorded backend or pass call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    CreateTexture(TextureDesc),
    CreateDepthBuffer(u32, u32),
    CreateRenderTarget(TextureId, Option<DepthBufferId>),
    SetRenderTarget(Option<RenderTargetId>),
    SetViewport(Rect),
    SetClearColor(Vec4),
    Clear,
    SetColorMask(bool),
    SetBlendState(Option<BlendState>),
    BindMesh(MeshId),
    Draw(MeshId),
    Blur(TextureId, (f32, f32)),
    PassState(String),
    InstanceState(String),
}

/// Backend that records every call in order
#[derive(Debug, Default)]
pub struct RecordingGpu {
    log: Arc<Mutex<Vec<GpuCall>>>,
    unsupported: Vec<TextureDataType>,
    next_id: u32,
}

impl RecordingGpu {
    /// Backend lacking render support for the given data types
    pub fn without(unsupported: &[TextureDataType]) -> Self {
        Self { unsupported: unsupported.to_vec(), ..Self::default() }
    }

    /// Calls recorded so far
    pub fn calls(&self) -> Vec<GpuCall> {
        self.log.lock().unwrap().clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.log.lock().unwrap().clear();
    }

    fn record(&self, call: GpuCall) {
        self.log.lock().unwrap().push(call);
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuBackend for RecordingGpu {
    fn supports_data_type(&self, data_type: TextureDataType) -> bool {
        !self.unsupported.contains(&data_type)
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> RenderResult<TextureId> {
        if !self.supports_data_type(desc.data_type) {
            return Err(RenderError::ResourceCreationFailed(format!("{:?}", desc.data_type)));
        }
        self.record(GpuCall::CreateTexture(*desc));
        Ok(TextureId(self.next()))
    }

    fn create_depth_buffer(&mut self, width: u32, height: u32) -> RenderResult<DepthBufferId> {
        self.record(GpuCall::CreateDepthBuffer(width, height));
        Ok(DepthBufferId(self.next()))
    }

    fn create_render_target(
        &mut self,
        color: TextureId,
        depth: Option<DepthBufferId>,
    ) -> RenderResult<RenderTargetId> {
        self.record(GpuCall::CreateRenderTarget(color, depth));
        Ok(RenderTargetId(self.next()))
    }

    fn set_render_target(&mut self, target: Option<RenderTargetId>) {
        self.record(GpuCall::SetRenderTarget(target));
    }

    fn set_viewport(&mut self, viewport: Rect) {
        self.record(GpuCall::SetViewport(viewport));
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.record(GpuCall::SetClearColor(color));
    }

    fn clear(&mut self) {
        self.record(GpuCall::Clear);
    }

    fn set_color_mask(&mut self, enabled: bool) {
        self.record(GpuCall::SetColorMask(enabled));
    }

    fn set_blend_state(&mut self, state: Option<BlendState>) {
        self.record(GpuCall::SetBlendState(state));
    }

    fn bind_mesh(&mut self, mesh: &Mesh, _pass: PassType) {
        self.record(GpuCall::BindMesh(mesh.id()));
    }

    fn draw(&mut self, mesh: &Mesh) {
        self.record(GpuCall::Draw(mesh.id()));
    }

    fn blur(&mut self, source: TextureId, step: (f32, f32)) {
        self.record(GpuCall::Blur(source, step));
    }
}

/// Material pass logging into a [`RecordingGpu`]'s call list
#[derive(Debug)]
pub struct RecordingPass {
    name: String,
    log: Arc<Mutex<Vec<GpuCall>>>,
}

impl RecordingPass {
    /// Pass named `name` recording into `gpu`
    pub fn shared(name: &str, gpu: &RecordingGpu) -> Arc<dyn MaterialPass> {
        Arc::new(Self { name: name.to_string(), log: Arc::clone(&gpu.log) })
    }
}

impl MaterialPass for RecordingPass {
    fn update_pass_render_state(&self, _camera: &Camera, _gpu: &mut dyn GpuBackend) {
        self.log.lock().unwrap().push(GpuCall::PassState(self.name.clone()));
    }

    fn update_instance_render_state(&self, _camera: &Camera, _item: &RenderItem, _gpu: &mut dyn GpuBackend) {
        self.log.lock().unwrap().push(GpuCall::InstanceState(self.name.clone()));
    }
}
