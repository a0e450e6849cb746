/// Represents a single acquired surface frame.
///
/// This object is short-lived. Holding the surface texture prevents
/// acquisition of subsequent frames; it is presented by [`Gpu::present`](super::Gpu::present)
/// after the command stream has been flushed.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
