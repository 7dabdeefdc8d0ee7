//! vrgl
//!
//! A thin object layer over WebGL2 plus a small WebXR demo driven by it. The
//! GL objects (geometry buffers, shader stages and programs, textures) own their
//! handles and are released explicitly; every GL call goes through the [`Gl`]
//! trait so the objects and the frame loop can be exercised without a browser.
//!
//! High-level modules
//! - `context`: the [`Gl`] seam and its `glow` implementation
//! - `data_structures`: geometry buffers, shaders, textures, meshes and materials
//! - `render`: mesh + material draw calls, clearing and depth testing
//! - `flow`: the per-frame stereo render loop with locomotion and audio controls
//! - `session`: lifecycle of the single immersive session
//! - `audio`: a spatialised clip with play/stop bookkeeping
//! - `resources`: loading OBJ files and images, background tasks
//! - `web`: browser glue (canvas, WebXR, Web Audio), wasm only
//!

pub mod audio;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod math;
pub mod render;
pub mod resources;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod web;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use context::Gl;
pub use error::GfxError;

/// Installs the logger: `env_logger` natively, the browser console on the web.
///
/// Calling it more than once is harmless.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }
}
