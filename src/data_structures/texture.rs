//! 2D textures.
//!
//! A [`Texture`] always has an image: [`Texture::from_file`] defines a 1x1
//! magenta placeholder right away and replaces it once the fetch finishes. The
//! fetch runs as its own task and hands its result back through a oneshot
//! channel; [`Texture::poll`] applies it on the render thread, so the image is
//! never swapped out in the middle of a draw.

use anyhow::Result;
use futures::channel::oneshot;
use image::RgbaImage;
use instant::Instant;

pub use crate::context::{Filter, TextureOptions, Wrap};
use crate::{context::Gl, error::GfxError, resources};

/// The pixel shown until a file-backed texture has loaded.
pub const PLACEHOLDER_PIXEL: [u8; 4] = [255, 0, 255, 255];

/// Progress of the image behind a texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// The current image is final.
    Ready,
    /// A fetch is in flight and the placeholder is bound.
    Pending,
    /// The fetch or decode failed; the placeholder stays.
    Failed(String),
    /// The load was abandoned with [`Texture::cancel_load`].
    Canceled,
}

#[derive(Debug)]
struct PendingImage {
    url: String,
    started: Instant,
    receiver: oneshot::Receiver<Result<RgbaImage>>,
}

/// A 2D RGBA texture object.
#[derive(Debug)]
pub struct Texture<G: Gl> {
    handle: G::Texture,
    size: (u32, u32),
    options: TextureOptions,
    pending: Option<PendingImage>,
    state: LoadState,
}

impl<G: Gl> Texture<G> {
    /// Creates a texture object without an image.
    pub fn new(gl: &G) -> Result<Self> {
        let handle = gl.create_texture().map_err(|reason| GfxError::Create {
            what: "texture",
            reason,
        })?;
        Ok(Self {
            handle,
            size: (0, 0),
            options: TextureOptions::default(),
            pending: None,
            state: LoadState::Ready,
        })
    }

    /// Binds the placeholder pixel now and starts fetching `url` in the background.
    ///
    /// Call [`poll`](Self::poll) once per frame to swap the real image in.
    pub fn from_file(gl: &G, url: &str, options: TextureOptions) -> Result<Self> {
        let mut texture = Self::new(gl)?;
        texture.options = options;
        texture.define(gl, 1, 1, &PLACEHOLDER_PIXEL);

        let (sender, receiver) = oneshot::channel();
        resources::spawn(resources::texture::fetch_image(url.to_string(), sender));
        texture.pending = Some(PendingImage {
            url: url.to_string(),
            started: Instant::now(),
            receiver,
        });
        texture.state = LoadState::Pending;
        Ok(texture)
    }

    /// Creates a texture from tightly packed RGBA8 pixels.
    pub fn from_data(
        gl: &G,
        width: u32,
        height: u32,
        data: &[u8],
        options: TextureOptions,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(GfxError::PixelData {
                expected,
                found: data.len(),
            }
            .into());
        }
        let mut texture = Self::new(gl)?;
        texture.options = options;
        texture.define(gl, width, height, data);
        Ok(texture)
    }

    /// Applies a finished background load, if there is one.
    pub fn poll(&mut self, gl: &G) -> &LoadState {
        let Some(mut pending) = self.pending.take() else {
            return &self.state;
        };
        match pending.receiver.try_recv() {
            Ok(None) => {
                self.pending = Some(pending);
                return &self.state;
            }
            Ok(Some(Ok(image))) => {
                let (width, height) = image.dimensions();
                self.define(gl, width, height, image.as_raw());
                log::info!(
                    "loaded texture {} ({}x{}) in {:?}",
                    pending.url,
                    width,
                    height,
                    pending.started.elapsed()
                );
                self.state = LoadState::Ready;
            }
            Ok(Some(Err(e))) => {
                log::warn!("texture {} failed to load: {:#}", pending.url, e);
                self.state = LoadState::Failed(e.to_string());
            }
            Err(oneshot::Canceled) => {
                log::warn!("texture {} loader stopped without a result", pending.url);
                self.state = LoadState::Failed("loader dropped".to_string());
            }
        }
        &self.state
    }

    /// Abandons an in-flight load. The current image stays.
    pub fn cancel_load(&mut self) {
        if self.pending.take().is_some() {
            self.state = LoadState::Canceled;
        }
    }

    /// Makes this texture the one sampled from texture unit `slot`.
    pub fn bind(&self, gl: &G, slot: u32) {
        gl.active_texture(slot);
        gl.bind_texture_2d(Some(self.handle));
    }

    pub fn handle(&self) -> G::Texture {
        self.handle
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn options(&self) -> TextureOptions {
        self.options
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn free(self, gl: &G) {
        gl.delete_texture(self.handle);
    }

    fn define(&mut self, gl: &G, width: u32, height: u32, pixels: &[u8]) {
        gl.bind_texture_2d(Some(self.handle));
        gl.tex_image_2d_rgba(width, height, pixels);
        gl.texture_sampling(self.options);
        gl.bind_texture_2d(None);
        self.size = (width, height);
    }
}
