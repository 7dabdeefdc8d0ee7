//! Web Audio backend for [`PlayableAudio`](crate::audio::PlayableAudio).

use std::{cell::Cell, rc::Rc};

use anyhow::{Result, anyhow};
use cgmath::{Matrix4, Vector3, Vector4};
use futures::channel::oneshot;
use wasm_bindgen::{JsCast, JsValue, closure::Closure};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AudioBuffer, AudioBufferSourceNode, AudioContext, PannerNode};

use crate::{audio::AudioSink, math, resources};

use super::js_err;

/// A decoded clip routed through a panner into the context's speakers.
pub struct WebAudioSink {
    context: AudioContext,
    buffer: AudioBuffer,
    panner: PannerNode,
    source: Option<AudioBufferSourceNode>,
    looping: bool,
    ended: Rc<Cell<bool>>,
    on_ended: Closure<dyn FnMut()>,
}

impl std::fmt::Debug for WebAudioSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebAudioSink")
            .field("looping", &self.looping)
            .field("playing", &self.source.is_some())
            .finish()
    }
}

impl WebAudioSink {
    pub fn new(context: AudioContext, buffer: AudioBuffer) -> Result<Self> {
        let panner = context.create_panner().map_err(js_err)?;
        panner
            .connect_with_audio_node(&context.destination())
            .map_err(js_err)?;

        let ended = Rc::new(Cell::new(false));
        let flag = ended.clone();
        let on_ended = Closure::<dyn FnMut()>::new(move || flag.set(true));

        Ok(Self {
            context,
            buffer,
            panner,
            source: None,
            looping: false,
            ended,
            on_ended,
        })
    }

    fn disconnect(&mut self) {
        if let Some(source) = self.source.take() {
            source.set_onended(None);
            // Stopping a source that already ended throws; there is nothing to undo.
            let _ = source.stop();
            let _ = source.disconnect();
        }
    }
}

impl AudioSink for WebAudioSink {
    fn set_position(&mut self, position: Vector3<f32>) {
        self.panner.position_x().set_value(position.x);
        self.panner.position_y().set_value(position.y);
        self.panner.position_z().set_value(position.z);
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        if let Some(source) = &self.source {
            source.set_loop(looping);
        }
    }

    fn start(&mut self) -> Result<()> {
        self.disconnect();
        // Contexts created outside a user gesture start suspended.
        let _ = self.context.resume();

        let source = self.context.create_buffer_source().map_err(js_err)?;
        source.set_buffer(Some(&self.buffer));
        source.set_loop(self.looping);
        source
            .connect_with_audio_node(&self.panner)
            .map_err(js_err)?;
        source.set_onended(Some(self.on_ended.as_ref().unchecked_ref()));
        source.start().map_err(js_err)?;

        self.ended.set(false);
        self.source = Some(source);
        Ok(())
    }

    fn stop(&mut self) {
        self.disconnect();
    }

    #[allow(deprecated)]
    fn set_listener(&mut self, viewer: &Matrix4<f32>) {
        let position = math::position_of(viewer);
        let forward = math::mul_vec_by_mat(viewer, Vector4::new(0.0, 0.0, -1.0, 0.0));
        let up = math::mul_vec_by_mat(viewer, Vector4::new(0.0, 1.0, 0.0, 0.0));

        let listener = self.context.listener();
        listener.set_position(position.x as f64, position.y as f64, position.z as f64);
        listener.set_orientation(
            forward.x as f64,
            forward.y as f64,
            forward.z as f64,
            up.x as f64,
            up.y as f64,
            up.z as f64,
        );
    }

    fn take_ended(&mut self) -> bool {
        if self.ended.replace(false) {
            self.source = None;
            true
        } else {
            false
        }
    }
}

impl Drop for WebAudioSink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Fetches and decodes `file_name` into a sink on `context`.
pub async fn load_clip(context: AudioContext, file_name: &str) -> Result<WebAudioSink> {
    let bytes = resources::load_binary(file_name).await?;
    let data = js_sys::Uint8Array::from(bytes.as_slice()).buffer();
    let promise = context.decode_audio_data(&data).map_err(js_err)?;
    let decoded: JsValue = JsFuture::from(promise).await.map_err(js_err)?;
    let buffer: AudioBuffer = decoded
        .dyn_into()
        .map_err(|_| anyhow!("{} did not decode to an audio buffer", file_name))?;
    log::info!(
        "decoded {} ({:.1}s, {} channels)",
        file_name,
        buffer.duration(),
        buffer.number_of_channels()
    );
    WebAudioSink::new(context, buffer)
}

/// Starts [`load_clip`] in the background.
pub fn spawn_load(
    context: AudioContext,
    file_name: String,
) -> oneshot::Receiver<Result<WebAudioSink>> {
    let (sender, receiver) = oneshot::channel();
    resources::spawn(async move {
        let result = load_clip(context, &file_name).await;
        let _ = sender.send(result);
    });
    receiver
}
