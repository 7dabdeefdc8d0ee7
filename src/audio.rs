//! A single spatialised audio clip.
//!
//! The platform side (decoding, the positioned source, the listener) sits
//! behind [`AudioSink`]. [`PlayableAudio`] adds the playable/playing bookkeeping
//! that keeps a held button from restarting the clip every frame.

use anyhow::Result;
use cgmath::{Matrix4, Vector3};
use futures::channel::oneshot;

/// A decoded clip attached to a 3D positioned source.
pub trait AudioSink {
    fn set_position(&mut self, position: Vector3<f32>);
    fn set_looping(&mut self, looping: bool);
    /// Starts the clip from the beginning.
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self);
    /// Moves the listener to the viewer pose.
    fn set_listener(&mut self, viewer: &Matrix4<f32>);
    /// Reports, once, that a started clip reached its end on its own.
    fn take_ended(&mut self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct PlayableAudio<A: AudioSink> {
    sink: Option<A>,
    pending: Option<oneshot::Receiver<Result<A>>>,
    position: Vector3<f32>,
    looping: bool,
    playing: bool,
}

impl<A: AudioSink> PlayableAudio<A> {
    /// Wraps a sink whose clip is already decoded.
    pub fn ready(sink: A, looping: bool) -> Self {
        Self {
            sink: Some(sink),
            pending: None,
            position: Vector3::new(0.0, 0.0, 0.0),
            looping,
            playing: false,
        }
    }

    /// Waits for a sink that is still being fetched and decoded.
    pub fn pending(receiver: oneshot::Receiver<Result<A>>, looping: bool) -> Self {
        Self {
            sink: None,
            pending: Some(receiver),
            position: Vector3::new(0.0, 0.0, 0.0),
            looping,
            playing: false,
        }
    }

    /// Picks up a finished decode and clip-ended notifications.
    pub fn poll(&mut self) {
        if let Some(receiver) = self.pending.as_mut() {
            match receiver.try_recv() {
                Ok(None) => {}
                Ok(Some(Ok(mut sink))) => {
                    sink.set_position(self.position);
                    sink.set_looping(self.looping);
                    self.sink = Some(sink);
                    self.pending = None;
                    log::info!("audio clip ready");
                }
                Ok(Some(Err(e))) => {
                    log::warn!("audio clip failed to load: {:#}", e);
                    self.pending = None;
                }
                Err(oneshot::Canceled) => {
                    log::warn!("audio loader stopped without a result");
                    self.pending = None;
                }
            }
        }
        if let Some(sink) = self.sink.as_mut() {
            if sink.take_ended() {
                self.playing = false;
            }
        }
    }

    /// Whether the clip is decoded and can be started.
    pub fn is_playable(&self) -> bool {
        self.sink.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
        if let Some(sink) = self.sink.as_mut() {
            sink.set_position(position);
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        if let Some(sink) = self.sink.as_mut() {
            sink.set_looping(looping);
        }
    }

    /// Starts playback. Returns `false` without touching the sink when the clip
    /// is not decoded yet or already playing.
    pub fn play(&mut self) -> Result<bool> {
        if self.playing {
            return Ok(false);
        }
        let Some(sink) = self.sink.as_mut() else {
            return Ok(false);
        };
        sink.start()?;
        self.playing = true;
        Ok(true)
    }

    /// Stops playback. Returns `false` when nothing was playing.
    pub fn stop(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.stop();
        }
        self.playing = false;
        true
    }

    pub fn sync_listener(&mut self, viewer: &Matrix4<f32>) {
        if let Some(sink) = self.sink.as_mut() {
            sink.set_listener(viewer);
        }
    }
}
