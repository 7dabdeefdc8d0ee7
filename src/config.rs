//! Tunables of the VR demo scene.
//!
//! Everything has a sensible default; embedders override fields before handing
//! the config to [`crate::flow::FrameDriver`] or [`crate::flow::VrScene::load`].

use cgmath::Vector3;

use crate::flow::Handedness;

/// A gamepad button on a specific hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonBinding {
    pub hand: Handedness,
    pub button: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VrConfig {
    pub clear_colour: [f32; 4],
    /// Metres moved per frame at full stick deflection.
    pub locomotion_speed: f32,
    /// Hand whose thumbstick drives locomotion.
    pub locomotion_hand: Handedness,
    /// Moves the audio clip to this controller and starts it.
    pub play_audio: ButtonBinding,
    pub stop_audio: ButtonBinding,
    pub plane_mesh: String,
    pub cube_mesh: String,
    pub controller_mesh: String,
    /// Optional ground texture, sampled by the plane material.
    pub plane_texture: Option<String>,
    /// Optional looping clip played at the controller position.
    pub audio_clip: Option<String>,
    pub audio_looping: bool,
    pub plane_colour: [f32; 4],
    pub cube_colour: [f32; 4],
    pub cube_offset: Vector3<f32>,
}

impl Default for VrConfig {
    fn default() -> Self {
        Self {
            clear_colour: [0.3, 1.0, 0.4, 1.0],
            locomotion_speed: 0.1,
            locomotion_hand: Handedness::Left,
            play_audio: ButtonBinding {
                hand: Handedness::Right,
                button: 4,
            },
            stop_audio: ButtonBinding {
                hand: Handedness::Left,
                button: 4,
            },
            plane_mesh: "plane.obj".to_string(),
            cube_mesh: "cube.obj".to_string(),
            controller_mesh: "controller.obj".to_string(),
            plane_texture: None,
            audio_clip: None,
            audio_looping: true,
            plane_colour: [0.5, 0.5, 0.5, 1.0],
            cube_colour: [0.4, 0.3, 1.0, 1.0],
            cube_offset: Vector3::new(-2.0, 1.0, -10.0),
        }
    }
}
