//! The per-frame VR render loop.
//!
//! The platform glue turns each XR animation frame into a plain [`FrameInput`]
//! (viewer pose, stereo views, controller poses and gamepads) and hands it to
//! [`FrameDriver::tick`]. The driver never talks to the XR runtime itself: the
//! locomotion offset it computes comes back in the [`FrameOutcome`] and the
//! caller applies it to its reference space.
//!
//! # Tick
//!
//! 1. Without a viewer pose the tick is skipped: no GL call, no state change
//! 2. Locomotion is derived from the configured hand's thumbstick
//! 3. The audio clip is moved/started/stopped from the configured buttons
//! 4. Pending texture loads are applied
//! 5. The target frame buffer is bound and cleared
//! 6. For every eye: viewport, projection/view uniforms, then the ground
//!    plane, the cube and one marker per tracked controller

use anyhow::Result;
use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    audio::{AudioSink, PlayableAudio},
    config::{ButtonBinding, VrConfig},
    context::{Gl, TextureOptions},
    data_structures::{
        material::{Material, lit},
        mesh::Mesh,
        texture::Texture,
    },
    math,
    render::Renderer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One eye of the stereo pair.
#[derive(Clone, Debug, PartialEq)]
pub struct EyeView {
    pub viewport: Viewport,
    pub projection: Matrix4<f32>,
    /// World-to-eye matrix, i.e. the inverse of the eye's pose.
    pub view: Matrix4<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerPose {
    /// Head pose in the reference space.
    pub transform: Matrix4<f32>,
    pub views: Vec<EyeView>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Button {
    pub pressed: bool,
    /// Analog value in `[0, 1]`.
    pub value: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gamepad {
    pub buttons: Vec<Button>,
    pub axes: Vec<f32>,
}

impl Gamepad {
    pub fn pressed(&self, button: usize) -> bool {
        self.buttons.get(button).is_some_and(|b| b.pressed)
    }

    pub fn value(&self, button: usize) -> f32 {
        self.buttons.get(button).map_or(0.0, |b| b.value)
    }

    pub fn axis(&self, axis: usize) -> f32 {
        self.axes.get(axis).copied().unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Controller {
    /// Grip pose in the reference space.
    pub transform: Matrix4<f32>,
    pub gamepad: Option<Gamepad>,
}

impl Controller {
    pub fn pressed(&self, button: usize) -> bool {
        self.gamepad.as_ref().is_some_and(|g| g.pressed(button))
    }

    /// Marker colour: trigger, grip and the first face button as red, green and blue.
    pub fn marker_colour(&self) -> [f32; 4] {
        match &self.gamepad {
            Some(gamepad) => [gamepad.value(0), gamepad.value(1), gamepad.value(4), 1.0],
            None => [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Controllers {
    pub left: Option<Controller>,
    pub right: Option<Controller>,
}

impl Controllers {
    pub fn hand(&self, hand: Handedness) -> Option<&Controller> {
        match hand {
            Handedness::Left => self.left.as_ref(),
            Handedness::Right => self.right.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Controller> {
        self.left.iter().chain(self.right.iter())
    }

    fn pressed(&self, binding: ButtonBinding) -> bool {
        self.hand(binding.hand)
            .is_some_and(|c| c.pressed(binding.button))
    }
}

/// Everything the driver needs to know about one XR frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub viewer: Option<ViewerPose>,
    pub controllers: Controllers,
}

/// The frame buffer a session renders into.
pub trait RenderTarget<G: Gl> {
    fn bind(&self, gl: &G);
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// No viewer pose this frame; nothing was touched.
    Skipped,
    Rendered {
        /// Offset to apply to the reference space.
        offset: Option<Vector3<f32>>,
        draws: usize,
    },
}

/// The meshes and materials of the demo scene.
#[derive(Debug)]
pub struct VrScene<G: Gl> {
    pub plane: Mesh<G>,
    pub cube: Mesh<G>,
    pub controller: Mesh<G>,
    pub plane_material: Material<G>,
    pub cube_material: Material<G>,
    pub controller_material: Material<G>,
}

impl<G: Gl> VrScene<G> {
    /// Fetches the configured meshes, falling back to the built-in ones.
    pub async fn load(gl: &G, config: &VrConfig) -> Result<Self> {
        let plane = Mesh::from_obj_or_builtin(gl, &config.plane_mesh).await?;
        let cube = Mesh::from_obj_or_builtin(gl, &config.cube_mesh).await?;
        let controller = Mesh::from_obj_or_builtin(gl, &config.controller_mesh).await?;
        Self::assemble(gl, config, plane, cube, controller)
    }

    /// Builds the scene from the meshes compiled into the crate.
    pub fn builtin(gl: &G, config: &VrConfig) -> Result<Self> {
        use crate::resources::builtin;

        let plane = Mesh::from_obj_str(gl, "plane.obj", builtin::PLANE_OBJ)?;
        let cube = Mesh::from_obj_str(gl, "cube.obj", builtin::CUBE_OBJ)?;
        let controller = Mesh::from_obj_str(gl, "controller.obj", builtin::CONTROLLER_OBJ)?;
        Self::assemble(gl, config, plane, cube, controller)
    }

    fn assemble(
        gl: &G,
        config: &VrConfig,
        plane: Mesh<G>,
        cube: Mesh<G>,
        controller: Mesh<G>,
    ) -> Result<Self> {
        let mut plane_material = match &config.plane_texture {
            Some(file) => {
                let mut material = Material::new(gl, Some(lit::VERTEX), Some(lit::TEXTURED_FRAGMENT))?;
                let texture = Texture::from_file(gl, file, TextureOptions::default())?;
                material.set_texture(gl, texture)?;
                material
            }
            None => Material::lit(gl)?,
        };
        plane_material.set_color(gl, config.plane_colour)?;

        let mut cube_material = Material::lit(gl)?;
        cube_material.set_model(gl, &math::to_array(&math::translation(config.cube_offset)))?;
        cube_material.set_color(gl, config.cube_colour)?;

        let controller_material = Material::lit(gl)?;

        Ok(Self {
            plane,
            cube,
            controller,
            plane_material,
            cube_material,
            controller_material,
        })
    }

    /// Applies texture loads that finished since the last frame.
    pub fn poll(&mut self, gl: &G) {
        self.plane_material.poll(gl);
        self.cube_material.poll(gl);
        self.controller_material.poll(gl);
    }

    fn draw_eye(
        &mut self,
        gl: &G,
        renderer: &mut Renderer,
        eye: &EyeView,
        controllers: &Controllers,
    ) -> Result<()> {
        let projection = math::to_array(&eye.projection);
        let view = math::to_array(&eye.view);

        self.plane_material.set_projection(gl, &projection)?;
        self.plane_material.set_view(gl, &view)?;
        renderer.draw(gl, &self.plane, &self.plane_material);

        self.cube_material.set_projection(gl, &projection)?;
        self.cube_material.set_view(gl, &view)?;
        renderer.draw(gl, &self.cube, &self.cube_material);

        for controller in controllers.iter() {
            self.controller_material.set_projection(gl, &projection)?;
            self.controller_material.set_view(gl, &view)?;
            self.controller_material
                .set_model(gl, &math::to_array(&controller.transform))?;
            self.controller_material
                .set_color(gl, controller.marker_colour())?;
            renderer.draw(gl, &self.controller, &self.controller_material);
        }
        Ok(())
    }

    pub fn free(self, gl: &G) {
        self.plane.free(gl);
        self.cube.free(gl);
        self.controller.free(gl);
        self.plane_material.free(gl);
        self.cube_material.free(gl);
        self.controller_material.free(gl);
    }
}

#[derive(Debug)]
pub struct FrameDriver {
    config: VrConfig,
    renderer: Renderer,
    frames: u64,
}

impl FrameDriver {
    /// Enables depth testing on `gl` and prepares the driver.
    pub fn new<G: Gl>(gl: &G, config: VrConfig) -> Self {
        let mut renderer = Renderer::new();
        renderer.depth_testing(gl, true);
        Self {
            config,
            renderer,
            frames: 0,
        }
    }

    pub fn config(&self) -> &VrConfig {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Frames rendered so far (skipped ticks are not counted).
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Reference-space offset requested by the locomotion thumbstick.
    ///
    /// Stick up (negative axis 3) moves along the controller's horizontal
    /// forward direction, stick right (positive axis 2) strafes right.
    pub fn locomotion(&self, controllers: &Controllers) -> Option<Vector3<f32>> {
        let controller = controllers.hand(self.config.locomotion_hand)?;
        let gamepad = controller.gamepad.as_ref()?;
        let (x, y) = (gamepad.axis(2), gamepad.axis(3));
        if x == 0.0 && y == 0.0 {
            return None;
        }
        let forward = math::horizontal_forward(&controller.transform)?;
        let right = Vector3::new(-forward.z, 0.0, forward.x);
        Some((forward * y - right * x) * self.config.locomotion_speed)
    }

    pub fn tick<G, A, T>(
        &mut self,
        gl: &G,
        scene: &mut VrScene<G>,
        target: &T,
        input: &FrameInput,
        audio: Option<&mut PlayableAudio<A>>,
    ) -> Result<FrameOutcome>
    where
        G: Gl,
        A: AudioSink,
        T: RenderTarget<G>,
    {
        let Some(viewer) = &input.viewer else {
            return Ok(FrameOutcome::Skipped);
        };
        let controllers = &input.controllers;

        let offset = self.locomotion(controllers);

        if let Some(audio) = audio {
            self.drive_audio(audio, &viewer.transform, controllers)?;
        }

        scene.poll(gl);
        target.bind(gl);
        self.renderer.clear(gl, self.config.clear_colour);

        let before = self.renderer.draws();
        for eye in &viewer.views {
            let Viewport {
                x,
                y,
                width,
                height,
            } = eye.viewport;
            gl.viewport(x, y, width, height);
            scene.draw_eye(gl, &mut self.renderer, eye, controllers)?;
        }
        self.frames += 1;

        Ok(FrameOutcome::Rendered {
            offset,
            draws: self.renderer.draws() - before,
        })
    }

    fn drive_audio<A: AudioSink>(
        &self,
        audio: &mut PlayableAudio<A>,
        viewer: &Matrix4<f32>,
        controllers: &Controllers,
    ) -> Result<()> {
        audio.poll();
        audio.sync_listener(viewer);

        // Stop wins while both bindings are held.
        if controllers.pressed(self.config.stop_audio) {
            if audio.stop() {
                log::debug!("audio stopped");
            }
        } else if controllers.pressed(self.config.play_audio) {
            if let Some(controller) = controllers.hand(self.config.play_audio.hand) {
                audio.set_position(math::position_of(&controller.transform));
            }
            if audio.play()? {
                log::debug!("audio started at {:?}", audio.position());
            }
        }
        Ok(())
    }
}

/// A viewer pose at the origin with one full-size eye and identity matrices.
pub fn identity_pose(width: i32, height: i32) -> ViewerPose {
    ViewerPose {
        transform: Matrix4::identity(),
        views: vec![EyeView {
            viewport: Viewport {
                x: 0,
                y: 0,
                width,
                height,
            },
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
        }],
    }
}
