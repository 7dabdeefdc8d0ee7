//! Browser glue: the enter/exit button, the WebGL2 canvas, WebXR sessions and
//! the XR animation frame loop.
//!
//! Everything here only translates between the browser and the platform
//! independent pieces. XR frames become [`FrameInput`]s for the
//! [`FrameDriver`], the session lifecycle is delegated to [`SessionManager`]
//! and the clip plays through [`audio::WebAudioSink`].

pub mod audio;

use std::{cell::RefCell, rc::Rc};

use anyhow::{Result, anyhow};
use cgmath::Vector3;
use wasm_bindgen::{JsCast, JsValue, prelude::*};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AudioContext, DomPointInit, HtmlButtonElement, HtmlCanvasElement, WebGl2RenderingContext,
    WebGlFramebuffer, XrFrame, XrHandedness, XrReferenceSpace, XrReferenceSpaceType,
    XrRenderStateInit, XrRigidTransform, XrSession, XrSessionInit, XrSessionMode, XrView,
    XrWebGlLayer,
};

use crate::{
    audio::PlayableAudio,
    config::VrConfig,
    flow::{
        Button, Controller, Controllers, EyeView, FrameDriver, FrameInput, FrameOutcome, Gamepad,
        RenderTarget, ViewerPose, Viewport, VrScene,
    },
    math,
    session::{SessionAction, SessionHandle, SessionManager},
};

pub(crate) fn js_err(e: JsValue) -> anyhow::Error {
    anyhow!("{:?}", e)
}

const BUTTON_ID: &str = "xr-button";

/// A running `immersive-vr` session.
pub struct ActiveSession {
    session: XrSession,
}

impl SessionHandle for ActiveSession {
    fn end(&self) {
        // The end event reports back through `SessionManager::ended`.
        let _ = self.session.end();
    }
}

/// The framebuffer of the session's base layer.
struct LayerTarget<'a> {
    raw: &'a WebGl2RenderingContext,
    framebuffer: Option<WebGlFramebuffer>,
}

impl RenderTarget<glow::Context> for LayerTarget<'_> {
    fn bind(&self, _: &glow::Context) {
        self.raw
            .bind_framebuffer(WebGl2RenderingContext::FRAMEBUFFER, self.framebuffer.as_ref());
    }
}

struct App {
    config: VrConfig,
    button: HtmlButtonElement,
    raw: WebGl2RenderingContext,
    gl: Rc<glow::Context>,
    sessions: SessionManager<ActiveSession>,
}

type Shared = Rc<RefCell<App>>;

/// Everything the frame callback needs while a session runs.
struct SessionLoop {
    reference_space: XrReferenceSpace,
    raw: WebGl2RenderingContext,
    gl: Rc<glow::Context>,
    scene: Option<VrScene<glow::Context>>,
    driver: FrameDriver,
    audio: Option<PlayableAudio<audio::WebAudioSink>>,
    audio_context: Option<AudioContext>,
}

type FrameCallback = Closure<dyn FnMut(f64, XrFrame)>;

/// One requested session, from the moment the platform grants it until its end event.
struct Running {
    session: XrSession,
    ended: bool,
    failure: Option<String>,
    world: Option<SessionLoop>,
    frames: Option<FrameCallback>,
    frame_request: Option<u32>,
}

type SharedRunning = Rc<RefCell<Running>>;

#[wasm_bindgen(start)]
pub fn run_vrgl_wasm() -> Result<(), JsValue> {
    crate::init_logging();
    wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = setup(VrConfig::default()).await {
            log::error!("could not set up VR: {:#}", e);
        }
    });
    Ok(())
}

async fn setup(config: VrConfig) -> Result<()> {
    let window = web_sys::window().ok_or_else(|| anyhow!("no window"))?;
    let document = window.document().ok_or_else(|| anyhow!("no document"))?;
    let button: HtmlButtonElement = document
        .get_element_by_id(BUTTON_ID)
        .ok_or_else(|| anyhow!("the page has no #{} button", BUTTON_ID))?
        .dyn_into()
        .map_err(|_| anyhow!("#{} is not a button", BUTTON_ID))?;

    let xr = window.navigator().xr();
    let supported = JsFuture::from(xr.is_session_supported(XrSessionMode::ImmersiveVr))
        .await
        .map_err(js_err)?
        .as_bool()
        .unwrap_or(false);
    if !supported {
        button.set_text_content(Some("VR not supported"));
        log::warn!("immersive-vr sessions are not supported by this browser");
        return Ok(());
    }

    let (raw, gl) = create_context(&document)?;
    let app = Rc::new(RefCell::new(App {
        config,
        button: button.clone(),
        raw,
        gl: Rc::new(gl),
        sessions: SessionManager::new(),
    }));

    let on_click = {
        let app = app.clone();
        Closure::<dyn FnMut()>::new(move || {
            let action = app.borrow_mut().sessions.toggle();
            if action == SessionAction::Request {
                let app = app.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    // Only a failed request lands here; later failures end the session.
                    if let Err(e) = start_session(app.clone()).await {
                        log::error!("could not start the VR session: {:#}", e);
                        let mut app = app.borrow_mut();
                        app.sessions.start_failed();
                        app.button
                            .set_text_content(Some(&format!("Enter VR ({})", e)));
                    }
                });
            }
        })
    };
    button.set_onclick(Some(on_click.as_ref().unchecked_ref()));
    on_click.forget();

    button.set_disabled(false);
    button.set_text_content(Some("Enter VR"));
    log::info!("VR is available");
    Ok(())
}

/// An XR compatible WebGL2 context on a fresh canvas.
fn create_context(document: &web_sys::Document) -> Result<(WebGl2RenderingContext, glow::Context)> {
    let canvas: HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(js_err)?
        .dyn_into()
        .map_err(|_| anyhow!("created element is not a canvas"))?;
    let body = document.body().ok_or_else(|| anyhow!("no body"))?;
    body.append_child(&canvas).map_err(js_err)?;

    let attributes = js_sys::Object::new();
    js_sys::Reflect::set(&attributes, &"alpha".into(), &false.into()).map_err(js_err)?;
    js_sys::Reflect::set(&attributes, &"xrCompatible".into(), &true.into()).map_err(js_err)?;

    let raw: WebGl2RenderingContext = canvas
        .get_context_with_context_options("webgl2", &attributes)
        .map_err(js_err)?
        .ok_or_else(|| anyhow!("browser does not support webgl2"))?
        .dyn_into()
        .map_err(|_| anyhow!("context is not a WebGl2RenderingContext"))?;
    let gl = glow::Context::from_webgl2_context(raw.clone());
    Ok((raw, gl))
}

async fn start_session(app: Shared) -> Result<()> {
    let xr = web_sys::window()
        .ok_or_else(|| anyhow!("no window"))?
        .navigator()
        .xr();

    let init = XrSessionInit::new();
    let features = js_sys::Array::of1(&"local-floor".into());
    init.set_required_features(&features);
    let session: XrSession =
        JsFuture::from(xr.request_session_with_options(XrSessionMode::ImmersiveVr, &init))
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(|_| anyhow!("request did not produce a session"))?;

    // Register the session before anything else is awaited so that an end
    // event or a button press during loading is handled.
    let running = Rc::new(RefCell::new(Running {
        session: session.clone(),
        ended: false,
        failure: None,
        world: None,
        frames: None,
        frame_request: None,
    }));
    let on_end = {
        let app = app.clone();
        let running = running.clone();
        Closure::once_into_js(move || {
            let failure = running.borrow_mut().close();
            let mut app = app.borrow_mut();
            app.sessions.ended();
            let label = match failure {
                Some(e) => format!("Enter VR ({})", e),
                None => "Enter VR".to_string(),
            };
            app.button.set_text_content(Some(&label));
        })
    };
    session.set_onend(Some(on_end.unchecked_ref()));
    {
        let mut app = app.borrow_mut();
        app.sessions.started(ActiveSession {
            session: session.clone(),
        });
        app.button.set_text_content(Some("Exit VR"));
    }

    if let Err(e) = prepare_session(&app, &running).await {
        log::error!("could not prepare the VR session: {:#}", e);
        running.borrow_mut().failure = Some(e.to_string());
        let _ = session.end();
    }
    Ok(())
}

/// Sets up rendering for a granted session and starts its frame loop.
async fn prepare_session(app: &Shared, running: &SharedRunning) -> Result<()> {
    let (raw, gl, config) = {
        let app = app.borrow();
        (app.raw.clone(), app.gl.clone(), app.config.clone())
    };
    let session = running.borrow().session.clone();

    let layer = XrWebGlLayer::new_with_web_gl2_rendering_context(&session, &raw).map_err(js_err)?;
    let state = XrRenderStateInit::new();
    state.set_base_layer(Some(&layer));
    session.update_render_state_with_state(&state);

    let reference_space: XrReferenceSpace =
        JsFuture::from(session.request_reference_space(XrReferenceSpaceType::LocalFloor))
            .await
            .map_err(js_err)?
            .dyn_into()
            .map_err(|_| anyhow!("request did not produce a reference space"))?;

    let scene = VrScene::load(gl.as_ref(), &config).await?;
    if running.borrow().ended {
        log::debug!("session ended while its scene was loading");
        scene.free(gl.as_ref());
        return Ok(());
    }

    let driver = FrameDriver::new(gl.as_ref(), config.clone());
    let (audio, audio_context) = match &config.audio_clip {
        Some(clip) => {
            let context = AudioContext::new().map_err(js_err)?;
            let audio = PlayableAudio::pending(
                audio::spawn_load(context.clone(), clip.clone()),
                config.audio_looping,
            );
            (Some(audio), Some(context))
        }
        None => (None, None),
    };

    running.borrow_mut().world = Some(SessionLoop {
        reference_space,
        raw,
        gl,
        scene: Some(scene),
        driver,
        audio,
        audio_context,
    });
    request_frames(running);
    Ok(())
}

/// Drives [`SessionLoop::frame`] from the session's animation frames until [`Running::close`].
fn request_frames(running: &SharedRunning) {
    let shared = running.clone();
    let callback: FrameCallback = Closure::new(move |_time: f64, frame: XrFrame| {
        let mut running = shared.borrow_mut();
        if running.ended {
            return;
        }
        let next = running
            .frames
            .as_ref()
            .map(|next| frame.session().request_animation_frame(next.as_ref().unchecked_ref()));
        running.frame_request = next;
        if let Some(world) = running.world.as_mut() {
            if let Err(e) = world.frame(&frame) {
                log::error!("frame failed: {:#}", e);
            }
        }
    });

    let mut running = running.borrow_mut();
    let first = running
        .session
        .request_animation_frame(callback.as_ref().unchecked_ref());
    running.frame_request = Some(first);
    running.frames = Some(callback);
}

impl Running {
    /// Stops the frame loop and releases the scene and audio. Returns why
    /// the session was ended, if it failed.
    fn close(&mut self) -> Option<String> {
        self.ended = true;
        if let Some(request) = self.frame_request.take() {
            self.session.cancel_animation_frame(request);
        }
        // Breaks the cycle between the frame callback and this state.
        self.frames = None;
        if let Some(world) = self.world.take() {
            world.close();
        }
        self.failure.take()
    }
}

impl SessionLoop {
    fn close(mut self) {
        if let Some(scene) = self.scene.take() {
            scene.free(self.gl.as_ref());
        }
        drop(self.audio.take());
        if let Some(context) = self.audio_context.take() {
            if let Err(e) = context.close() {
                log::warn!("could not close the audio context: {:?}", e);
            }
        }
    }

    fn frame(&mut self, frame: &XrFrame) -> Result<()> {
        let layer = frame.session().render_state().base_layer();
        let input = frame_input(frame, &self.reference_space, layer.as_ref());
        let target = LayerTarget {
            raw: &self.raw,
            framebuffer: layer.as_ref().and_then(|l| l.framebuffer()),
        };
        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };

        let outcome = self
            .driver
            .tick(self.gl.as_ref(), scene, &target, &input, self.audio.as_mut())?;
        if let FrameOutcome::Rendered {
            offset: Some(offset),
            ..
        } = outcome
        {
            self.reference_space = offset_space(&self.reference_space, offset)?;
        }
        Ok(())
    }
}

fn offset_space(space: &XrReferenceSpace, offset: Vector3<f32>) -> Result<XrReferenceSpace> {
    let position = DomPointInit::new();
    position.set_x(offset.x as f64);
    position.set_y(offset.y as f64);
    position.set_z(offset.z as f64);
    let transform = XrRigidTransform::new_with_position(&position).map_err(js_err)?;
    Ok(space.get_offset_reference_space(&transform))
}

fn frame_input(
    frame: &XrFrame,
    space: &XrReferenceSpace,
    layer: Option<&XrWebGlLayer>,
) -> FrameInput {
    let viewer = match (frame.get_viewer_pose(space), layer) {
        (Some(pose), Some(layer)) => Some(ViewerPose {
            transform: math::matrix_from_slice(&pose.transform().matrix()),
            views: pose
                .views()
                .iter()
                .filter_map(|view| view.dyn_into::<XrView>().ok())
                .filter_map(|view| eye_view(&view, layer))
                .collect(),
        }),
        _ => None,
    };
    FrameInput {
        viewer,
        controllers: controllers(frame, space),
    }
}

fn eye_view(view: &XrView, layer: &XrWebGlLayer) -> Option<EyeView> {
    let viewport = layer.get_viewport(view)?;
    Some(EyeView {
        viewport: Viewport {
            x: viewport.x(),
            y: viewport.y(),
            width: viewport.width(),
            height: viewport.height(),
        },
        projection: math::matrix_from_slice(&view.projection_matrix()),
        view: math::matrix_from_slice(&view.transform().inverse().matrix()),
    })
}

fn controllers(frame: &XrFrame, space: &XrReferenceSpace) -> Controllers {
    let mut controllers = Controllers::default();
    let sources = frame.session().input_sources();
    for index in 0..sources.length() {
        let Some(source) = sources.get(index) else {
            continue;
        };
        let Some(grip) = source.grip_space() else {
            continue;
        };
        let Some(pose) = frame.get_pose(&grip, space) else {
            continue;
        };
        let controller = Controller {
            transform: math::matrix_from_slice(&pose.transform().matrix()),
            gamepad: source.gamepad().map(|pad| gamepad(&pad)),
        };
        match source.handedness() {
            XrHandedness::Left => controllers.left = Some(controller),
            XrHandedness::Right => controllers.right = Some(controller),
            _ => {}
        }
    }
    controllers
}

fn gamepad(pad: &web_sys::Gamepad) -> Gamepad {
    Gamepad {
        buttons: pad
            .buttons()
            .iter()
            .filter_map(|button| button.dyn_into::<web_sys::GamepadButton>().ok())
            .map(|button| Button {
                pressed: button.pressed(),
                value: button.value() as f32,
            })
            .collect(),
        axes: pad
            .axes()
            .iter()
            .map(|axis| axis.as_f64().unwrap_or(0.0) as f32)
            .collect(),
    }
}
