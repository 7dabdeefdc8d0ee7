//! Loading of external files and background tasks.
//!
//! In the browser files are fetched relative to the page origin, natively they
//! are read from the `assets/` directory (absolute paths are used as given).

use std::future::Future;

pub mod mesh;
pub mod texture;

/// Meshes compiled into the binary so the scene can be built without an asset server.
pub mod builtin {
    pub const PLANE_OBJ: &str = include_str!(concat!(env!("OUT_DIR"), "/assets/plane.obj"));
    pub const CUBE_OBJ: &str = include_str!(concat!(env!("OUT_DIR"), "/assets/cube.obj"));
    pub const CONTROLLER_OBJ: &str =
        include_str!(concat!(env!("OUT_DIR"), "/assets/controller.obj"));

    /// Looks a built-in mesh up by the file name it ships as.
    pub fn obj(file_name: &str) -> Option<&'static str> {
        match file_name.trim_start_matches('/') {
            "plane.obj" => Some(PLANE_OBJ),
            "cube.obj" => Some(CUBE_OBJ),
            "controller.obj" => Some(CONTROLLER_OBJ),
            _ => None,
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("page has no origin"))?;
    let base = reqwest::Url::parse(&format!("{}/", origin))?;
    Ok(base.join(file_name)?)
}

#[cfg(not(target_arch = "wasm32"))]
fn asset_path(file_name: &str) -> std::path::PathBuf {
    let path = std::path::Path::new(file_name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::path::Path::new("./")
            .join("assets")
            .join(file_name.trim_start_matches('/'))
    }
}

pub async fn load_string(file_name: &str) -> anyhow::Result<String> {
    #[cfg(target_arch = "wasm32")]
    let txt = {
        let url = format_url(file_name)?;
        reqwest::get(url).await?.error_for_status()?.text().await?
    };
    #[cfg(not(target_arch = "wasm32"))]
    let txt = tokio::fs::read_to_string(asset_path(file_name)).await?;

    Ok(txt)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = tokio::fs::read(asset_path(file_name)).await?;

    Ok(data)
}

/// Runs a loader task to completion in the background.
#[cfg(target_arch = "wasm32")]
pub fn spawn<F>(task: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(task);
}

/// Runs a loader task to completion in the background.
///
/// Inside a tokio runtime the task is spawned onto it, otherwise it gets a
/// short-lived thread with its own runtime.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn<F>(task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => {
            std::thread::spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(task),
                    Err(e) => log::error!("could not start a loader runtime: {}", e),
                }
            });
        }
    }
}
