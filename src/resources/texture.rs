use anyhow::Context as _;
use futures::channel::oneshot;
use image::RgbaImage;

use super::load_binary;

/// Decodes an encoded image (PNG, JPEG) into tightly packed RGBA8 pixels.
pub fn decode_rgba(bytes: &[u8]) -> anyhow::Result<RgbaImage> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_rgba8())
}

/// Fetches and decodes `file_name`, delivering the result through `sender`.
///
/// Decoding is skipped when the receiving texture has already given up on the
/// load.
pub async fn fetch_image(file_name: String, sender: oneshot::Sender<anyhow::Result<RgbaImage>>) {
    let bytes = match load_binary(&file_name)
        .await
        .with_context(|| format!("fetching {file_name}"))
    {
        Ok(bytes) => bytes,
        Err(e) => {
            // A closed channel only means nobody waits for this image anymore.
            let _ = sender.send(Err(e));
            return;
        }
    };
    if sender.is_canceled() {
        log::debug!("dropping {} before decoding, the load was canceled", file_name);
        return;
    }
    let decoded = decode_rgba(&bytes).with_context(|| format!("decoding {file_name}"));
    let _ = sender.send(decoded);
}
