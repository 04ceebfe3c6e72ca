//! Browser-tab icon derived from a profile avatar.

use std::io::Cursor;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{ImageOutputFormat, imageops::FilterType};
use thiserror::Error;

pub const DEFAULT_PAGE_ICON: &str = "/favicon.ico";
pub const PAGE_ICON_SIZE: u32 = 64;

#[derive(Error, Debug)]
pub enum PageIconError {
    #[error("avatar is not a base64 data url")]
    NotDataUrl,

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unreadable image: {0}")]
    Image(#[from] image::ImageError),
}

/// Scales a base64 data-url avatar down to a 64×64 PNG data url.
pub fn favicon_data_url(avatar: &str) -> Result<String, PageIconError> {
    let payload = avatar
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, data)| data)
        .ok_or(PageIconError::NotDataUrl)?;

    let bytes = STANDARD.decode(payload.trim())?;
    let icon = image::load_from_memory(&bytes)?.resize_exact(
        PAGE_ICON_SIZE,
        PAGE_ICON_SIZE,
        FilterType::Triangle,
    );

    let mut png = Cursor::new(Vec::new());
    icon.write_to(&mut png, ImageOutputFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner())))
}

/// The icon a profile page should show for `avatar`.
///
/// Data urls are scaled down, remote images are used as they are, and anything
/// unusable falls back to the site icon.
pub fn page_icon(avatar: Option<&str>) -> String {
    match avatar.map(str::trim).filter(|a| !a.is_empty()) {
        Some(avatar) if avatar.starts_with("data:") => favicon_data_url(avatar).unwrap_or_else(|e| {
            tracing::warn!("Falling back to the default page icon: {}", e);
            DEFAULT_PAGE_ICON.to_string()
        }),
        Some(avatar) if avatar.starts_with("http://") || avatar.starts_with("https://") => {
            avatar.to_string()
        }
        _ => DEFAULT_PAGE_ICON.to_string(),
    }
}
