//! Keeps the main surface and the presenter console in agreement.
//!
//! The main side owns the [`Navigator`](crate::nav::Navigator) and the UI
//! flags and broadcasts a `state` snapshot whenever either changes while a
//! presenter is connected. The presenter side owns nothing: it sends
//! `navigate`/`control` commands and renders the last snapshot it received.

mod authority;
mod presenter;

pub use authority::MainController;
pub use presenter::PresenterController;

use crate::protocol::AspectRatio;

/// Display flags that travel with every snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiFlags {
    pub show_border: bool,
    pub is_fullscreen: bool,
    pub aspect_ratio: AspectRatio,
}

impl Default for UiFlags {
    fn default() -> Self {
        Self {
            show_border: true,
            is_fullscreen: false,
            aspect_ratio: AspectRatio::default(),
        }
    }
}

/// Fullscreen capability of the surface hosting the slides.
pub trait Fullscreen {
    fn is_fullscreen(&self) -> bool;
    fn request(&mut self);
    fn exit(&mut self);
}
