//! winit bridge: forwards window events a style runtime cares about.

use restyle_core::{ColorScheme, StyleRuntime};
use winit::event::WindowEvent;
use winit::window::{Theme, Window};

use crate::WindowMetrics;

pub fn color_scheme_from_theme(theme: Theme) -> ColorScheme {
    match theme {
        Theme::Light => ColorScheme::Light,
        Theme::Dark => ColorScheme::Dark,
    }
}

/// Metrics seeded from the window's current logical size.
pub fn window_metrics(window: &Window) -> WindowMetrics {
    let size = window.inner_size().to_logical::<f64>(window.scale_factor());
    WindowMetrics::new(restyle_core::WindowSize::new(size.width, size.height))
}

/// Applies `event` to the runtime. Returns `true` when the event changed a
/// topic.
///
/// `Resized` is converted to logical px with `scale_factor` and pushed through
/// `metrics` when given (so a viewport installed with `set_dimensions` sees
/// it), or straight into the runtime otherwise.
pub fn apply_window_event(
    rt: &StyleRuntime,
    metrics: Option<&WindowMetrics>,
    event: &WindowEvent,
    scale_factor: f64,
) -> bool {
    match event {
        WindowEvent::Resized(size) => {
            let logical = size.to_logical::<f64>(scale_factor);
            log::trace!("window resized to {}x{}", logical.width, logical.height);
            match metrics {
                Some(metrics) => metrics.resize(logical.width, logical.height),
                None => rt.set_window_size(logical.width, logical.height),
            }
            true
        }
        WindowEvent::ThemeChanged(theme) => {
            rt.system_appearance_changed(Some(color_scheme_from_theme(*theme)));
            true
        }
        _ => false,
    }
}
