use std::cell::Cell;
use std::rc::Rc;

use restyle_core::{Appearance, ColorScheme};

/// OS scheme source the host updates itself (from a theme event, a settings
/// screen, a test). Clones share the value.
#[derive(Clone, Debug, Default)]
pub struct FixedAppearance(Rc<Cell<Option<ColorScheme>>>);

impl FixedAppearance {
    pub fn new(scheme: Option<ColorScheme>) -> Self {
        Self(Rc::new(Cell::new(scheme)))
    }

    pub fn set(&self, scheme: Option<ColorScheme>) {
        self.0.set(scheme);
    }
}

impl Appearance for FixedAppearance {
    fn color_scheme(&self) -> Option<ColorScheme> {
        self.0.get()
    }
}
