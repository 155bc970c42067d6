pub use crate::atom::{AtRule, Atom, Meta, declaration};
pub use crate::conditions::ComponentState;
pub use crate::effects::{Subscription, effect};
pub use crate::environment::{Appearance, KeyValueStorage, MemoryStorage, Viewport, WindowSize};
pub use crate::error::{StorageError, StyleError};
pub use crate::locals::{current_runtime, use_sync, with_runtime};
pub use crate::runtime::{RuntimeBuilder, StyleRuntime, SyncStyle};
pub use crate::scope::{Scope, current_scope};
pub use crate::topics::{ColorScheme, ColorSchemeSetting, Orientation, TopicValue};
pub use crate::value::{PropertyValue, StyleDeclaration, StyleList, StyleValue};
