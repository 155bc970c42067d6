//! # Atoms, Topics, and Style Sets
//!
//! Restyle resolves utility-class strings to native style declarations and
//! keeps them current as the environment changes. There are four pieces:
//!
//! - `Atom`: one compiled utility class, with optional gated layers.
//! - Topics: environment facts (color scheme, window size, custom
//!   properties) held in a reactive record store.
//! - The style store: each atom's currently applicable declarations.
//! - Style sets: flattened declarations per composite class key.
//!
//! ## Registering atoms
//!
//! The style compiler hands atoms to `create`:
//!
//! ```rust
//! use restyle_core::*;
//!
//! let rt = StyleRuntime::new();
//! rt.create([
//!     ("p-4", Atom::new([declaration([("padding", 16)])])),
//!     (
//!         "md:w-full",
//!         Atom::new([declaration([("width", "100%")])])
//!             .with_at_rules(0, [AtRule::media("(min-width: 768px)")])
//!             .with_topics(["width"]),
//!     ),
//! ])
//! .unwrap();
//! ```
//!
//! Atoms listing `topics` (or `customProperties`) are re-evaluated whenever
//! one of those topics changes. Everything else is evaluated once.
//!
//! ## Resolving class names
//!
//! ```rust
//! # use restyle_core::*;
//! # let rt = StyleRuntime::new();
//! # rt.create([("p-4", Atom::new([declaration([("padding", 16)])]))]).unwrap();
//! let style = rt.resolve("p-4 unknown-class", &ComponentState::new());
//! assert_eq!(style.key, "p-4");
//! assert_eq!(style.styles.len(), 1);
//! ```
//!
//! Unknown tokens are dropped. Atoms with `conditions` are filtered against
//! the instance's `ComponentState` first.
//!
//! ## Reacting to changes
//!
//! `use_sync` also returns a `Subscription` that reports new styles for the
//! key. Created inside `Scope::run`, it is torn down with the scope:
//!
//! ```rust
//! use restyle_core::*;
//!
//! let rt = StyleRuntime::new();
//! let scope = Scope::new();
//! scope.run(|| {
//!     let (_style, _sub) = rt.use_sync("group", &ComponentState::new(), |styles| {
//!         log::info!("restyled: {} declarations", styles.len());
//!     });
//! });
//! scope.dispose();
//! ```
//!
//! Writes propagate synchronously: after `set_window_size`,
//! `set_color_scheme` or `set_custom_properties` return, every store is
//! settled.

pub mod atom;
pub mod cache;
pub mod conditions;
pub mod config;
pub mod effects;
pub mod environment;
pub mod error;
pub mod evaluate;
pub mod locals;
pub mod media;
pub mod prelude;
pub mod registry;
pub mod runtime;
pub mod scope;
pub mod store;
pub mod tests;
pub mod topics;
pub mod units;
pub mod value;

pub use atom::*;
pub use conditions::*;
pub use config::*;
pub use effects::*;
pub use environment::*;
pub use error::*;
pub use locals::*;
pub use media::*;
pub use prelude::*;
pub use runtime::*;
pub use scope::*;
pub use store::*;
pub use topics::*;
pub use units::*;
pub use value::*;
