//! Runtime composition of independently deployed remotes.
//!
//! [`RemoteLoader`] fetches remote entries on first use and caches them,
//! [`DependencyRegistry`] keeps one instance per singleton shared dependency,
//! and the [`bridge`] views run either under host control or standalone on an
//! [`EventChannel`]. [`HostRuntime`] owns all of it for one application.

pub mod bridge;
pub mod cart;
pub mod channel;
pub mod error;
pub mod loader;
pub mod resolver;
pub mod runtime;

pub use bridge::{
    AddOutcome, AddToCart, BridgeEnv, CartMode, CartProps, CartView, ModeKind, MountedView,
    ProductsProps, ProductsView, RemoveFromCart,
};
pub use cart::{CartSnapshot, CartStore, CartSummary};
pub use channel::{EventChannel, Subscription, SubscriptionId};
pub use error::FederationError;
pub use loader::{
    HttpManifestFetcher, ManifestFetcher, RemoteContainer, RemoteLoader, RemoteModule,
    ViewLifetime,
};
pub use resolver::{
    BindingSource, DependencyRegistry, ResolvedSharedInstance, ShareReport,
    SharedDependencyConflict,
};
pub use runtime::HostRuntime;
