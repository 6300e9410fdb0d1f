//! Host-Controlled / Standalone arbitration for exposed components.
//!
//! A view picks its mode from the props it is mounted with and re-picks only
//! when the external state changes between present and absent. A Standalone
//! cart is the only thing that ever listens on the cart channel, so a host
//! that owns the cart and a channel listener can never both apply an add.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;
use shared::{domain::CartItem, protocol::ComponentKind};
use tracing::{debug, info, warn};

use crate::{
    cart::{total_of, CartSnapshot, CartStore, CartSummary},
    channel::{EventChannel, Subscription},
};

pub type AddToCart = Arc<dyn Fn(CartItem) + Send + Sync>;
pub type RemoveFromCart = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    HostControlled,
    Standalone,
}

/// Props the host passes to the cart export.
#[derive(Clone, Default)]
pub struct CartProps {
    pub items: Option<CartSnapshot>,
    pub on_remove_from_cart: Option<RemoveFromCart>,
}

/// Props the host passes to the products export.
#[derive(Clone, Default)]
pub struct ProductsProps {
    pub on_add_to_cart: Option<AddToCart>,
}

/// What the execution environment offers a mounted view.
#[derive(Debug, Clone, Default)]
pub struct BridgeEnv {
    channel: Option<Arc<EventChannel<CartItem>>>,
}

impl BridgeEnv {
    pub fn with_channel(channel: Arc<EventChannel<CartItem>>) -> Self {
        Self {
            channel: Some(channel),
        }
    }

    /// An environment with no broadcast capability.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn channel(&self) -> Option<&Arc<EventChannel<CartItem>>> {
        self.channel.as_ref()
    }
}

pub enum CartMode {
    HostControlled {
        items: CartSnapshot,
        on_remove: Option<RemoveFromCart>,
    },
    Standalone {
        store: Arc<Mutex<CartStore>>,
        subscription: Option<Subscription<CartItem>>,
    },
}

impl CartMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::HostControlled { .. } => ModeKind::HostControlled,
            Self::Standalone { .. } => ModeKind::Standalone,
        }
    }
}

impl fmt::Debug for CartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostControlled { items, on_remove } => f
                .debug_struct("HostControlled")
                .field("items", &items.len())
                .field("on_remove", &on_remove.is_some())
                .finish(),
            Self::Standalone {
                store,
                subscription,
            } => f
                .debug_struct("Standalone")
                .field("items", &store.lock().len())
                .field("subscription", subscription)
                .finish(),
        }
    }
}

/// The cart export, mounted.
#[derive(Debug)]
pub struct CartView {
    env: BridgeEnv,
    local: Arc<Mutex<CartStore>>,
    mode: CartMode,
}

impl CartView {
    pub fn mount(props: CartProps, env: BridgeEnv) -> Self {
        let local = Arc::new(Mutex::new(CartStore::new()));
        let mode = select_cart_mode(props, &env, &local);
        debug!(mode = ?mode.kind(), "cart view mounted");
        Self { env, local, mode }
    }

    /// Applies new props. The mode only changes when `items` flips between
    /// present and absent; local state survives the round trip.
    pub fn set_props(&mut self, props: CartProps) {
        match (self.mode.kind(), props.items) {
            (ModeKind::HostControlled, Some(next)) => {
                if let CartMode::HostControlled { items, on_remove } = &mut self.mode {
                    *items = next;
                    *on_remove = props.on_remove_from_cart;
                }
            }
            (ModeKind::Standalone, None) => {}
            (_, items) => {
                let props = CartProps {
                    items,
                    on_remove_from_cart: props.on_remove_from_cart,
                };
                self.mode = select_cart_mode(props, &self.env, &self.local);
                info!(mode = ?self.mode.kind(), "cart view switched mode");
            }
        }
    }

    pub fn mode(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(
            self.mode,
            CartMode::Standalone {
                subscription: Some(_),
                ..
            }
        )
    }

    pub fn items(&self) -> CartSnapshot {
        match &self.mode {
            CartMode::HostControlled { items, .. } => Arc::clone(items),
            CartMode::Standalone { store, .. } => store.lock().snapshot(),
        }
    }

    pub fn total(&self) -> u64 {
        total_of(&self.items())
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary::from_items(&self.items())
    }

    /// Host-Controlled: forwarded to the host callback only.
    /// Standalone: filters local state directly.
    pub fn remove(&self, index: usize) {
        match &self.mode {
            CartMode::HostControlled {
                on_remove: Some(on_remove),
                ..
            } => on_remove(index),
            CartMode::HostControlled {
                on_remove: None, ..
            } => {
                warn!(index, "cart: on_remove_from_cart prop is missing, removal ignored");
            }
            CartMode::Standalone { store, .. } => {
                if !store.lock().remove(index) {
                    debug!(index, "cart: stale index, nothing removed");
                }
            }
        }
    }
}

fn select_cart_mode(
    props: CartProps,
    env: &BridgeEnv,
    local: &Arc<Mutex<CartStore>>,
) -> CartMode {
    if let Some(items) = props.items {
        return CartMode::HostControlled {
            items,
            on_remove: props.on_remove_from_cart,
        };
    }

    if props.on_remove_from_cart.is_some() {
        debug!("cart: standalone mode ignores on_remove_from_cart without items");
    }
    let subscription = match env.channel() {
        Some(channel) => {
            let store = Arc::clone(local);
            Some(channel.listen(move |item: &CartItem| store.lock().add(item.clone())))
        }
        None => {
            warn!("cart: no broadcast channel available, standalone cart will not receive adds");
            None
        }
    };
    CartMode::Standalone {
        store: Arc::clone(local),
        subscription,
    }
}

pub enum ProductsMode {
    HostControlled { on_add: AddToCart },
    Standalone,
}

impl ProductsMode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::HostControlled { .. } => ModeKind::HostControlled,
            Self::Standalone => ModeKind::Standalone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Handed to the host callback.
    Delegated,
    /// Published on the cart channel.
    Broadcast { listeners: usize },
    /// Neither a callback nor a channel was available.
    Dropped,
}

/// The products export, mounted.
pub struct ProductsView {
    env: BridgeEnv,
    mode: ProductsMode,
}

impl ProductsView {
    pub fn mount(props: ProductsProps, env: BridgeEnv) -> Self {
        let mode = select_products_mode(props);
        debug!(mode = ?mode.kind(), "products view mounted");
        Self { env, mode }
    }

    pub fn set_props(&mut self, props: ProductsProps) {
        self.mode = select_products_mode(props);
    }

    pub fn mode(&self) -> ModeKind {
        self.mode.kind()
    }

    /// Never fails: with no callback and no channel the add is dropped with a
    /// warning and reported as [`AddOutcome::Dropped`].
    pub fn add_to_cart(&self, item: CartItem) -> AddOutcome {
        match &self.mode {
            ProductsMode::HostControlled { on_add } => {
                info!(id = %item.id, name = %item.name, "products: called on_add_to_cart");
                on_add(item);
                AddOutcome::Delegated
            }
            ProductsMode::Standalone => match self.env.channel() {
                Some(channel) => {
                    warn!(channel = channel.name(), "products: on_add_to_cart prop is missing, dispatching on channel");
                    let listeners = channel.publish(&item);
                    AddOutcome::Broadcast { listeners }
                }
                None => {
                    warn!(id = %item.id, "products: no on_add_to_cart and no broadcast channel, add dropped");
                    AddOutcome::Dropped
                }
            },
        }
    }
}

impl fmt::Debug for ProductsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProductsView")
            .field("mode", &self.mode.kind())
            .field("env", &self.env)
            .finish()
    }
}

fn select_products_mode(props: ProductsProps) -> ProductsMode {
    match props.on_add_to_cart {
        Some(on_add) => ProductsMode::HostControlled { on_add },
        None => ProductsMode::Standalone,
    }
}

/// A mounted export of either component kind.
#[derive(Debug)]
pub enum MountedView {
    Cart(CartView),
    Products(ProductsView),
}

impl MountedView {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Cart(_) => ComponentKind::Cart,
            Self::Products(_) => ComponentKind::Products,
        }
    }

    pub fn mode(&self) -> ModeKind {
        match self {
            Self::Cart(view) => view.mode(),
            Self::Products(view) => view.mode(),
        }
    }
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
