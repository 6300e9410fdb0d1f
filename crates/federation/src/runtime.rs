use std::sync::Arc;

use parking_lot::Mutex;
use shared::{
    domain::{CartItem, RemoteDescriptor},
    protocol::{ComponentKind, SharedDependencySpec, CART_ADD_CHANNEL},
};
use tracing::info;

use crate::{
    bridge::{
        AddToCart, BridgeEnv, CartProps, CartView, ModeKind, MountedView, ProductsProps,
        ProductsView, RemoveFromCart,
    },
    cart::{CartSnapshot, CartStore},
    channel::EventChannel,
    error::FederationError,
    loader::{ManifestFetcher, RemoteLoader, ViewLifetime},
    resolver::{DependencyRegistry, ResolvedSharedInstance},
};

/// Application root: owns the share scope, the loader, the cart channel and
/// the canonical cart, and hands them down explicitly.
pub struct HostRuntime {
    registry: Arc<Mutex<DependencyRegistry>>,
    loader: RemoteLoader,
    channel: Arc<EventChannel<CartItem>>,
    cart: Arc<Mutex<CartStore>>,
}

impl HostRuntime {
    /// Registers the host's shared declarations and instantiates the eager
    /// ones before any remote can be loaded.
    pub fn new(
        fetcher: Arc<dyn ManifestFetcher>,
        host_shared: impl IntoIterator<Item = SharedDependencySpec>,
    ) -> Self {
        let mut registry = DependencyRegistry::new();
        registry.register_host(host_shared);
        let eager = registry.initialize_eager();
        info!(eager = eager.len(), "host shared scope initialized");

        let registry = Arc::new(Mutex::new(registry));
        let loader = RemoteLoader::new(fetcher, Arc::clone(&registry));
        Self {
            registry,
            loader,
            channel: Arc::new(EventChannel::new(CART_ADD_CHANNEL)),
            cart: Arc::new(Mutex::new(CartStore::new())),
        }
    }

    pub fn register_remotes(
        &self,
        remotes: impl IntoIterator<Item = RemoteDescriptor>,
    ) -> Result<(), FederationError> {
        for remote in remotes {
            self.loader.register(remote)?;
        }
        Ok(())
    }

    pub fn loader(&self) -> &RemoteLoader {
        &self.loader
    }

    pub fn registry(&self) -> &Arc<Mutex<DependencyRegistry>> {
        &self.registry
    }

    pub fn shared_instance(&self, key: &str) -> Option<Arc<ResolvedSharedInstance>> {
        self.registry.lock().instance(key)
    }

    pub fn channel(&self) -> &Arc<EventChannel<CartItem>> {
        &self.channel
    }

    pub fn env(&self) -> BridgeEnv {
        BridgeEnv::with_channel(Arc::clone(&self.channel))
    }

    pub fn cart_len(&self) -> usize {
        self.cart.lock().len()
    }

    pub fn cart_total(&self) -> u64 {
        self.cart.lock().total()
    }

    pub fn cart_snapshot(&self) -> CartSnapshot {
        self.cart.lock().snapshot()
    }

    pub fn on_add_to_cart(&self) -> AddToCart {
        let cart = Arc::clone(&self.cart);
        Arc::new(move |item: CartItem| {
            info!(id = %item.id, name = %item.name, "host: item added to cart");
            cart.lock().add(item);
        })
    }

    pub fn on_remove_from_cart(&self) -> RemoveFromCart {
        let cart = Arc::clone(&self.cart);
        Arc::new(move |index: usize| {
            if cart.lock().remove(index) {
                info!(index, "host: item removed from cart");
            }
        })
    }

    pub fn cart_props(&self) -> CartProps {
        CartProps {
            items: Some(self.cart_snapshot()),
            on_remove_from_cart: Some(self.on_remove_from_cart()),
        }
    }

    pub fn products_props(&self) -> ProductsProps {
        ProductsProps {
            on_add_to_cart: Some(self.on_add_to_cart()),
        }
    }

    /// Loads `remote`, resolves `export` and mounts it under host control.
    ///
    /// `Ok(None)` means the view went away while the remote was loading.
    pub async fn mount(
        &self,
        remote: &str,
        export: &str,
        lifetime: &ViewLifetime,
    ) -> Result<Option<MountedView>, FederationError> {
        self.mount_as(remote, export, lifetime, ModeKind::HostControlled)
            .await
    }

    /// Mounts `export` the way a remote runs when launched on its own: no
    /// props, so it keeps local state and talks over the cart channel.
    pub async fn mount_standalone(
        &self,
        remote: &str,
        export: &str,
        lifetime: &ViewLifetime,
    ) -> Result<Option<MountedView>, FederationError> {
        self.mount_as(remote, export, lifetime, ModeKind::Standalone)
            .await
    }

    async fn mount_as(
        &self,
        remote: &str,
        export: &str,
        lifetime: &ViewLifetime,
        mode: ModeKind,
    ) -> Result<Option<MountedView>, FederationError> {
        let Some(module) = self.loader.load_for_view(remote, lifetime).await? else {
            return Ok(None);
        };
        let hosted = mode == ModeKind::HostControlled;
        let view = match module.get(export)?.component {
            ComponentKind::Cart => {
                let props = if hosted { self.cart_props() } else { CartProps::default() };
                MountedView::Cart(CartView::mount(props, self.env()))
            }
            ComponentKind::Products => {
                let props = if hosted {
                    self.products_props()
                } else {
                    ProductsProps::default()
                };
                MountedView::Products(ProductsView::mount(props, self.env()))
            }
        };
        info!(remote, export, kind = ?view.kind(), mode = ?view.mode(), "view mounted");
        Ok(Some(view))
    }

    /// Re-renders a mounted view with the current host state.
    pub fn refresh(&self, view: &mut MountedView) {
        match view {
            MountedView::Cart(cart) => cart.set_props(self.cart_props()),
            MountedView::Products(products) => products.set_props(self.products_props()),
        }
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
