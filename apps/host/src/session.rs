use std::{io::Write, str::FromStr};

use federation::{cart::format_price, AddOutcome, HostRuntime, MountedView, ViewLifetime};
use shared::domain::CartItem;
use thiserror::Error;
use tracing::warn;

use crate::route::{Route, UnknownRoute};

/// One scripted user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Navigate(Route),
    /// `add=ID:NAME:PRICE`
    Add(CartItem),
    /// `remove=INDEX`
    Remove(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepParseError {
    #[error(transparent)]
    Route(#[from] UnknownRoute),
    #[error("'{0}' must have the form add=ID:NAME:PRICE")]
    BadAdd(String),
    #[error("'{0}' must have the form remove=INDEX")]
    BadRemove(String),
    #[error("unrecognized step '{0}'")]
    Unknown(String),
}

impl FromStr for Step {
    type Err = StepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('/') {
            return Ok(Self::Navigate(s.parse()?));
        }
        if let Some(spec) = s.strip_prefix("add=") {
            let bad = || StepParseError::BadAdd(s.to_string());
            let (id, rest) = spec.split_once(':').ok_or_else(bad)?;
            let (name, price) = rest.rsplit_once(':').ok_or_else(bad)?;
            let id = id.parse().map_err(|_| bad())?;
            let price = price.parse().map_err(|_| bad())?;
            if name.is_empty() {
                return Err(bad());
            }
            return Ok(Self::Add(CartItem::new(id, name, price)));
        }
        if let Some(index) = s.strip_prefix("remove=") {
            return index
                .parse()
                .map(Self::Remove)
                .map_err(|_| StepParseError::BadRemove(s.to_string()));
        }
        Err(StepParseError::Unknown(s.to_string()))
    }
}

/// Drives the host through a sequence of steps, rendering each page as text.
///
/// In standalone mode every remote is mounted without props, as if launched
/// on its own, and stays mounted after navigating away. Adds then reach the
/// cart only through the cart channel.
pub struct Session<'a> {
    runtime: &'a HostRuntime,
    standalone: bool,
    route: Route,
    lifetime: ViewLifetime,
    view: Option<MountedView>,
    parked: Vec<(Route, MountedView)>,
}

impl<'a> Session<'a> {
    pub fn new(runtime: &'a HostRuntime) -> Self {
        Self::with_mode(runtime, false)
    }

    pub fn standalone(runtime: &'a HostRuntime) -> Self {
        Self::with_mode(runtime, true)
    }

    fn with_mode(runtime: &'a HostRuntime, standalone: bool) -> Self {
        Self {
            runtime,
            standalone,
            route: Route::Home,
            lifetime: ViewLifetime::new(),
            view: None,
            parked: Vec::new(),
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn view(&self) -> Option<&MountedView> {
        self.view.as_ref()
    }

    pub async fn apply<W: Write>(&mut self, step: Step, out: &mut W) -> anyhow::Result<()> {
        match step {
            Step::Navigate(route) => self.navigate(route, out).await?,
            Step::Add(item) => match &self.view {
                Some(MountedView::Products(products)) => {
                    let name = item.name.clone();
                    let price = format_price(item.price);
                    match products.add_to_cart(item) {
                        AddOutcome::Delegated => writeln!(out, "added {name} {price}")?,
                        AddOutcome::Broadcast { listeners } => writeln!(
                            out,
                            "added {name} {price} (broadcast to {listeners} listener(s))"
                        )?,
                        AddOutcome::Dropped => writeln!(out, "'{name}' was not added")?,
                    }
                }
                _ => writeln!(out, "no products view on {}", self.route)?,
            },
            Step::Remove(index) => match &self.view {
                Some(MountedView::Cart(cart)) => cart.remove(index),
                _ => writeln!(out, "no cart view on {}", self.route)?,
            },
        }

        if !self.standalone {
            if let Some(view) = self.view.as_mut() {
                self.runtime.refresh(view);
            }
        }
        if let Some(MountedView::Cart(cart)) = &self.view {
            write!(out, "{}", cart.summary())?;
        }
        Ok(())
    }

    async fn navigate<W: Write>(&mut self, route: Route, out: &mut W) -> anyhow::Result<()> {
        // The old page unmounts before the new one starts loading.
        self.lifetime.deactivate();
        self.lifetime = ViewLifetime::new();
        if let Some(view) = self.view.take() {
            if self.standalone {
                self.parked.push((self.route, view));
            }
        }
        self.route = route;

        writeln!(out, "{}", self.nav_bar())?;
        let Some((remote, export)) = route.target() else {
            writeln!(out, "Welcome to MicroStore")?;
            for descriptor in self.runtime.loader().registered() {
                writeln!(out, "  composes {descriptor}")?;
            }
            return Ok(());
        };

        if let Some(index) = self.parked.iter().position(|(parked, _)| *parked == route) {
            self.view = Some(self.parked.swap_remove(index).1);
        } else {
            if !self.runtime.loader().is_cached(remote) {
                if let Some(label) = route.loading_label() {
                    writeln!(out, "{label}")?;
                }
            }
            let mounted = if self.standalone {
                self.runtime
                    .mount_standalone(remote, export, &self.lifetime)
                    .await
            } else {
                self.runtime.mount(remote, export, &self.lifetime).await
            };
            match mounted {
                Ok(view) => self.view = view,
                Err(error) => {
                    warn!(remote, export, %error, "view failed to load");
                    writeln!(out, "failed to load {remote}/{export}: {error}")?;
                }
            }
        }
        if matches!(self.view, Some(MountedView::Products(_))) {
            writeln!(out, "Featured Products")?;
        }
        Ok(())
    }

    pub fn nav_bar(&self) -> String {
        format!(
            "MicroStore | Home | Products | Cart ({})",
            self.cart_count()
        )
    }

    /// Host cart size, or the standalone cart's own count when remotes run
    /// without the host.
    fn cart_count(&self) -> usize {
        if !self.standalone {
            return self.runtime.cart_len();
        }
        self.view
            .iter()
            .chain(self.parked.iter().map(|(_, view)| view))
            .find_map(|view| match view {
                MountedView::Cart(cart) => Some(cart.items().len()),
                MountedView::Products(_) => None,
            })
            .unwrap_or(0)
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.lifetime.deactivate();
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
