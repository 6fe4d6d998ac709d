pub mod account;
pub mod books;
pub mod categories;
pub mod favorites;

use std::sync::Arc;

use bookstore_kernel::{gateway::Gateways, ModuleRegistry};

/// Register all bookstore modules with the registry.
///
/// Favorites is registered before account: account start needs the
/// favorites repository, and stop runs in reverse.
pub fn register_all(registry: &mut ModuleRegistry, gateways: &Gateways) {
    let categories = categories::CategoriesModule::new(gateways);
    let books = books::BooksModule::new(gateways, categories.service());
    let favorites = Arc::new(favorites::FavoritesModule::new());
    let account = account::AccountModule::new(gateways, Arc::clone(&favorites));

    registry.register(Arc::new(books));
    registry.register(Arc::new(categories));
    registry.register(favorites);
    registry.register(Arc::new(account));
}
