pub mod paths;
pub mod preference_store;

pub use paths::StatehousePaths;
pub use preference_store::TomlPreferenceStore;
