//! Registry trait for configuration-selected implementations.
//!
//! Key backends and chain RPC clients are chosen by name in the TOML
//! configuration. Each implementation module exposes a `Registry` type that
//! ties that name to the factory building it.

/// Binds a configuration name to a factory function.
pub trait ImplementationRegistry {
	/// Key under `implementations` in the configuration, e.g. `local` or `remote`
	/// for `[account.implementations.local]`.
	const NAME: &'static str;

	/// Factory signature of the owning module, e.g. `AccountFactory`.
	type Factory;

	fn factory() -> Self::Factory;
}
