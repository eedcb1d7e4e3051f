//! Autolist core library: domain types, collaborator seams, configuration
//! and the in-memory / YAML collaborator implementations.
//!
//! - [`types`]: newtypes and domain structs
//! - [`collab`]: [`PortfolioSource`], [`MembershipWriter`],
//!   [`ExecutionContextFactory`]
//! - [`config`]: [`UpdaterConfig`] load / save
//! - [`store`]: concrete collaborators

pub mod collab;
pub mod config;
pub mod context;
pub mod error;
pub mod paths;
pub mod store;
pub mod types;

pub use collab::{
    Collaborators, ExecutionContextFactory, MembershipTransaction, MembershipWriter,
    PortfolioSource,
};
pub use config::UpdaterConfig;
pub use context::SessionContextFactory;
pub use error::{CollaboratorError, ConfigError, StoreError};
pub use store::items::YamlMembershipStore;
pub use store::memory::{MemoryMembershipStore, MemoryPortfolio};
pub use store::portfolio::{PortfolioFile, YamlPortfolioSource};
pub use types::{ExecutionContext, ListId, ListItem, MemberKey, Principal, PrincipalId, ProjectList};
