//! Knowledge module - Company roles, permissions and users loaded once at startup

pub mod store;

pub use store::{CompanyInfo, KnowledgeStore, RoleRecord, UserRecord};
