//! Read-only store of company roles and users.
//!
//! Two JSON documents feed the store: a role-knowledge document mapping role
//! name to `{description, permissions, reports_to}` and a user-mapping
//! document `{companyName, companyId, users}`. Document order is kept so the
//! rendered context lists roles and users the way the source lists them.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::errors::{AssistantError, Result};

const ROLES_SOURCE: &str = "<roles document>";
const USERS_SOURCE: &str = "<users document>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyInfo {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    /// Parent role key. May dangle; that only degrades context quality.
    pub reports_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub roles: Vec<String>,
    pub designation: String,
}

/// Immutable after construction. Share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    company: CompanyInfo,
    roles: Vec<RoleRecord>,
    role_index: HashMap<String, usize>,
    users: Vec<UserRecord>,
    user_index: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct RoleDocument {
    description: String,
    permissions: Vec<String>,
    #[serde(default)]
    reports_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserMappingDocument {
    company_name: String,
    company_id: CompanyId,
    users: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompanyId {
    Text(String),
    Number(serde_json::Number),
}

impl CompanyId {
    fn into_string(self) -> String {
        match self {
            CompanyId::Text(text) => text,
            CompanyId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserDocument {
    name: String,
    roles: Vec<String>,
    designation: String,
}

impl KnowledgeStore {
    /// Load both documents from disk. Any missing, unreadable or malformed
    /// document fails the whole load.
    pub fn load(roles_path: impl AsRef<Path>, users_path: impl AsRef<Path>) -> Result<Self> {
        let roles_path = roles_path.as_ref();
        let users_path = users_path.as_ref();

        let roles_text = read_document(roles_path)?;
        let users_text = read_document(users_path)?;

        let roles = parse_roles(roles_path, &roles_text)?;
        let (company, users) = parse_users(users_path, &users_text)?;

        let store = Self::assemble(company, roles, users);
        info!(
            "Knowledge store loaded: company '{}', {} roles, {} users",
            store.company.name,
            store.roles.len(),
            store.users.len()
        );
        Ok(store)
    }

    /// Build a store from in-memory JSON documents.
    pub fn from_documents(roles_json: &str, users_json: &str) -> Result<Self> {
        let roles = parse_roles(Path::new(ROLES_SOURCE), roles_json)?;
        let (company, users) = parse_users(Path::new(USERS_SOURCE), users_json)?;
        Ok(Self::assemble(company, roles, users))
    }

    fn assemble(company: CompanyInfo, roles: Vec<RoleRecord>, users: Vec<UserRecord>) -> Self {
        let role_index = roles
            .iter()
            .enumerate()
            .map(|(i, role)| (role.name.clone(), i))
            .collect::<HashMap<_, _>>();
        let user_index = users
            .iter()
            .enumerate()
            .map(|(i, user)| (user.id.clone(), i))
            .collect::<HashMap<_, _>>();

        let store = Self {
            company,
            roles,
            role_index,
            users,
            user_index,
        };
        store.warn_on_dangling_references();
        store
    }

    fn warn_on_dangling_references(&self) {
        for problem in self.dangling_references() {
            warn!("{}", problem);
        }
    }

    /// References to roles that are not defined. An empty `reports_to` means
    /// no parent and is not reported.
    fn dangling_references(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for role in &self.roles {
            if let Some(parent) = role.reports_to.as_deref().filter(|p| !p.is_empty()) {
                if !self.role_index.contains_key(parent) {
                    problems.push(format!("Role '{}' reports to unknown role '{}'", role.name, parent));
                }
            }
        }
        for user in &self.users {
            for role in &user.roles {
                if !self.role_index.contains_key(role) {
                    problems.push(format!(
                        "User '{}' ({}) is assigned unknown role '{}'",
                        user.id, user.name, role
                    ));
                }
            }
        }
        problems
    }

    pub fn company(&self) -> &CompanyInfo {
        &self.company
    }

    /// Roles in document order.
    pub fn roles(&self) -> &[RoleRecord] {
        &self.roles
    }

    /// Users in document order.
    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }

    pub fn role(&self, name: &str) -> Option<&RoleRecord> {
        self.role_index.get(name).map(|&i| &self.roles[i])
    }

    pub fn user(&self, id: &str) -> Option<&UserRecord> {
        self.user_index.get(id).map(|&i| &self.users[i])
    }

    /// Resolve a user's assigned roles, skipping names the store does not know.
    pub fn roles_for_user(&self, id: &str) -> Vec<&RoleRecord> {
        self.user(id)
            .map(|user| user.roles.iter().filter_map(|name| self.role(name)).collect())
            .unwrap_or_default()
    }
}

fn read_document(path: &Path) -> Result<String> {
    debug!("Reading knowledge document {}", path.display());
    std::fs::read_to_string(path)
        .map_err(|e| AssistantError::data_load(path, format!("cannot read document: {}", e)))
}

fn parse_roles(path: &Path, text: &str) -> Result<Vec<RoleRecord>> {
    let document: Map<String, Value> = serde_json::from_str(text)
        .map_err(|e| AssistantError::data_load(path, format!("malformed roles document: {}", e)))?;

    document
        .into_iter()
        .map(|(name, value)| {
            let role: RoleDocument = serde_json::from_value(value).map_err(|e| {
                AssistantError::data_load(path, format!("role '{}': {}", name, e))
            })?;
            Ok(RoleRecord {
                name,
                description: role.description,
                permissions: role.permissions,
                reports_to: role.reports_to,
            })
        })
        .collect()
}

fn parse_users(path: &Path, text: &str) -> Result<(CompanyInfo, Vec<UserRecord>)> {
    let document: UserMappingDocument = serde_json::from_str(text)
        .map_err(|e| AssistantError::data_load(path, format!("malformed user mapping: {}", e)))?;

    let company = CompanyInfo {
        name: document.company_name,
        id: document.company_id.into_string(),
    };

    let users = document
        .users
        .into_iter()
        .map(|(id, value)| {
            let user: UserDocument = serde_json::from_value(value).map_err(|e| {
                AssistantError::data_load(path, format!("user '{}': {}", id, e))
            })?;
            Ok(UserRecord {
                id,
                name: user.name,
                roles: user.roles,
                designation: user.designation,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((company, users))
}
