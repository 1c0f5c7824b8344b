//! Renders the knowledge store into the grounding block both agents read

use crate::knowledge::{KnowledgeStore, RoleRecord, UserRecord};

/// Value rendered for a role without a parent.
const NO_PARENT: &str = "None";

/// Builds the textual context from the knowledge store.
///
/// Rendering is a pure function of the store. Section headers, field labels
/// and ordering are what the agent preambles tell the model to rely on, so
/// the layout must stay byte-stable.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, store: &KnowledgeStore) -> String {
        let company = store.company();
        let mut context = format!(
            "### Company Info:\nCompany Name: {}\nCompany ID: {}\n",
            company.name, company.id
        );

        context.push_str("\n### Roles and Permissions:\n");
        for role in store.roles() {
            Self::push_role(&mut context, role);
        }

        context.push_str("\n\n### Users:\n");
        for user in store.users() {
            Self::push_user(&mut context, user);
        }

        context
    }

    fn push_role(context: &mut String, role: &RoleRecord) {
        let reports_to = role
            .reports_to
            .as_deref()
            .filter(|parent| !parent.is_empty())
            .unwrap_or(NO_PARENT);

        context.push_str(&format!("\n**{}**\nDescription: {}\n", role.name, role.description));
        context.push_str(&format!("Permissions: {}\n", role.permissions.join(", ")));
        context.push_str(&format!("Reports To: {}\n", reports_to));
    }

    fn push_user(context: &mut String, user: &UserRecord) {
        context.push_str(&format!("\nName: {}\n", user.name));
        context.push_str(&format!("Roles: {}\n", user.roles.join(", ")));
        context.push_str(&format!("Designation: {}\n", user.designation));
    }
}

/// Shorthand for `ContextBuilder::new().render(store)`.
pub fn render_context(store: &KnowledgeStore) -> String {
    ContextBuilder::new().render(store)
}
