const CLOUD_ADMIN_PRPL: &str = "r/CloudAdmin";
const ADMIN_ROLE_PRPL: &str = "r/Admin";

/// The verified identity attached to every request and connection by the
/// auth middleware. Issuance and verification of the underlying token is
/// the external auth collaborator's job; this core only consumes it.
#[derive(Clone, Debug)]
pub struct Actor {
    pub user_id: String,
    pub org_id: String,
    pub display_name: String,
    pub prpls: Vec<String>,
}

/// Actions gated by the central capability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    EditComment,
    DeleteComment,
    ResolveComment,
    PinComment,
    CreateSnapshot,
    Rollback,
    ViewVersions,
    ViewComments,
    ViewDiagnostics,
}

pub fn is_cloud_admin(prpls: &[String]) -> bool {
    prpls.iter().any(|p| p == CLOUD_ADMIN_PRPL)
}

pub fn is_admin(prpls: &[String], org_id: &str) -> bool {
    if is_cloud_admin(prpls) {
        return true;
    }
    let org_admin = format!("{}/f/admin", org_id);
    prpls
        .iter()
        .any(|p| p == ADMIN_ROLE_PRPL || p == &org_admin)
}

pub fn is_org_member(prpls: &[String], org_id: &str) -> bool {
    if is_cloud_admin(prpls) {
        return true;
    }
    let org_prefix = format!("{}/u/", org_id);
    prpls.iter().any(|p| p.starts_with(&org_prefix))
}

/// Central capability check consumed by the comment and version services.
///
/// `resource_owner` is the author of the targeted resource, when the action
/// has one. Resolution and pinning are deliberately permissive: they are
/// collaborative signals, not access-controlled actions.
pub fn can(actor: &Actor, capability: Capability, resource_owner: Option<&str>) -> bool {
    match capability {
        Capability::EditComment => resource_owner == Some(actor.user_id.as_str()),
        Capability::DeleteComment => {
            resource_owner == Some(actor.user_id.as_str())
                || is_admin(&actor.prpls, &actor.org_id)
        }
        Capability::ResolveComment | Capability::PinComment => {
            is_org_member(&actor.prpls, &actor.org_id)
        }
        Capability::CreateSnapshot
        | Capability::Rollback
        | Capability::ViewVersions
        | Capability::ViewComments => is_org_member(&actor.prpls, &actor.org_id),
        Capability::ViewDiagnostics => is_cloud_admin(&actor.prpls),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(user_id: &str, prpls: Vec<&str>) -> Actor {
        Actor {
            user_id: user_id.to_string(),
            org_id: "org1".to_string(),
            display_name: user_id.to_string(),
            prpls: prpls.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn author_may_delete_own_comment() {
        let a = actor("u1", vec!["org1/u/u1"]);
        assert!(can(&a, Capability::DeleteComment, Some("u1")));
    }

    #[test]
    fn non_author_needs_admin_to_delete() {
        let member = actor("u2", vec!["org1/u/u2"]);
        assert!(!can(&member, Capability::DeleteComment, Some("u1")));

        let admin = actor("u2", vec!["org1/u/u2", "r/Admin"]);
        assert!(can(&admin, Capability::DeleteComment, Some("u1")));
    }

    #[test]
    fn resolve_is_permissive_for_members() {
        let member = actor("u3", vec!["org1/u/u3"]);
        assert!(can(&member, Capability::ResolveComment, Some("u1")));
    }

    #[test]
    fn edit_is_author_only_even_for_admins() {
        let admin = actor("u2", vec!["org1/u/u2", "r/Admin"]);
        assert!(!can(&admin, Capability::EditComment, Some("u1")));
    }

    #[test]
    fn diagnostics_requires_cloud_admin() {
        let admin = actor("u2", vec!["org1/u/u2", "r/Admin"]);
        assert!(!can(&admin, Capability::ViewDiagnostics, None));
        let cloud = actor("ops", vec!["r/CloudAdmin"]);
        assert!(can(&cloud, Capability::ViewDiagnostics, None));
    }
}
