//! Role-based convenience API on an [`Enforcer`]
//!
//! Users and roles are the first two fields of `g` rows; permissions are `p`
//! rows with the subject stripped. Domain variants put the domain in the
//! third `g` field and the second `p` field.

use crate::enforcer::Enforcer;
use crate::error::Result;
use crate::rbac::RoleManager;
use crate::types::{Rule, SEC_ROLE};
use std::collections::{HashSet, VecDeque};

impl Enforcer {
    /// Direct roles of `name`
    pub fn get_roles_for_user(&self, name: &str) -> Vec<String> {
        self.roles_of(name, None)
    }

    /// Direct members of role `name`
    pub fn get_users_for_role(&self, name: &str) -> Vec<String> {
        self.users_of(name, None)
    }

    /// Whether `name` directly has `role`
    pub fn has_role_for_user(&self, name: &str, role: &str) -> bool {
        self.get_roles_for_user(name).iter().any(|r| r == role)
    }

    /// Give `user` the role `role`; false if it already had it
    pub async fn add_role_for_user(&mut self, user: &str, role: &str) -> Result<bool> {
        self.add_grouping_policy(&[user, role]).await
    }

    /// Take `role` away from `user`; false if it did not have it
    pub async fn delete_role_for_user(&mut self, user: &str, role: &str) -> Result<bool> {
        self.remove_grouping_policy(&[user, role]).await
    }

    /// Take every role away from `user`
    pub async fn delete_roles_for_user(&mut self, user: &str) -> Result<bool> {
        self.remove_filtered_grouping_policy(0, &[user]).await
    }

    /// Remove `user` from grouping and policy rows
    pub async fn delete_user(&mut self, user: &str) -> Result<bool> {
        let grouping = self.remove_filtered_grouping_policy(0, &[user]).await?;
        let policy = self.remove_filtered_policy(0, &[user]).await?;
        Ok(grouping || policy)
    }

    /// Remove `role` from grouping rows and the policy rows it is subject of
    pub async fn delete_role(&mut self, role: &str) -> Result<bool> {
        let grouping = self.remove_filtered_grouping_policy(1, &[role]).await?;
        let policy = self.remove_filtered_policy(0, &[role]).await?;
        Ok(grouping || policy)
    }

    /// Remove every policy row granting `permission`
    pub async fn delete_permission<S: AsRef<str>>(&mut self, permission: &[S]) -> Result<bool> {
        self.remove_filtered_policy(1, permission).await
    }

    /// Grant `permission` to `user`; false if already granted
    pub async fn add_permission_for_user<S: AsRef<str>>(&mut self, user: &str, permission: &[S]) -> Result<bool> {
        self.add_policy(&with_subject(user, permission)).await
    }

    /// Revoke `permission` from `user`; false if it was not granted
    pub async fn delete_permission_for_user<S: AsRef<str>>(&mut self, user: &str, permission: &[S]) -> Result<bool> {
        self.remove_policy(&with_subject(user, permission)).await
    }

    /// Revoke every permission of `user`
    pub async fn delete_permissions_for_user(&mut self, user: &str) -> Result<bool> {
        self.remove_filtered_policy(0, &[user]).await
    }

    /// Policy rows whose subject is `user`
    pub fn get_permissions_for_user(&self, user: &str) -> Vec<Rule> {
        self.get_filtered_policy(0, &[user])
    }

    /// Whether `user` is directly granted `permission`
    pub fn has_permission_for_user<S: AsRef<str>>(&self, user: &str, permission: &[S]) -> bool {
        self.has_policy(&with_subject(user, permission))
    }

    /// Direct and inherited roles of `name`, nearest first
    ///
    /// For `g, alice, admin` and `g, admin, staff` the implicit roles of
    /// `alice` are `admin` and `staff`.
    pub fn get_implicit_roles_for_user(&self, name: &str, domain: Option<&str>) -> Vec<String> {
        let mut roles = Vec::new();
        let mut seen: HashSet<String> = HashSet::from([name.to_string()]);
        let mut queue: VecDeque<String> = VecDeque::from([name.to_string()]);

        while let Some(current) = queue.pop_front() {
            for role in self.roles_of(&current, domain) {
                if seen.insert(role.clone()) {
                    roles.push(role.clone());
                    queue.push_back(role);
                }
            }
        }
        roles
    }

    /// Policy rows of `user` and of every role it inherits
    pub fn get_implicit_permissions_for_user(&self, user: &str, domain: Option<&str>) -> Vec<Rule> {
        let mut subjects = vec![user.to_string()];
        subjects.extend(self.get_implicit_roles_for_user(user, domain));

        subjects
            .iter()
            .flat_map(|subject| match domain {
                Some(domain) => self.get_filtered_policy(0, &[subject.as_str(), domain]),
                None => self.get_filtered_policy(0, &[subject.as_str()]),
            })
            .collect()
    }

    /// Users (not roles) allowed `permission` directly or through a role
    ///
    /// # Errors
    /// Returns error if enforcing the permission fails
    pub fn get_implicit_users_for_permission<S: AsRef<str>>(&self, permission: &[S]) -> Result<Vec<String>> {
        let roles: HashSet<String> = self.get_all_roles().into_iter().collect();
        let mut candidates = self.get_all_subjects();
        for user in self
            .get_model()
            .get_values_for_field_in_section(SEC_ROLE, 0)
        {
            if !candidates.contains(&user) {
                candidates.push(user);
            }
        }

        let mut users = Vec::new();
        for candidate in candidates.into_iter().filter(|c| !roles.contains(c)) {
            let request = with_subject(&candidate, permission);
            if self.enforce(request.iter().map(String::as_str))? {
                users.push(candidate);
            }
        }
        Ok(users)
    }

    // ========================================================================
    // Domains
    // ========================================================================

    pub fn get_roles_for_user_in_domain(&self, name: &str, domain: &str) -> Vec<String> {
        self.roles_of(name, Some(domain))
    }

    pub fn get_users_for_role_in_domain(&self, name: &str, domain: &str) -> Vec<String> {
        self.users_of(name, Some(domain))
    }

    /// Policy rows of `user` in `domain`
    pub fn get_permissions_for_user_in_domain(&self, user: &str, domain: &str) -> Vec<Rule> {
        self.get_filtered_policy(0, &[user, domain])
    }

    pub async fn add_role_for_user_in_domain(&mut self, user: &str, role: &str, domain: &str) -> Result<bool> {
        self.add_grouping_policy(&[user, role, domain]).await
    }

    pub async fn delete_roles_for_user_in_domain(&mut self, user: &str, role: &str, domain: &str) -> Result<bool> {
        self.remove_filtered_grouping_policy(0, &[user, role, domain])
            .await
    }

    fn roles_of(&self, name: &str, domain: Option<&str>) -> Vec<String> {
        self.get_role_manager()
            .map(|rm| rm.read().get_roles(name, domain))
            .unwrap_or_default()
    }

    fn users_of(&self, name: &str, domain: Option<&str>) -> Vec<String> {
        self.get_role_manager()
            .map(|rm| rm.read().get_users(name, domain))
            .unwrap_or_default()
    }
}

fn with_subject<S: AsRef<str>>(subject: &str, permission: &[S]) -> Vec<String> {
    std::iter::once(subject.to_string())
        .chain(permission.iter().map(|p| p.as_ref().to_string()))
        .collect()
}
