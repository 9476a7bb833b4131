use parking_lot::RwLock;

use crate::{
    config::Config,
    errors::Result,
    models::{AccountRole, RoleChangeRequest, RoleChangeResponse, UserId, UserRecord},
    services::{feedback::ViewFeedback, gateway::ResourceGateway},
};

/// Admins first, then by username ignoring case; the raw username breaks ties
/// so the order is total.
pub fn sort_directory(users: &mut [UserRecord]) {
    users.sort_by_cached_key(|user| {
        (
            user.role != AccountRole::Admin,
            user.username.to_lowercase(),
            user.username.clone(),
        )
    });
}

pub struct UserDirectoryController {
    gateway: ResourceGateway,
    users: RwLock<Vec<UserRecord>>,
    feedback: ViewFeedback,
}

impl UserDirectoryController {
    pub fn new(gateway: ResourceGateway, config: &Config) -> Self {
        Self {
            gateway,
            users: RwLock::new(Vec::new()),
            feedback: ViewFeedback::new(config.error_display_window()),
        }
    }

    pub fn users(&self) -> Vec<UserRecord> {
        self.users.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.feedback.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.feedback.error()
    }

    pub fn mount(&self) {
        self.feedback.mount();
    }

    pub fn unmount(&self) {
        self.feedback.unmount();
    }

    pub async fn load(&self) -> Result<()> {
        let ticket = self.feedback.begin();
        let outcome = self.gateway.get_json::<Vec<UserRecord>>("/users").await;

        if ticket.is_live() {
            if let Ok(users) = outcome.as_ref() {
                let mut users = users.clone();
                sort_directory(&mut users);
                tracing::debug!(count = users.len(), "Directory loaded");
                *self.users.write() = users;
                self.feedback.clear_error();
            }
        }

        ticket.settle(outcome.map(drop))
    }

    pub async fn remove(&self, user_id: UserId) -> Result<()> {
        let ticket = self.feedback.begin();
        let outcome = self.gateway.delete(&format!("/users/{}", user_id)).await;

        if ticket.is_live() && outcome.is_ok() {
            self.users.write().retain(|u| u.id != user_id);
            tracing::info!(user_id, "Account removed");
        }

        ticket.settle(outcome)
    }

    /// Applies the confirmed role, then reloads so ordering and usage come
    /// from the server rather than local extrapolation.
    pub async fn change_role(&self, user_id: UserId, new_role: AccountRole) -> Result<()> {
        let ticket = self.feedback.begin();
        let outcome = self
            .gateway
            .patch_json::<_, RoleChangeResponse>(
                &format!("/users/{}", user_id),
                &RoleChangeRequest { role: new_role },
            )
            .await;

        let outcome = match outcome {
            Ok(response) => {
                if ticket.is_live() {
                    if let Some(user) = self.users.write().iter_mut().find(|u| u.id == user_id) {
                        user.role = response.role;
                    }
                    tracing::info!(user_id, role = %response.role, "Role changed");
                }
                self.load().await
            }
            Err(e) => Err(e),
        };

        ticket.settle(outcome)
    }
}
