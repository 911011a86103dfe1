//! Restaurant staff accounts.

use waiterdesk_core::prelude::*;
use waiterdesk_core::{require_id, NewUser, User, UserUpdate};

use crate::http::{path_segment, ApiClient, HttpBackend, ReqwestBackend};

pub struct UserService<B = ReqwestBackend> {
    api: ApiClient<B>,
}

impl<B: HttpBackend + Sync> UserService<B> {
    pub fn new(api: ApiClient<B>) -> Self {
        Self { api }
    }

    pub async fn list(&self, restaurant_id: &str) -> Result<Vec<User>> {
        require_id("restaurantId", restaurant_id)?;
        self.api
            .get(&format!("restaurants/{}/users", path_segment(restaurant_id)))
            .await
            .with_context(|| format!("Failed to list users for restaurant {restaurant_id}"))
    }

    pub async fn create(&self, restaurant_id: &str, user: &NewUser) -> Result<User> {
        require_id("restaurantId", restaurant_id)?;
        user.validate()?;
        self.api
            .post(
                &format!("restaurants/{}/users", path_segment(restaurant_id)),
                user,
            )
            .await
            .with_context(|| format!("Failed to create user {}", user.email))
    }

    pub async fn update(&self, user_id: &str, changes: &UserUpdate) -> Result<User> {
        require_id("userId", user_id)?;
        changes.validate()?;
        self.api
            .put(&format!("users/{}", path_segment(user_id)), changes)
            .await
            .with_context(|| format!("Failed to update user {user_id}"))
    }

    pub async fn delete(&self, user_id: &str) -> Result<()> {
        require_id("userId", user_id)?;
        self.api
            .delete(&format!("users/{}", path_segment(user_id)))
            .await
            .with_context(|| format!("Failed to delete user {user_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use crate::test_utils::fake_client;
    use serde_json::json;
    use waiterdesk_core::UserRole;

    #[tokio::test]
    async fn test_list_users() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        backend.push_json(
            200,
            json!({"success": true, "data": [
                {"_id": "u1", "name": "Ana", "email": "ana@example.com", "role": "admin"},
                {"_id": "u2", "name": "Luis", "email": "luis@example.com"}
            ]}),
        );

        let users = UserService::new(api).list("r1").await.unwrap();
        assert_eq!(users[0].role, UserRole::Admin);
        assert_eq!(users[1].role, UserRole::Waiter);
        assert_eq!(
            backend.last_request().unwrap().url.path(),
            "/api/restaurants/r1/users"
        );
    }

    #[tokio::test]
    async fn test_create_rejects_short_password() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        let user = NewUser {
            name: "Luis".into(),
            email: "luis@example.com".into(),
            password: "123".into(),
            role: UserRole::Waiter,
        };
        let err = UserService::new(api).create("r1", &user).await.unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "password"));
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_create_posts_user() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        backend.push_json(
            201,
            json!({"data": {"_id": "u3", "name": "Luis", "email": "luis@example.com", "role": "kitchen"}}),
        );
        let user = NewUser {
            name: "Luis".into(),
            email: "luis@example.com".into(),
            password: "secret1".into(),
            role: UserRole::Kitchen,
        };

        let created = UserService::new(api).create("r1", &user).await.unwrap();
        assert_eq!(created.id, "u3");
        let body = backend.last_request().unwrap().body.unwrap();
        assert_eq!(body["role"], "kitchen");
    }

    #[tokio::test]
    async fn test_delete_requires_id() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        let err = UserService::new(api).delete("").await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(backend.request_count(), 0);
    }
}
