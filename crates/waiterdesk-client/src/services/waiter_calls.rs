//! Waiter calls.
//!
//! Returns wire records; normalization into the call list's shape happens in
//! the synchronization layer.

use serde_json::json;

use waiterdesk_core::prelude::*;
use waiterdesk_core::{require_id, CallStatus, NewWaiterCall, WaiterCallRecord};

use crate::http::{path_segment, ApiClient, HttpBackend, ReqwestBackend};

/// The waiter-call operations the call list depends on.
#[trait_variant::make(WaiterCallApi: Send)]
pub trait LocalWaiterCallApi {
    /// Every call currently known for a restaurant.
    async fn list(&self, restaurant_id: &str) -> Result<Vec<WaiterCallRecord>>;

    /// Ask the server to move a call to `status`.
    async fn update_status(&self, call_id: &str, status: CallStatus) -> Result<WaiterCallRecord>;
}

pub struct WaiterCallService<B = ReqwestBackend> {
    api: ApiClient<B>,
}

impl<B> Clone for WaiterCallService<B> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
        }
    }
}

impl<B: HttpBackend + Sync> WaiterCallService<B> {
    pub fn new(api: ApiClient<B>) -> Self {
        Self { api }
    }

    pub async fn list(&self, restaurant_id: &str) -> Result<Vec<WaiterCallRecord>> {
        require_id("restaurantId", restaurant_id)?;
        self.api
            .get(&format!(
                "waiter-calls/restaurant/{}",
                path_segment(restaurant_id)
            ))
            .await
            .with_context(|| format!("Failed to list waiter calls for restaurant {restaurant_id}"))
    }

    pub async fn get(&self, call_id: &str) -> Result<WaiterCallRecord> {
        require_id("callId", call_id)?;
        self.api
            .get(&call_path(call_id))
            .await
            .with_context(|| format!("Failed to load waiter call {call_id}"))
    }

    /// Summon staff to a table.
    pub async fn create(&self, call: &NewWaiterCall) -> Result<WaiterCallRecord> {
        call.validate()?;
        self.api
            .post("waiter-calls", call)
            .await
            .with_context(|| format!("Failed to create waiter call for table {}", call.table_id))
    }

    pub async fn update_status(
        &self,
        call_id: &str,
        status: CallStatus,
    ) -> Result<WaiterCallRecord> {
        require_id("callId", call_id)?;
        self.api
            .patch(
                &format!("{}/status", call_path(call_id)),
                &json!({ "status": status }),
            )
            .await
            .with_context(|| format!("Failed to set waiter call {call_id} to {status}"))
    }

    pub async fn acknowledge(&self, call_id: &str) -> Result<WaiterCallRecord> {
        self.update_status(call_id, CallStatus::Acknowledged).await
    }

    pub async fn resolve(&self, call_id: &str) -> Result<WaiterCallRecord> {
        self.update_status(call_id, CallStatus::Resolved).await
    }
}

impl<B: HttpBackend + Sync> WaiterCallApi for WaiterCallService<B> {
    async fn list(&self, restaurant_id: &str) -> Result<Vec<WaiterCallRecord>> {
        WaiterCallService::list(self, restaurant_id).await
    }

    async fn update_status(&self, call_id: &str, status: CallStatus) -> Result<WaiterCallRecord> {
        WaiterCallService::update_status(self, call_id, status).await
    }
}

fn call_path(call_id: &str) -> String {
    format!("waiter-calls/{}", path_segment(call_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::session::SessionStore;
    use crate::test_utils::{call_json, fake_client};

    #[tokio::test]
    async fn test_list_returns_wire_records() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        backend.push_json(
            200,
            json!({"success": true, "data": [call_json("c1", "pending"), call_json("c2", "resolved")]}),
        );

        let records = WaiterCallService::new(api).list("r1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, Some(CallStatus::Resolved));
        assert_eq!(
            backend.last_request().unwrap().url.path(),
            "/api/waiter-calls/restaurant/r1"
        );
    }

    #[tokio::test]
    async fn test_list_schema_mismatch() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        backend.push_json(200, json!({"data": [{"status": "pending"}]}));

        let err = WaiterCallService::new(api).list("r1").await.unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[tokio::test]
    async fn test_acknowledge_patches_status() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        backend.push_json(200, call_json("c1", "acknowledged"));

        let record = WaiterCallService::new(api).acknowledge("c1").await.unwrap();
        assert_eq!(record.status, Some(CallStatus::Acknowledged));

        let request = backend.last_request().unwrap();
        assert_eq!(request.method, Method::Patch);
        assert_eq!(request.url.path(), "/api/waiter-calls/c1/status");
        assert_eq!(request.body, Some(json!({"status": "acknowledged"})));
    }

    #[tokio::test]
    async fn test_resolve_patches_status() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        backend.push_json(200, call_json("c1", "resolved"));

        WaiterCallService::new(api).resolve("c1").await.unwrap();
        assert_eq!(
            backend.last_request().unwrap().body,
            Some(json!({"status": "resolved"}))
        );
    }

    #[tokio::test]
    async fn test_create_validates_before_sending() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        let call = NewWaiterCall {
            restaurant_id: "r1".into(),
            table_id: String::new(),
            customer_name: "Bob".into(),
            message: String::new(),
        };
        let err = WaiterCallService::new(api).create(&call).await.unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "tableId"));
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_create_posts_call() {
        let (api, backend) = fake_client(SessionStore::in_memory());
        backend.push_json(201, json!({"data": {"callId": "c7", "customerName": "Bob"}}));
        let call = NewWaiterCall {
            restaurant_id: "r1".into(),
            table_id: "t3".into(),
            customer_name: "Bob".into(),
            message: "Check please".into(),
        };

        let record = WaiterCallService::new(api).create(&call).await.unwrap();
        assert_eq!(record.call_id, "c7");
        assert_eq!(
            backend.last_request().unwrap().body,
            Some(json!({
                "restaurantId": "r1",
                "tableId": "t3",
                "customerName": "Bob",
                "message": "Check please"
            }))
        );
    }

    #[tokio::test]
    async fn test_trait_delegates_to_service() {
        async fn list_via_trait<S: WaiterCallApi>(api: &S) -> Result<Vec<WaiterCallRecord>> {
            WaiterCallApi::list(api, "r1").await
        }

        let (api, backend) = fake_client(SessionStore::in_memory());
        backend.push_json(200, json!([call_json("c1", "pending")]));
        let service = WaiterCallService::new(api);
        assert_eq!(list_via_trait(&service).await.unwrap().len(), 1);
    }
}
