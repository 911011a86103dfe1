//! Dependency wiring
//!
//! [`AppContext`] builds every backend-facing object once from [`Settings`]
//! and hands out shared references. There is no process-wide state: a
//! consumer that needs the realtime channel or a service gets it from here.

use std::sync::Arc;

use waiterdesk_client::{
    ApiClient, AuthService, DishService, FileKeyValueStore, HttpBackend, RealtimeChannel,
    ReqwestBackend, RestaurantService, SessionStore, TableService, UserService,
    WaiterCallService,
};
use waiterdesk_core::prelude::*;

use crate::call_sync::CallSync;
use crate::config::Settings;

pub struct AppContext<B = ReqwestBackend> {
    pub settings: Settings,
    pub api: ApiClient<B>,
    pub realtime: RealtimeChannel,
    pub auth: AuthService<B>,
    pub restaurants: RestaurantService<B>,
    pub dishes: DishService<B>,
    pub tables: TableService<B>,
    pub users: UserService<B>,
    pub waiter_calls: WaiterCallService<B>,
}

impl AppContext<ReqwestBackend> {
    /// Production wiring: `reqwest` transport and the file-backed session.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let session_path = settings
            .session
            .path
            .clone()
            .unwrap_or_else(FileKeyValueStore::default_path);
        debug!("Session file: {:?}", session_path);
        let session = SessionStore::new(Arc::new(FileKeyValueStore::new(session_path)));
        let backend = ReqwestBackend::new(settings.http_timeout())?;
        Self::with_backend(settings, backend, session)
    }
}

impl<B: HttpBackend + Sync> AppContext<B> {
    pub fn with_backend(settings: Settings, backend: B, session: SessionStore) -> Result<Self> {
        settings.validate()?;
        let realtime = RealtimeChannel::new(settings.realtime_config()?);
        realtime.use_session_token(session.clone());
        let api = ApiClient::new(backend, settings.api_url()?, session);

        Ok(Self {
            auth: AuthService::new(api.clone()),
            restaurants: RestaurantService::new(api.clone()),
            dishes: DishService::new(api.clone()),
            tables: TableService::new(api.clone()),
            users: UserService::new(api.clone()),
            waiter_calls: WaiterCallService::new(api.clone()),
            settings,
            api,
            realtime,
        })
    }

    pub fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// A call list for `restaurant_id` backed by this context's services.
    pub fn call_sync(&self, restaurant_id: impl Into<String>) -> CallSync<WaiterCallService<B>> {
        CallSync::new(restaurant_id, self.waiter_calls.clone())
    }

    /// Restaurant of the stored session's user, if any.
    pub fn session_restaurant(&self) -> Result<Option<String>> {
        Ok(self
            .session()
            .load()?
            .and_then(|session| session.user.restaurant_id))
    }
}
