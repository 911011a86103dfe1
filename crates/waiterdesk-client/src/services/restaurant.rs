use waiterdesk_core::prelude::*;
use waiterdesk_core::{require_id, Restaurant, RestaurantUpdate};

use crate::http::{path_segment, ApiClient, HttpBackend, ReqwestBackend};

pub struct RestaurantService<B = ReqwestBackend> {
    api: ApiClient<B>,
}

impl<B: HttpBackend + Sync> RestaurantService<B> {
    pub fn new(api: ApiClient<B>) -> Self {
        Self { api }
    }

    pub async fn get(&self, restaurant_id: &str) -> Result<Restaurant> {
        require_id("restaurantId", restaurant_id)?;
        self.api
            .get(&format!("restaurants/{}", path_segment(restaurant_id)))
            .await
            .with_context(|| format!("Failed to load restaurant {restaurant_id}"))
    }

    pub async fn update(&self, restaurant_id: &str, changes: &RestaurantUpdate) -> Result<Restaurant> {
        require_id("restaurantId", restaurant_id)?;
        changes.validate()?;
        self.api
            .put(&format!("restaurants/{}", path_segment(restaurant_id)), changes)
            .await
            .with_context(|| format!("Failed to update restaurant {restaurant_id}"))
    }
}
