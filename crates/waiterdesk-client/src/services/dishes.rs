//! Menu dishes.

use serde_json::json;

use waiterdesk_core::prelude::*;
use waiterdesk_core::{require_id, Dish, DishUpdate, NewDish};

use crate::http::{path_segment, ApiClient, HttpBackend, ReqwestBackend};

pub struct DishService<B = ReqwestBackend> {
    api: ApiClient<B>,
}

impl<B: HttpBackend + Sync> DishService<B> {
    pub fn new(api: ApiClient<B>) -> Self {
        Self { api }
    }

    pub async fn list(&self, restaurant_id: &str) -> Result<Vec<Dish>> {
        require_id("restaurantId", restaurant_id)?;
        self.api
            .get(&format!("restaurants/{}/dishes", path_segment(restaurant_id)))
            .await
            .with_context(|| format!("Failed to list dishes for restaurant {restaurant_id}"))
    }

    pub async fn get(&self, dish_id: &str) -> Result<Dish> {
        require_id("dishId", dish_id)?;
        self.api
            .get(&dish_path(dish_id))
            .await
            .with_context(|| format!("Failed to load dish {dish_id}"))
    }

    pub async fn create(&self, restaurant_id: &str, dish: &NewDish) -> Result<Dish> {
        require_id("restaurantId", restaurant_id)?;
        dish.validate()?;
        self.api
            .post(
                &format!("restaurants/{}/dishes", path_segment(restaurant_id)),
                dish,
            )
            .await
            .with_context(|| format!("Failed to create dish '{}'", dish.name))
    }

    pub async fn update(&self, dish_id: &str, changes: &DishUpdate) -> Result<Dish> {
        require_id("dishId", dish_id)?;
        changes.validate()?;
        self.api
            .put(&dish_path(dish_id), changes)
            .await
            .with_context(|| format!("Failed to update dish {dish_id}"))
    }

    pub async fn delete(&self, dish_id: &str) -> Result<()> {
        require_id("dishId", dish_id)?;
        self.api
            .delete(&dish_path(dish_id))
            .await
            .with_context(|| format!("Failed to delete dish {dish_id}"))
    }

    /// Mark a dish as orderable or sold out.
    pub async fn set_availability(&self, dish_id: &str, available: bool) -> Result<Dish> {
        require_id("dishId", dish_id)?;
        self.api
            .patch(
                &format!("{}/availability", dish_path(dish_id)),
                &json!({ "available": available }),
            )
            .await
            .with_context(|| format!("Failed to set availability of dish {dish_id}"))
    }
}

fn dish_path(dish_id: &str) -> String {
    format!("dishes/{}", path_segment(dish_id))
}
