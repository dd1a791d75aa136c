use common::{CategoryList, CategoryRequest, CategoryResponse};
use gallery_core::CategoryOutcome;
use tracing::{debug, info};

use crate::{GalleryClient, GalleryError, Result};

impl GalleryClient {
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let list: CategoryList = self
            .execute_json(self.http.get(self.url("/api/categories")), "load categories")
            .await?;
        Ok(list.categories)
    }

    /// Ensures the category exists. Adding an existing one reports `Exists`.
    pub async fn add_category(&self, name: &str) -> Result<CategoryOutcome> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GalleryError::Validation(
                "Please enter a category name".to_string(),
            ));
        }

        let response: CategoryResponse = self
            .execute_json(
                self.http
                    .post(self.url("/api/categories"))
                    .json(&CategoryRequest {
                        name: name.to_string(),
                    }),
                "add category",
            )
            .await?;

        let category = response
            .category
            .filter(|category| !category.trim().is_empty())
            .unwrap_or_else(|| name.to_string());
        match response.status.as_str() {
            "exists" => {
                debug!(category = %category, "category already exists");
                Ok(CategoryOutcome::Exists(category))
            }
            "success" => {
                info!(category = %category, "added category");
                Ok(CategoryOutcome::Created(category))
            }
            _ => Err(GalleryError::Rejected {
                action: "add category",
                status: response.status,
                message: Some("Unexpected response from server".to_string()),
            }),
        }
    }
}
