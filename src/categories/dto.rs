use serde::{Deserialize, Serialize};

use super::repo_types::Category;

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub is_default: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub message: String,
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub message: String,
    pub category: Category,
}
