//! Product modules and the product catalog.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    db::DbPool,
    entities::product::{self, Entity as ProductEntity},
    entities::product_module::{self, Entity as ModuleEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    models::money,
};

fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    super::orders::validate_unit_price(value)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductModuleResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub position: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product_module::Model> for ProductModuleResponse {
    fn from(model: product_module::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            brand: model.brand,
            image_url: model.image_url,
            position: model.position,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub module_id: Option<Uuid>,
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub in_stock: bool,
    pub image_url: Option<String>,
    pub is_new: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            module_id: model.module_id,
            sku: model.sku,
            name: model.name,
            brand: model.brand,
            category: model.category,
            description: model.description,
            price: money(model.price),
            stock: model.stock,
            in_stock: model.stock > 0,
            image_url: model.image_url,
            is_new: model.is_new,
            active: model.active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 120, message = "Module name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateModuleRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub image_url: Option<String>,
    pub position: Option<i32>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    pub module_id: Option<Uuid>,
    #[validate(length(min = 1, max = 64, message = "SKU is required"))]
    pub sku: String,
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1))]
    pub brand: String,
    #[validate(length(min = 1))]
    pub category: String,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i32,
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_new: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub module_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub is_new: Option<bool>,
    pub active: Option<bool>,
}

/// Catalog narrowing. Every present field must match.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Case-insensitive match on name, SKU or brand
    pub search: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub module_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub is_new: Option<bool>,
}

impl ProductFilter {
    pub fn matches(&self, product: &product::Model) -> bool {
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let term = term.to_lowercase();
            let hit = [&product.name, &product.sku, &product.brand]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        if let Some(brand) = &self.brand {
            if !product.brand.eq_ignore_ascii_case(brand) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if !product.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if self.module_id.is_some() && product.module_id != self.module_id {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if self.in_stock.is_some_and(|wanted| (product.stock > 0) != wanted) {
            return false;
        }
        if self.is_new.is_some_and(|wanted| product.is_new != wanted) {
            return false;
        }
        true
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductSort {
    #[default]
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
    Newest,
    StockDesc,
}

impl ProductSort {
    /// Stable sort; ties keep their incoming order.
    pub fn apply(self, products: &mut [product::Model]) {
        match self {
            ProductSort::NameAsc => products.sort_by_key(|p| p.name.to_lowercase()),
            ProductSort::NameDesc => products.sort_by_key(|p| Reverse(p.name.to_lowercase())),
            ProductSort::PriceAsc => products.sort_by_key(|p| p.price),
            ProductSort::PriceDesc => products.sort_by_key(|p| Reverse(p.price)),
            ProductSort::Newest => products.sort_by_key(|p| Reverse(p.created_at)),
            ProductSort::StockDesc => products.sort_by_key(|p| Reverse(p.stock)),
        }
    }
}

fn page_slice<T>(items: Vec<T>, page: u64, limit: u64) -> Vec<T> {
    let limit = limit.max(1) as usize;
    let skip = (page.max(1) as usize - 1).saturating_mul(limit);
    items.into_iter().skip(skip).take(limit).collect()
}

#[derive(Clone)]
pub struct ProductModuleService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProductModuleService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_modules(
        &self,
        include_inactive: bool,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ProductModuleResponse>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = ModuleEntity::find();
        if !include_inactive {
            query = query.filter(product_module::Column::Active.eq(true));
        }
        let paginator = query
            .order_by_asc(product_module::Column::Position)
            .order_by_asc(product_module::Column::Name)
            .paginate(db, limit.max(1));
        let total = paginator.num_items().await?;
        let modules = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((modules.into_iter().map(Into::into).collect(), total))
    }

    pub async fn get_module(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<ProductModuleResponse, ServiceError> {
        let module = ModuleEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .filter(|m| include_inactive || m.active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product module {} not found", id)))?;
        Ok(module.into())
    }

    pub async fn module_products(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<ProductResponse>, ServiceError> {
        self.get_module(id, include_inactive).await?;

        let mut query = ProductEntity::find().filter(product::Column::ModuleId.eq(id));
        if !include_inactive {
            query = query.filter(product::Column::Active.eq(true));
        }
        let products = query
            .order_by_asc(product::Column::Name)
            .all(&*self.db_pool)
            .await?;
        Ok(products.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_module(
        &self,
        request: CreateModuleRequest,
    ) -> Result<ProductModuleResponse, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let module = product_module::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            description: Set(request.description),
            brand: Set(request.brand),
            image_url: Set(request.image_url),
            position: Set(request.position.unwrap_or(0)),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(module_id = %module.id, "product module created");
        if let Some(sender) = &self.event_sender {
            sender
                .send_or_log(Event::ProductModuleCreated(module.id))
                .await;
        }
        Ok(module.into())
    }

    pub async fn update_module(
        &self,
        id: Uuid,
        request: UpdateModuleRequest,
    ) -> Result<ProductModuleResponse, ServiceError> {
        request.validate()?;
        let existing = ModuleEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product module {} not found", id)))?;

        let mut active: product_module::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if request.description.is_some() {
            active.description = Set(request.description);
        }
        if request.brand.is_some() {
            active.brand = Set(request.brand);
        }
        if request.image_url.is_some() {
            active.image_url = Set(request.image_url);
        }
        if let Some(position) = request.position {
            active.position = Set(position);
        }
        if let Some(flag) = request.active {
            active.active = Set(flag);
        }

        Ok(active.update(&*self.db_pool).await?.into())
    }
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        include_inactive: bool,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ProductResponse>, u64), ServiceError> {
        let mut query = ProductEntity::find();
        if !include_inactive {
            query = query.filter(product::Column::Active.eq(true));
        }
        let mut candidates: Vec<product::Model> = query
            .all(&*self.db_pool)
            .await?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        sort.apply(&mut candidates);

        let total = candidates.len() as u64;
        let items = page_slice(candidates, page, limit)
            .into_iter()
            .map(Into::into)
            .collect();
        Ok((items, total))
    }

    pub async fn get_product(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<ProductResponse, ServiceError> {
        let product = ProductEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .filter(|p| include_inactive || p.active)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        Ok(product.into())
    }

    async fn ensure_module_exists(&self, module_id: Uuid) -> Result<(), ServiceError> {
        match ModuleEntity::find_by_id(module_id).one(&*self.db_pool).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::ValidationError(format!(
                "Product module {} does not exist",
                module_id
            ))),
        }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;

        let duplicate = ProductEntity::find()
            .filter(product::Column::Sku.eq(request.sku.as_str()))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU {} already exists",
                request.sku
            )));
        }
        if let Some(module_id) = request.module_id {
            self.ensure_module_exists(module_id).await?;
        }

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            module_id: Set(request.module_id),
            sku: Set(request.sku),
            name: Set(request.name),
            brand: Set(request.brand),
            category: Set(request.category),
            description: Set(request.description),
            price: Set(request.price),
            stock: Set(request.stock),
            image_url: Set(request.image_url),
            is_new: Set(request.is_new),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(product_id = %product.id, "product created");
        self.emit(Event::ProductCreated(product.id)).await;
        Ok(product.into())
    }

    pub async fn update_product(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request.validate()?;
        let existing = ProductEntity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        if let Some(module_id) = request.module_id {
            self.ensure_module_exists(module_id).await?;
        }

        let mut active: product::ActiveModel = existing.into();
        if request.module_id.is_some() {
            active.module_id = Set(request.module_id);
        }
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(brand) = request.brand {
            active.brand = Set(brand);
        }
        if let Some(category) = request.category {
            active.category = Set(category);
        }
        if request.description.is_some() {
            active.description = Set(request.description);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(stock) = request.stock {
            active.stock = Set(stock);
        }
        if request.image_url.is_some() {
            active.image_url = Set(request.image_url);
        }
        if let Some(is_new) = request.is_new {
            active.is_new = Set(is_new);
        }
        if let Some(flag) = request.active {
            active.active = Set(flag);
        }

        let product = active.update(&*self.db_pool).await?;
        self.emit(Event::ProductUpdated(product.id)).await;
        Ok(product.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(name: &str, sku: &str, brand: &str, price: Decimal, stock: i32) -> product::Model {
        let now = Utc::now();
        product::Model {
            id: Uuid::new_v4(),
            module_id: None,
            sku: sku.to_string(),
            name: name.to_string(),
            brand: brand.to_string(),
            category: "color".to_string(),
            description: None,
            price,
            stock,
            image_url: None,
            is_new: false,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog() -> Vec<product::Model> {
        vec![
            product("Permanent Color 7.1", "HX-PC-71", "Hairmax", dec!(12.50), 40),
            product("Bond Mask", "HX-BM-01", "Bondplex", dec!(20.00), 0),
            product("developer 20 vol", "HX-DV-20", "Hairmax", dec!(8.25), 12),
        ]
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let filter = ProductFilter {
            search: Some("hairmax".into()),
            ..Default::default()
        };
        assert_eq!(catalog().iter().filter(|p| filter.matches(p)).count(), 2);

        let by_sku = ProductFilter {
            search: Some("bm-01".into()),
            ..Default::default()
        };
        assert_eq!(catalog().iter().filter(|p| by_sku.matches(p)).count(), 1);
    }

    #[test]
    fn price_and_stock_filters_combine() {
        let filter = ProductFilter {
            min_price: Some(dec!(10)),
            in_stock: Some(true),
            ..Default::default()
        };
        let hits: Vec<_> = catalog().into_iter().filter(|p| filter.matches(p)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sku, "HX-PC-71");

        let out_of_stock = ProductFilter {
            in_stock: Some(false),
            ..Default::default()
        };
        assert_eq!(catalog().iter().filter(|p| out_of_stock.matches(p)).count(), 1);
    }

    #[test]
    fn sorting() {
        let mut items = catalog();
        ProductSort::NameAsc.apply(&mut items);
        let names: Vec<_> = items.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(names, vec!["HX-BM-01", "HX-DV-20", "HX-PC-71"]);

        ProductSort::PriceDesc.apply(&mut items);
        assert_eq!(items[0].price, dec!(20.00));

        ProductSort::StockDesc.apply(&mut items);
        assert_eq!(items[0].stock, 40);
    }

    #[test]
    fn sort_names_parse() {
        assert_eq!("price_asc".parse::<ProductSort>().unwrap(), ProductSort::PriceAsc);
        assert_eq!(ProductSort::default(), ProductSort::NameAsc);
    }

    #[test]
    fn paging_in_memory() {
        let items: Vec<u32> = (1..=7).collect();
        assert_eq!(page_slice(items.clone(), 1, 3), vec![1, 2, 3]);
        assert_eq!(page_slice(items.clone(), 3, 3), vec![7]);
        assert!(page_slice(items, 4, 3).is_empty());
    }
}
