use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::order::{self, ActiveModel as OrderActiveModel, Entity as OrderEntity},
    entities::order_item::{self, Entity as OrderItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        money, order::MAX_UNIT_PRICE, Order, OrderAuthor, OrderLine, OrderScope, OrderStatus,
        PaymentProof, TrackingInfo, TrackingStatus,
    },
    services::order_status::{get_orders_needing_attention, OrderStatusService},
};

pub(crate) fn validate_unit_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("negative_amount"));
    }
    if *value > MAX_UNIT_PRICE {
        return Err(ValidationError::new("amount_too_large"));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("too_many_decimals"));
    }
    Ok(())
}

/// One line of an order as submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineInput {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    #[validate(range(min = 1, max = 1000000, message = "Quantity must be between 1 and 1000000"))]
    pub quantity: u32,
    #[validate(custom = "validate_unit_price")]
    pub price: Decimal,
}

impl From<OrderLineInput> for OrderLine {
    fn from(input: OrderLineInput) -> Self {
        OrderLine {
            product_id: input.product_id,
            name: input.name,
            quantity: input.quantity,
            price: money(input.price),
        }
    }
}

fn order_total(items: &[OrderLine]) -> Result<Decimal, ServiceError> {
    Order::checked_total(items).ok_or_else(|| {
        ServiceError::ValidationError("Order total exceeds the supported amount".to_string())
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// Customer display name. Defaults to the caller's name for client orders.
    pub customer: Option<String>,
    pub customer_id: Option<Uuid>,
    /// Vendor in charge of the order. Ignored when the caller is a sales vendor.
    pub vendor_id: Option<Uuid>,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<OrderLineInput>,
    pub sales_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReviseOrderRequest {
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Option<Vec<OrderLineInput>>,
    pub sales_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AttachInvoiceRequest {
    #[validate(length(min = 1, message = "Invoice URL is required"))]
    pub invoice_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShipOrderRequest {
    #[validate(length(min = 1, message = "Carrier is required"))]
    pub company: String,
    #[validate(length(min = 1, message = "Tracking number is required"))]
    pub tracking_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingUpdateRequest {
    pub status: TrackingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PaymentProofRequest {
    #[validate(length(min = 1, message = "File name is required"))]
    pub file_name: String,
    #[validate(length(min = 1, message = "File URL is required"))]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentVerificationRequest {
    pub verified: bool,
}

/// Narrowing applied on top of the caller's scope.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    /// Substring of the customer name
    pub search: Option<String>,
}

/// Orders persistence and workflow. Status changes go through
/// [`OrderStatusService`]; this type only loads, guards and stores.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    transitions: OrderStatusService,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self::with_transitions(db_pool, event_sender, OrderStatusService::default())
    }

    pub fn with_transitions(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        transitions: OrderStatusService,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            transitions,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        scope: OrderScope,
        filter: &OrderFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<Order>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = scoped(OrderEntity::find(), scope);

        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }
        if let Some(vendor_id) = filter.vendor_id {
            query = query.filter(order::Column::VendorId.eq(vendor_id));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(order::Column::Customer.contains(search));
        }

        let paginator = query
            .order_by_desc(order::Column::OrderDate)
            .paginate(db, limit.max(1));
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.saturating_sub(1)).await?;

        let orders = load_with_items(db, models).await?;
        Ok((orders, total))
    }

    /// Every order the scope can see, newest first.
    pub async fn visible_orders(&self, scope: OrderScope) -> Result<Vec<Order>, ServiceError> {
        let db = &*self.db_pool;
        let models = scoped(OrderEntity::find(), scope)
            .order_by_desc(order::Column::OrderDate)
            .all(db)
            .await?;
        load_with_items(db, models).await
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, scope: OrderScope, id: Uuid) -> Result<Order, ServiceError> {
        let db = &*self.db_pool;
        let model = OrderEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;

        let mut orders = load_with_items(db, vec![model]).await?;
        match orders.pop() {
            Some(order) if scope.permits(&order) => Ok(order),
            _ => Err(ServiceError::NotFound(format!("Order {} not found", id))),
        }
    }

    pub async fn get_order_items(
        &self,
        scope: OrderScope,
        id: Uuid,
    ) -> Result<Vec<OrderLine>, ServiceError> {
        Ok(self.get_order(scope, id).await?.items)
    }

    #[instrument(skip(self, user, request), fields(user_id = %user.user_id, role = %user.role))]
    pub async fn create_order(
        &self,
        user: &AuthUser,
        request: CreateOrderRequest,
    ) -> Result<Order, ServiceError> {
        request.validate()?;
        for item in &request.items {
            item.validate()?;
        }

        let author = user.role.order_author();
        let customer = match author {
            OrderAuthor::Client => request.customer.unwrap_or_else(|| user.name.clone()),
            OrderAuthor::Sales => request
                .customer
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| {
                    ServiceError::ValidationError("Customer name is required".to_string())
                })?,
        };

        let lines: Vec<OrderLine> = request.items.into_iter().map(OrderLine::from).collect();
        order_total(&lines)?;
        let mut order = Order::new(customer, author, lines);
        order.sales_notes = request.sales_notes;
        match user.role.order_scope(user.user_id) {
            OrderScope::Customer(id) => {
                order.customer_id = Some(id);
                order.vendor_id = request.vendor_id;
            }
            OrderScope::Vendor(id) => {
                order.customer_id = request.customer_id;
                order.vendor_id = Some(id);
            }
            OrderScope::All => {
                order.customer_id = request.customer_id;
                order.vendor_id = request.vendor_id;
            }
        }

        self.insert_order(&order).await?;
        info!(order_id = %order.id, status = %order.status, total = %order.total, "order created");
        self.emit(Event::OrderCreated(order.id)).await;
        Ok(order)
    }

    /// Replaces lines and/or notes while the order is still negotiable. A
    /// revision by sales hands the order back to the client for approval.
    #[instrument(skip(self, user, request), fields(user_id = %user.user_id))]
    pub async fn revise_order(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: ReviseOrderRequest,
    ) -> Result<Order, ServiceError> {
        request.validate()?;
        let current = self.get_order(user.role.order_scope(user.user_id), id).await?;
        ensure_editable(&current)?;

        let mut revised = current.clone();
        let items_changed = request.items.is_some();
        if let Some(items) = request.items {
            for item in &items {
                item.validate()?;
            }
            revised.items = items.into_iter().map(OrderLine::from).collect();
            revised.total = order_total(&revised.items)?;
        }
        if request.sales_notes.is_some() {
            revised.sales_notes = request.sales_notes;
        }

        let author = user.role.order_author();
        revised.modified_by = Some(author);
        revised.modified_date = Some(Utc::now());
        if author == OrderAuthor::Sales {
            revised = self
                .transitions
                .update_order_status(&revised, OrderStatus::PendingApproval);
        }

        self.save_order(&revised, items_changed).await?;
        self.emit(Event::OrderRevised(id)).await;
        self.emit_transition(&current, &revised).await;
        Ok(revised)
    }

    pub async fn add_order_item(
        &self,
        user: &AuthUser,
        id: Uuid,
        line: OrderLineInput,
    ) -> Result<Order, ServiceError> {
        line.validate()?;
        let current = self.get_order(user.role.order_scope(user.user_id), id).await?;
        ensure_editable(&current)?;

        let mut updated = current;
        updated.items.push(line.into());
        updated.total = order_total(&updated.items)?;
        updated.modified_by = Some(user.role.order_author());
        updated.modified_date = Some(Utc::now());

        self.save_order(&updated, true).await?;
        self.emit(Event::OrderRevised(id)).await;
        Ok(updated)
    }

    /// Places a fresh order with the same lines as `id`.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn reorder(&self, user: &AuthUser, id: Uuid) -> Result<Order, ServiceError> {
        let source = self.get_order(user.role.order_scope(user.user_id), id).await?;
        if source.items.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} has no items to reorder",
                id
            )));
        }

        let mut order = Order::new(source.customer.clone(), user.role.order_author(), source.items);
        order.customer_id = source.customer_id;
        order.vendor_id = source.vendor_id;
        order.original_order_id = Some(id);

        self.insert_order(&order).await?;
        info!(order_id = %order.id, original_order_id = %id, "order placed again");
        self.emit(Event::OrderCreated(order.id)).await;
        Ok(order)
    }

    /// Direct status change requested by a user.
    #[instrument(skip(self, user), fields(user_id = %user.user_id, role = %user.role))]
    pub async fn set_status(
        &self,
        user: &AuthUser,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, ServiceError> {
        if status == OrderStatus::Completed {
            return Err(ServiceError::InvalidStatus(
                "completed is reached automatically once an order is delivered and paid"
                    .to_string(),
            ));
        }
        if !user.role.can_set_status(status) {
            return Err(ServiceError::Forbidden(format!(
                "role {} cannot set status {}",
                user.role, status
            )));
        }

        let role = user.role;
        self.transition(user, id, |svc, order| {
            if !role.can_transition(order.status, status) {
                return Err(ServiceError::InvalidOperation(format!(
                    "role {} cannot move order {} from {} to {}",
                    role, order.id, order.status, status
                )));
            }
            Ok(svc.update_order_status(order, status))
        })
        .await
    }

    pub async fn attach_invoice(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: AttachInvoiceRequest,
    ) -> Result<Order, ServiceError> {
        request.validate()?;
        self.transition(user, id, move |svc, order| {
            let mut invoiced = svc.update_order_status(order, OrderStatus::Invoiced);
            invoiced.invoice_url = Some(request.invoice_url);
            Ok(invoiced)
        })
        .await
    }

    pub async fn ship(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: ShipOrderRequest,
    ) -> Result<Order, ServiceError> {
        request.validate()?;
        self.transition(user, id, move |svc, order| {
            let mut shipped = svc.update_order_status(order, OrderStatus::Shipped);
            shipped.tracking_info = Some(TrackingInfo {
                company: request.company,
                tracking_number: request.tracking_number,
            });
            Ok(shipped)
        })
        .await
    }

    pub async fn tracking_update(
        &self,
        user: &AuthUser,
        id: Uuid,
        tracking: TrackingStatus,
    ) -> Result<Order, ServiceError> {
        self.transition(user, id, |svc, order| {
            Ok(svc.process_tracking_update(order, tracking))
        })
        .await
    }

    pub async fn upload_payment_proof(
        &self,
        user: &AuthUser,
        id: Uuid,
        request: PaymentProofRequest,
    ) -> Result<Order, ServiceError> {
        request.validate()?;
        let proof = PaymentProof {
            file_name: request.file_name,
            upload_date: Utc::now(),
            url: request.url,
        };
        let updated = self
            .transition(user, id, move |svc, order| {
                Ok(svc.process_payment_proof_upload(order, proof))
            })
            .await?;
        self.emit(Event::PaymentProofUploaded(id)).await;
        Ok(updated)
    }

    pub async fn verify_payment(
        &self,
        user: &AuthUser,
        id: Uuid,
        verified: bool,
    ) -> Result<Order, ServiceError> {
        self.transition(user, id, |svc, order| {
            Ok(svc.process_payment_verification(order, verified))
        })
        .await
    }

    pub async fn orders_needing_attention(
        &self,
        scope: OrderScope,
    ) -> Result<Vec<Order>, ServiceError> {
        let orders = self.visible_orders(scope).await?;
        Ok(get_orders_needing_attention(&orders))
    }

    /// Loads, applies `step` and persists the result when it differs.
    /// Finished orders are frozen.
    async fn transition<F>(&self, user: &AuthUser, id: Uuid, step: F) -> Result<Order, ServiceError>
    where
        F: FnOnce(&OrderStatusService, &Order) -> Result<Order, ServiceError>,
    {
        let current = self.get_order(user.role.order_scope(user.user_id), id).await?;
        if current.status.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is {} and can no longer change",
                id, current.status
            )));
        }

        let updated = step(&self.transitions, &current)?;
        if updated == current {
            return Ok(current);
        }

        self.save_order(&updated, false).await?;
        self.emit_transition(&current, &updated).await;
        Ok(updated)
    }

    async fn emit_transition(&self, before: &Order, after: &Order) {
        if before.status == after.status {
            return;
        }
        info!(
            order_id = %after.id,
            old_status = %before.status,
            new_status = %after.status,
            "order status changed"
        );
        self.emit(Event::OrderStatusChanged {
            order_id: after.id,
            old_status: before.status,
            new_status: after.status,
        })
        .await;
        if after.status == OrderStatus::Completed {
            self.emit(Event::OrderCompleted(after.id)).await;
        }
    }

    async fn insert_order(&self, order: &Order) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;

        let mut active = to_active_model(order);
        active.created_at = Set(Utc::now());
        active.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order.id, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;
        insert_items(&txn, order).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn save_order(&self, order: &Order, replace_items: bool) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;

        to_active_model(order).update(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %order.id, "Failed to update order");
            ServiceError::DatabaseError(e)
        })?;
        if replace_items {
            OrderItemEntity::delete_many()
                .filter(order_item::Column::OrderId.eq(order.id))
                .exec(&txn)
                .await?;
            insert_items(&txn, order).await?;
        }

        txn.commit().await?;
        Ok(())
    }
}

fn ensure_editable(order: &Order) -> Result<(), ServiceError> {
    if order.status.is_editable() {
        Ok(())
    } else {
        Err(ServiceError::InvalidOperation(format!(
            "Order {} is {} and can no longer be edited",
            order.id, order.status
        )))
    }
}

fn scoped(query: Select<OrderEntity>, scope: OrderScope) -> Select<OrderEntity> {
    match scope {
        OrderScope::All => query,
        OrderScope::Vendor(id) => query.filter(order::Column::VendorId.eq(id)),
        OrderScope::Customer(id) => query.filter(order::Column::CustomerId.eq(id)),
    }
}

async fn insert_items<C: ConnectionTrait>(conn: &C, order: &Order) -> Result<(), ServiceError> {
    if order.items.is_empty() {
        return Ok(());
    }
    let rows = order
        .items
        .iter()
        .enumerate()
        .map(|(position, line)| {
            let position = i32::try_from(position).map_err(|_| {
                ServiceError::ValidationError("Order has too many items".to_string())
            })?;
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                ServiceError::ValidationError(format!(
                    "Quantity {} of '{}' is out of range",
                    line.quantity, line.name
                ))
            })?;
            Ok(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                position: Set(position),
                product_id: Set(line.product_id),
                name: Set(line.name.clone()),
                quantity: Set(quantity),
                price: Set(line.price),
            })
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;
    OrderItemEntity::insert_many(rows).exec(conn).await?;
    Ok(())
}

async fn load_with_items<C: ConnectionTrait>(
    conn: &C,
    models: Vec<order::Model>,
) -> Result<Vec<Order>, ServiceError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for item in OrderItemEntity::find()
        .filter(order_item::Column::OrderId.is_in(ids))
        .order_by_asc(order_item::Column::Position)
        .all(conn)
        .await?
    {
        let quantity = u32::try_from(item.quantity).map_err(|_| {
            ServiceError::InternalError(format!(
                "unexpected quantity {} on order item {}",
                item.quantity, item.id
            ))
        })?;
        lines.entry(item.order_id).or_default().push(OrderLine {
            product_id: item.product_id,
            name: item.name,
            quantity,
            price: money(item.price),
        });
    }

    models
        .into_iter()
        .map(|model| {
            let items = lines.remove(&model.id).unwrap_or_default();
            to_domain(model, items)
        })
        .collect()
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> Result<T, ServiceError> {
    T::from_str(value).map_err(|_| {
        ServiceError::InternalError(format!("unexpected {} value '{}' in orders", column, value))
    })
}

pub(crate) fn to_domain(model: order::Model, items: Vec<OrderLine>) -> Result<Order, ServiceError> {
    let tracking_info = match (model.tracking_company, model.tracking_number) {
        (Some(company), Some(tracking_number)) => Some(TrackingInfo {
            company,
            tracking_number,
        }),
        _ => None,
    };
    let payment_proof = match (
        model.payment_proof_file_name,
        model.payment_proof_url,
        model.payment_proof_uploaded_at,
    ) {
        (Some(file_name), Some(url), Some(upload_date)) => Some(PaymentProof {
            file_name,
            upload_date,
            url,
        }),
        _ => None,
    };

    Ok(Order {
        id: model.id,
        date: model.order_date,
        total: money(model.total),
        items,
        customer: model.customer,
        customer_id: model.customer_id,
        vendor_id: model.vendor_id,
        created_by: parse_column("created_by", &model.created_by)?,
        modified_by: model
            .modified_by
            .as_deref()
            .map(|value| parse_column("modified_by", value))
            .transpose()?,
        original_order_id: model.original_order_id,
        sales_notes: model.sales_notes,
        modified_date: model.modified_date,
        invoice_url: model.invoice_url,
        tracking_info,
        payment_proof,
        delivered_date: model.delivered_date,
        paid_date: model.paid_date,
        completed_date: model.completed_date,
        status: parse_column("status", &model.status)?,
    })
}

fn to_active_model(order: &Order) -> OrderActiveModel {
    let (tracking_company, tracking_number) = match &order.tracking_info {
        Some(info) => (Some(info.company.clone()), Some(info.tracking_number.clone())),
        None => (None, None),
    };
    let (proof_name, proof_url, proof_at) = match &order.payment_proof {
        Some(proof) => (
            Some(proof.file_name.clone()),
            Some(proof.url.clone()),
            Some(proof.upload_date),
        ),
        None => (None, None, None),
    };

    OrderActiveModel {
        id: Set(order.id),
        status: Set(order.status.to_string()),
        order_date: Set(order.date),
        total: Set(order.total),
        customer: Set(order.customer.clone()),
        customer_id: Set(order.customer_id),
        vendor_id: Set(order.vendor_id),
        created_by: Set(order.created_by.to_string()),
        modified_by: Set(order.modified_by.map(|author| author.to_string())),
        original_order_id: Set(order.original_order_id),
        sales_notes: Set(order.sales_notes.clone()),
        modified_date: Set(order.modified_date),
        invoice_url: Set(order.invoice_url.clone()),
        tracking_company: Set(tracking_company),
        tracking_number: Set(tracking_number),
        payment_proof_file_name: Set(proof_name),
        payment_proof_url: Set(proof_url),
        payment_proof_uploaded_at: Set(proof_at),
        delivered_date: Set(order.delivered_date),
        paid_date: Set(order.paid_date),
        completed_date: Set(order.completed_date),
        created_at: NotSet,
        updated_at: NotSet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn stored_row_round_trips_to_domain() {
        let mut order = Order::new(
            "Salon Aurora",
            OrderAuthor::Sales,
            vec![OrderLine::new("Toner 250ml", 2, dec!(8.25))],
        )
        .with_status(OrderStatus::Shipped);
        order.modified_by = Some(OrderAuthor::Client);
        order.tracking_info = Some(TrackingInfo {
            company: "Chilexpress".into(),
            tracking_number: "CX-1001".into(),
        });

        let active = to_active_model(&order);
        let now = Utc::now();
        let model = order::Model {
            id: order.id,
            status: "shipped".into(),
            order_date: order.date,
            total: order.total,
            customer: order.customer.clone(),
            customer_id: None,
            vendor_id: None,
            created_by: "sales".into(),
            modified_by: Some("client".into()),
            original_order_id: None,
            sales_notes: None,
            modified_date: None,
            invoice_url: None,
            tracking_company: Some("Chilexpress".into()),
            tracking_number: Some("CX-1001".into()),
            payment_proof_file_name: None,
            payment_proof_url: None,
            payment_proof_uploaded_at: None,
            delivered_date: None,
            paid_date: None,
            completed_date: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(active.status, Set("shipped".to_string()));
        assert_eq!(active.created_by, Set("sales".to_string()));

        let back = to_domain(model, order.items.clone()).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn unknown_status_column_is_internal_error() {
        let now = Utc::now();
        let model = order::Model {
            id: Uuid::new_v4(),
            status: "archived".into(),
            order_date: now,
            total: Decimal::ZERO,
            customer: "x".into(),
            customer_id: None,
            vendor_id: None,
            created_by: "client".into(),
            modified_by: None,
            original_order_id: None,
            sales_notes: None,
            modified_date: None,
            invoice_url: None,
            tracking_company: None,
            tracking_number: None,
            payment_proof_file_name: None,
            payment_proof_url: None,
            payment_proof_uploaded_at: None,
            delivered_date: None,
            paid_date: None,
            completed_date: None,
            created_at: now,
            updated_at: now,
        };
        assert_matches!(
            to_domain(model, vec![]),
            Err(ServiceError::InternalError(_))
        );
    }

    #[test]
    fn line_validation() {
        let bad = OrderLineInput {
            product_id: None,
            name: "".into(),
            quantity: 0,
            price: dec!(-1),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("price"));

        let oversized = OrderLineInput {
            product_id: None,
            name: "Bulk mask".into(),
            quantity: 1_000_001,
            price: dec!(1.005),
        };
        let errors = oversized.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("quantity"));
        assert!(fields.contains_key("price"));

        assert!(validate_unit_price(&dec!(12.50)).is_ok());
        assert!(validate_unit_price(&dec!(1.500)).is_ok());
        assert!(validate_unit_price(&Decimal::MAX).is_err());
    }

    #[test]
    fn overflowing_total_is_a_validation_error() {
        let lines = vec![
            OrderLine::new("Bulk", 1, Decimal::MAX),
            OrderLine::new("Bulk", 1, Decimal::MAX),
        ];
        assert_matches!(order_total(&lines), Err(ServiceError::ValidationError(_)));
        assert_eq!(
            order_total(&[OrderLine::new("Toner", 4, dec!(8.25))]).unwrap(),
            dec!(33.00)
        );
    }
}
