//! A scripted [`Connection`] for testing consumers without a database.
//!
//! Each logical operation can be given a canned response with the matching
//! `on_*` builder. Every call is recorded as an [`Invocation`] so tests can
//! assert on what the consumer asked for.
//!
//! ```
//! use product_db::stub::{Operation, StubConnection};
//! use product_db::{Connection, DbError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let stub = StubConnection::new().on_authenticate(|| Err(DbError::InvalidCredentials));
//! let result = stub.authenticate("alice", "wrong").await;
//! assert!(matches!(result, Err(DbError::InvalidCredentials)));
//! assert_eq!(stub.calls(Operation::Authenticate), 1);
//! # }
//! ```
//!
//! Operations without a script fall back to a neutral answer: `true` for
//! the liveness check, empty lists for reads, `Ok(())`/`Ok(None)` for scoped writes.
//! Operations that must produce an entity fail with [`DbError::Config`]
//! naming the operation, so a missing script is loud.

use std::sync::{Arc, Mutex, PoisonError};

use product_types::{
    Component, ComponentDetail, ComponentId, NewProduct, Order, OrderId, OrderLine, Product,
    ProductComponent, ProductId, Token, TokenId, User, UserId,
};

use crate::connection::Connection;
use crate::error::DbError;

/// A canned response producer.
type Responder<T> = Arc<dyn Fn() -> Result<T, DbError> + Send + Sync>;

/// The logical operations of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Connection::is_reachable`]
    IsReachable,
    /// [`Connection::list_products`]
    ListProducts,
    /// [`Connection::list_components`]
    ListComponents,
    /// [`Connection::create_product`]
    CreateProduct,
    /// [`Connection::create_component`]
    CreateComponent,
    /// [`Connection::upsert_component_link`]
    UpsertComponentLink,
    /// [`Connection::list_orders`]
    ListOrders,
    /// [`Connection::create_order`]
    CreateOrder,
    /// [`Connection::update_order`]
    UpdateOrder,
    /// [`Connection::delete_order`]
    DeleteOrder,
    /// [`Connection::create_user`]
    CreateUser,
    /// [`Connection::authenticate`]
    Authenticate,
    /// [`Connection::issue_token`]
    IssueToken,
    /// [`Connection::validate_token`]
    ValidateToken,
    /// [`Connection::revoke_token`]
    RevokeToken,
}

impl Operation {
    /// Stable name of the operation.
    pub const fn name(self) -> &'static str {
        match self {
            Self::IsReachable => "is_reachable",
            Self::ListProducts => "list_products",
            Self::ListComponents => "list_components",
            Self::CreateProduct => "create_product",
            Self::CreateComponent => "create_component",
            Self::UpsertComponentLink => "upsert_component_link",
            Self::ListOrders => "list_orders",
            Self::CreateOrder => "create_order",
            Self::UpdateOrder => "update_order",
            Self::DeleteOrder => "delete_order",
            Self::CreateUser => "create_user",
            Self::Authenticate => "authenticate",
            Self::IssueToken => "issue_token",
            Self::ValidateToken => "validate_token",
            Self::RevokeToken => "revoke_token",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// One recorded call with its arguments.
///
/// Passwords are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// A liveness check.
    IsReachable,
    /// A product listing.
    ListProducts {
        /// Requested product, if any.
        product_id: Option<ProductId>,
    },
    /// A component listing.
    ListComponents {
        /// Product whose components were requested.
        product_id: ProductId,
    },
    /// A product creation.
    CreateProduct {
        /// The submitted draft.
        draft: NewProduct,
    },
    /// A component creation.
    CreateComponent {
        /// The submitted name.
        name: String,
    },
    /// A link upsert.
    UpsertComponentLink {
        /// Product side.
        product_id: ProductId,
        /// Component side.
        component_id: ComponentId,
        /// Submitted quantity.
        quantity: i32,
        /// Submitted unit.
        unit: String,
    },
    /// An order listing.
    ListOrders {
        /// Owner.
        user_id: UserId,
        /// Requested order, if any.
        order_id: Option<OrderId>,
    },
    /// An order creation.
    CreateOrder {
        /// Owner.
        user_id: UserId,
        /// Submitted lines.
        lines: Vec<OrderLine>,
    },
    /// An order item replacement.
    UpdateOrder {
        /// Owner.
        user_id: UserId,
        /// Target order.
        order_id: OrderId,
        /// Submitted lines.
        lines: Vec<OrderLine>,
    },
    /// An order deletion.
    DeleteOrder {
        /// Owner.
        user_id: UserId,
        /// Target order.
        order_id: OrderId,
    },
    /// An account creation.
    CreateUser {
        /// Submitted username.
        username: String,
    },
    /// A credential check.
    Authenticate {
        /// Submitted username.
        username: String,
    },
    /// A session issue.
    IssueToken {
        /// Owner.
        user_id: UserId,
    },
    /// A session check.
    ValidateToken {
        /// Token row.
        token_id: TokenId,
        /// Claimed owner.
        user_id: UserId,
    },
    /// A session revocation.
    RevokeToken {
        /// Token row.
        token_id: TokenId,
        /// Claimed owner.
        user_id: UserId,
    },
}

impl Invocation {
    /// The operation this call was made to.
    pub const fn operation(&self) -> Operation {
        match self {
            Self::IsReachable => Operation::IsReachable,
            Self::ListProducts { .. } => Operation::ListProducts,
            Self::ListComponents { .. } => Operation::ListComponents,
            Self::CreateProduct { .. } => Operation::CreateProduct,
            Self::CreateComponent { .. } => Operation::CreateComponent,
            Self::UpsertComponentLink { .. } => Operation::UpsertComponentLink,
            Self::ListOrders { .. } => Operation::ListOrders,
            Self::CreateOrder { .. } => Operation::CreateOrder,
            Self::UpdateOrder { .. } => Operation::UpdateOrder,
            Self::DeleteOrder { .. } => Operation::DeleteOrder,
            Self::CreateUser { .. } => Operation::CreateUser,
            Self::Authenticate { .. } => Operation::Authenticate,
            Self::IssueToken { .. } => Operation::IssueToken,
            Self::ValidateToken { .. } => Operation::ValidateToken,
            Self::RevokeToken { .. } => Operation::RevokeToken,
        }
    }
}

/// Generates the per-operation script table and its `on_*` builders.
macro_rules! define_script {
    (
        $(
            $(#[$meta:meta])*
            $field:ident => $setter:ident: $ty:ty
        ),* $(,)?
    ) => {
        #[derive(Default)]
        struct Script {
            $( $field: Option<Responder<$ty>>, )*
        }

        impl StubConnection {
            $(
                $(#[$meta])*
                #[must_use]
                pub fn $setter<F>(mut self, respond: F) -> Self
                where
                    F: Fn() -> Result<$ty, DbError> + Send + Sync + 'static,
                {
                    self.script.$field = Some(Arc::new(respond));
                    self
                }
            )*
        }
    };
}

define_script! {
    /// Script [`Connection::is_reachable`].
    is_reachable => on_is_reachable: bool,
    /// Script [`Connection::list_products`].
    list_products => on_list_products: Vec<Product>,
    /// Script [`Connection::list_components`].
    list_components => on_list_components: Vec<ComponentDetail>,
    /// Script [`Connection::create_product`].
    create_product => on_create_product: Product,
    /// Script [`Connection::create_component`].
    create_component => on_create_component: Component,
    /// Script [`Connection::upsert_component_link`].
    upsert_component_link => on_upsert_component_link: ProductComponent,
    /// Script [`Connection::list_orders`].
    list_orders => on_list_orders: Vec<Order>,
    /// Script [`Connection::create_order`].
    create_order => on_create_order: Order,
    /// Script [`Connection::update_order`].
    update_order => on_update_order: Option<Order>,
    /// Script [`Connection::delete_order`].
    delete_order => on_delete_order: (),
    /// Script [`Connection::create_user`].
    create_user => on_create_user: User,
    /// Script [`Connection::authenticate`].
    authenticate => on_authenticate: User,
    /// Script [`Connection::issue_token`].
    issue_token => on_issue_token: Token,
    /// Script [`Connection::validate_token`].
    validate_token => on_validate_token: Token,
    /// Script [`Connection::revoke_token`].
    revoke_token => on_revoke_token: (),
}

/// A [`Connection`] that replays canned responses and records every call.
#[derive(Default)]
pub struct StubConnection {
    script: Script,
    invocations: Mutex<Vec<Invocation>>,
}

impl core::fmt::Debug for StubConnection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StubConnection")
            .field("invocations", &self.invocations())
            .finish_non_exhaustive()
    }
}

impl StubConnection {
    /// Create a stub with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call made so far, oldest first.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `operation` was called.
    pub fn calls(&self, operation: Operation) -> usize {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Forget all recorded calls. Scripts are kept.
    pub fn clear_invocations(&self) {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Record `invocation` and produce the scripted answer, or `fallback`
    /// when the operation has no script.
    fn replay<T>(
        &self,
        invocation: Invocation,
        script: Option<&Responder<T>>,
        fallback: impl FnOnce(Operation) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        let operation = invocation.operation();
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation);
        script.map_or_else(|| fallback(operation), |respond| respond())
    }
}

/// Fallback for operations that must produce an entity.
fn unscripted<T>(operation: Operation) -> Result<T, DbError> {
    Err(DbError::Config(format!("no canned response for {operation}")))
}

impl Connection for StubConnection {
    async fn is_reachable(&self) -> Result<bool, DbError> {
        self.replay(
            Invocation::IsReachable,
            self.script.is_reachable.as_ref(),
            |_| Ok(true),
        )
    }

    async fn list_products(&self, product_id: Option<ProductId>) -> Result<Vec<Product>, DbError> {
        self.replay(
            Invocation::ListProducts { product_id },
            self.script.list_products.as_ref(),
            |_| Ok(Vec::new()),
        )
    }

    async fn list_components(&self, product_id: ProductId) -> Result<Vec<ComponentDetail>, DbError> {
        self.replay(
            Invocation::ListComponents { product_id },
            self.script.list_components.as_ref(),
            |_| Ok(Vec::new()),
        )
    }

    async fn create_product(&self, draft: &NewProduct) -> Result<Product, DbError> {
        self.replay(
            Invocation::CreateProduct {
                draft: draft.clone(),
            },
            self.script.create_product.as_ref(),
            unscripted,
        )
    }

    async fn create_component(&self, name: &str) -> Result<Component, DbError> {
        self.replay(
            Invocation::CreateComponent {
                name: name.to_owned(),
            },
            self.script.create_component.as_ref(),
            unscripted,
        )
    }

    async fn upsert_component_link(
        &self,
        product_id: ProductId,
        component_id: ComponentId,
        quantity: i32,
        unit: &str,
    ) -> Result<ProductComponent, DbError> {
        self.replay(
            Invocation::UpsertComponentLink {
                product_id,
                component_id,
                quantity,
                unit: unit.to_owned(),
            },
            self.script.upsert_component_link.as_ref(),
            unscripted,
        )
    }

    async fn list_orders(
        &self,
        user_id: UserId,
        order_id: Option<OrderId>,
    ) -> Result<Vec<Order>, DbError> {
        self.replay(
            Invocation::ListOrders { user_id, order_id },
            self.script.list_orders.as_ref(),
            |_| Ok(Vec::new()),
        )
    }

    async fn create_order(&self, user_id: UserId, lines: &[OrderLine]) -> Result<Order, DbError> {
        self.replay(
            Invocation::CreateOrder {
                user_id,
                lines: lines.to_vec(),
            },
            self.script.create_order.as_ref(),
            unscripted,
        )
    }

    async fn update_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
        lines: &[OrderLine],
    ) -> Result<Option<Order>, DbError> {
        self.replay(
            Invocation::UpdateOrder {
                user_id,
                order_id,
                lines: lines.to_vec(),
            },
            self.script.update_order.as_ref(),
            |_| Ok(None),
        )
    }

    async fn delete_order(&self, user_id: UserId, order_id: OrderId) -> Result<(), DbError> {
        self.replay(
            Invocation::DeleteOrder { user_id, order_id },
            self.script.delete_order.as_ref(),
            |_| Ok(()),
        )
    }

    async fn create_user(&self, username: &str, _password: &str) -> Result<User, DbError> {
        self.replay(
            Invocation::CreateUser {
                username: username.to_owned(),
            },
            self.script.create_user.as_ref(),
            unscripted,
        )
    }

    async fn authenticate(&self, username: &str, _password: &str) -> Result<User, DbError> {
        self.replay(
            Invocation::Authenticate {
                username: username.to_owned(),
            },
            self.script.authenticate.as_ref(),
            unscripted,
        )
    }

    async fn issue_token(&self, user_id: UserId) -> Result<Token, DbError> {
        self.replay(
            Invocation::IssueToken { user_id },
            self.script.issue_token.as_ref(),
            unscripted,
        )
    }

    async fn validate_token(&self, token_id: TokenId, user_id: UserId) -> Result<Token, DbError> {
        self.replay(
            Invocation::ValidateToken { token_id, user_id },
            self.script.validate_token.as_ref(),
            unscripted,
        )
    }

    async fn revoke_token(&self, token_id: TokenId, user_id: UserId) -> Result<(), DbError> {
        self.replay(
            Invocation::RevokeToken { token_id, user_id },
            self.script.revoke_token.as_ref(),
            |_| Ok(()),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn user(id: i64, name: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(id),
            username: name.to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn scripted_response_is_replayed_on_every_call() {
        let stub = StubConnection::new().on_create_user(|| Ok(user(1, "User1")));

        for _ in 0..2 {
            let created = stub.create_user("User1", "pw").await;
            assert_eq!(created.ok().map(|u| u.id), Some(UserId::new(1)));
        }
        assert_eq!(stub.calls(Operation::CreateUser), 2);
    }

    #[tokio::test]
    async fn scripted_errors_are_returned() {
        let stub = StubConnection::new()
            .on_create_user(|| Err(DbError::DuplicateUsername("alice".to_owned())));

        let result = stub.create_user("alice", "pw").await;
        assert!(matches!(result, Err(DbError::DuplicateUsername(name)) if name == "alice"));
    }

    #[tokio::test]
    async fn unscripted_entity_operations_fail_loudly() {
        let stub = StubConnection::new();

        let result = stub.issue_token(UserId::new(1)).await;
        assert!(
            matches!(&result, Err(DbError::Config(msg)) if msg.contains("issue_token")),
            "expected config error, got {result:?}"
        );
    }

    #[tokio::test]
    async fn unscripted_reads_and_scoped_writes_are_neutral() {
        let stub = StubConnection::new();

        assert!(matches!(stub.is_reachable().await, Ok(true)));
        assert!(matches!(stub.list_products(None).await, Ok(v) if v.is_empty()));
        assert!(matches!(stub.list_orders(UserId::new(1), None).await, Ok(v) if v.is_empty()));
        assert!(matches!(
            stub.update_order(UserId::new(1), OrderId::new(2), &[]).await,
            Ok(None)
        ));
        assert!(stub.delete_order(UserId::new(1), OrderId::new(2)).await.is_ok());
        assert!(stub.revoke_token(TokenId::new(3), UserId::new(1)).await.is_ok());
    }

    #[tokio::test]
    async fn invocations_record_arguments_in_order() {
        let stub = StubConnection::new();
        let lines = [OrderLine::new(ProductId::new(1), 2)];

        let _ = stub.update_order(UserId::new(7), OrderId::new(3), &lines).await;
        let _ = stub.validate_token(TokenId::new(5), UserId::new(7)).await;

        assert_eq!(
            stub.invocations(),
            vec![
                Invocation::UpdateOrder {
                    user_id: UserId::new(7),
                    order_id: OrderId::new(3),
                    lines: lines.to_vec(),
                },
                Invocation::ValidateToken {
                    token_id: TokenId::new(5),
                    user_id: UserId::new(7),
                },
            ]
        );

        stub.clear_invocations();
        assert!(stub.invocations().is_empty());
    }

    #[test]
    fn operation_names_are_snake_case() {
        assert_eq!(Operation::UpsertComponentLink.name(), "upsert_component_link");
        assert_eq!(Operation::IsReachable.to_string(), "is_reachable");
        assert_eq!(
            Invocation::RevokeToken {
                token_id: TokenId::new(1),
                user_id: UserId::new(1)
            }
            .operation(),
            Operation::RevokeToken
        );
    }
}
