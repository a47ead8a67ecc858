//! Consumers written against [`Connection`] run unchanged on the stub.
//!
//! The helpers below play the part of request handlers: they only know the
//! trait. No database is needed.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]

use chrono::Utc;
use product_db::{Connection, DbError, Invocation, Operation, StubConnection};
use product_types::{
    Order, OrderId, OrderItem, OrderItemId, OrderLine, ProductId, SessionKey, Token, TokenId,
    User, UserId,
};

/// Sign in and open a session.
async fn sign_in<C: Connection>(
    conn: &C,
    username: &str,
    password: &str,
) -> Result<SessionKey, DbError> {
    let user = conn.authenticate(username, password).await?;
    let token = conn.issue_token(user.id).await?;
    Ok(token.session_key())
}

/// Place an order on behalf of a live session.
async fn place_order<C: Connection>(
    conn: &C,
    session: SessionKey,
    lines: &[OrderLine],
) -> Result<Order, DbError> {
    conn.validate_token(session.token_id, session.user_id).await?;
    conn.create_order(session.user_id, lines).await
}

/// Health endpoint: a failed ping reads as "down", not as an error.
async fn health<C: Connection>(conn: &C) -> bool {
    conn.is_reachable().await.unwrap_or(false)
}

fn user(id: i64) -> User {
    let now = Utc::now();
    User {
        id: UserId::new(id),
        username: "User1".to_owned(),
        created_at: now,
        updated_at: now,
    }
}

fn token(id: i64, user_id: i64) -> Token {
    Token {
        id: TokenId::new(id),
        user_id: UserId::new(user_id),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn sign_in_issues_a_token_for_the_authenticated_user() {
    let stub = StubConnection::new()
        .on_authenticate(|| Ok(user(1)))
        .on_issue_token(|| Ok(token(10, 1)));

    let session = sign_in(&stub, "User1", "pw").await.unwrap();

    assert_eq!(session.token_id, TokenId::new(10));
    assert_eq!(session.user_id, UserId::new(1));
    assert_eq!(
        stub.invocations(),
        vec![
            Invocation::Authenticate {
                username: "User1".to_owned()
            },
            Invocation::IssueToken {
                user_id: UserId::new(1)
            },
        ]
    );
}

#[tokio::test]
async fn failed_sign_in_never_issues_a_token() {
    let stub = StubConnection::new().on_authenticate(|| Err(DbError::InvalidCredentials));

    let result = sign_in(&stub, "User1", "nope").await;

    assert!(matches!(result, Err(DbError::InvalidCredentials)));
    assert_eq!(stub.calls(Operation::IssueToken), 0);
}

#[tokio::test]
async fn revoked_session_cannot_place_orders() {
    let stub = StubConnection::new().on_validate_token(|| Err(DbError::InvalidToken));
    let session = token(10, 1).session_key();

    let result = place_order(&stub, session, &[OrderLine::new(ProductId::new(1), 1)]).await;

    assert!(matches!(result, Err(DbError::InvalidToken)));
    assert_eq!(stub.calls(Operation::CreateOrder), 0);
}

#[tokio::test]
async fn live_session_places_the_order_for_its_owner() {
    let stub = StubConnection::new()
        .on_validate_token(|| Ok(token(10, 1)))
        .on_create_order(|| {
            let now = Utc::now();
            Ok(Order {
                id: OrderId::new(5),
                user_id: UserId::new(1),
                created_at: now,
                updated_at: now,
                items: vec![OrderItem {
                    id: OrderItemId::new(50),
                    order_id: OrderId::new(5),
                    product_id: ProductId::new(2),
                    product: None,
                    quantity: 3,
                }],
            })
        });
    let lines = [OrderLine::new(ProductId::new(2), 3)];

    let order = place_order(&stub, token(10, 1).session_key(), &lines)
        .await
        .unwrap();

    assert_eq!(order.lines(), lines.to_vec());
    assert_eq!(
        stub.invocations()[1],
        Invocation::CreateOrder {
            user_id: UserId::new(1),
            lines: lines.to_vec(),
        }
    );
}

#[tokio::test]
async fn health_reports_down_on_ping_error() {
    let up = StubConnection::new();
    let down = StubConnection::new().on_is_reachable(|| Ok(false));
    let broken =
        StubConnection::new().on_is_reachable(|| Err(DbError::Config("ping".to_owned())));

    assert!(health(&up).await);
    assert!(!health(&down).await);
    assert!(!health(&broken).await);
}

#[tokio::test]
async fn stub_is_shareable_across_tasks() {
    let stub = std::sync::Arc::new(StubConnection::new().on_list_products(|| Ok(Vec::new())));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let stub = std::sync::Arc::clone(&stub);
            tokio::spawn(async move { stub.list_products(None).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_empty());
    }

    assert_eq!(stub.calls(Operation::ListProducts), 4);
}
