//! Tests for the asynchronous mock connection

#![cfg(feature = "tokio")]

use std::time::{Duration, Instant};

use zero_postgres_mock::tokio::Conn;
use zero_postgres_mock::{Batch, CallModifier, CommandTag, Context, Error, Opts, Rows};

async fn get_conn() -> Conn {
    Conn::new(Opts::default())
        .await
        .expect("Failed to create mock")
}

#[tokio::test]
async fn query_row_and_exec() {
    let conn = get_conn().await;
    let ctx = Context::background();
    conn.expect_query("SELECT email FROM users")
        .with_args((7_i32,))
        .will_return_rows(Rows::new(["email"]).add_row(("a@example.com",)));
    conn.expect_exec("UPDATE users")
        .will_return_result(CommandTag::new("UPDATE", 1));

    let (email,): (String,) = conn
        .query_row(&ctx, "SELECT email FROM users WHERE id = $1", (7_i32,))
        .await
        .scan()
        .unwrap();
    assert_eq!(email, "a@example.com");
    let tag = conn
        .exec(&ctx, "UPDATE users SET seen = now()", ())
        .await
        .unwrap();
    assert!(tag.is_update());
    assert!(conn.expectations_were_met().is_ok());
}

#[tokio::test]
async fn delay_elapses_before_deadline() {
    let conn = get_conn().await;
    let ctx = Context::background().with_timeout(Duration::from_secs(5));
    conn.expect_ping()
        .will_delay_for(Duration::from_millis(20))
        .will_return_error("server closed the connection");

    let start = Instant::now();
    let err = conn.ping(&ctx).await.unwrap_err();
    assert!(start.elapsed() >= Duration::from_millis(20));
    assert_eq!(err.to_string(), "server closed the connection");
}

#[tokio::test]
async fn cancel_wins_over_delay() {
    let conn = get_conn().await;
    let ctx = Context::background();
    conn.expect_exec("VACUUM")
        .will_delay_for(Duration::from_secs(5))
        .will_return_result(CommandTag::new("VACUUM", 0));

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let start = Instant::now();
    let err = conn.exec(&ctx, "VACUUM", ()).await.unwrap_err();
    assert!(matches!(err, Error::Canceled));
    assert!(start.elapsed() < Duration::from_secs(5));
    // matched, so the expectation counts as met
    assert!(conn.expectations_were_met().is_ok());
}

#[tokio::test]
async fn panic_in_task() {
    let conn = get_conn().await;
    conn.expect_ping().will_panic("fatal");

    let task_conn = conn.clone();
    let res = tokio::spawn(async move { task_conn.ping(&Context::background()).await }).await;
    let err = res.unwrap_err();
    assert!(err.is_panic());
    assert!(conn.expectations_were_met().is_ok());
}

#[tokio::test]
async fn transaction_and_batch() {
    let conn = get_conn().await;
    let ctx = Context::background();
    conn.expect_begin();
    let expected = conn.expect_batch().will_be_closed();
    expected
        .expect_exec("INSERT INTO orders")
        .with_args((10_i32,))
        .will_return_result(CommandTag::new("INSERT", 1));
    expected
        .expect_exec("UPDATE stock")
        .will_return_result(CommandTag::new("UPDATE", 1));
    conn.expect_commit();

    let tx = conn.begin(&ctx).await.unwrap();
    assert!(tx.in_transaction());

    let mut batch = Batch::new();
    batch.queue("INSERT INTO orders VALUES ($1)", (10_i32,));
    batch.queue("UPDATE stock SET n = n - 1", ());
    let mut results = tx.send_batch(&ctx, &batch).await;
    assert_eq!(results.exec(&ctx).await.unwrap().rows_affected(), 1);
    results.close(&ctx).await.unwrap();

    tx.commit(&ctx).await.unwrap();
    assert!(!conn.in_transaction());
    assert!(conn.expectations_were_met().is_ok());
}

#[tokio::test]
async fn deallocate_flags_prepare() {
    let conn = get_conn().await;
    let ctx = Context::background();
    conn.expect_prepare("q", "SELECT 1").will_be_closed();
    conn.expect_deallocate("q");

    let stmt = conn.prepare(&ctx, "q", "SELECT 1").await.unwrap();
    assert!(conn.expectations_were_met().is_err());
    conn.deallocate(&ctx, &stmt.name).await.unwrap();
    assert!(conn.expectations_were_met().is_ok());
}

#[tokio::test]
async fn panic_inside_transaction_rolls_back() {
    let conn = get_conn().await;
    conn.expect_begin();
    conn.expect_exec("UPDATE").will_panic("disk on fire");
    conn.expect_rollback();

    let task_conn = conn.clone();
    let err = tokio::spawn(async move {
        let ctx = Context::background();
        task_conn
            .run_transaction(&ctx, |conn, _tx| async move {
                conn.exec(&Context::background(), "UPDATE t SET x = 1", ())
                    .await
            })
            .await
    })
    .await
    .unwrap_err();
    let payload = err.into_panic();
    assert_eq!(
        payload.downcast_ref::<String>().map(String::as_str),
        Some("disk on fire")
    );
    assert!(!conn.in_transaction());
    assert!(conn.expectations_were_met().is_ok());
}
