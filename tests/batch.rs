//! Tests for send_batch

use std::panic::{AssertUnwindSafe, catch_unwind};

use zero_postgres_mock::sync::Conn;
use zero_postgres_mock::{Batch, CallModifier, CommandTag, Context, Error, Opts, Rows};

fn get_conn() -> Conn {
    Conn::new(Opts::default()).expect("Failed to create mock")
}

#[test]
fn batch_sub_dispatch() {
    let conn = get_conn();
    let ctx = Context::background();
    let expected = conn.expect_batch().will_be_closed();
    expected
        .expect_query("SELECT name FROM users")
        .with_args((1_i32,))
        .will_return_rows(Rows::new(["name"]).add_row(("john",)));
    expected
        .expect_query("SELECT count")
        .will_return_rows(Rows::new(["count"]).add_row((42_i64,)));

    let mut batch = Batch::new();
    batch.queue("SELECT name FROM users WHERE id = $1", (1_i32,));
    batch.queue("SELECT count(*) FROM users", ());

    let mut results = conn.send_batch(&ctx, &batch);
    let (name,): (String,) = results.query_row(&ctx).scan().unwrap();
    assert_eq!(name, "john");
    let mut counts = results.query(&ctx).unwrap();
    assert!(counts.next());
    assert_eq!(counts.get::<i64>(0).unwrap(), 42);
    counts.close().unwrap();

    assert!(conn.expectations_were_met().is_err());
    results.close(&ctx).unwrap();
    assert!(results.is_closed());
    assert!(conn.expectations_were_met().is_ok());
}

#[test]
fn batch_must_be_closed() {
    let conn = get_conn();
    let ctx = Context::background();
    let expected = conn.expect_batch().will_be_closed();
    expected
        .expect_exec("UPDATE")
        .will_return_result(CommandTag::new("UPDATE", 3));

    let mut batch = Batch::new();
    batch.queue("UPDATE users SET active = true", ());
    let mut results = conn.send_batch(&ctx, &batch);
    assert_eq!(results.exec(&ctx).unwrap().rows_affected(), 3);

    let err = conn.expectations_were_met().unwrap_err();
    assert!(
        err.to_string()
            .starts_with("expected batch to be closed, but it was not")
    );
}

#[test]
fn close_drains_unread_statements() {
    let conn = get_conn();
    let ctx = Context::background();
    let expected = conn.expect_batch();
    expected
        .expect_exec("INSERT")
        .with_args(("login",))
        .will_return_result(CommandTag::new("INSERT", 1));
    expected.expect_exec("DELETE").will_return_error("permission denied");

    let mut batch = Batch::new();
    batch.queue("INSERT INTO audit VALUES ($1)", ("login",));
    batch.queue("DELETE FROM sessions", ());

    let mut results = conn.send_batch(&ctx, &batch);
    let err = results.close(&ctx).unwrap_err();
    assert_eq!(err.to_string(), "permission denied");
    assert!(conn.expectations_were_met().is_ok());
}

#[test]
fn send_mismatch_is_reported_on_read() {
    let conn = get_conn();
    let ctx = Context::background();
    let expected = conn.expect_batch();
    expected
        .expect_exec("INSERT")
        .with_args((1_i32,))
        .will_return_result(CommandTag::new("INSERT", 1));

    let mut batch = Batch::new();
    batch.queue("INSERT INTO t VALUES ($1)", (2_i32,));
    let mut results = conn.send_batch(&ctx, &batch);

    let err = results.exec(&ctx).unwrap_err();
    assert!(matches!(err, Error::Mismatch { .. }));
    assert!(err.to_string().starts_with("SendBatch: statement 0: ExecQuery"));
    // a failed send answers every read with the same error
    assert!(matches!(results.exec(&ctx), Err(Error::Mismatch { .. })));
    assert!(matches!(results.close(&ctx), Err(Error::Mismatch { .. })));
    assert!(conn.expectations_were_met().is_err());
}

#[test]
fn send_statement_count_mismatch() {
    let conn = get_conn();
    let ctx = Context::background();
    let expected = conn.expect_batch();
    expected
        .expect_exec("INSERT")
        .will_return_result(CommandTag::new("INSERT", 1));

    let mut batch = Batch::new();
    batch.queue("INSERT INTO t VALUES (1)", ());
    batch.queue("INSERT INTO t VALUES (2)", ());
    let mut results = conn.send_batch(&ctx, &batch);
    let err = results.exec(&ctx).unwrap_err();
    assert!(
        err.to_string()
            .starts_with("SendBatch: expected 1 queued statements, but got 2")
    );
}

#[test]
fn read_kind_must_follow_queue() {
    let conn = get_conn();
    let ctx = Context::background();
    let expected = conn.expect_batch();
    expected
        .expect_query("SELECT 1")
        .will_return_rows(Rows::new(["n"]).add_row((1_i32,)));

    let mut batch = Batch::new();
    batch.queue("SELECT 1", ());
    let mut results = conn.send_batch(&ctx, &batch);
    assert!(matches!(results.exec(&ctx), Err(Error::UnexpectedCall(_))));
    let mut rows = results.query(&ctx).unwrap();
    assert!(rows.next());
    rows.close().unwrap();
    assert!(matches!(results.query(&ctx), Err(Error::InvalidUsage(_))));
    results.close(&ctx).unwrap();
    assert!(conn.expectations_were_met().is_ok());
}

#[test]
fn batch_with_prepared_statement() {
    let conn = get_conn();
    let ctx = Context::background();
    conn.expect_prepare("bump", "UPDATE counters");
    let expected = conn.expect_batch();
    expected
        .expect_exec("^bump$")
        .with_args(("visits",))
        .will_return_result(CommandTag::new("UPDATE", 1));

    let stmt = conn
        .prepare(&ctx, "bump", "UPDATE counters SET n = n + 1 WHERE name = $1")
        .unwrap();
    let mut batch = Batch::new();
    batch.queue(&stmt, ("visits",));
    let mut results = conn.send_batch(&ctx, &batch);
    assert_eq!(results.exec(&ctx).unwrap().as_str(), "UPDATE 1");
    results.close(&ctx).unwrap();
    assert!(conn.expectations_were_met().is_ok());
}

#[test]
fn panic_while_draining_is_not_swallowed() {
    let conn = get_conn();
    let ctx = Context::background();
    let expected = conn.expect_batch().will_be_closed();
    expected.expect_exec("INSERT").will_panic("trigger crashed");
    expected
        .expect_exec("DELETE")
        .will_return_result(CommandTag::new("DELETE", 1));

    let mut batch = Batch::new();
    batch.queue("INSERT INTO audit DEFAULT VALUES", ());
    batch.queue("DELETE FROM sessions", ());
    let mut results = conn.send_batch(&ctx, &batch);

    let payload = catch_unwind(AssertUnwindSafe(|| results.close(&ctx))).unwrap_err();
    assert_eq!(
        payload.downcast_ref::<String>().map(String::as_str),
        Some("trigger crashed")
    );
    // closing finished before the panic surfaced
    assert!(results.is_closed());
    assert!(conn.expectations_were_met().is_ok());
}
