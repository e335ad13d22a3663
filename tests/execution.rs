mod common;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Barrier};

use common::{FakeDb, Product, Products, text_row};
use dml::prelude::*;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn numbered(n: i64) -> FakeDb {
    let rows = (1..=n).map(|i| text_row([Some(i.to_string().as_str())])).collect();
    FakeDb::with_rows(["entity_id"], rows)
}

fn products() -> FakeDb {
    FakeDb::with_rows(
        ["id", "sku", "price", "active"],
        vec![
            text_row([Some("1"), Some("SKU-1"), Some("9.99"), Some("1")]),
            text_row([Some("2"), Some("SKU-2"), None, Some("0")]),
        ],
    )
}

#[tokio::test]
async fn test_exec_sends_bound_sql() {
    let db = FakeDb {
        rows_affected: 1,
        ..Default::default()
    };
    let mut upd = Update::new("sales_order")
        .set(column("status").str("complete"))
        .filter(column("entity_id").placeholder());
    let result = upd.bind().unwrap().int64(10).exec(&db).await.unwrap();
    assert_eq!(result.rows_affected, 1);
    assert_eq!(result.last_insert_id, 42);
    assert_eq!(
        db.statements(),
        vec![(
            "UPDATE `sales_order` SET `status`=? WHERE (`entity_id` = ?)".to_string(),
            vec![Value::String("complete".into()), Value::Int(10)],
        )]
    );
}

#[tokio::test]
async fn test_exec_expecting_rows() {
    let db = FakeDb {
        rows_affected: 2,
        ..Default::default()
    };
    let mut del = Delete::new("sales_order").filter(column("entity_id").placeholder());
    let err = del
        .bind()
        .unwrap()
        .int64(1)
        .exec_expecting(&db, 1)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotValid));

    let ok = del.bind().unwrap().int64(1).exec_expecting(&db, 2).await;
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_exec_interpolated() {
    let db = FakeDb::default();
    let mut ins = Insert::new("customer_entity").columns(["email"]);
    ins.bind()
        .unwrap()
        .str("o'brien@example.com")
        .interpolate()
        .exec(&db)
        .await
        .unwrap();
    assert_eq!(
        db.statements()[0],
        (
            "INSERT INTO `customer_entity` (`email`) VALUES ('o\\'brien@example.com')".to_string(),
            vec![]
        )
    );
}

#[tokio::test]
async fn test_load_record() {
    let db = products();
    let mut sel = Select::new(["id", "sku", "price", "active"]).from("catalog_product_entity");
    let mut all = Products::default();
    let count = sel.bind().unwrap().load(&db, &mut all).await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        all.0,
        vec![
            Product {
                id: 1,
                sku: "SKU-1".into(),
                price: Some(9.99),
                active: true,
            },
            Product {
                id: 2,
                sku: "SKU-2".into(),
                price: None,
                active: false,
            },
        ]
    );
    assert!(db.cursor_closed());
}

#[tokio::test]
async fn test_load_single_record_keeps_last_row() {
    let db = products();
    let mut sel = Select::star().from("catalog_product_entity");
    let mut product = Product::default();
    sel.bind().unwrap().load(&db, &mut product).await.unwrap();
    assert_eq!(product.id, 2);
}

#[tokio::test]
async fn test_load_scalars() {
    let db = numbered(3);
    let mut sel = Select::new(["entity_id"]).from("sales_order");
    assert_eq!(sel.bind().unwrap().load_int64(&db).await.unwrap(), 1);
    assert_eq!(
        sel.bind().unwrap().load_int64s(&db).await.unwrap(),
        vec![1, 2, 3]
    );
    assert_eq!(sel.bind().unwrap().load_string(&db).await.unwrap(), "1");

    let empty = FakeDb::with_rows(["entity_id"], vec![]);
    let err = sel.bind().unwrap().load_int64(&empty).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_query_row() {
    let db = products();
    let row = db.query_row("SELECT 1", &[]).await.unwrap().unwrap();
    assert_eq!(row.columns, vec!["id", "sku", "price", "active"]);
    assert_eq!(row.values[2], Some(b"9.99".to_vec()));
    assert!(db.cursor_closed());

    let empty = FakeDb::with_rows(["id"], vec![]);
    assert_eq!(empty.query_row("SELECT 1", &[]).await.unwrap(), None);
}

#[tokio::test]
async fn test_scan_error_names_the_row() {
    let db = FakeDb::with_rows(
        ["id"],
        vec![text_row([Some("1")]), text_row([Some("not a number")])],
    );
    let mut sel = Select::new(["id"]).from("catalog_product_entity");
    let mut all = Products::default();
    let err = sel.bind().unwrap().load(&db, &mut all).await.unwrap_err();
    assert!(err.is(ErrorKind::NotValid));
    assert!(err.to_string().contains("row 2"));
    assert!(db.cursor_closed());
}

#[tokio::test]
async fn test_prepared_statement() {
    let db = FakeDb::default();
    let mut sel = Select::star()
        .from("t")
        .filter(column("id").in_().placeholder());
    let mut bound = sel.bind().unwrap().int64s([1, 2]).expand_placeholders();
    let stmt = bound.prepare_statement(&db).await.unwrap();
    assert_eq!(stmt.sql(), "SELECT * FROM `t` WHERE (`id` IN (?,?))");

    bound.reset().push(Argument::new(vec![3i64, 4]));
    bound.exec_prepared(&stmt).await.unwrap();
    assert_eq!(
        db.statements(),
        vec![(stmt.sql().to_string(), vec![Value::Int(3), Value::Int(4)])]
    );

    bound.reset().push(Argument::new(vec![5i64, 6, 7]));
    let err = bound.exec_prepared(&stmt).await.unwrap_err();
    assert!(err.is(ErrorKind::Mismatch));
    stmt.close().await.unwrap();
}

#[tokio::test]
async fn test_interpolated_statement_cannot_be_prepared() {
    let db = FakeDb::default();
    let mut sel = Select::star().from("t").filter(column("id").placeholder());
    let err = sel
        .bind()
        .unwrap()
        .int64(1)
        .interpolate()
        .prepare_statement(&db)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotAllowed));
}

// ===== iteration =====

#[tokio::test]
async fn test_iterate_serial_in_order() {
    let db = numbered(5);
    let mut sel = Select::new(["entity_id"]).from("sales_order");
    let mut seen = Vec::new();
    let count = sel
        .bind()
        .unwrap()
        .iterate_serial(&db, |cm| {
            let mut id = 0;
            while cm.next(1) {
                cm.int64(&mut id)?;
            }
            seen.push((cm.count(), id));
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(count, 5);
    assert_eq!(seen, vec![(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
    assert!(db.cursor_closed());
}

#[tokio::test]
async fn test_iterate_serial_stops_on_error() {
    let db = numbered(5);
    let mut sel = Select::new(["entity_id"]).from("sales_order");
    let mut calls = 0;
    let err = sel
        .bind()
        .unwrap()
        .iterate_serial(&db, |cm| {
            calls += 1;
            if cm.count() == 3 {
                return Err(DmlError::not_valid("bad row"));
            }
            Ok(())
        })
        .await
        .unwrap_err();
    assert_eq!(calls, 3);
    assert!(err.to_string().contains("row 3"));
    assert!(db.cursor_closed());
}

#[tokio::test]
async fn test_iterate_serial_cursor_error() {
    let db = FakeDb {
        fail_after: Some(2),
        ..numbered(5)
    };
    let mut sel = Select::new(["entity_id"]).from("sales_order");
    let err = sel
        .bind()
        .unwrap()
        .iterate_serial(&db, |_| Ok(()))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Execution));
    assert!(db.cursor_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_iterate_parallel_visits_every_row() {
    let db = numbered(50);
    let mut sel = Select::new(["entity_id"]).from("sales_order");
    let sum = Arc::new(AtomicI64::new(0));
    let total = Arc::clone(&sum);
    sel.bind()
        .unwrap()
        .iterate_parallel(&db, 4, &CancellationToken::new(), move |cm| {
            let mut id = 0;
            while cm.next(1) {
                cm.int64(&mut id)?;
            }
            assert_eq!(cm.count(), id as u64);
            total.fetch_add(id, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(sum.load(Ordering::SeqCst), (1..=50).sum::<i64>());
    assert!(db.cursor_closed());
}

#[tokio::test]
async fn test_iterate_parallel_rejects_zero_workers() {
    let db = numbered(3);
    let mut sel = Select::new(["entity_id"]).from("sales_order");
    let err = sel
        .bind()
        .unwrap()
        .iterate_parallel(&db, 0, &CancellationToken::new(), |_| Ok(()))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::OutOfRange));
    assert!(db.statements().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_iterate_parallel_collects_every_error() {
    let db = numbered(10);
    let mut sel = Select::new(["entity_id"]).from("sales_order");
    // all three workers fail together
    let barrier = Arc::new(Barrier::new(3));
    let err = sel
        .bind()
        .unwrap()
        .iterate_parallel(&db, 3, &CancellationToken::new(), move |cm| {
            tokio::task::block_in_place(|| barrier.wait());
            Err(DmlError::not_valid(format!("row {} rejected", cm.count())))
        })
        .await
        .unwrap_err();
    match err {
        DmlError::Multi(errors) => {
            assert_eq!(errors.len(), 3);
            assert!(errors.iter().all(|e| e.is(ErrorKind::NotValid)));
        }
        other => panic!("expected several errors, got {other}"),
    }
    assert!(db.cursor_closed());
}

#[tokio::test]
async fn test_iterate_parallel_single_error() {
    let db = numbered(20);
    let mut sel = Select::new(["entity_id"]).from("sales_order");
    let err = sel
        .bind()
        .unwrap()
        .iterate_parallel(&db, 1, &CancellationToken::new(), |cm| {
            if cm.count() == 4 {
                return Err(DmlError::not_valid("bad row"));
            }
            Ok(())
        })
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::NotValid));
    assert!(err.to_string().contains("row 4"));
    assert!(db.cursor_closed());
}

#[tokio::test]
async fn test_iterate_parallel_cancelled() {
    let db = numbered(20);
    let mut sel = Select::new(["entity_id"]).from("sales_order");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = sel
        .bind()
        .unwrap()
        .iterate_parallel(&db, 2, &cancel, |_| Ok(()))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Execution));
    assert!(err.to_string().contains("cancelled"));
    assert!(db.cursor_closed());
}
