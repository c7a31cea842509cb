//! Integration tests for the PostgreSQL billing store
//!
//! Each test starts its own PostgreSQL container, so they are ignored by
//! default. Run with `cargo test -p infra_db -- --ignored` where Docker is
//! available.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use core_kernel::{PageRequest, PortError};
use domain_billing::{
    BillQuery, BillRecordStore, BillStatus, BillType, BillingEngine, BillingError, BillingStore,
    CreditPaymentRequest, CreditShortfallPolicy, CustomerLedger, InventoryStore, PaymentMethod,
    SequenceBillNumberGenerator, UnitOfWork,
};
use infra_db::PostgresBillingStore;
use test_utils::{
    seed_store, BillBuilder, MoneyFixtures, ReturnRequestBuilder, SaleRequestBuilder, SeedData,
    TestDatabase,
};

async fn seeded_store() -> (TestDatabase, PostgresBillingStore, SeedData) {
    let db = TestDatabase::start().await.expect("Failed to start test database");
    let store = PostgresBillingStore::new(db.pool().clone());
    let seed = seed_store(&store).await.unwrap();
    (db, store, seed)
}

fn engine(store: &PostgresBillingStore) -> BillingEngine {
    BillingEngine::new(
        Arc::new(store.clone()),
        Arc::new(SequenceBillNumberGenerator::new()),
        Default::default(),
    )
}

mod repository_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_customer_and_product_round_trip() {
        let (_db, store, seed) = seeded_store().await;
        let mut uow = store.begin().await.unwrap();

        let bob = uow.find_customer(seed.bob.id).await.unwrap().unwrap();
        assert_eq!(bob.credit_balance.amount(), dec!(30));
        assert_eq!(bob.contact, "555-0101");

        let by_contact = uow.find_customer_by_contact("555-0100").await.unwrap().unwrap();
        assert_eq!(by_contact.id, seed.alice.id);

        let widget = uow.find_product(seed.widget.id).await.unwrap().unwrap();
        assert_eq!(widget.quantity_on_hand, 10);
        assert_eq!(widget.unit_price.amount(), dec!(100));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_duplicate_bill_number_is_conflict() {
        let (_db, store, seed) = seeded_store().await;
        let first = BillBuilder::sale("AD010124-AAAA", seed.alice.id).line(&seed.widget, 1).build();
        let second = BillBuilder::sale("ad010124-aaaa", seed.alice.id).line(&seed.widget, 1).build();

        let mut uow = store.begin().await.unwrap();
        uow.save_bill(&first).await.unwrap();
        let err = uow.save_bill(&second).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict { .. }));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_uncommitted_work_is_rolled_back() {
        let (db, store, seed) = seeded_store().await;
        {
            let mut uow = store.begin().await.unwrap();
            let bill = BillBuilder::sale("AD010124-BBBB", seed.alice.id).line(&seed.widget, 1).build();
            uow.save_bill(&bill).await.unwrap();
        }
        assert_eq!(db.count_rows("bills").await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_search_escapes_like_wildcards() {
        let (_db, store, seed) = seeded_store().await;
        let mut uow = store.begin().await.unwrap();
        let bill = BillBuilder::sale("AD010124-CCCC", seed.alice.id).line(&seed.widget, 1).build();
        uow.save_bill(&bill).await.unwrap();

        let hits = uow
            .list_bills(&BillQuery {
                search: Some("%".to_string()),
                customer_id: None,
                page: PageRequest::default(),
            })
            .await
            .unwrap();
        assert_eq!(hits.total, 0);

        let hits = uow
            .list_bills(&BillQuery {
                search: Some("alice".to_string()),
                customer_id: None,
                page: PageRequest::default(),
            })
            .await
            .unwrap();
        assert_eq!(hits.total, 1);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_delete_cascades_lines() {
        let (db, store, seed) = seeded_store().await;
        let bill = BillBuilder::sale("AD010124-DDDD", seed.alice.id)
            .line(&seed.widget, 1)
            .line(&seed.gadget, 2)
            .build();

        let mut uow = store.begin().await.unwrap();
        uow.save_bill(&bill).await.unwrap();
        assert!(uow.delete_bill(bill.id).await.unwrap());
        assert!(!uow.delete_bill(bill.id).await.unwrap());
        uow.commit().await.unwrap();

        assert_eq!(db.count_rows("bill_lines").await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_credit_payment_round_trip() {
        let (db, store, seed) = seeded_store().await;
        let payment = BillBuilder::sale("BR010124-EEEE", seed.bob.id)
            .credit_payment(MoneyFixtures::usd(dec!(12.50)))
            .build();

        let mut uow = store.begin().await.unwrap();
        uow.save_bill(&payment).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let loaded = uow.find_bill_by_number("br010124-eeee").await.unwrap().unwrap();
        assert_eq!(loaded.bill_type, BillType::CreditsPayment);
        assert_eq!(loaded.total_amount.amount(), dec!(12.50));
        assert!(loaded.lines.is_empty());
        assert_eq!(db.count_rows("bill_lines").await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_count_rows_rejects_unknown_table() {
        let (db, _store, _seed) = seeded_store().await;
        assert_eq!(db.count_rows("customers").await.unwrap(), 2);
        assert!(db.count_rows("pg_user").await.is_err());
    }
}

mod engine_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_credit_sale_return_and_payment() {
        let (_db, store, seed) = seeded_store().await;
        let engine = engine(&store);

        let sale = engine
            .create_bill(
                SaleRequestBuilder::for_customer(seed.alice.id)
                    .paid_by(PaymentMethod::Credit)
                    .discounted_line(seed.widget.id, 3, dec!(5))
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(sale.total_amount.amount(), dec!(285));

        let partial = engine
            .process_return(
                ReturnRequestBuilder::against(sale.bill_number.to_lowercase())
                    .line(seed.widget.id, 1)
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(partial.bill_type, BillType::PartialReturn);
        assert_eq!(partial.total_amount.amount(), dec!(95));

        let full = engine
            .process_return(ReturnRequestBuilder::against(&sale.bill_number).line(seed.widget.id, 2).build())
            .await
            .unwrap();
        assert_eq!(full.bill_type, BillType::FullReturn);

        let original = engine.get_bill(&sale.bill_number).await.unwrap();
        assert_eq!(original.bill_status, BillStatus::Cancelled);
        assert_eq!(original.bill_type, BillType::FullReturn);

        let history = engine.return_history(&sale.bill_number).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].bill_number, partial.bill_number);

        let mut uow = store.begin().await.unwrap();
        let alice = uow.find_customer(seed.alice.id).await.unwrap().unwrap();
        assert!(alice.credit_balance.is_zero());
        let widget = uow.find_product(seed.widget.id).await.unwrap().unwrap();
        assert_eq!(widget.quantity_on_hand, 10);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_credit_payment_bounds() {
        let (_db, store, seed) = seeded_store().await;
        let engine = engine(&store);

        let err = engine
            .create_credit_payment(CreditPaymentRequest {
                customer_id: Some(seed.bob.id),
                amount: dec!(50),
                payment_method: Some(PaymentMethod::Cash),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidCreditAmount { .. }));

        let paid = engine
            .create_credit_payment(CreditPaymentRequest {
                customer_id: Some(seed.bob.id),
                amount: dec!(30),
                payment_method: Some(PaymentMethod::Online),
            })
            .await
            .unwrap();
        assert_eq!(paid.bill_type, BillType::CreditsPayment);
        assert!(paid.lines.is_empty());

        let summary = engine.credit_summary().await.unwrap();
        assert_eq!(summary.customers_with_credit, 0);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_concurrent_returns_never_over_return() {
        let (_db, store, seed) = seeded_store().await;
        let engine = engine(&store);
        let sale = engine
            .create_bill(SaleRequestBuilder::for_customer(seed.alice.id).line(seed.widget.id, 3).build())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let engine = engine.clone();
            let request = ReturnRequestBuilder::against(&sale.bill_number).line(seed.widget.id, 1).build();
            handles.push(tokio::spawn(async move { engine.process_return(request).await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 3);

        let history = engine.return_history(&sale.bill_number).await.unwrap();
        let returned: i32 = history.iter().flat_map(|b| b.lines.iter()).map(|l| l.quantity).sum();
        assert_eq!(returned, 3);
        assert_eq!(CreditShortfallPolicy::default(), engine.config().credit_shortfall);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_reads_do_not_wait_on_locked_customer() {
        let (_db, store, seed) = seeded_store().await;
        let engine = engine(&store);
        let sale = engine
            .create_bill(SaleRequestBuilder::for_customer(seed.alice.id).line(seed.widget.id, 1).build())
            .await
            .unwrap();

        let mut writer = store.begin().await.unwrap();
        writer.lock_customer(seed.alice.id).await.unwrap().unwrap();

        let read = tokio::time::timeout(Duration::from_secs(5), async {
            let bill = engine.get_bill(&sale.bill_number).await?;
            let page = engine.bills_for_customer_contact("555-0100", PageRequest::default()).await?;
            let history = engine.return_history(&sale.bill_number).await?;
            Ok::<_, BillingError>((bill, page, history))
        })
        .await
        .expect("read blocked behind a customer lock")
        .unwrap();
        assert_eq!(read.0.customer_name, "Alice Doe");
        assert_eq!(read.1.total, 1);
        assert!(read.2.is_empty());
        drop(writer);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires Docker"]
    async fn test_opposite_line_orders_do_not_deadlock() {
        let (_db, store, seed) = seeded_store().await;
        let engine = engine(&store);

        let mut handles = Vec::new();
        for i in 0..8 {
            let engine = engine.clone();
            let customer = if i % 2 == 0 { seed.alice.id } else { seed.bob.id };
            let (first, second) = if i % 2 == 0 {
                (seed.widget.id, seed.gadget.id)
            } else {
                (seed.gadget.id, seed.widget.id)
            };
            let request = SaleRequestBuilder::for_customer(customer)
                .line(first, 1)
                .line(second, 1)
                .build();
            handles.push(tokio::spawn(async move { engine.create_bill(request).await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(BillingError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(succeeded, 5);

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.find_product(seed.widget.id).await.unwrap().unwrap().quantity_on_hand, 5);
        assert_eq!(uow.find_product(seed.gadget.id).await.unwrap().unwrap().quantity_on_hand, 0);
    }
}
