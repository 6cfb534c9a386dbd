use super::*;

use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use shared::{
    domain::{BoxId, PalletId, RecordKind},
    error::InventoryError,
};

async fn inventory() -> Inventory {
    Inventory::open("sqlite::memory:", DisplayOptions::default())
        .await
        .expect("inventory")
}

fn codes<T>(items: &[T], code: impl Fn(&T) -> &str) -> Vec<String> {
    items.iter().map(|item| code(item).to_string()).collect()
}

#[tokio::test]
async fn sequential_pallets_are_coded_p1_to_pn() {
    let mut inventory = inventory().await;
    for _ in 0..5 {
        inventory.add_pallet().await.expect("pallet");
    }

    let pallets = inventory.list_pallets().await.expect("list");
    assert_eq!(
        codes(&pallets, |p| p.code.as_str()),
        vec!["P1", "P2", "P3", "P4", "P5"]
    );
}

#[tokio::test]
async fn pallet_box_listing_scenario() {
    let mut inventory = inventory().await;

    let p1 = inventory.add_pallet().await.expect("p1");
    assert_eq!(p1.code, "P1");
    let p2 = inventory.add_pallet().await.expect("p2");
    assert_eq!(p2.code, "P2");

    let first_box = inventory.boxes.add_new(&p1).await.expect("box");
    assert_eq!(first_box.code, "P1C1");

    let p1_boxes = inventory.boxes.list(&p1).await.expect("p1 boxes");
    assert_eq!(codes(&p1_boxes, |b| b.code.as_str()), vec!["P1C1"]);
    let p2_boxes = inventory.boxes.list(&p2).await.expect("p2 boxes");
    assert!(p2_boxes.is_empty());
}

#[tokio::test]
async fn box_codes_count_per_pallet() {
    let mut inventory = inventory().await;
    let p1 = inventory.add_pallet().await.expect("p1");
    let p2 = inventory.add_pallet().await.expect("p2");

    for pallet in [&p1, &p2, &p1, &p1, &p2] {
        inventory.boxes.add_new(pallet).await.expect("box");
    }

    let p1_boxes = inventory.boxes.list(&p1).await.expect("p1 boxes");
    let p2_boxes = inventory.boxes.list(&p2).await.expect("p2 boxes");
    assert_eq!(codes(&p1_boxes, |b| b.code.as_str()), vec!["P1C1", "P1C2", "P1C3"]);
    assert_eq!(codes(&p2_boxes, |b| b.code.as_str()), vec!["P2C1", "P2C2"]);
    assert!(p1_boxes.iter().all(|b| b.pallet_id == p1.pallet_id));
}

#[tokio::test]
async fn boxes_added_after_listing_appear_in_next_listing() {
    let mut inventory = inventory().await;
    let pallet = inventory.add_pallet().await.expect("pallet");

    assert!(inventory.list_boxes().await.expect("empty").is_empty());
    inventory.add_box().await.expect("box");
    inventory.open_pallet("P1").await.expect("reopen");
    inventory.add_box().await.expect("box");

    let boxes = inventory.boxes.list(&pallet).await.expect("boxes");
    assert_eq!(codes(&boxes, |b| b.code.as_str()), vec!["P1C1", "P1C2"]);
}

#[tokio::test]
async fn scoped_operations_require_a_selected_parent() {
    let inventory = inventory().await;

    let err = inventory.list_boxes().await.expect_err("no pallet");
    assert_eq!(
        err.downcast_ref::<InventoryError>(),
        Some(&InventoryError::ParentNotSelected {
            parent: RecordKind::Pallet
        })
    );

    let err = inventory
        .list_box_products()
        .await
        .expect_err("no box");
    assert_eq!(
        err.downcast_ref::<InventoryError>(),
        Some(&InventoryError::ParentNotSelected {
            parent: RecordKind::Box
        })
    );
}

#[tokio::test]
async fn details_render_placeholder_until_finished() {
    let mut inventory = inventory().await;
    inventory.add_pallet().await.expect("pallet");
    inventory.add_box().await.expect("box");

    let today = DateDisplay::pallets().format_date(Local::now().date_naive());

    let details = inventory.open_pallet("P1").await.expect("details");
    assert_eq!(details.code, "P1");
    assert_eq!(details.created_at, today);
    assert_eq!(details.finished_at, "Não Finalizado");

    let details = inventory.open_box("P1C1").await.expect("box details");
    assert_eq!(details.finished_at, "Não Finalizada");

    let finished = inventory.finish_box().await.expect("finish box");
    assert_eq!(finished.finished_at, today);

    inventory.open_pallet("P1").await.expect("reopen");
    let finished = inventory.finish_pallet().await.expect("finish pallet");
    assert_eq!(finished.finished_at, today);
}

#[tokio::test]
async fn unknown_codes_are_not_found() {
    let mut inventory = inventory().await;
    let err = inventory.open_pallet("P9").await.expect_err("missing");
    assert_eq!(
        err.downcast_ref::<InventoryError>(),
        Some(&InventoryError::not_found(RecordKind::Pallet, "P9"))
    );

    let err = inventory.open_box("P9C1").await.expect_err("missing");
    assert!(matches!(
        err.downcast_ref::<InventoryError>(),
        Some(InventoryError::NotFound {
            kind: RecordKind::Box,
            ..
        })
    ));
}

#[tokio::test]
async fn products_go_into_the_open_box() {
    let mut inventory = inventory().await;
    inventory.add_pallet().await.expect("pallet");
    inventory.add_box().await.expect("box");
    inventory
        .add_product("Coffee 500g", "7891000100103")
        .await
        .expect("coffee");
    inventory
        .add_product("  Sugar 1kg ", " 7896005800019 ")
        .await
        .expect("sugar");

    let single = inventory
        .add_product_to_box("7891000100103", None)
        .await
        .expect("default quantity");
    assert_eq!(single.quantity, 1);
    inventory
        .add_product_to_box("7896005800019", Some(6))
        .await
        .expect("six");

    let lines = inventory.list_box_products().await.expect("lines");
    let summary: Vec<(String, u32)> = lines
        .iter()
        .map(|line| (line.product.name.clone(), line.quantity))
        .collect();
    assert_eq!(
        summary,
        vec![("Coffee 500g".to_string(), 1), ("Sugar 1kg".to_string(), 6)]
    );

    let err = inventory
        .add_product_to_box("0000000000000", None)
        .await
        .expect_err("unknown product");
    assert!(matches!(
        err.downcast_ref::<InventoryError>(),
        Some(InventoryError::NotFound {
            kind: RecordKind::Product,
            ..
        })
    ));
}

#[tokio::test]
async fn product_input_is_validated() {
    let inventory = inventory().await;

    for (name, ean) in [("", "123"), ("Tea", ""), ("Tea", "1234567890123456")] {
        let err = inventory
            .add_product(name, ean)
            .await
            .expect_err("rejected");
        assert!(matches!(
            err.downcast_ref::<InventoryError>(),
            Some(InventoryError::Validation(_))
        ));
    }

    inventory.add_product("Tea", "123456789012345").await.expect("15 chars");
    inventory
        .add_product("Green tea", "123456789012345")
        .await
        .expect_err("duplicate ean");
    assert_eq!(inventory.list_products().await.expect("list").len(), 1);
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let mut inventory = inventory().await;
    inventory.add_pallet().await.expect("pallet");
    inventory.add_box().await.expect("box");
    inventory.add_product("Tea", "42").await.expect("tea");

    let err = inventory
        .add_product_to_box("42", Some(0))
        .await
        .expect_err("zero");
    assert!(matches!(
        err.downcast_ref::<InventoryError>(),
        Some(InventoryError::Validation(_))
    ));
    assert!(inventory.list_box_products().await.expect("lines").is_empty());
}

#[tokio::test]
async fn controllers_announce_added_and_listed() {
    let inventory = inventory().await;
    let seen = Arc::new(Mutex::new(Vec::new()));

    for tag in [ControllerEvent::Added, ControllerEvent::Listed] {
        let seen = Arc::clone(&seen);
        inventory.pallets.events().listen_fn(tag, move |event| {
            seen.lock().expect("seen").push(event.clone());
            Ok(())
        });
    }

    let pallet = inventory.pallets.add_new().await.expect("pallet");
    inventory.pallets.list().await.expect("list");
    inventory
        .pallets
        .load_details(pallet.pallet_id)
        .await
        .expect("details");

    assert_eq!(
        *seen.lock().expect("seen"),
        vec![
            PalletEvent::Added(pallet.clone()),
            PalletEvent::Listed(vec![pallet]),
        ]
    );
}

#[tokio::test]
async fn listener_failure_reaches_the_caller() {
    let inventory = inventory().await;
    inventory
        .boxes
        .events()
        .listen_fn(ControllerEvent::Added, |_event| {
            Err(anyhow::anyhow!("list widget gone"))
        });
    let pallet = inventory.pallets.add_new().await.expect("pallet");

    let err = inventory.boxes.add_new(&pallet).await.expect_err("listener");
    assert_eq!(err.to_string(), "list widget gone");
}

#[tokio::test]
async fn finishing_unknown_records_is_not_found() {
    let inventory = inventory().await;

    let err = inventory
        .pallets
        .finish(PalletId(99))
        .await
        .expect_err("unknown pallet");
    assert_eq!(
        err.downcast_ref::<InventoryError>(),
        Some(&InventoryError::not_found(RecordKind::Pallet, 99))
    );

    let err = inventory
        .boxes
        .finish(BoxId(42))
        .await
        .expect_err("unknown box");
    assert_eq!(
        err.downcast_ref::<InventoryError>(),
        Some(&InventoryError::not_found(RecordKind::Box, 42))
    );
}

#[tokio::test]
async fn finishing_again_announces_the_original_date() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let created = NaiveDate::from_ymd_opt(2024, 1, 2).expect("date");
    let finished = NaiveDate::from_ymd_opt(2024, 2, 3).expect("date");
    let pallet_id = storage.insert_pallet("P1", created).await.expect("pallet");
    let box_id = storage
        .insert_box(pallet_id, "P1C1", created)
        .await
        .expect("box");
    storage
        .finish_pallet(pallet_id, finished)
        .await
        .expect("finish pallet");
    storage.finish_box(box_id, finished).await.expect("finish box");

    let inventory = Inventory::new(Arc::new(storage), DisplayOptions::default());
    let pallet_events = Arc::new(Mutex::new(Vec::new()));
    let box_events = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&pallet_events);
        inventory
            .pallets
            .events()
            .listen_fn(ControllerEvent::Finished, move |event| {
                seen.lock().expect("seen").push(event.clone());
                Ok(())
            });
        let seen = Arc::clone(&box_events);
        inventory
            .boxes
            .events()
            .listen_fn(ControllerEvent::Finished, move |event| {
                seen.lock().expect("seen").push(event.clone());
                Ok(())
            });
    }

    let details = inventory.pallets.finish(pallet_id).await.expect("pallet");
    assert_eq!(details.finished_at, "03/02/2024");
    let box_details = inventory.boxes.finish(box_id).await.expect("box");
    assert_eq!(box_details.finished_at, "03/02/2024");

    assert_eq!(
        *pallet_events.lock().expect("seen"),
        vec![PalletEvent::Finished(RecordDetails {
            code: "P1".to_string(),
            created_at: "02/01/2024".to_string(),
            finished_at: "03/02/2024".to_string(),
        })]
    );
    assert_eq!(
        *box_events.lock().expect("seen"),
        vec![BoxEvent::Finished(box_details)]
    );
}
