//! Architectural Contract Test: Overwrite Semantics
//!
//! The latest-value slot always reflects the most recently processed
//! payload. That includes the uncomfortable case: a payload whose weight
//! fails to parse still overwrites a previously valid reading with a
//! null weight. These tests pin that behavior down so nobody "fixes" it
//! silently.

mod common;

use common::*;
use scale_core::engine::IngestEngine;
use scale_core::store::LatestValueStore;
use scale_core::traits::PayloadEvent;

#[tokio::test]
async fn bad_payload_overwrites_valid_reading_with_null_weight() {
    let (transport, payload_tx) = ControlledTransport::new();
    let store = LatestValueStore::new();

    let (engine, _event_rx) = IngestEngine::new(
        Box::new(transport),
        store.clone(),
        None,
        minimal_engine_config(),
    )
    .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle =
        tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    payload_tx
        .send(PayloadEvent::new("RTW:0.650 kg", allowed_peer()))
        .expect("payload send succeeds");

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    assert_eq!(store.current().await.unwrap().weight, Some(0.65));

    // The follow-up packet is garbage; it still takes the slot
    payload_tx
        .send(PayloadEvent::new("garbage", allowed_peer()))
        .expect("payload send succeeds");

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    let current = store.current().await.expect("store holds a reading");
    assert_eq!(current.weight, None);
    assert_eq!(current.message, "garbage");

    shutdown_tx.send(()).unwrap();
    engine_handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn valid_payload_recovers_the_slot() {
    let (transport, payload_tx) = ControlledTransport::new();
    let store = LatestValueStore::new();

    let (engine, _event_rx) = IngestEngine::new(
        Box::new(transport),
        store.clone(),
        None,
        minimal_engine_config(),
    )
    .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle =
        tokio::spawn(async move { engine.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    payload_tx
        .send(PayloadEvent::new("garbage", allowed_peer()))
        .expect("payload send succeeds");
    payload_tx
        .send(PayloadEvent::new("RTW:0.550 kg", allowed_peer()))
        .expect("payload send succeeds");

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    let current = store.current().await.expect("store holds a reading");
    assert_eq!(current.weight, Some(0.55));
    assert_eq!(current.message, "RTW:0.550 kg");

    shutdown_tx.send(()).unwrap();
    engine_handle.await.unwrap().unwrap();
}
