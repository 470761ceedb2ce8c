//! Learning store tests against an on-disk database.

use invoice_recon_core::{
    Database, DecisionStatus, InvoiceLineItem, LearningStore, RawInvoice, RecordOutcome,
    ReconEngine,
};
use tempfile::TempDir;

fn approved_invoice(number: &str) -> RawInvoice {
    RawInvoice {
        vendor_name: Some("Acme Supplies Inc.".into()),
        invoice_number: Some(number.into()),
        invoice_date: Some("2024-11-04".into()),
        line_items: vec![InvoiceLineItem::new("A4 Paper Box", 24.0, 90.0, 2160.0)],
        subtotal: Some(2160.0),
        tax: Some(178.2),
        shipping: Some(0.0),
        total: Some(2338.2),
        ..Default::default()
    }
}

#[test]
fn test_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.sqlite");

    {
        let db = Database::open(&path).unwrap();
        let outcome = db
            .record_invoice(&approved_invoice("INV-1"), DecisionStatus::Approved, "Acme Supplies Inc.")
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Recorded);
    }

    let db = Database::open(&path).unwrap();
    assert!(db.is_recorded("INV-1").unwrap());

    let stat = db
        .learned_rate("Acme Supplies Inc.", "A4 Paper Box")
        .unwrap()
        .unwrap();
    assert_eq!(stat.count, 1);
    assert!((stat.avg - 90.0).abs() < 1e-9);
}

#[test]
fn test_recording_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("history.sqlite")).unwrap();
    let invoice = approved_invoice("INV-1");

    for expected in [RecordOutcome::Recorded, RecordOutcome::Duplicate, RecordOutcome::Duplicate] {
        let outcome = db
            .record_invoice(&invoice, DecisionStatus::Approved, "Acme Supplies Inc.")
            .unwrap();
        assert_eq!(outcome, expected);
    }

    let stats = db.stats().unwrap();
    assert_eq!(stats.total_invoices, 1);
    assert_eq!(stats.price_observations, 1);
}

#[test]
fn test_flagged_invoices_never_contaminate() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("history.sqlite")).unwrap();

    let mut overpriced = approved_invoice("INV-9");
    overpriced.line_items = vec![InvoiceLineItem::new("A4 Paper Box", 24.0, 200.0, 4800.0)];

    let outcome = db
        .record_invoice(&overpriced, DecisionStatus::Flagged, "Acme Supplies Inc.")
        .unwrap();
    assert_eq!(outcome, RecordOutcome::NotApproved);
    assert!(db.learned_rate("Acme Supplies Inc.", "A4 Paper Box").unwrap().is_none());
    assert!(!db.is_recorded("INV-9").unwrap());
}

#[test]
fn test_engine_records_only_approved() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("history.sqlite")).unwrap();
    let engine = ReconEngine::builtin().with_store(db);

    let (processed, outcome) = engine.reconcile(&approved_invoice("INV-1"), true).unwrap();
    assert!(processed.decision.is_approved());
    assert_eq!(outcome, Some(RecordOutcome::Recorded));

    let mut overpriced = approved_invoice("INV-2");
    overpriced.line_items = vec![InvoiceLineItem::new("A4 Paper Box", 24.0, 200.0, 4800.0)];
    overpriced.subtotal = Some(4800.0);
    overpriced.tax = None;
    overpriced.total = None;
    let (processed, outcome) = engine.reconcile(&overpriced, true).unwrap();
    assert_eq!(processed.decision.status(), DecisionStatus::Flagged);
    assert_eq!(outcome, Some(RecordOutcome::NotApproved));

    let (_, outcome) = engine.reconcile(&approved_invoice("INV-3"), false).unwrap();
    assert_eq!(outcome, None);

    let stats = engine.store_stats().unwrap().unwrap();
    assert_eq!(stats.total_invoices, 1);
    assert_eq!(stats.unique_vendors, 1);
    assert_eq!(stats.unique_items_tracked, 1);
}
