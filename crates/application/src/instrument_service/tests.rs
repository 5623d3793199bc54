use std::sync::Arc;

use brokerdesk_core::AppError;
use brokerdesk_domain::{ChangeType, InstrumentDraft, InstrumentType, Permission};

use crate::test_support::{TradingBook, actor, authorization, authorization_all};

use super::InstrumentService;

fn draft() -> InstrumentDraft {
    InstrumentDraft {
        symbol: " ubsg ".to_owned(),
        name: "UBS Group AG".to_owned(),
        isin: Some("CH0244767585".to_owned()),
        instrument_type: InstrumentType::Stock,
        currency: "chf".to_owned(),
        exchange: Some("XSWX".to_owned()),
        lot_size: 1,
        is_active: true,
    }
}

#[tokio::test]
async fn deactivation_is_recorded_as_single_field_change() {
    let book = Arc::new(TradingBook::default());
    let service = InstrumentService::new(book.clone(), authorization_all());

    let instrument = service
        .create_instrument(&actor(), draft())
        .await
        .unwrap_or_else(|error| panic!("instrument should be created: {error}"))
        .value;
    assert_eq!(instrument.symbol, "UBSG");
    book.changes.clear().await;

    let mut deactivate = draft();
    deactivate.is_active = false;
    let updated = service
        .update_instrument(&actor(), instrument.id, instrument.row_version, deactivate)
        .await
        .unwrap_or_else(|error| panic!("instrument should be updated: {error}"));

    assert!(updated.audit.old_values.is_some());
    let recorded = book.changes.recorded().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].field_name, "IsActive");
    assert_eq!(recorded[0].old_value.as_deref(), Some("true"));
    assert_eq!(recorded[0].new_value.as_deref(), Some("false"));
    assert_eq!(recorded[0].change_type, ChangeType::Modified);
}

#[tokio::test]
async fn stale_update_leaves_instrument_untouched() {
    let book = Arc::new(TradingBook::default());
    let service = InstrumentService::new(book.clone(), authorization_all());
    let instrument = service
        .create_instrument(&actor(), draft())
        .await
        .unwrap_or_else(|error| panic!("instrument should be created: {error}"))
        .value;

    let mut rename = draft();
    rename.name = "UBS".to_owned();
    let result = service
        .update_instrument(&actor(), instrument.id, instrument.row_version.next(), rename)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    let stored = book.instruments.lock().await.get(&instrument.id).cloned();
    assert_eq!(stored.map(|stored| stored.name), Some("UBS Group AG".to_owned()));
}

#[tokio::test]
async fn delete_requires_permission() {
    let book = Arc::new(TradingBook::default());
    let instrument = book.seed_instrument(true).await;
    let service = InstrumentService::new(
        book.clone(),
        authorization(&[Permission::InstrumentsRead, Permission::InstrumentsUpdate]),
    );

    let result = service
        .delete_instrument(&actor(), instrument.id, None)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}
