use super::*;

use std::time::Duration;

use shared::domain::ProductId;

use crate::{
    auth_widget::SubmitOutcome,
    list_widget::ProductField,
    notifications::ToastKind,
    session_controller::{ViewMode, SESSION_EXPIRED_MESSAGE},
    test_support::{product, settings_for, spawn_catalog, wait_for, MockCatalog},
};

const COLLECTION: &str = "/api/v1/productos";

async fn started_page(state: &MockCatalog) -> (CatalogPage, JoinHandle<()>) {
    state.update(|inner| inner.require_cookie = true).await;
    let base_url = spawn_catalog(state.clone()).await.expect("spawn server");
    let page = CatalogPage::connect(&settings_for(&base_url)).expect("page");
    let handle = page.start();
    (page, handle)
}

async fn logged_in_page(state: &MockCatalog) -> (CatalogPage, JoinHandle<()>) {
    let (page, handle) = started_page(state).await;
    page.auth.set_username("alice");
    page.auth.set_password("pw");
    assert!(matches!(
        page.auth.submit().await,
        SubmitOutcome::Authenticated(_)
    ));
    let mut list = page.list.watch();
    wait_for(&mut list, |state| state.renders >= 1).await;
    (page, handle)
}

async fn wait_for_toast(page: &CatalogPage, kind: ToastKind, message: &str) {
    let mut toasts = page.toasts.watch();
    wait_for(&mut toasts, |board| {
        board
            .history
            .iter()
            .any(|toast| toast.kind == kind && toast.message == message)
    })
    .await;
}

#[tokio::test]
async fn login_reveals_catalog_after_a_single_fetch() {
    let state = MockCatalog::with_products(vec![
        product("1", "Lamp", 12.0),
        product("2", "Desk", 99.5),
    ]);
    let (page, _handle) = started_page(&state).await;
    let mut surfaces = page.session_controller.watch_surfaces();
    assert!(surfaces.borrow().auth_visible);

    page.auth.set_username("alice");
    page.auth.set_password("pw");
    page.auth.submit().await;

    wait_for(&mut surfaces, |s| s.catalog_visible && !s.auth_visible).await;
    let mut list = page.list.watch();
    wait_for(&mut list, |state| state.renders == 1).await;

    assert_eq!(surfaces.borrow().view_mode, Some(ViewMode::Admin));
    assert_eq!(page.list.items(), state.products().await);
    assert_eq!(state.count("GET", COLLECTION).await, 1);
    let requests = state.requests().await;
    let fetch = requests
        .iter()
        .find(|req| req.method == "GET")
        .expect("list request");
    assert!(fetch.had_cookie);
}

#[tokio::test]
async fn create_from_the_form_reloads_and_confirms() {
    let state = MockCatalog::with_products(vec![product("1", "Lamp", 12.0)]);
    let (page, _handle) = logged_in_page(&state).await;

    page.list.set_create_field(ProductField::Name, "Widget");
    page.list.set_create_field(ProductField::Description, "Blue");
    page.list.set_create_field(ProductField::Price, "9.99");
    page.list.submit_create().expect("valid form");

    let mut list = page.list.watch();
    wait_for(&mut list, |state| state.items.len() == 2).await;
    wait_for_toast(&page, ToastKind::Success, "Product created successfully").await;

    assert_eq!(page.list.items(), state.products().await);
    assert_eq!(page.list.rows()[1].price, "$9.99");
    assert_eq!(state.count("POST", COLLECTION).await, 1);
    assert_eq!(state.count("GET", COLLECTION).await, 2);
}

#[tokio::test]
async fn edit_from_the_panel_updates_the_row() {
    let state = MockCatalog::with_products(vec![product("1", "Lamp", 12.0)]);
    let (page, _handle) = logged_in_page(&state).await;

    page.list.click_edit(&ProductId::new("1")).expect("row exists");
    page.list
        .set_edit_field(ProductField::Price, "15.50")
        .expect("panel open");
    page.list.submit_edit().expect("valid edit");

    let mut list = page.list.watch();
    wait_for(&mut list, |state| {
        state.items.first().is_some_and(|item| item.price == 15.5)
    })
    .await;
    assert_eq!(state.count("PUT", "/api/v1/productos/1").await, 1);
    assert!(page.list.edit_panel().is_none());
}

#[tokio::test]
async fn rejected_session_on_delete_returns_to_auth() {
    let state = MockCatalog::with_products(vec![product("42", "Lamp", 12.0)]);
    let (page, _handle) = logged_in_page(&state).await;
    let mut surfaces = page.session_controller.watch_surfaces();
    state.update(|inner| inner.reject_session = true).await;

    page.list
        .click_delete(&ProductId::new("42"))
        .expect("row exists");

    wait_for(&mut surfaces, |s| s.auth_visible && !s.catalog_visible).await;
    assert!(page.list.items().is_empty());
    assert!(!page.session.is_active());
    assert!(page.toasts.contains(ToastKind::Error, SESSION_EXPIRED_MESSAGE));
    assert_eq!(state.count("DELETE", "/api/v1/productos/42").await, 1);
    assert_eq!(state.count("GET", COLLECTION).await, 1);
}

#[derive(Debug, Clone, Copy)]
enum RejectedCall {
    InitialLoad,
    Create,
    Edit,
    Delete,
}

#[tokio::test]
async fn any_rejected_catalog_call_expires_the_session() {
    for call in [
        RejectedCall::InitialLoad,
        RejectedCall::Create,
        RejectedCall::Edit,
        RejectedCall::Delete,
    ] {
        let state = MockCatalog::with_products(vec![product("42", "Lamp", 12.0)]);
        let (page, _handle) = started_page(&state).await;
        if let RejectedCall::InitialLoad = call {
            state.update(|inner| inner.reject_session = true).await;
        }
        page.auth.set_username("alice");
        page.auth.set_password("pw");
        assert!(matches!(
            page.auth.submit().await,
            SubmitOutcome::Authenticated(_)
        ));

        if !matches!(call, RejectedCall::InitialLoad) {
            let mut list = page.list.watch();
            wait_for(&mut list, |state| state.renders >= 1).await;
            state.update(|inner| inner.reject_session = true).await;
        }
        let id = ProductId::new("42");
        match call {
            RejectedCall::InitialLoad => {}
            RejectedCall::Create => {
                page.list.set_create_field(ProductField::Name, "Widget");
                page.list.set_create_field(ProductField::Description, "x");
                page.list.set_create_field(ProductField::Price, "9.99");
                page.list.submit_create().expect("valid form");
            }
            RejectedCall::Edit => {
                page.list.click_edit(&id).expect("row exists");
                page.list.submit_edit().expect("valid edit");
            }
            RejectedCall::Delete => page.list.click_delete(&id).expect("row exists"),
        }

        wait_for_toast(&page, ToastKind::Error, SESSION_EXPIRED_MESSAGE).await;
        let mut surfaces = page.session_controller.watch_surfaces();
        wait_for(&mut surfaces, |s| s.auth_visible && !s.catalog_visible).await;

        assert!(page.list.items().is_empty(), "{call:?}: cache cleared");
        assert!(!page.session.is_active(), "{call:?}: session reset");
        assert_eq!(
            state.count("GET", COLLECTION).await,
            1,
            "{call:?}: no reload after the 401"
        );
    }
}

#[tokio::test]
async fn logout_clears_the_page() {
    let state = MockCatalog::with_products(vec![product("1", "Lamp", 12.0)]);
    let (page, _handle) = logged_in_page(&state).await;
    let mut surfaces = page.session_controller.watch_surfaces();

    page.auth.logout().await.expect("logout");

    wait_for(&mut surfaces, |s| s.auth_visible).await;
    assert!(page.list.items().is_empty());
    assert!(!page.session.is_active());
    let logout = state
        .requests()
        .await
        .into_iter()
        .find(|req| req.path == "/api/auth/logout")
        .expect("logout request");
    assert!(logout.had_cookie);
    assert!(page.toasts.history().is_empty());
}

#[tokio::test]
async fn loop_stops_once_the_page_is_dropped() {
    let state = MockCatalog::default();
    let (page, handle) = started_page(&state).await;

    drop(page);

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop stopped")
        .expect("loop did not panic");
}
