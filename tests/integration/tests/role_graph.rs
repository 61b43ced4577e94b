//! Role graph, default roles, scope mappings, and application lifecycle.

use std::collections::HashSet;
use std::sync::Arc;

use kc_integration_tests::memory_store;
use kc_model::{ClaimMask, RoleOwner};
use kc_realm::{Applications, RealmError, RoleContainer};
use kc_storage::{ModelStore, RoleMappingProvider, RoleProvider};
use uuid::Uuid;

fn names(roles: &HashSet<kc_model::Role>) -> HashSet<&str> {
    roles.iter().map(|r| r.name.as_str()).collect()
}

/// Application `A` has roles `{admin, user}` and defaults `{user}`;
/// reconciling to `["admin", "editor"]` creates `editor` and keeps `user`.
#[tokio::test]
async fn test_default_role_reconciliation_example() -> anyhow::Result<()> {
    let store = memory_store();
    let applications = Applications::new(store.clone());
    let app = applications.create(Uuid::now_v7(), "A").await?;

    app.add_role("admin").await?;
    app.add_role("user").await?;
    app.update_default_roles(&["user"]).await?;

    app.update_default_roles(&["admin", "editor"]).await?;

    let mut defaults = app.get_default_roles().await?;
    defaults.sort();
    assert_eq!(defaults, vec!["admin", "editor"]);

    let roles = app.get_roles().await?;
    assert_eq!(names(&roles), HashSet::from(["admin", "user", "editor"]));

    // A second identical call changes nothing.
    app.update_default_roles(&["admin", "editor"]).await?;
    let mut again = app.get_default_roles().await?;
    again.sort();
    assert_eq!(again, defaults);
    assert_eq!(app.get_roles().await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_role_removal_leaves_no_references() -> anyhow::Result<()> {
    let store = memory_store();
    let applications = Applications::new(store.clone());
    let realm = Uuid::now_v7();
    let portal = applications.create(realm, "portal").await?;
    let billing = applications.create(realm, "billing").await?;
    let user = Uuid::now_v7();

    let admin = portal.add_role("admin").await?;
    portal.update_default_roles(&["admin"]).await?;
    portal.grant_role(user, &admin).await?;
    billing.add_scope(&admin).await?;

    // Billing cannot remove or see the portal's role.
    assert!(!billing.remove_role_by_id(admin.id).await?);
    assert!(billing.get_role_by_id(admin.id).await?.is_none());

    assert!(portal.remove_role_by_id(admin.id).await?);

    assert!(portal.get_roles().await?.is_empty());
    assert!(portal.get_default_roles().await?.is_empty());
    assert!(store.get_role_mappings(user).await?.is_empty());
    assert!(store.get_scope_mappings(billing.id()).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_mixed_ownership_mappings_are_narrowed() -> anyhow::Result<()> {
    let store = memory_store();
    let applications = Applications::new(store.clone());
    let realm = Uuid::now_v7();
    let portal = applications.create(realm, "portal").await?;
    let billing = applications.create(realm, "billing").await?;
    let realm_roles = RoleContainer::for_realm(store.clone(), realm);
    let user = Uuid::now_v7();

    let viewer = portal.add_role("viewer").await?;
    let invoices = billing.add_role("invoices").await?;
    let offline = realm_roles.add_role("offline_access").await?;
    for role in [&viewer, &invoices, &offline] {
        store.add_role_mapping(user, role.id).await?;
        store.add_scope_mapping(portal.id(), role.id).await?;
    }

    assert_eq!(
        portal.get_application_role_mappings(user).await?,
        HashSet::from([viewer.clone()])
    );
    assert_eq!(
        billing.get_application_role_mappings(user).await?,
        HashSet::from([invoices])
    );
    assert_eq!(
        portal.get_application_scope_mappings(portal.id()).await?,
        HashSet::from([viewer])
    );

    Ok(())
}

#[tokio::test]
async fn test_concurrent_add_role_yields_one_role() -> anyhow::Result<()> {
    let store = memory_store();
    let applications = Applications::new(store.clone());
    let app = applications.create(Uuid::now_v7(), "portal").await?;

    let sessions: Vec<RoleContainer> = (0..4)
        .map(|_| {
            let session: Arc<dyn ModelStore> = Arc::new(store.session());
            RoleContainer::for_application(session, app.application())
        })
        .collect();

    let mut handles = Vec::new();
    for container in sessions {
        handles.push(tokio::spawn(async move { container.add_role("auditor").await }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await??.id);
    }

    assert_eq!(ids.len(), 1);
    assert_eq!(
        store
            .list_roles(RoleOwner::Application(app.id()))
            .await?
            .len(),
        1
    );

    Ok(())
}

#[tokio::test]
async fn test_application_identity_round_trip() -> anyhow::Result<()> {
    let store = memory_store();
    let applications = Applications::new(store.clone());
    let realm = Uuid::now_v7();
    let mut app = applications.create(realm, "portal").await?;

    assert!(!app.validate_secret(""));

    {
        let identity = app.application_mut();
        identity.set_secret(Some("s3cr3t".to_string()));
        identity.add_redirect_uri("https://portal.example/callback");
        identity.add_redirect_uri("https://portal.example/silent");
        identity.add_web_origin("https://portal.example");
        identity.allowed_claims_mask = ClaimMask::NAME;
        identity.allowed_claims_mask.insert(ClaimMask::EMAIL);
        identity.surrogate_auth_required = true;
        identity.management_url = Some("https://portal.example/admin".to_string());
    }
    applications.update(app.application()).await?;

    let stored = applications
        .get_by_name(realm, "portal")
        .await?
        .ok_or_else(|| anyhow::anyhow!("application vanished"))?;

    assert!(stored.validate_secret("s3cr3t"));
    assert!(!stored.validate_secret("S3cr3t"));
    assert!(!stored.validate_secret(""));

    let identity = stored.application();
    assert!(identity.allowed_claims_mask.contains(ClaimMask::EMAIL));
    assert!(!identity.allowed_claims_mask.contains(ClaimMask::PHONE));
    assert!(identity.surrogate_auth_required);

    // Copies are independent of stored state.
    let mut uris = identity.redirect_uris();
    uris.clear();
    assert_eq!(identity.redirect_uris().len(), 2);

    let mut edited = identity.clone();
    assert!(edited.remove_redirect_uri("https://portal.example/silent"));
    applications.update(&edited).await?;
    let reloaded = applications
        .get_by_id(app.id())
        .await?
        .ok_or_else(|| anyhow::anyhow!("application vanished"))?;
    assert_eq!(reloaded.application().redirect_uris().len(), 1);
    assert_eq!(reloaded, stored);

    Ok(())
}

#[tokio::test]
async fn test_deregistration_cascades() -> anyhow::Result<()> {
    let store = memory_store();
    let applications = Applications::new(store.clone());
    let realm = Uuid::now_v7();
    let app = applications.create(realm, "portal").await?;
    let user = Uuid::now_v7();

    app.update_default_roles(&["viewer", "editor"]).await?;
    let viewer = app
        .get_role("viewer")
        .await?
        .ok_or_else(|| anyhow::anyhow!("viewer missing"))?;
    app.grant_role(user, &viewer).await?;

    assert!(applications.deregister(app.id()).await?);
    assert!(applications.list(realm).await?.is_empty());
    assert!(store.get_role_mappings(user).await?.is_empty());

    // The name is free again.
    let again = applications.create(realm, "portal").await?;
    assert!(again.get_roles().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_invalid_arguments_are_rejected_up_front() -> anyhow::Result<()> {
    let store = memory_store();
    let applications = Applications::new(store.clone());
    let app = applications.create(Uuid::now_v7(), "portal").await?;

    assert!(matches!(
        app.add_role("").await,
        Err(RealmError::InvalidArgument(_))
    ));
    assert!(matches!(
        app.update_default_roles(&["ok", " "]).await,
        Err(RealmError::InvalidArgument(_))
    ));
    assert!(app.get_roles().await?.is_empty());

    Ok(())
}
