//! The same scenarios against a real `PostgreSQL` schema.
//!
//! These need Docker and are ignored by default.

use std::collections::HashSet;
use std::sync::Arc;

use kc_auth::{FlowError, FlowManager};
use kc_integration_tests::PostgresEnv;
use kc_model::{Requirement, RoleOwner};
use kc_realm::{Applications, RoleContainer};
use kc_storage::{
    AuthenticationFlowProvider, DefaultRoleProvider, ModelStore, RoleMappingProvider,
    RoleProvider, StorageError,
};
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pg_default_role_reconciliation() -> anyhow::Result<()> {
    let env = PostgresEnv::start().await?;
    let applications = Applications::new(env.store());
    let app = applications.create(Uuid::now_v7(), "A").await?;

    app.add_role("admin").await?;
    app.add_role("user").await?;
    app.update_default_roles(&["user"]).await?;
    app.update_default_roles(&["admin", "editor"]).await?;

    let mut defaults = app.get_default_roles().await?;
    defaults.sort();
    assert_eq!(defaults, vec!["admin", "editor"]);

    let names: HashSet<String> = app
        .get_roles()
        .await?
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(
        names,
        HashSet::from(["admin".to_string(), "user".to_string(), "editor".to_string()])
    );

    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pg_role_removal_cascades() -> anyhow::Result<()> {
    let env = PostgresEnv::start().await?;
    let store = env.store();
    let applications = Applications::new(store.clone());
    let realm = Uuid::now_v7();
    let portal = applications.create(realm, "portal").await?;
    let billing = applications.create(realm, "billing").await?;
    let user = Uuid::now_v7();

    let admin = portal.add_role("admin").await?;
    portal.update_default_roles(&["admin"]).await?;
    portal.grant_role(user, &admin).await?;
    billing.add_scope(&admin).await?;

    assert!(portal.remove_role_by_id(admin.id).await?);

    assert!(store.get_role(admin.id).await?.is_none());
    assert!(
        store
            .list_default_roles(RoleOwner::Application(portal.id()))
            .await?
            .is_empty()
    );
    assert!(store.get_role_mappings(user).await?.is_empty());
    assert!(store.get_scope_mappings(billing.id()).await?.is_empty());

    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pg_role_names_are_unique_per_owner() -> anyhow::Result<()> {
    let env = PostgresEnv::start().await?;
    let store = env.store();
    let realm = Uuid::now_v7();
    let applications = Applications::new(store.clone());
    let app = applications.create(realm, "portal").await?;

    let first = app.add_role("viewer").await?;
    let second = RoleContainer::for_application(env.store(), app.application())
        .add_role("viewer")
        .await?;
    assert_eq!(first.id, second.id);

    // The same name under the realm is a different role.
    let realm_role = RoleContainer::for_realm(store.clone(), realm)
        .add_role("viewer")
        .await?;
    assert_ne!(realm_role.id, first.id);

    let clash = kc_model::Role::new_application_role(realm, app.id(), "viewer");
    assert!(matches!(
        store.create_role(&clash).await,
        Err(StorageError::Duplicate { .. })
    ));

    let editor = app.add_role("editor").await?;
    let renamed = app
        .roles()
        .update_role(editor.id, "author", Some("writes content"))
        .await?
        .ok_or_else(|| anyhow::anyhow!("editor vanished"))?;
    assert_eq!(renamed.name, "author");
    assert!(app.roles().update_role(editor.id, "viewer", None).await.is_err());
    let stored = store
        .get_role(editor.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("author vanished"))?;
    assert_eq!(stored.name, "author");
    assert_eq!(stored.description.as_deref(), Some("writes content"));

    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pg_concurrent_add_role_yields_one_role() -> anyhow::Result<()> {
    let env = PostgresEnv::start().await?;
    let applications = Applications::new(env.store());
    let app = applications.create(Uuid::now_v7(), "portal").await?;

    let a: Arc<dyn ModelStore> = env.store();
    let b: Arc<dyn ModelStore> = env.store();
    let left = RoleContainer::for_application(a, app.application());
    let right = RoleContainer::for_application(b, app.application());

    let (l, r) = tokio::join!(left.add_role("auditor"), right.add_role("auditor"));
    assert_eq!(l?.id, r?.id);
    assert_eq!(app.get_roles().await?.len(), 1);

    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pg_failed_reconciliation_rolls_back() -> anyhow::Result<()> {
    let env = PostgresEnv::start().await?;
    let applications = Applications::new(env.store());
    let app = applications.create(Uuid::now_v7(), "portal").await?;
    app.update_default_roles(&["user"]).await?;

    // The application disappears underneath a second session; the new role
    // cannot reference it and the whole reconciliation is undone.
    let stale = RoleContainer::for_application(env.store(), app.application());
    assert!(applications.deregister(app.id()).await?);
    assert!(stale.update_default_roles(&["admin"]).await.is_err());

    let store = env.store();
    assert!(
        store
            .list_roles(RoleOwner::Application(app.id()))
            .await?
            .is_empty()
    );

    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pg_flow_tree_round_trip() -> anyhow::Result<()> {
    let env = PostgresEnv::start().await?;
    let store = env.store();
    let flows = FlowManager::new(store.clone());
    let realm = Uuid::now_v7();

    let browser = flows.create_flow(realm, "browser", None).await?;
    let cookie = flows
        .add_execution(browser.id, "auth-cookie", Requirement::Alternative)
        .await?;
    let (forms, forms_step) = flows
        .add_sub_flow(browser.id, "forms", Requirement::Alternative)
        .await?;
    let password = flows
        .add_execution(forms.id, "auth-username-password-form", Requirement::Required)
        .await?;

    let tree = flows.load_tree(browser.id).await?;
    tree.validate()?;
    let walked: Vec<(usize, Uuid)> = tree.walk().into_iter().map(|(d, e)| (d, e.id)).collect();
    assert_eq!(
        walked,
        vec![(0, cookie.id), (0, forms_step.id), (1, password.id)]
    );

    assert!(flows.lower_priority(cookie.id).await?);
    let tree = flows.load_tree(browser.id).await?;
    let order: Vec<Uuid> = tree.roots().iter().map(|e| e.id).collect();
    assert_eq!(order, vec![forms_step.id, cookie.id]);

    assert!(matches!(
        flows.add_sub_flow(browser.id, "forms", Requirement::Optional).await,
        Err(FlowError::DuplicateAlias(_))
    ));

    // A referenced sub-flow cannot be removed on its own.
    assert!(flows.remove_flow(forms.id).await.is_err());
    assert!(store.get_flow(forms.id).await?.is_some());

    assert!(flows.remove_execution(forms_step.id).await?);
    assert!(store.get_flow(forms.id).await?.is_none());
    assert!(store.list_executions(Some(forms.id)).await?.is_empty());

    Ok(())
}
