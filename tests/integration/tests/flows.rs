//! Authentication flow trees assembled through the flow manager.

use kc_auth::{FlowError, FlowManager, SiblingGroup};
use kc_integration_tests::memory_store;
use kc_model::Requirement;
use kc_storage::AuthenticationFlowProvider;
use uuid::Uuid;

/// Builds `browser -> [cookie (ALTERNATIVE), forms (ALTERNATIVE)]` with
/// `forms -> [username-password (REQUIRED), otp (OPTIONAL)]`.
#[tokio::test]
async fn test_browser_flow_tree() -> anyhow::Result<()> {
    let store = memory_store();
    let flows = FlowManager::new(store.clone());
    let realm = Uuid::now_v7();

    let browser = flows.create_flow(realm, "browser", Some("browser based authentication")).await?;
    let cookie = flows
        .add_execution(browser.id, "auth-cookie", Requirement::Alternative)
        .await?;
    let (forms, forms_step) = flows
        .add_sub_flow(browser.id, "forms", Requirement::Alternative)
        .await?;
    let password = flows
        .add_execution(forms.id, "auth-username-password-form", Requirement::Required)
        .await?;
    let otp = flows
        .add_execution(forms.id, "auth-otp-form", Requirement::Optional)
        .await?;

    let tree = flows.load_tree(browser.id).await?;
    tree.validate()?;
    assert_eq!(tree.top(), Some(browser.id));
    assert_eq!(tree.len(), 4);

    let walked: Vec<(usize, Uuid)> = tree.walk().into_iter().map(|(d, e)| (d, e.id)).collect();
    assert_eq!(
        walked,
        vec![(0, cookie.id), (0, forms_step.id), (1, password.id), (1, otp.id)]
    );

    // Top level: no required step, so one alternative suffices.
    let top = tree.root_group();
    assert!(top.alternatives_apply());
    assert_eq!(top.alternatives.len(), 2);

    // Inside the forms sub-flow the required step dominates.
    let inner = tree
        .sub_flow_children(forms_step.id)
        .ok_or_else(|| anyhow::anyhow!("forms step has no children"))?;
    let group = SiblingGroup::from_siblings(inner);
    assert!(!group.alternatives_apply());
    assert_eq!(group.required.len(), 1);
    assert_eq!(group.optional.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_disabling_and_reordering_steps() -> anyhow::Result<()> {
    let store = memory_store();
    let flows = FlowManager::new(store.clone());
    let browser = flows.create_flow(Uuid::now_v7(), "browser", None).await?;

    let cookie = flows
        .add_execution(browser.id, "auth-cookie", Requirement::Alternative)
        .await?;
    let kerberos = flows
        .add_execution(browser.id, "auth-spnego", Requirement::Disabled)
        .await?;
    let idp = flows
        .add_execution(browser.id, "identity-provider-redirector", Requirement::Alternative)
        .await?;

    assert!(flows.raise_priority(idp.id).await?);
    assert!(!flows.raise_priority(cookie.id).await?);

    let tree = flows.load_tree(browser.id).await?;
    let order: Vec<Uuid> = tree.roots().iter().map(|e| e.id).collect();
    assert_eq!(order, vec![cookie.id, idp.id, kerberos.id]);

    let enabled: Vec<Uuid> = tree.root_group().enabled().iter().map(|e| e.id).collect();
    assert!(!enabled.contains(&kerberos.id));
    assert_eq!(enabled.len(), 2);

    flows
        .update_requirement(kerberos.id, Requirement::Alternative)
        .await?;
    let tree = flows.load_tree(browser.id).await?;
    assert_eq!(tree.root_group().enabled().len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_removing_a_sub_flow_removes_its_subtree() -> anyhow::Result<()> {
    let store = memory_store();
    let flows = FlowManager::new(store.clone());
    let realm = Uuid::now_v7();
    let browser = flows.create_flow(realm, "browser", None).await?;

    let (forms, forms_step) = flows
        .add_sub_flow(browser.id, "forms", Requirement::Required)
        .await?;
    let (conditional, _) = flows
        .add_sub_flow(forms.id, "conditional otp", Requirement::Optional)
        .await?;
    flows
        .add_execution(conditional.id, "auth-otp-form", Requirement::Required)
        .await?;

    assert!(flows.remove_execution(forms_step.id).await?);

    assert!(store.get_flow(forms.id).await?.is_none());
    assert!(store.get_flow(conditional.id).await?.is_none());
    assert!(store.list_executions(Some(conditional.id)).await?.is_empty());
    assert!(flows.load_tree(browser.id).await?.is_empty());

    // Aliases are free again.
    flows
        .add_sub_flow(browser.id, "forms", Requirement::Required)
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_flow_aliases_are_unique_per_realm() -> anyhow::Result<()> {
    let store = memory_store();
    let flows = FlowManager::new(store.clone());
    let realm = Uuid::now_v7();

    flows.create_flow(realm, "browser", None).await?;
    assert!(matches!(
        flows.create_flow(realm, "browser", None).await,
        Err(FlowError::DuplicateAlias(_))
    ));
    flows.create_flow(Uuid::now_v7(), "browser", None).await?;

    assert_eq!(flows.list_flows(realm).await?.len(), 1);
    assert!(matches!(
        flows.load_tree(Uuid::now_v7()).await,
        Err(FlowError::FlowNotFound(_))
    ));

    Ok(())
}
