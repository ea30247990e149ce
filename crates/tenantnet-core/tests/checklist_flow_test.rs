mod common;

use common::{TestNetwork, igw, route_table, vpc};
use tenantnet_core::checklist::{
    DEFAULT_ROUTES_CONFIGURED, INTERNET_GATEWAY_ATTACHED, TENANT_ADMIN_ASSIGNED, VPC_CONFIGURED,
};
use tenantnet_core::{
    AccountSignals, Action, ChecklistItem, DispatchOutcome, GatewayFallback, LocalUser, Method,
    Namespace, NetError, ResourceKind,
};

fn item(items: &[ChecklistItem], title: &str) -> ChecklistItem {
    items.iter().find(|i| i.title == title).cloned().unwrap()
}

#[tokio::test]
async fn test_checklist_before_any_sync_is_all_incomplete() {
    let net = TestNetwork::new();
    let items = net.service.get_checklist(&net.project);
    assert_eq!(items.len(), 8);
    assert!(items.iter().all(|i| !i.completed && i.action.is_none()));
}

#[tokio::test]
async fn test_gateway_item_completes_only_after_resolution_is_synced() {
    let net = TestNetwork::new();
    net.provider_has(ResourceKind::Vpc, vec![vpc("vpc-1").into()]);
    net.provider_has(ResourceKind::InternetGateway, vec![igw("igw-1", None).into()]);
    net.sync(&[ResourceKind::Vpc, ResourceKind::InternetGateway]).await;

    let before = item(&net.service.get_checklist(&net.project), INTERNET_GATEWAY_ATTACHED);
    assert!(!before.completed);
    let action = before.action.clone().unwrap();

    let outcome = net
        .service
        .dispatch_action(&net.project.project_id, &action)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        DispatchOutcome::Completed {
            namespace: Namespace::Provider,
            ..
        }
    ));

    // Checklist reads cached state only; nothing changes until a sync
    let stale = item(&net.service.get_checklist(&net.project), INTERNET_GATEWAY_ATTACHED);
    assert!(!stale.completed);

    // A sync that still reports the gateway unattached keeps the item open
    net.sync(&[ResourceKind::InternetGateway]).await;
    let unresolved = item(&net.service.get_checklist(&net.project), INTERNET_GATEWAY_ATTACHED);
    assert!(!unresolved.completed);

    net.provider_has(
        ResourceKind::InternetGateway,
        vec![igw("igw-1", Some("vpc-1")).into()],
    );
    net.sync(&[ResourceKind::InternetGateway]).await;
    let after = item(&net.service.get_checklist(&net.project), INTERNET_GATEWAY_ATTACHED);
    assert!(after.completed);
    assert!(after.action.is_none());
}

#[tokio::test]
async fn test_default_route_item_follows_route_creation() {
    let net = TestNetwork::new();
    net.provider_has(ResourceKind::Vpc, vec![vpc("vpc-1").into()]);
    net.provider_has(
        ResourceKind::InternetGateway,
        vec![igw("igw-1", Some("vpc-1")).into()],
    );
    net.provider_has(
        ResourceKind::RouteTable,
        vec![route_table("rtb-1", "vpc-1").into()],
    );
    net.sync(&[
        ResourceKind::Vpc,
        ResourceKind::InternetGateway,
        ResourceKind::RouteTable,
    ])
    .await;

    let before = item(&net.service.get_checklist(&net.project), DEFAULT_ROUTES_CONFIGURED);
    assert_eq!(before.missing_count, Some(1));

    net.service
        .create_default_route(&net.scope(), "rtb-1", GatewayFallback::AttachedOnly)
        .await
        .unwrap();
    net.sync(&[ResourceKind::Route]).await;

    let after = item(&net.service.get_checklist(&net.project), DEFAULT_ROUTES_CONFIGURED);
    assert!(after.completed);
    assert_eq!(after.missing_count, Some(0));
}

#[tokio::test]
async fn test_network_remediations_reach_transport_with_region() {
    let net = TestNetwork::new();
    net.provider_has(ResourceKind::Vpc, vec![vpc("vpc-1").into(), vpc("vpc-2").into()]);
    net.provider_has(
        ResourceKind::InternetGateway,
        vec![igw("igw-1", Some("vpc-1")).into(), igw("igw-2", None).into()],
    );
    net.provider_has(
        ResourceKind::RouteTable,
        vec![route_table("rtb-1", "vpc-1").into()],
    );
    net.sync(&[
        ResourceKind::Vpc,
        ResourceKind::InternetGateway,
        ResourceKind::RouteTable,
    ])
    .await;

    let items = net.service.get_checklist(&net.project);
    let attach = item(&items, INTERNET_GATEWAY_ATTACHED).action.unwrap();
    let route = item(&items, DEFAULT_ROUTES_CONFIGURED).action.unwrap();

    net.service.dispatch_action("p1", &attach).await.unwrap();
    net.service.dispatch_action("p1", &route).await.unwrap();

    let sends = net.provider.sends();
    assert_eq!(sends.len(), 2);
    assert_eq!(sends[0].endpoint, "/internet-gateways/igw-2/associate");
    assert_eq!(sends[1].endpoint, "/routes");
    for request in &sends {
        assert_eq!(request.project_id, "p1");
        assert_eq!(request.region.as_deref(), Some("tk1a"));
    }
}

#[tokio::test]
async fn test_tenant_admin_remediation_goes_through_account_gateway() {
    let net = TestNetwork::new();
    let assign = Action::new(Method::Post, "/users/u2/roles", "Assign tenant-admin role")
        .with_body(serde_json::json!({"role": "tenant-admin"}));
    net.accounts.set_signals(
        "p1",
        AccountSignals::new().with_users(vec![
            LocalUser::new("u1", "alice", true),
            LocalUser::new("u2", "bob", false).with_role_assignment(assign.clone()),
        ]),
    );
    net.service.refresh_account_signals("p1").await.unwrap();

    let before = item(&net.service.get_checklist(&net.project), TENANT_ADMIN_ASSIGNED);
    assert_eq!(before.action, Some(assign.clone()));

    net.service.dispatch_action("p1", &assign).await.unwrap();
    assert_eq!(net.accounts.sends().len(), 1);
    assert!(net.provider.sends().is_empty());

    net.accounts.set_signals(
        "p1",
        AccountSignals::new().with_users(vec![
            LocalUser::new("u1", "alice", true),
            LocalUser::new("u2", "bob", true),
        ]),
    );
    net.service.refresh_account_signals("p1").await.unwrap();

    let after = item(&net.service.get_checklist(&net.project), TENANT_ADMIN_ASSIGNED);
    assert!(after.completed);
    assert_eq!(after.missing_count, Some(0));
}

#[tokio::test]
async fn test_failed_sync_keeps_last_known_checklist() {
    let net = TestNetwork::new();
    net.provider_has(ResourceKind::Vpc, vec![vpc("vpc-1").into()]);
    net.sync(&[ResourceKind::Vpc]).await;

    net.provider
        .fail_next_list(NetError::ProviderUnavailable("gateway timeout".into()));
    let err = net
        .service
        .sync_resources(ResourceKind::Vpc, &net.scope())
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    assert!(item(&net.service.get_checklist(&net.project), VPC_CONFIGURED).completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_repeated_fix_clicks_issue_one_call() {
    let net = std::sync::Arc::new(TestNetwork::new());
    let action = Action::new(Method::Post, "/internet-gateways/igw-1/associate", "Attach");
    net.provider.hold_sends();

    let first = {
        let net = net.clone();
        let action = action.clone();
        tokio::spawn(async move { net.service.dispatch_action("p1", &action).await })
    };
    while net.provider.sends_started() == 0 {
        tokio::task::yield_now().await;
    }

    let second = net.service.dispatch_action("p1", &action).await;
    assert!(matches!(second, Err(NetError::ActionAlreadyInFlight(_))));

    net.provider.release_sends();
    first.await.unwrap().unwrap();
    assert_eq!(net.provider.sends().len(), 1);
}
