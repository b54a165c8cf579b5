//! Tests for `RoleEndpointService` gRPC implementation.

use std::sync::Arc;

use tonic::Code;
use warden_core::Role;

use warden_proto::role_endpoint_service_server::RoleEndpointService;
use warden_proto::{
    AddRoleEndpointRequest, DeleteRoleEndpointRequest, GetRoleEndpointsRequest, RoleEndpoint,
    UpdateRoleEndpointRequest,
};

use super::policy_svc::RoleEndpointServiceImpl;
use super::status::role_to_proto;
use super::test_helpers::{admin_principal, authed};
use crate::gate::Principal;
use crate::policy::PolicyEngine;
use crate::storage::AuthDatabase;

async fn setup() -> (RoleEndpointServiceImpl, Arc<PolicyEngine>) {
    let db = AuthDatabase::open_in_memory().await.unwrap();
    let policy = Arc::new(PolicyEngine::load(db).await.unwrap());
    (RoleEndpointServiceImpl::new(Arc::clone(&policy)), policy)
}

fn permission(endpoint: &str, roles: &[Role]) -> Option<RoleEndpoint> {
    Some(RoleEndpoint {
        endpoint: endpoint.into(),
        allowed_roles: roles.iter().copied().map(role_to_proto).collect(),
    })
}

fn plain_user() -> Principal {
    Principal {
        user_id: "u1".into(),
        username: "alice".into(),
        role: Role::User,
    }
}

#[tokio::test]
async fn add_update_delete_cycle() {
    let (svc, policy) = setup().await;

    svc.add_role_endpoint(authed(
        AddRoleEndpointRequest {
            permission: permission("/svc/Create", &[Role::Admin]),
        },
        admin_principal(),
    ))
    .await
    .unwrap();
    assert!(policy.check("/svc/Create", Role::User).await.is_err());

    svc.update_role_endpoint(authed(
        UpdateRoleEndpointRequest {
            permission: permission("/svc/Create", &[Role::Admin, Role::User]),
        },
        admin_principal(),
    ))
    .await
    .unwrap();
    policy.check("/svc/Create", Role::User).await.unwrap();

    svc.delete_role_endpoint(authed(
        DeleteRoleEndpointRequest {
            endpoint: "/svc/Create".into(),
        },
        admin_principal(),
    ))
    .await
    .unwrap();
    assert!(policy.check("/svc/Create", Role::Admin).await.is_err());
}

#[tokio::test]
async fn get_role_endpoints_lists_seeded_table() {
    let (svc, _) = setup().await;

    let resp = svc
        .get_role_endpoints(authed(GetRoleEndpointsRequest {}, admin_principal()))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(resp.permissions.len(), 4);
    for p in &resp.permissions {
        assert_eq!(p.allowed_roles, vec![role_to_proto(Role::Admin)]);
    }
}

#[tokio::test]
async fn non_admin_is_denied_by_the_policy_table() {
    let (svc, _) = setup().await;

    let err = svc
        .add_role_endpoint(authed(
            AddRoleEndpointRequest {
                permission: permission("/svc/Create", &[Role::User]),
            },
            plain_user(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::PermissionDenied);
}

#[tokio::test]
async fn malformed_requests_are_invalid() {
    let (svc, _) = setup().await;

    let err = svc
        .add_role_endpoint(authed(
            AddRoleEndpointRequest { permission: None },
            admin_principal(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = svc
        .add_role_endpoint(authed(
            AddRoleEndpointRequest {
                permission: permission("/svc/Create", &[]),
            },
            admin_principal(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn duplicate_and_missing_endpoints() {
    let (svc, _) = setup().await;
    let add = || {
        authed(
            AddRoleEndpointRequest {
                permission: permission("/svc/Create", &[Role::User]),
            },
            admin_principal(),
        )
    };

    svc.add_role_endpoint(add()).await.unwrap();
    let err = svc.add_role_endpoint(add()).await.unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);

    let err = svc
        .delete_role_endpoint(authed(
            DeleteRoleEndpointRequest {
                endpoint: "/svc/Missing".into(),
            },
            admin_principal(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::NotFound);
}
