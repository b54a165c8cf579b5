//! RoleEndpointService gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::instrument;

use warden_proto::role_endpoint_service_server::RoleEndpointService;
use warden_proto::{
    AddRoleEndpointRequest, AddRoleEndpointResponse, DeleteRoleEndpointRequest,
    DeleteRoleEndpointResponse, GetRoleEndpointsRequest, GetRoleEndpointsResponse, RoleEndpoint,
    UpdateRoleEndpointRequest, UpdateRoleEndpointResponse,
};

use super::status::{permission_to_proto, roles_from_proto};
use crate::gate::extract_principal;
use crate::policy::PolicyEngine;

pub struct RoleEndpointServiceImpl {
    policy: Arc<PolicyEngine>,
}

impl RoleEndpointServiceImpl {
    pub const fn new(policy: Arc<PolicyEngine>) -> Self {
        Self { policy }
    }
}

#[allow(clippy::result_large_err)]
fn require_permission(permission: Option<RoleEndpoint>) -> Result<RoleEndpoint, Status> {
    permission.ok_or_else(|| Status::invalid_argument("Missing required field: permission"))
}

#[tonic::async_trait]
impl RoleEndpointService for RoleEndpointServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "AddRoleEndpoint"))]
    async fn add_role_endpoint(
        &self,
        request: Request<AddRoleEndpointRequest>,
    ) -> Result<Response<AddRoleEndpointResponse>, Status> {
        let caller = extract_principal(&request)?.role;
        let permission = require_permission(request.into_inner().permission)?;
        let roles = roles_from_proto(&permission.allowed_roles)?;

        self.policy
            .add_endpoint(caller, &permission.endpoint, roles)
            .await?;
        Ok(Response::new(AddRoleEndpointResponse {}))
    }

    #[instrument(skip(self, request), fields(rpc = "UpdateRoleEndpoint"))]
    async fn update_role_endpoint(
        &self,
        request: Request<UpdateRoleEndpointRequest>,
    ) -> Result<Response<UpdateRoleEndpointResponse>, Status> {
        let caller = extract_principal(&request)?.role;
        let permission = require_permission(request.into_inner().permission)?;
        let roles = roles_from_proto(&permission.allowed_roles)?;

        self.policy
            .update_endpoint(caller, &permission.endpoint, roles)
            .await?;
        Ok(Response::new(UpdateRoleEndpointResponse {}))
    }

    #[instrument(skip(self, request), fields(rpc = "DeleteRoleEndpoint"))]
    async fn delete_role_endpoint(
        &self,
        request: Request<DeleteRoleEndpointRequest>,
    ) -> Result<Response<DeleteRoleEndpointResponse>, Status> {
        let caller = extract_principal(&request)?.role;
        let endpoint = request.into_inner().endpoint;

        self.policy.delete_endpoint(caller, &endpoint).await?;
        Ok(Response::new(DeleteRoleEndpointResponse {}))
    }

    #[instrument(skip(self, request), fields(rpc = "GetRoleEndpoints"))]
    async fn get_role_endpoints(
        &self,
        request: Request<GetRoleEndpointsRequest>,
    ) -> Result<Response<GetRoleEndpointsResponse>, Status> {
        extract_principal(&request)?;

        let permissions = self
            .policy
            .endpoints()
            .await
            .into_iter()
            .map(permission_to_proto)
            .collect();
        Ok(Response::new(GetRoleEndpointsResponse { permissions }))
    }
}
