//! AuthService gRPC implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, instrument};

use warden_proto::auth_service_server::AuthService;
use warden_proto::{
    CheckRequest, CheckResponse, LoginRequest, LoginResponse, LogoutRequest, LogoutResponse,
    RefreshTokensRequest, RefreshTokensResponse,
};

use crate::account::AccountService;
use crate::gate::extract_principal;
use crate::policy::PolicyEngine;

pub struct AuthServiceImpl {
    accounts: AccountService,
    policy: Arc<PolicyEngine>,
}

impl AuthServiceImpl {
    pub fn new(accounts: AccountService, policy: Arc<PolicyEngine>) -> Self {
        Self { accounts, policy }
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "Login"))]
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        let pair = self.accounts.login(&req.username, &req.password).await?;

        Ok(Response::new(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "RefreshTokens"))]
    async fn refresh_tokens(
        &self,
        request: Request<RefreshTokensRequest>,
    ) -> Result<Response<RefreshTokensResponse>, Status> {
        let req = request.into_inner();
        let pair = self.accounts.refresh_tokens(&req.refresh_token).await?;

        Ok(Response::new(RefreshTokensResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "Logout"))]
    async fn logout(
        &self,
        request: Request<LogoutRequest>,
    ) -> Result<Response<LogoutResponse>, Status> {
        let req = request.into_inner();
        self.accounts.logout(&req.refresh_token).await?;
        Ok(Response::new(LogoutResponse {}))
    }

    #[instrument(skip(self, request), fields(rpc = "Check"))]
    async fn check(
        &self,
        request: Request<CheckRequest>,
    ) -> Result<Response<CheckResponse>, Status> {
        let role = extract_principal(&request)?.role;
        let endpoint = request.into_inner().endpoint;

        self.policy.check(&endpoint, role).await?;
        debug!(endpoint = %endpoint, %role, "Access granted");
        Ok(Response::new(CheckResponse {}))
    }
}
