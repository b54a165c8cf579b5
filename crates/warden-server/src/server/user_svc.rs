//! UserService gRPC implementation.

use tonic::{Request, Response, Status};
use tracing::instrument;
use warden_core::Role;

use warden_proto::user_service_server::UserService;
use warden_proto::{
    CreateUserRequest, CreateUserResponse, DeleteUserRequest, DeleteUserResponse,
    GetUserRequest, GetUserResponse, RevokeSessionsRequest, RevokeSessionsResponse,
    UpdateUserRequest, UpdateUserResponse,
};

use super::status::{role_from_proto, user_to_proto};
use crate::account::{AccountService, AccountUpdate, NewAccount};
use crate::gate::extract_principal;

pub struct UserServiceImpl {
    accounts: AccountService,
}

impl UserServiceImpl {
    pub const fn new(accounts: AccountService) -> Self {
        Self { accounts }
    }
}

#[tonic::async_trait]
impl UserService for UserServiceImpl {
    #[instrument(skip(self, request), fields(rpc = "CreateUser"))]
    async fn create_user(
        &self,
        request: Request<CreateUserRequest>,
    ) -> Result<Response<CreateUserResponse>, Status> {
        let actor = extract_principal(&request)?.clone();
        let req = request.into_inner();

        // An unset role creates a regular user.
        let role = if req.role == warden_proto::Role::Unspecified as i32 {
            Role::User
        } else {
            role_from_proto(req.role)?
        };

        let user = self
            .accounts
            .create_user(
                &actor,
                NewAccount {
                    name: req.name,
                    email: req.email,
                    password: req.password,
                    password_confirm: req.password_confirm,
                    role,
                },
            )
            .await?;

        Ok(Response::new(CreateUserResponse {
            user: Some(user_to_proto(user)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "GetUser"))]
    async fn get_user(
        &self,
        request: Request<GetUserRequest>,
    ) -> Result<Response<GetUserResponse>, Status> {
        let actor = extract_principal(&request)?.clone();
        let req = request.into_inner();

        let user = self.accounts.get_user(&actor, &req.id).await?;

        Ok(Response::new(GetUserResponse {
            user: Some(user_to_proto(user)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "UpdateUser"))]
    async fn update_user(
        &self,
        request: Request<UpdateUserRequest>,
    ) -> Result<Response<UpdateUserResponse>, Status> {
        let actor = extract_principal(&request)?.clone();
        let req = request.into_inner();

        let update = AccountUpdate {
            name: req.name,
            email: req.email,
            password: req.password,
            role: req.role.map(role_from_proto).transpose()?,
        };
        let user = self.accounts.update_user(&actor, &req.id, update).await?;

        Ok(Response::new(UpdateUserResponse {
            user: Some(user_to_proto(user)),
        }))
    }

    #[instrument(skip(self, request), fields(rpc = "DeleteUser"))]
    async fn delete_user(
        &self,
        request: Request<DeleteUserRequest>,
    ) -> Result<Response<DeleteUserResponse>, Status> {
        let actor = extract_principal(&request)?.clone();
        let req = request.into_inner();

        self.accounts.delete_user(&actor, &req.id).await?;
        Ok(Response::new(DeleteUserResponse {}))
    }

    #[instrument(skip(self, request), fields(rpc = "RevokeSessions"))]
    async fn revoke_sessions(
        &self,
        request: Request<RevokeSessionsRequest>,
    ) -> Result<Response<RevokeSessionsResponse>, Status> {
        let actor = extract_principal(&request)?.clone();
        let req = request.into_inner();

        let version = self.accounts.revoke_sessions(&actor, &req.id).await?;
        Ok(Response::new(RevokeSessionsResponse { version }))
    }
}
