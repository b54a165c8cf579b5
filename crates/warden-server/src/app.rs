//! Wiring of the components into one gRPC server.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

use warden_proto::auth_service_server::AuthServiceServer;
use warden_proto::role_endpoint_service_server::RoleEndpointServiceServer;
use warden_proto::user_service_server::UserServiceServer;

use crate::account::AccountService;
use crate::auth::JwtManager;
use crate::gate::{AuthLayer, Gatekeeper};
use crate::policy::{PolicyEngine, PolicyError};
use crate::revocation::RevocationStore;
use crate::server::{AuthServiceImpl, RoleEndpointServiceImpl, UserServiceImpl};
use crate::storage::AuthDatabase;

/// A fully wired Warden instance, ready to serve.
pub struct Warden {
    accounts: AccountService,
    policy: Arc<PolicyEngine>,
    gate: Gatekeeper,
    request_timeout: Duration,
}

impl Warden {
    /// Build every component over one database and revocation store.
    /// Loads the policy table.
    pub async fn new(
        db: AuthDatabase,
        jwt: JwtManager,
        revocations: Arc<dyn RevocationStore>,
        request_timeout: Duration,
    ) -> Result<Self, PolicyError> {
        let jwt = Arc::new(jwt);
        let policy = Arc::new(PolicyEngine::load(db.clone()).await?);
        let accounts = AccountService::new(db, Arc::clone(&jwt), Arc::clone(&revocations));
        let gate = Gatekeeper::new(jwt, revocations);

        Ok(Self {
            accounts,
            policy,
            gate,
            request_timeout,
        })
    }

    pub const fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub const fn policy(&self) -> &Arc<PolicyEngine> {
        &self.policy
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()> + Send,
    {
        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<AuthServiceServer<AuthServiceImpl>>()
            .await;
        health_reporter
            .set_serving::<UserServiceServer<UserServiceImpl>>()
            .await;
        health_reporter
            .set_serving::<RoleEndpointServiceServer<RoleEndpointServiceImpl>>()
            .await;

        let auth = AuthServiceImpl::new(self.accounts.clone(), Arc::clone(&self.policy));
        let users = UserServiceImpl::new(self.accounts);
        let policies = RoleEndpointServiceImpl::new(self.policy);

        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, timeout_secs = self.request_timeout.as_secs(), "Warden listening");
        }

        Server::builder()
            .timeout(self.request_timeout)
            .layer(AuthLayer::new(self.gate))
            .add_service(health_service)
            .add_service(AuthServiceServer::new(auth))
            .add_service(UserServiceServer::new(users))
            .add_service(RoleEndpointServiceServer::new(policies))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await
    }
}
