use async_trait::async_trait;
use tonic::{service::interceptor::InterceptedService, transport::Channel, Status};

use crate::{
    credentials::MacaroonInterceptor,
    proto::lnrpc::{
        self, lightning_client::LightningClient, wallet_unlocker_client::WalletUnlockerClient,
    },
};

// TLS channel with the macaroon interceptor layered on top.
type AuthedChannel = InterceptedService<Channel, MacaroonInterceptor>;

/// The slice of LND's RPC surface the engine consumes.
///
/// [`LndClient`] is the production implementation; tests substitute their own
/// to drive the engine without a daemon.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// `Lightning.GetInfo`. Only served once the wallet is unlocked.
    async fn get_info(&self) -> Result<lnrpc::GetInfoResponse, Status>;

    /// `Lightning.ListChannels`.
    async fn list_channels(
        &self,
        request: lnrpc::ListChannelsRequest,
    ) -> Result<lnrpc::ListChannelsResponse, Status>;

    /// `Lightning.WalletBalance`.
    async fn wallet_balance(&self) -> Result<lnrpc::WalletBalanceResponse, Status>;

    /// `WalletUnlocker.GenSeed`. Harmless: generates a seed without persisting it.
    async fn gen_seed(&self) -> Result<lnrpc::GenSeedResponse, Status>;

    /// `WalletUnlocker.ChangePassword`.
    async fn change_password(
        &self,
        request: lnrpc::ChangePasswordRequest,
    ) -> Result<lnrpc::ChangePasswordResponse, Status>;
}

/// Tonic clients for the `Lightning` and `WalletUnlocker` services sharing one channel.
#[derive(Clone)]
pub struct LndClient {
    lightning: LightningClient<AuthedChannel>,
    wallet_unlocker: WalletUnlockerClient<AuthedChannel>,
}

impl LndClient {
    /// Bind both service clients to `channel`, authenticating every call with `interceptor`.
    #[must_use]
    pub fn new(channel: Channel, interceptor: MacaroonInterceptor) -> Self {
        let svc = InterceptedService::new(channel, interceptor);
        Self {
            lightning: LightningClient::new(svc.clone()),
            wallet_unlocker: WalletUnlockerClient::new(svc),
        }
    }
}

#[async_trait]
impl NodeRpc for LndClient {
    async fn get_info(&self) -> Result<lnrpc::GetInfoResponse, Status> {
        let mut client = self.lightning.clone();
        let res = client.get_info(lnrpc::GetInfoRequest {}).await?;
        Ok(res.into_inner())
    }

    async fn list_channels(
        &self,
        request: lnrpc::ListChannelsRequest,
    ) -> Result<lnrpc::ListChannelsResponse, Status> {
        let mut client = self.lightning.clone();
        let res = client.list_channels(request).await?;
        Ok(res.into_inner())
    }

    async fn wallet_balance(&self) -> Result<lnrpc::WalletBalanceResponse, Status> {
        let mut client = self.lightning.clone();
        let res = client
            .wallet_balance(lnrpc::WalletBalanceRequest::default())
            .await?;
        Ok(res.into_inner())
    }

    async fn gen_seed(&self) -> Result<lnrpc::GenSeedResponse, Status> {
        let mut client = self.wallet_unlocker.clone();
        let res = client.gen_seed(lnrpc::GenSeedRequest::default()).await?;
        Ok(res.into_inner())
    }

    async fn change_password(
        &self,
        request: lnrpc::ChangePasswordRequest,
    ) -> Result<lnrpc::ChangePasswordResponse, Status> {
        let mut client = self.wallet_unlocker.clone();
        let res = client.change_password(request).await?;
        Ok(res.into_inner())
    }
}
