use crate::engine::EngineInner;
use crate::error::EngineResult;
use remote_authority::Credentials;
use tracing::info;

impl EngineInner {
    /// Sign in, then pull the new account's sections. The stores are
    /// cleared by the guard's reset hook before the new identity lands.
    pub(crate) async fn sign_in(&self, credentials: &Credentials) -> EngineResult<()> {
        let user = self.guard.sign_in(credentials).await?;
        info!(username = %user.username, "Session started");
        self.fetch_sections().await
    }

    pub(crate) async fn sign_up(&self, credentials: &Credentials) -> EngineResult<()> {
        let user = self.guard.sign_up(credentials).await?;
        info!(username = %user.username, "Account created");
        self.fetch_sections().await
    }

    /// Never fails; local content stays available in guest mode.
    pub(crate) async fn sign_out(&self) -> EngineResult<()> {
        self.throttle.clear();
        self.guard.sign_out().await;
        Ok(())
    }
}
