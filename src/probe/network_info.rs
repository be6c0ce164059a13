use crate::errors::ProbeError;
use crate::fallback::first_success;
use crate::network::requests::ip_lookup::IpLookup;
use crate::network::requests::send;
use crate::network::Transport;
use crate::probe::engine::SpeedProbe;
use crate::results::IpInfo;
use log::{debug, warn};

impl<T: Transport> SpeedProbe<T> {
    /// Ask each IP lookup endpoint in turn for the public address. With
    /// fallback enabled this never fails: exhaustion yields the placeholder.
    pub(crate) async fn lookup_network_info(&self) -> Result<IpInfo, ProbeError> {
        if self.is_simulated_only() {
            return Ok(IpInfo::placeholder());
        }

        let timeout = self.config.lookup_timeout;
        let outcome =
            first_success("ip lookup", &self.config.endpoints.ip, |url| {
                send(&self.transport, url, &IpLookup, timeout)
            })
            .await;

        match outcome.into_result("ip lookup") {
            Ok(info) => {
                debug!("Public address {} ({})", info.ip, info.country);
                Ok(info)
            }
            Err(e) if self.config.allow_fallback => {
                warn!("{}; using placeholder address", e.message);
                Ok(IpInfo::placeholder())
            }
            Err(e) => Err(e),
        }
    }
}
