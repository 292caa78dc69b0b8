//! Sequential execution of the probe suites. One process, one linear pass;
//! any probe failure is reported but does not stop later suites from running.

use crate::configuration::Settings;
use crate::errors::ProbeError;
use crate::probes;
use crate::target_client::TargetClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suite {
    HealthCheck,
    Clients,
    ServiceOrders,
    Payments,
    Whatsapp,
    EmailVerification,
    AdminSaas,
    AccessControl,
    BrowserAccess,
}

impl Suite {
    pub fn all() -> Vec<Suite> {
        vec![
            Suite::HealthCheck,
            Suite::Clients,
            Suite::ServiceOrders,
            Suite::Payments,
            Suite::Whatsapp,
            Suite::EmailVerification,
            Suite::AdminSaas,
            Suite::AccessControl,
            Suite::BrowserAccess,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Suite::HealthCheck => "health-check",
            Suite::Clients => "clients",
            Suite::ServiceOrders => "service-orders",
            Suite::Payments => "payments",
            Suite::Whatsapp => "whatsapp",
            Suite::EmailVerification => "email-verification",
            Suite::AdminSaas => "admin-saas",
            Suite::AccessControl => "access-control",
            Suite::BrowserAccess => "browser-access",
        }
    }
}

impl std::str::FromStr for Suite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Suite::all()
            .into_iter()
            .find(|suite| suite.name() == s)
            .ok_or_else(|| {
                let known: Vec<_> = Suite::all().iter().map(|s| s.name()).collect();
                format!("unknown suite `{}`; known suites: {}", s, known.join(", "))
            })
    }
}

#[derive(Debug)]
pub struct ProbeOutcome {
    pub suite: Suite,
    pub result: Result<(), ProbeError>,
}

impl ProbeOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run one suite against a freshly built, logged-in client.
#[tracing::instrument(name = "Running probe suite", skip(settings), fields(suite = suite.name()))]
pub async fn run_suite(suite: Suite, settings: &Settings) -> Result<(), ProbeError> {
    // Direct-call probes run under Basic auth with the fixture credentials;
    // only the access-control probe logs in and switches to a bearer token.
    let mut client = TargetClient::build(&settings.target).map_err(ProbeError::UnexpectedError)?;
    match suite {
        Suite::HealthCheck => probes::health_check::probe(&client).await,
        Suite::Clients => probes::clients::probe(&client).await,
        Suite::ServiceOrders => probes::service_orders::probe(&client).await,
        Suite::Payments => probes::payments::probe(&client).await,
        Suite::Whatsapp => probes::whatsapp::probe(&client).await,
        Suite::EmailVerification => probes::email_verification::probe(&client).await,
        Suite::AdminSaas => probes::admin_saas::probe(&client).await,
        Suite::AccessControl => probes::access_control::probe(&mut client).await,
        Suite::BrowserAccess => {
            probes::browser_access::probe(&settings.target, &settings.browser).await
        }
    }
}

/// Run the given suites in order and collect one outcome per suite.
pub async fn run_suites(suites: &[Suite], settings: &Settings) -> Vec<ProbeOutcome> {
    let mut outcomes = Vec::with_capacity(suites.len());
    for suite in suites {
        let result = run_suite(*suite, settings).await;
        match &result {
            Ok(()) => tracing::info!(suite = suite.name(), "Probe passed"),
            Err(e) => tracing::error!(suite = suite.name(), error = %e, "Probe failed"),
        }
        outcomes.push(ProbeOutcome {
            suite: *suite,
            result,
        });
    }
    outcomes
}
