use std::{sync::Arc, time::SystemTime};

use {
    secrecy::ExposeSecret,
    tokio::{sync::mpsc, time::Instant},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    weblib_common::{
        BackendError, LoginRequest, PLATFORM_MICROSOFT, PlatformId, SessionApi, SessionResult,
    },
};

#[cfg(feature = "metrics")]
use weblib_metrics::{auth as auth_metrics, counter, labels};

use crate::{
    error::LoginError,
    host::{BrowserContext, ItemRenderer, Popup},
    id_token::{IdToken, IdTokenClaims},
    message::ProviderMessage,
    request::{STATE_LEN, authorize_url, logout_url},
    types::{FlowState, OidcConfig, PendingAuthRequest, Prompt},
    validate::validate,
};

/// Source of the current time in Unix seconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// What handling a provider message led to.
#[derive(Debug)]
pub enum FlowStep {
    /// A silent attempt needed interaction; an interactive attempt is now pending.
    Retrying,
    /// The backend accepted the identity.
    Authenticated(SessionResult),
    /// No attempt was pending; the message was dropped.
    Ignored,
}

/// One pop-up session: the pending request, the pop-up handle and the
/// subscription that is cancelled when the attempt ends.
struct Attempt {
    pending: PendingAuthRequest,
    popup: Option<Box<dyn Popup>>,
    subscription: CancellationToken,
    deadline: Instant,
}

impl Attempt {
    fn release(&self) {
        self.subscription.cancel();
    }

    fn close_popup(&self) {
        if let Some(popup) = &self.popup {
            popup.close();
        }
    }
}

/// Login flow controller.
///
/// Owns at most one pending attempt. `initiate` replaces whatever was pending,
/// so a message from an older pop-up is validated against the new request and
/// rejected.
pub struct LoginFlow {
    config: OidcConfig,
    browser: Arc<dyn BrowserContext>,
    session: Arc<dyn SessionApi>,
    renderer: Arc<dyn ItemRenderer>,
    clock: Clock,
    state: FlowState,
    attempt: Option<Attempt>,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl LoginFlow {
    pub fn new(
        config: OidcConfig,
        browser: Arc<dyn BrowserContext>,
        session: Arc<dyn SessionApi>,
        renderer: Arc<dyn ItemRenderer>,
    ) -> Self {
        Self {
            config,
            browser,
            session,
            renderer,
            clock: Arc::new(unix_now),
            state: FlowState::Idle,
            attempt: None,
        }
    }

    /// Replace the clock used for claim timing checks and expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// The outstanding request, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingAuthRequest> {
        self.attempt.as_ref().map(|a| &a.pending)
    }

    /// Token cancelled when the current attempt ends. Cancelling it from
    /// outside abandons the attempt at the next [`LoginFlow::run`] poll.
    #[must_use]
    pub fn subscription(&self) -> Option<CancellationToken> {
        self.attempt.as_ref().map(|a| a.subscription.clone())
    }

    /// Start a new attempt and open the provider pop-up.
    pub fn initiate(&mut self, prompt: Prompt) -> Result<(), LoginError> {
        if let Some(previous) = self.attempt.take() {
            debug!(state = %previous.pending.state, "superseding pending login attempt");
            previous.release();
        }

        let pending = PendingAuthRequest::generate(prompt, (self.clock)());
        let url = authorize_url(&self.config, &pending)?;

        #[cfg(feature = "metrics")]
        counter!(auth_metrics::LOGIN_ATTEMPTS_TOTAL, labels::PROMPT => prompt.as_str()).increment(1);

        let popup = self.browser.open_popup(&url);
        let blocked = popup.is_none();
        let state = pending.state.clone();
        let attempt = Attempt {
            pending,
            popup,
            subscription: CancellationToken::new(),
            deadline: Instant::now() + self.config.login_timeout,
        };

        if blocked {
            // The request stays recorded, but nothing can answer it.
            attempt.release();
            self.attempt = Some(attempt);
            return Err(self.fail(LoginError::PopupBlocked));
        }

        self.attempt = Some(attempt);
        self.state = if prompt.is_interactive() {
            FlowState::PendingInteractive
        } else {
            FlowState::PendingSilent
        };
        info!(state = %state, prompt = prompt.as_str(), "login pop-up opened");
        Ok(())
    }

    /// Handle a message posted back by the provider pop-up.
    pub async fn on_provider_message(
        &mut self,
        message: ProviderMessage,
    ) -> Result<FlowStep, LoginError> {
        if !self.state.is_pending() {
            warn!(state = ?self.state, "provider message with no pending login, dropping");
            return Ok(FlowStep::Ignored);
        }
        let Some(attempt) = self.attempt.take() else {
            warn!("provider message with no pending request, dropping");
            return Ok(FlowStep::Ignored);
        };
        attempt.release();

        let retry = message.needs_interaction() && !attempt.pending.prompt.is_interactive();
        match message {
            ProviderMessage::Error { code, description } => {
                if retry {
                    info!(code = %code, "silent login needs interaction, retrying");
                    attempt.close_popup();
                    #[cfg(feature = "metrics")]
                    counter!(auth_metrics::INTERACTIVE_RETRIES_TOTAL).increment(1);
                    self.initiate(Prompt::SelectAccount)?;
                    return Ok(FlowStep::Retrying);
                }
                Err(self.fail(LoginError::Provider { code, description }))
            },
            ProviderMessage::Success { id_token, state } => {
                if state.len() == STATE_LEN {
                    attempt.close_popup();
                }
                let claims = match self.verify(id_token.expose_secret(), &state, &attempt.pending) {
                    Ok(claims) => claims,
                    Err(err) => return Err(self.fail(err)),
                };
                self.complete_login(&claims).await
            },
        }
    }

    fn verify(
        &self,
        compact: &str,
        returned_state: &str,
        pending: &PendingAuthRequest,
    ) -> Result<IdTokenClaims, LoginError> {
        let token = IdToken::decode(compact)?;
        let now = (self.clock)();
        validate(&token.claims, returned_state, pending, &self.config, now).map_err(|failure| {
            #[cfg(feature = "metrics")]
            counter!(auth_metrics::TOKEN_VALIDATION_FAILURES_TOTAL, labels::CHECK => failure.as_str())
                .increment(1);
            LoginError::TokenValidation {
                failure,
                claims: token.payload,
            }
        })?;
        debug!(tid = %token.claims.tid, "identity token claims accepted");
        Ok(token.claims)
    }

    /// Forward validated claims to the backend and hydrate the item lists.
    ///
    /// `claims` must already have passed [`validate`].
    pub async fn complete_login(
        &mut self,
        claims: &IdTokenClaims,
    ) -> Result<FlowStep, LoginError> {
        let request = match login_request(claims) {
            Ok(request) => request,
            Err(err) => return Err(self.fail(err)),
        };

        let result = match self.session.login(&request).await {
            Ok(result) => result,
            Err(err) => return Err(self.fail(err.into())),
        };
        if !result.status {
            let reason = result
                .error
                .clone()
                .unwrap_or_else(|| "login was not accepted".into());
            return Err(self.fail(BackendError::Rejected(reason).into()));
        }

        self.state = FlowState::Authenticated;
        self.renderer.set_logged_in(true);
        for (list, items) in result.lists() {
            debug!(list = list.as_str(), count = items.len(), "hydrating item list");
            self.renderer.clear_list(list);
            for item in items {
                self.renderer.append_item(list, item);
            }
        }

        #[cfg(feature = "metrics")]
        counter!(auth_metrics::LOGIN_SUCCESS_TOTAL).increment(1);
        info!(oid = %request.platform_id.oid, "logged in");
        Ok(FlowStep::Authenticated(result))
    }

    /// End the backend session, then send the browser to the provider's logout page.
    pub async fn logout(&mut self) -> Result<(), LoginError> {
        if let Some(attempt) = self.attempt.take() {
            attempt.release();
        }
        if let Err(err) = self.session.logout().await {
            warn!(error = %err, "backend logout failed");
        }
        let url = logout_url(&self.config)?;
        self.state = FlowState::Idle;
        self.renderer.set_logged_in(false);
        self.browser.navigate(&url);
        info!("logged out");
        Ok(())
    }

    /// Fail the pending attempt if it has been waiting at least the login
    /// timeout as of `now` (Unix seconds).
    pub fn expire(&mut self, now: i64) -> Result<(), LoginError> {
        let stale = self.state.is_pending()
            && self.attempt.as_ref().is_some_and(|a| {
                now.saturating_sub(a.pending.created_at)
                    >= self.config.login_timeout.as_secs() as i64
            });
        if stale {
            return Err(self.time_out());
        }
        Ok(())
    }

    fn time_out(&mut self) -> LoginError {
        if let Some(attempt) = self.attempt.take() {
            attempt.close_popup();
            attempt.release();
        }
        #[cfg(feature = "metrics")]
        counter!(auth_metrics::ATTEMPTS_EXPIRED_TOTAL).increment(1);
        self.fail(LoginError::TimedOut)
    }

    /// Drive the pending attempt with messages from `messages` until it is
    /// authenticated, fails, times out or its subscription is cancelled.
    pub async fn run(
        &mut self,
        messages: &mut mpsc::Receiver<ProviderMessage>,
    ) -> Result<FlowStep, LoginError> {
        loop {
            let (subscription, deadline) = match &self.attempt {
                Some(a) if self.state.is_pending() => (a.subscription.clone(), a.deadline),
                _ => return Err(LoginError::NoPendingAttempt),
            };

            tokio::select! {
                message = messages.recv() => match message {
                    Some(message) => match self.on_provider_message(message).await? {
                        FlowStep::Retrying | FlowStep::Ignored => continue,
                        step => return Ok(step),
                    },
                    None => {
                        if let Some(attempt) = self.attempt.take() {
                            attempt.release();
                        }
                        return Err(self.fail(LoginError::ChannelClosed));
                    },
                },
                () = tokio::time::sleep_until(deadline) => return Err(self.time_out()),
                () = subscription.cancelled() => return Err(self.cancel()),
            }
        }
    }

    /// Abandon the pending attempt: close its pop-up, cancel its subscription
    /// and move to `Failed`. Returns the `Cancelled` error for the caller.
    pub fn cancel(&mut self) -> LoginError {
        if let Some(attempt) = self.attempt.take() {
            attempt.close_popup();
            attempt.release();
        }
        self.fail(LoginError::Cancelled)
    }

    /// Move to `Failed`, surface the error to the user if it is user-facing,
    /// and hand it back for the caller to return.
    fn fail(&mut self, err: LoginError) -> LoginError {
        self.state = FlowState::Failed;
        match &err {
            LoginError::TokenValidation { failure, claims } => {
                error!(failure = failure.as_str(), claims = %claims, "identity token rejected");
            },
            LoginError::InvalidClaims { reason, claims } => {
                error!(reason = %reason, claims = %claims, "identity token claims unusable");
            },
            other => warn!(reason = other.reason(), error = %other, "login failed"),
        }
        if let Some(message) = err.user_message() {
            self.browser.alert(&message);
        }
        #[cfg(feature = "metrics")]
        counter!(auth_metrics::LOGIN_FAILURES_TOTAL, labels::REASON => err.reason()).increment(1);
        err
    }
}

/// Session bootstrap body for validated claims.
pub fn login_request(claims: &IdTokenClaims) -> Result<LoginRequest, LoginError> {
    let email = claims
        .email
        .clone()
        .ok_or(LoginError::MissingClaim("email"))?;
    Ok(LoginRequest {
        platform: PLATFORM_MICROSOFT.into(),
        platform_id: PlatformId {
            oid: claims.oid.clone(),
            tid: claims.tid.clone(),
        },
        email,
        username: claims.preferred_username.clone(),
        name: claims.name.clone(),
    })
}
