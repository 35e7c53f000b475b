use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use xuanke_captcha::CaptchaSolver;
use xuanke_core::{CredentialStore, PortalError, PortalResponse, PortalTransport, RetryPolicy};

const CAPTCHA_PATH: &str = "verifycode.servlet";
const LOGIN_PATH: &str = "xk/LoginToXkLdap";

// Portal phrases the response classifier keys on.
const WRONG_CAPTCHA: &str = "验证码错误";
const WRONG_CREDENTIALS: &str = "用户名或密码错误";
const SUCCESS_PHRASES: [&str; 2] = ["欢迎", "主页"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Evaluation {
    Success,
    BadStatus(u16),
    Rejected,
    Unclear,
}

/// Runs the login sequence until it succeeds: fetch a captcha, read it,
/// submit credentials plus the guess, classify the answer, repeat. The
/// default policy retries forever with no backoff — wrong guesses are
/// expected and cheap, and there is no fallback path.
pub struct LoginDriver {
    transport: Arc<dyn PortalTransport>,
    solver: CaptchaSolver,
    credentials: Arc<CredentialStore>,
    captcha_url: Url,
    login_url: Url,
    policy: RetryPolicy,
}

impl LoginDriver {
    pub fn new(
        transport: Arc<dyn PortalTransport>,
        solver: CaptchaSolver,
        credentials: Arc<CredentialStore>,
        base: &Url,
        policy: RetryPolicy,
    ) -> Result<Self, PortalError> {
        let captcha_url = base
            .join(CAPTCHA_PATH)
            .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;
        let login_url = base
            .join(LOGIN_PATH)
            .map_err(|e| PortalError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            transport,
            solver,
            credentials,
            captcha_url,
            login_url,
            policy,
        })
    }

    pub async fn login(&self) -> Result<(), PortalError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if !self.policy.allows(attempt) {
                return Err(PortalError::LoginExhausted(attempt - 1));
            }
            if self.attempt_once(attempt).await {
                info!(attempt, "login succeeded");
                return Ok(());
            }
            if let Some(backoff) = self.policy.backoff {
                tokio::time::sleep(backoff).await;
            }
        }
    }

    /// One full FETCH_CAPTCHA → SOLVE → SUBMIT → EVALUATE pass. Any failure
    /// restarts the attempt from the top; no partial state is carried over.
    async fn attempt_once(&self, attempt: u32) -> bool {
        let image = match self.transport.get(&self.captcha_url, &[]).await {
            Ok(resp) => resp.body,
            Err(e) => {
                warn!(attempt, error = %e, "captcha fetch failed");
                return false;
            }
        };

        let guess = self.solver.solve(&image).trim().to_string();
        if guess.is_empty() {
            warn!(attempt, "captcha could not be read, refetching");
            return false;
        }
        debug!(attempt, guess = %guess, "submitting login form");

        let creds = self.credentials.snapshot();
        let body = login_form_body(&creds.username, &creds.password, &guess);

        let resp = match self.transport.post_form(&self.login_url, body, &[]).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(attempt, error = %e, "login submit failed");
                return false;
            }
        };

        match evaluate(&resp, &self.login_url) {
            Evaluation::Success => true,
            Evaluation::BadStatus(code) => {
                warn!(attempt, code, "login answered with unexpected HTTP status");
                false
            }
            Evaluation::Rejected => {
                warn!(attempt, "login rejected: wrong captcha or credentials");
                false
            }
            Evaluation::Unclear => {
                warn!(attempt, "login result unclear, retrying");
                false
            }
        }
    }
}

/// Serialize the login form; percent-escaping keeps the declared length
/// honest for credentials with reserved characters.
fn login_form_body(username: &str, password: &str, guess: &str) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("USERNAME", username)
        .append_pair("PASSWORD", password)
        .append_pair("RANDOMCODE", guess)
        .finish()
}

fn evaluate(resp: &PortalResponse, login_url: &Url) -> Evaluation {
    if resp.status != 200 {
        return Evaluation::BadStatus(resp.status);
    }
    let text = resp.text();
    if text.contains(WRONG_CAPTCHA) || text.contains(WRONG_CREDENTIALS) {
        return Evaluation::Rejected;
    }
    // A redirect away from the login endpoint is the strongest success
    // signal; the welcome phrases cover portals that answer in place.
    if resp.final_url != *login_url || SUCCESS_PHRASES.iter().any(|p| text.contains(p)) {
        return Evaluation::Success;
    }
    Evaluation::Unclear
}
